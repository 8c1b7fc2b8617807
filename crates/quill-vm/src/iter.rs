//! Loop iterators.
//!
//! One iterator is pushed per active loop. Table loops walk a snapshot of
//! the keys taken when the loop starts, so inserting or deleting keys in the
//! body neither adds nor skips steps. Values are read at each step.

use quill_core::heap::{Heap, HeapIdx};
use quill_core::string::Str;
use quill_core::table::Table;
use quill_core::value::{Range, Value};
use std::rc::Rc;

#[derive(Debug)]
enum Source {
    Range { range: Range, pos: usize },
    /// Bytes of a string, or the text of a number.
    Text { bytes: Vec<u8>, pos: usize },
    Keys {
        table: HeapIdx<Table>,
        keys: Vec<Value>,
        pos: usize,
    },
    Empty,
}

/// An active loop.
#[derive(Debug)]
pub struct LoopIter {
    source: Source,
    /// Absolute stack index of the first bound local.
    pub slot: usize,
    /// Bind key into `slot` and value into `slot + 1`.
    pub with_key: bool,
}

impl LoopIter {
    pub fn new(subject: &Value, heap: &Heap, slot: usize, with_key: bool) -> Self {
        let source = match subject {
            Value::Range(range) => Source::Range {
                range: *range,
                pos: 0,
            },
            Value::Str(_) | Value::Int(_) | Value::Float(_) => Source::Text {
                bytes: subject.to_bytes(),
                pos: 0,
            },
            Value::Table(t) => Source::Keys {
                table: *t,
                keys: heap.table(*t).collect_keys(),
                pos: 0,
            },
            _ => Source::Empty,
        };
        LoopIter {
            source,
            slot,
            with_key,
        }
    }

    /// Next (key, value) pair, or `None` once exhausted.
    pub fn advance(&mut self, heap: &Heap) -> Option<(Value, Value)> {
        match &mut self.source {
            Source::Range { range, pos } => {
                let v = range.get(*pos)?;
                let key = Value::Int(*pos as i64);
                *pos += 1;
                Some((key, Value::Int(v)))
            }
            Source::Text { bytes, pos } => {
                let b = *bytes.get(*pos)?;
                let key = Value::Int(*pos as i64);
                *pos += 1;
                Some((key, Value::Str(Rc::new(Str::from(vec![b])))))
            }
            Source::Keys { table, keys, pos } => {
                let key = keys.get(*pos)?.clone();
                *pos += 1;
                let value = heap.table(*table).get(&key);
                Some((key, value))
            }
            Source::Empty => None,
        }
    }
}
