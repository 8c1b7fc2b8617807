//! Call frames and operand stack slots.

use quill_core::heap::HeapIdx;
use quill_core::string::Str;
use quill_core::table::Table;
use quill_core::value::Value;
use std::rc::Rc;

/// A call frame on the VM call stack.
#[derive(Clone, Debug)]
pub struct CallFrame {
    /// Index into the VM's prototype store.
    pub proto: usize,
    /// Program counter (byte offset into the prototype's code).
    pub pc: usize,
    /// Stack index of the first argument; the callee sits at `fp - 1`.
    pub fp: usize,
    /// Iterator stack height at entry, restored on return.
    pub iter_base: usize,
}

/// A writable location, pushed by the address forms of the location opcodes.
#[derive(Clone, Debug, PartialEq)]
pub enum Place {
    /// Absolute operand stack index.
    Local(usize),
    Global(Rc<Str>),
    /// Resolved through the table's key normalization on every access.
    Element { table: HeapIdx<Table>, key: Value },
}

/// One operand stack entry.
#[derive(Clone, Debug, PartialEq)]
pub enum Slot {
    Value(Value),
    Place(Place),
}

impl Default for Slot {
    fn default() -> Self {
        Slot::Value(Value::Null)
    }
}

impl From<Value> for Slot {
    fn from(v: Value) -> Self {
        Slot::Value(v)
    }
}
