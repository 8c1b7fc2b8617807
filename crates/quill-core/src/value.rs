/// Tagged runtime value.
///
/// Scalars (`Null`, `Int`, `Float`, `Range`) are copied on assignment.
/// Strings and regexes are shared immutable `Rc`s. Tables and functions
/// live in the `Heap` and are referenced by index, so copying a `Value`
/// that holds a table aliases the table rather than its contents.
use crate::heap::{Function, HeapIdx};
use crate::number::format_float;
use crate::string::Str;
use crate::table::Table;
use std::fmt;
use std::rc::Rc;

/// Handle to a native function registered with the VM.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NativeId(pub u32);

/// An inclusive integer range `from..to` walked by `step`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Range {
    pub from: i64,
    pub to: i64,
    pub step: i64,
}

impl Range {
    pub fn new(from: i64, to: i64, step: i64) -> Self {
        Range { from, to, step }
    }

    /// Number of elements. A zero step, or a step pointing away from `to`,
    /// gives an empty range.
    pub fn len(&self) -> usize {
        let (from, to, step) = (self.from as i128, self.to as i128, self.step as i128);
        let n = if step > 0 && from <= to {
            (to - from) / step + 1
        } else if step < 0 && from >= to {
            (from - to) / -step + 1
        } else {
            0
        };
        usize::try_from(n).unwrap_or(usize::MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `i`th element, if in range.
    pub fn get(&self, i: usize) -> Option<i64> {
        if i >= self.len() {
            return None;
        }
        let v = self.from as i128 + i as i128 * self.step as i128;
        i64::try_from(v).ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        (0..self.len()).map_while(|i| self.get(i))
    }
}

/// A runtime value.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Int(i64),
    Float(f64),
    Str(Rc<Str>),
    /// Regex pattern source. Compilation is left to the VM's regex service.
    Regex(Rc<Str>),
    Range(Range),
    Table(HeapIdx<Table>),
    Function(HeapIdx<Function>),
    Native(NativeId),
}

impl Value {
    pub fn str(s: impl Into<Str>) -> Self {
        Value::Str(Rc::new(s.into()))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&Rc<Str>> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<HeapIdx<Table>> {
        match self {
            Value::Table(t) => Some(*t),
            _ => None,
        }
    }

    /// The type name reported to scripts.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Regex(_) => "regex",
            Value::Range(_) => "range",
            Value::Table(_) => "table",
            Value::Function(_) => "function",
            Value::Native(_) => "native",
        }
    }

    /// Append the canonical string form to `out`. Strings are copied byte
    /// for byte; everything else goes through `Display`.
    pub fn write_canonical(&self, out: &mut Vec<u8>) {
        match self {
            Value::Null => {}
            Value::Str(s) | Value::Regex(s) => out.extend_from_slice(s.as_bytes()),
            Value::Int(i) => out.extend_from_slice(i.to_string().as_bytes()),
            other => out.extend_from_slice(other.to_string().as_bytes()),
        }
    }

    /// The canonical string form as bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_canonical(&mut out);
        out
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(n) => f.write_str(&format_float(*n)),
            Value::Str(s) | Value::Regex(s) => write!(f, "{}", s),
            Value::Range(r) if r.step == 1 => write!(f, "{}..{}", r.from, r.to),
            Value::Range(r) => write!(f, "{}..{}:{}", r.from, r.to, r.step),
            Value::Table(t) => write!(f, "table: #{}", t.index()),
            Value::Function(func) => write!(f, "function: #{}", func.index()),
            Value::Native(id) => write!(f, "native: #{}", id.0),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::str(s)
    }
}

impl From<Rc<Str>> for Value {
    fn from(s: Rc<Str>) -> Self {
        Value::Str(s)
    }
}

impl From<Range> for Value {
    fn from(r: Range) -> Self {
        Value::Range(r)
    }
}
