//! Type coercion helpers.
//!
//! Coercions never fail: values with no numeric reading become `0`.

use quill_core::heap::Heap;
use quill_core::number::{parse_number, parse_prefix, Number};
use quill_core::value::Value;

/// Numeric value. Strings use their longest numeric prefix.
pub fn numval(v: &Value) -> Number {
    match v {
        Value::Int(i) => Number::Int(*i),
        Value::Float(f) => Number::Float(*f),
        Value::Str(s) => parse_prefix(s.as_bytes()),
        _ => Number::Int(0),
    }
}

/// Integer value; floats truncate toward zero (saturating, NaN is 0).
pub fn intval(v: &Value) -> i64 {
    match numval(v) {
        Number::Int(i) => i,
        Number::Float(f) => f as i64,
    }
}

/// Float value.
pub fn fltval(v: &Value) -> f64 {
    numval(v).as_f64()
}

/// Numeric value only if the whole value reads as a number. Used where a
/// trailing-garbage string must not count as numeric.
pub fn full_number(v: &Value) -> Option<Number> {
    match v {
        Value::Int(i) => Some(Number::Int(*i)),
        Value::Float(f) => Some(Number::Float(*f)),
        Value::Str(s) => parse_number(s.as_bytes()),
        _ => None,
    }
}

/// Truthiness used by conditional jumps and `Not`.
pub fn truthy(v: &Value, heap: &Heap) -> bool {
    match v {
        Value::Null => false,
        Value::Int(i) => *i != 0,
        Value::Float(f) => *f != 0.0,
        Value::Str(s) => {
            if s.as_bytes() == b"0" {
                return false;
            }
            match parse_number(s.as_bytes()) {
                Some(n) => !n.is_zero(),
                None => !s.is_empty(),
            }
        }
        Value::Table(t) => heap.table(*t).length() > 0,
        Value::Regex(_) | Value::Range(_) | Value::Function(_) | Value::Native(_) => true,
    }
}

/// Length: live entries of a table, bytes of a string (or of a number's
/// text), elements of a range.
pub fn length(v: &Value, heap: &Heap) -> i64 {
    match v {
        Value::Table(t) => heap.table(*t).length() as i64,
        Value::Str(s) => s.len() as i64,
        Value::Range(r) => r.len() as i64,
        Value::Int(_) | Value::Float(_) => v.to_bytes().len() as i64,
        _ => 0,
    }
}
