//! Comparison operations.
//!
//! Equality only lets a string take part numerically when the whole string
//! is a number; ordering always compares `numval` of both sides.

use crate::coerce::{full_number, numval};
use quill_core::number::Number;
use quill_core::value::Value;
use std::cmp::Ordering;

/// Equality for `==` and `!=`.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            numbers_equal(numval(a), numval(b))
        }
        (Value::Str(x), Value::Str(y)) => x.content_eq(y),
        (Value::Str(_), Value::Int(_) | Value::Float(_))
        | (Value::Int(_) | Value::Float(_), Value::Str(_)) => {
            match (full_number(a), full_number(b)) {
                (Some(x), Some(y)) => numbers_equal(x, y),
                _ => false,
            }
        }
        (Value::Regex(x), Value::Regex(y)) => x.content_eq(y),
        (Value::Range(x), Value::Range(y)) => x == y,
        (Value::Table(x), Value::Table(y)) => x == y,
        (Value::Function(x), Value::Function(y)) => x == y,
        (Value::Native(x), Value::Native(y)) => x == y,
        _ => false,
    }
}

fn numbers_equal(a: Number, b: Number) -> bool {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => x == y,
        (Number::Int(i), Number::Float(f)) | (Number::Float(f), Number::Int(i)) => {
            i as f64 == f && (i as f64 as i64) == i
        }
        (Number::Float(x), Number::Float(y)) => x == y,
    }
}

/// Numeric ordering; `None` when a NaN is involved.
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (numval(a), numval(b)) {
        (Number::Int(x), Number::Int(y)) => Some(x.cmp(&y)),
        (x, y) => x.as_f64().partial_cmp(&y.as_f64()),
    }
}

pub fn less_than(a: &Value, b: &Value) -> bool {
    compare(a, b) == Some(Ordering::Less)
}

pub fn less_equal(a: &Value, b: &Value) -> bool {
    matches!(compare(a, b), Some(Ordering::Less | Ordering::Equal))
}
