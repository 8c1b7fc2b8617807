//! Arithmetic operations.
//!
//! `+ - *` stay integral only when both operands are `Int`; `/ ^ %` always
//! produce floats; bitwise operators work on `intval` of each operand.

use crate::coerce::{fltval, intval, numval};
use quill_core::number::Number;
use quill_core::value::Value;

/// Binary arithmetic operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

/// Perform a binary arithmetic operation.
pub fn arith(op: ArithOp, a: &Value, b: &Value) -> Value {
    match op {
        ArithOp::Add | ArithOp::Sub | ArithOp::Mul => {
            if let (Value::Int(x), Value::Int(y)) = (a, b) {
                return Value::Int(int_arith(op, *x, *y));
            }
            let (x, y) = (fltval(a), fltval(b));
            Value::Float(match op {
                ArithOp::Add => x + y,
                ArithOp::Sub => x - y,
                _ => x * y,
            })
        }
        ArithOp::Div => Value::Float(fltval(a) / fltval(b)),
        ArithOp::Pow => Value::Float(fltval(a).powf(fltval(b))),
        ArithOp::Mod => Value::Float(float_mod(fltval(a), fltval(b))),
        _ => Value::Int(int_arith(op, intval(a), intval(b))),
    }
}

fn int_arith(op: ArithOp, a: i64, b: i64) -> i64 {
    match op {
        ArithOp::Add => a.wrapping_add(b),
        ArithOp::Sub => a.wrapping_sub(b),
        ArithOp::Mul => a.wrapping_mul(b),
        ArithOp::BitAnd => a & b,
        ArithOp::BitOr => a | b,
        ArithOp::BitXor => a ^ b,
        ArithOp::Shl => shift_left(a, b),
        ArithOp::Shr => shift_right(a, b),
        ArithOp::Div | ArithOp::Mod | ArithOp::Pow => unreachable!("float-only operator"),
    }
}

/// Floored modulo: the result takes the sign of the divisor.
fn float_mod(a: f64, b: f64) -> f64 {
    let r = a % b; // IEEE 754 fmod (truncated remainder)
    if r != 0.0 && ((r > 0.0) != (b > 0.0)) {
        r + b
    } else {
        r
    }
}

/// Left shift; negative amounts shift right, 64 or more gives 0.
fn shift_left(a: i64, b: i64) -> i64 {
    if b >= 64 || b <= -64 {
        0
    } else if b < 0 {
        shift_right(a, -b)
    } else {
        a.wrapping_shl(b as u32)
    }
}

/// Arithmetic right shift; negative amounts shift left, 64 or more gives 0.
fn shift_right(a: i64, b: i64) -> i64 {
    if b >= 64 || b <= -64 {
        0
    } else if b < 0 {
        shift_left(a, -b)
    } else {
        a >> b
    }
}

/// Unary minus: numbers keep their kind, strings become floats, anything
/// else is `Int 0`.
pub fn negate(v: &Value) -> Value {
    match v {
        Value::Int(i) => Value::Int(i.wrapping_neg()),
        Value::Float(f) => Value::Float(-f),
        Value::Str(_) => Value::Float(-fltval(v)),
        _ => Value::Int(0),
    }
}

/// Numeric cast (`+x`), same typing rules as `negate`.
pub fn to_numeric(v: &Value) -> Value {
    match v {
        Value::Int(_) | Value::Float(_) => v.clone(),
        Value::Str(_) => Value::Float(fltval(v)),
        _ => Value::Int(0),
    }
}

pub fn bit_not(v: &Value) -> Value {
    Value::Int(!intval(v))
}

/// Add `delta` to the numeric value of `v`, keeping integers integral.
pub fn step(v: &Value, delta: i64) -> Value {
    match numval(v) {
        Number::Int(i) => Value::Int(i.wrapping_add(delta)),
        Number::Float(f) => Value::Float(f + delta as f64),
    }
}

/// Numeric value of `v` as a `Value`.
pub fn number_value(v: &Value) -> Value {
    match numval(v) {
        Number::Int(i) => Value::Int(i),
        Number::Float(f) => Value::Float(f),
    }
}

/// Concatenate the canonical string forms of `values` in one pass.
pub fn concat(values: &[Value]) -> Value {
    let mut out = Vec::new();
    for v in values {
        v.write_canonical(&mut out);
    }
    Value::str(out)
}
