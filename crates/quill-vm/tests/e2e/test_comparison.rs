use super::helpers::*;
use quill_bytecode::OpCode;
use quill_core::value::Value;

#[test]
fn test_numeric_equality() {
    assert_true(&binary(int(1), OpCode::Eq, int(1)));
    assert_true(&binary(int(1), OpCode::Eq, flt(1.0)));
    assert_false(&binary(int(1), OpCode::Eq, flt(1.5)));
    assert_true(&binary(int(1), OpCode::Ne, int(2)));
}

#[test]
fn test_string_numeric_equality_requires_whole_number() {
    assert_true(&binary(text("10"), OpCode::Eq, int(10)));
    assert_true(&binary(int(10), OpCode::Eq, text("10.0")));
    assert_false(&binary(text("10abc"), OpCode::Eq, int(10)));
    assert_false(&binary(text(""), OpCode::Eq, int(0)));
    assert_true(&binary(text(""), OpCode::Eq, text("")));
}

#[test]
fn test_ordering_uses_numeric_prefix() {
    // Equality rejects "9abc" but ordering reads it as 9.
    assert_false(&binary(text("9abc"), OpCode::Eq, int(9)));
    assert_false(&binary(int(10), OpCode::Lt, text("9abc")));
    assert_true(&binary(int(8), OpCode::Lt, text("9abc")));
    assert_true(&binary(int(9), OpCode::Le, text("9abc")));
}

#[test]
fn test_ordering_is_numeric_for_strings() {
    // "10" > "9" numerically, unlike byte order.
    assert_true(&binary(text("10"), OpCode::Gt, text("9")));
    assert_true(&binary(text("abc"), OpCode::Ge, text("xyz")));
    assert_false(&binary(text("abc"), OpCode::Lt, text("xyz")));
}

#[test]
fn test_null_equality() {
    assert_true(&binary(Value::Null, OpCode::Eq, Value::Null));
    assert_false(&binary(Value::Null, OpCode::Eq, int(0)));
    assert_false(&binary(text(""), OpCode::Eq, Value::Null));
    assert_true(&binary(Value::Null, OpCode::Ne, int(0)));
}

#[test]
fn test_string_equality_by_content() {
    let v = run(|b| {
        b.load_str("ab").load_str("c").emit(OpCode::Cat);
        b.load_str("abc").emit(OpCode::Eq).emit(OpCode::Ret);
    });
    assert_true(&v);
}

#[test]
fn test_tables_compare_by_identity() {
    let v = run(|b| {
        b.emit1(OpCode::Array, 0).emit1(OpCode::Array, 0).emit(OpCode::Eq);
        b.local_addr(0).emit1(OpCode::Array, 0).emit(OpCode::Assign).emit(OpCode::Pop);
        b.local(0).local(0).emit(OpCode::Eq);
        b.emit1(OpCode::CatN, 2).emit(OpCode::Ret);
    });
    assert_str(&v, "01");
}

#[test]
fn test_nan_compares_false() {
    let nan = flt(f64::NAN);
    assert_false(&binary(nan.clone(), OpCode::Eq, nan.clone()));
    assert_false(&binary(nan.clone(), OpCode::Lt, int(1)));
    assert_false(&binary(nan, OpCode::Ge, int(1)));
}

#[test]
fn test_truthiness() {
    let falsy = [Value::Null, int(0), flt(0.0), text(""), text("0"), text("0.0")];
    for v in falsy {
        assert_true(&unary(OpCode::Not, v));
    }
    let truthy = [int(2), flt(-0.5), text("a"), text("00x"), text(" 1 ")];
    for v in truthy {
        assert_false(&unary(OpCode::Not, v));
    }
}

#[test]
fn test_table_truthiness_is_length() {
    let v = run(|b| {
        b.emit1(OpCode::Array, 0).emit(OpCode::Not);
        b.load_null().emit1(OpCode::Array, 1).emit(OpCode::Not);
        b.load_int(1).emit1(OpCode::Array, 1).emit(OpCode::Not);
        b.emit1(OpCode::CatN, 3).emit(OpCode::Ret);
    });
    assert_str(&v, "110");
}

#[test]
fn test_regex_match() {
    let v = run(|b| {
        b.load_str("hello world").load_regex("w.r").emit(OpCode::Match);
        b.load_str("hello").load_regex("^x").emit(OpCode::Match);
        b.load_str("hello").load_regex("^x").emit(OpCode::NotMatch);
        b.load_int(2024).load_str("^[0-9]+$").emit(OpCode::Match);
        b.emit1(OpCode::CatN, 4).emit(OpCode::Ret);
    });
    assert_str(&v, "1011");
}
