use super::helpers::*;
use quill_bytecode::{CodeBuilder, OpCode};

/// Emit `for <locals> in <subject on stack> { body }`.
fn for_loop(b: &mut CodeBuilder, slot: u8, with_key: bool, body: impl FnOnce(&mut CodeBuilder)) {
    b.locals(slot as usize + 2);
    let op = if with_key {
        OpCode::IterKeyValue
    } else {
        OpCode::IterValue
    };
    b.emit1(op, slot);
    let top = b.label();
    let done = b.label();
    b.bind(top).jump(OpCode::IterNext, done);
    body(b);
    b.jump(OpCode::Jmp, top);
    b.bind(done).emit(OpCode::IterPop);
}

/// Append local `n` to the accumulator in local 0.
fn append(b: &mut CodeBuilder, n: u8) {
    b.local_addr(0).local(n).emit(OpCode::CatAssign).emit(OpCode::Pop);
}

#[test]
fn test_range_sum() {
    // s = 0; for i in 1..10 { s += i }; return s
    let v = run(|b| {
        b.local_addr(0).load_int(0).emit(OpCode::Assign).emit(OpCode::Pop);
        b.load_int(1).load_int(10).emit(OpCode::Range);
        for_loop(b, 1, false, |b| {
            b.local_addr(0).local(1).emit(OpCode::AddAssign).emit(OpCode::Pop);
        });
        b.local(0).emit(OpCode::Ret);
    });
    assert_int(&v, 55);
}

#[test]
fn test_descending_range_with_step() {
    let v = run(|b| {
        b.load_int(10).load_int(1).load_int(-3).emit(OpCode::RangeStep);
        for_loop(b, 1, false, |b| append(b, 1));
        b.local(0).emit(OpCode::Ret);
    });
    assert_str(&v, "10741");
}

#[test]
fn test_zero_step_range_is_empty() {
    let v = run(|b| {
        b.local_addr(0).load_str("empty").emit(OpCode::Assign).emit(OpCode::Pop);
        b.load_int(1).load_int(10).load_int(0).emit(OpCode::RangeStep);
        for_loop(b, 1, false, |b| append(b, 1));
        b.local(0).emit(OpCode::Ret);
    });
    assert_str(&v, "empty");
}

#[test]
fn test_key_value_over_range() {
    let v = run(|b| {
        b.load_int(5).load_int(7).emit(OpCode::Range);
        for_loop(b, 1, true, |b| {
            append(b, 1);
            append(b, 2);
        });
        b.local(0).emit(OpCode::Ret);
    });
    assert_str(&v, "051627");
}

#[test]
fn test_string_iteration() {
    let v = run(|b| {
        b.load_str("abc");
        for_loop(b, 1, true, |b| {
            append(b, 2);
            append(b, 1);
        });
        b.local(0).emit(OpCode::Ret);
    });
    assert_str(&v, "a0b1c2");
}

#[test]
fn test_table_iteration_order() {
    // null key, then array part, then hash part
    let v = run(|b| {
        b.load_int(10).load_int(20).emit1(OpCode::Array, 2);
        b.emit(OpCode::Dup).load_null().emit(OpCode::IdxA);
        b.load_str("n").emit(OpCode::Assign).emit(OpCode::Pop);
        b.emit(OpCode::Dup).load_str("x").emit(OpCode::IdxA);
        b.load_str("X").emit(OpCode::Assign).emit(OpCode::Pop);
        for_loop(b, 1, false, |b| append(b, 1));
        b.local(0).emit(OpCode::Ret);
    });
    assert_str(&v, "n1020X");
}

#[test]
fn test_table_iteration_skips_null_values() {
    let v = run(|b| {
        b.load_int(1).load_null().load_int(3).emit1(OpCode::Array, 3);
        for_loop(b, 1, true, |b| append(b, 1));
        b.local(0).emit(OpCode::Ret);
    });
    assert_str(&v, "02");
}

#[test]
fn test_snapshot_ignores_keys_added_in_body() {
    // t = ["a", "b"]; for k, v in t { t["new" .. k] = 1; out ..= v }; return out .. #t
    let v = run(|b| {
        b.local_addr(3).load_str("a").load_str("b").emit1(OpCode::Array, 2);
        b.emit(OpCode::Assign).emit(OpCode::Pop);
        b.local(3);
        for_loop(b, 1, true, |b| {
            b.local(3).load_str("new").local(1).emit(OpCode::Cat).emit(OpCode::IdxA);
            b.load_int(1).emit(OpCode::Assign).emit(OpCode::Pop);
            append(b, 2);
        });
        b.local(0).local(3).emit(OpCode::Len).emit(OpCode::Cat).emit(OpCode::Ret);
    });
    assert_str(&v, "ab4");
}

#[test]
fn test_values_deleted_in_body_read_as_null() {
    // t = [1, 2, 3]; for k, v in t { t[2] = null; out ..= v }; return out
    let v = run(|b| {
        b.local_addr(3).load_int(1).load_int(2).load_int(3).emit1(OpCode::Array, 3);
        b.emit(OpCode::Assign).emit(OpCode::Pop);
        b.local(3);
        for_loop(b, 1, true, |b| {
            b.local(3).load_int(2).emit(OpCode::IdxA);
            b.load_null().emit(OpCode::Assign).emit(OpCode::Pop);
            append(b, 2);
        });
        b.local(0).emit(OpCode::Ret);
    });
    assert_str(&v, "12");
}

#[test]
fn test_nested_loops() {
    let v = run(|b| {
        b.locals(5);
        b.load_int(1).load_int(2).emit(OpCode::Range);
        for_loop(b, 1, false, |b| {
            b.load_str("xy");
            for_loop(b, 3, false, |b| {
                append(b, 1);
                append(b, 3);
            });
        });
        b.local(0).emit(OpCode::Ret);
    });
    assert_str(&v, "1x1y2x2y");
}

#[test]
fn test_break_out_of_loop() {
    // for i in 1..100 { if i == 3 break; out ..= i }
    let v = run(|b| {
        b.load_int(1).load_int(100).emit(OpCode::Range);
        b.locals(3);
        b.emit1(OpCode::IterValue, 1);
        let top = b.label();
        let done = b.label();
        b.bind(top).jump(OpCode::IterNext, done);
        b.local(1).load_int(3).emit(OpCode::Eq).jump(OpCode::Jnz, done);
        append(b, 1);
        b.jump(OpCode::Jmp, top);
        b.bind(done).emit(OpCode::IterPop);
        b.local(0).emit(OpCode::Ret);
    });
    assert_str(&v, "12");
}

#[test]
fn test_return_inside_loop_drops_iterators() {
    // f = fn() { for i in 1..5 { for c in "ab" { return i .. c } } }
    let f = function("first", 0, |b| {
        b.load_int(1).load_int(5).emit(OpCode::Range);
        for_loop(b, 0, false, |b| {
            b.load_str("ab");
            for_loop(b, 2, false, |b| {
                b.local(0).local(2).emit(OpCode::Cat).emit(OpCode::Ret);
            });
        });
    });
    // for i in 1..2 { out ..= f(); out ..= i }
    let v = run(|b| {
        b.locals(3);
        b.local_addr(2).function(f).emit(OpCode::Assign).emit(OpCode::Pop);
        b.load_int(1).load_int(2).emit(OpCode::Range);
        for_loop(b, 1, false, |b| {
            b.local_addr(0).local(2).call(0).emit(OpCode::CatAssign).emit(OpCode::Pop);
            append(b, 1);
        });
        b.local(0).emit(OpCode::Ret);
    });
    assert_str(&v, "1a11a2");
}

#[test]
fn test_iterating_null_is_empty() {
    let v = run(|b| {
        b.load_null();
        for_loop(b, 1, false, |b| append(b, 1));
        b.local(0).load_str("done").emit(OpCode::Cat).emit(OpCode::Ret);
    });
    assert_str(&v, "done");
}
