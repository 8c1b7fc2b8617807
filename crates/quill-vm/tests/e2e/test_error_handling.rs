use super::helpers::*;
use quill_bytecode::OpCode;
use quill_core::value::Value;
use quill_vm::{Vm, VmError};

#[test]
fn test_invalid_regex_is_fatal() {
    let err = run_err(|b| {
        b.load_str("abc").load_regex("(unclosed").emit(OpCode::Match);
    });
    assert!(matches!(err, VmError::Regex(_)), "{err}");
}

#[test]
fn test_invalid_regex_from_string_operand() {
    let err = run_err(|b| {
        b.load_str("abc").load_str("[z-a]").emit(OpCode::NotMatch);
    });
    assert!(matches!(err, VmError::Regex(_)), "{err}");
}

#[test]
fn test_local_outside_frame_is_corrupt() {
    let err = run_err(|b| {
        b.emit1(OpCode::Local, 9).emit(OpCode::Ret);
    });
    assert!(matches!(err, VmError::CorruptCode { pc: 0, .. }), "{err}");
}

#[test]
fn test_iter_next_without_loop_is_corrupt() {
    let err = run_err(|b| {
        let done = b.label();
        b.bind(done).jump(OpCode::IterNext, done);
    });
    assert!(matches!(err, VmError::CorruptCode { .. }), "{err}");
}

#[test]
fn test_iter_pop_cannot_reach_callers_loop() {
    // the caller's loop is not visible from inside the callee
    let f = function("pop", 0, |b| {
        b.emit(OpCode::IterPop);
    });
    let err = run_err(|b| {
        b.locals(2);
        b.load_int(1).load_int(3).emit(OpCode::Range);
        b.emit1(OpCode::IterValue, 0);
        b.function(f).call(0);
    });
    assert!(matches!(err, VmError::CorruptCode { .. }), "{err}");
}

#[test]
fn test_error_message_names_type() {
    let err = run_err(|b| {
        b.load_float(1.5).call(0);
    });
    assert_eq!(err.to_string(), "attempt to call a float value");
}

#[test]
fn test_vm_recovers_after_error() {
    let mut vm = Vm::new();
    let code = {
        let mut b = quill_bytecode::CodeBuilder::new();
        b.global_addr("before").load_int(1).emit(OpCode::Assign).emit(OpCode::Pop);
        b.load_int(1).load_int(2).load_int(3);
        b.load_str("x").load_regex("(").emit(OpCode::Match);
        b.finish().unwrap()
    };
    assert!(vm.eval(code).is_err());
    assert_eq!(vm.stack_len(), 0);
    assert_eq!(vm.call_depth(), 0);

    // side effects before the error stay visible
    assert_eq!(vm.global("before"), Value::Int(1));
    let v = run_in(&mut vm, |b| {
        b.global("before").load_int(41).emit(OpCode::Add).emit(OpCode::Ret);
    });
    assert_int(&v, 42);
}

#[test]
fn test_error_inside_loop_resets_iterators() {
    let mut vm = Vm::new();
    let code = {
        let mut b = quill_bytecode::CodeBuilder::new();
        b.locals(2);
        b.load_int(1).load_int(3).emit(OpCode::Range);
        b.emit1(OpCode::IterValue, 0);
        let top = b.label();
        let done = b.label();
        b.bind(top).jump(OpCode::IterNext, done);
        b.load_int(0).call(0);
        b.jump(OpCode::Jmp, top);
        b.bind(done).emit(OpCode::IterPop);
        b.finish().unwrap()
    };
    let err = vm.eval(code).unwrap_err();
    assert!(matches!(err, VmError::NotCallable("int")), "{err}");

    // a fresh script sees no stale loop
    let err = vm
        .eval({
            let mut b = quill_bytecode::CodeBuilder::new();
            let done = b.label();
            b.bind(done).jump(OpCode::IterNext, done);
            b.finish().unwrap()
        })
        .unwrap_err();
    assert!(matches!(err, VmError::CorruptCode { .. }), "{err}");
}
