use super::helpers::*;
use quill_bytecode::OpCode;
use quill_core::value::Value;
use quill_vm::error::Result;
use quill_vm::{Vm, VmConfig, VmError};

fn native_sum(vm: &mut Vm, fp: usize, argc: usize) -> Result<usize> {
    let total: i64 = (0..argc)
        .map(|i| vm.arg(fp, argc, i).as_int().unwrap_or(0))
        .sum();
    vm.set_result(fp, Value::Int(total));
    Ok(1)
}

fn native_argc(vm: &mut Vm, fp: usize, argc: usize) -> Result<usize> {
    vm.set_result(fp, Value::Int(argc as i64));
    Ok(1)
}

fn native_silent(_vm: &mut Vm, _fp: usize, _argc: usize) -> Result<usize> {
    Ok(0)
}

/// `apply(f, x)` calls back into the VM.
fn native_apply(vm: &mut Vm, fp: usize, argc: usize) -> Result<usize> {
    let f = vm.arg(fp, argc, 0);
    let x = vm.arg(fp, argc, 1);
    let result = vm.call_value(&f, &[x])?;
    vm.set_result(fp, result);
    Ok(1)
}

/// Runs a fresh script against the same globals.
fn native_eval_add(vm: &mut Vm, fp: usize, argc: usize) -> Result<usize> {
    let n = vm.arg(fp, argc, 0);
    let code = assemble(|b| {
        b.global("base");
        push(b, &n);
        b.emit(OpCode::Add).emit(OpCode::Ret);
    });
    let result = vm.eval(code)?;
    vm.set_result(fp, result);
    Ok(1)
}

fn native_fail(_vm: &mut Vm, _fp: usize, _argc: usize) -> Result<usize> {
    Err(VmError::Resource {
        path: "missing.txt".into(),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
    })
}

#[test]
fn test_call_script_function() {
    // add = fn(a, b) { return a + b }; return add(2, 3)
    let add = function("add", 2, |b| {
        b.local(0).local(1).emit(OpCode::Add).emit(OpCode::Ret);
    });
    let v = run(|b| {
        b.function(add).load_int(2).load_int(3).call(2).emit(OpCode::Ret);
    });
    assert_int(&v, 5);
}

#[test]
fn test_missing_arguments_are_null() {
    let f = function("second", 2, |b| {
        b.local(1).emit(OpCode::Ret);
    });
    let v = run(|b| {
        b.function(f).load_int(1).call(1).emit(OpCode::Ret);
    });
    assert_null(&v);
}

#[test]
fn test_extra_arguments_are_dropped() {
    // f = fn(a) { x = 7; return a .. x } where x is local 1
    let f = function("first", 1, |b| {
        b.local_addr(1).load_int(7).emit(OpCode::Assign).emit(OpCode::Pop);
        b.local(0).local(1).emit(OpCode::Cat).emit(OpCode::Ret);
    });
    let v = run(|b| {
        b.function(f).load_int(1).load_int(2).load_int(3).call(3).emit(OpCode::Ret);
    });
    assert_str(&v, "17");
}

#[test]
fn test_locals_start_null() {
    let f = function("fresh", 1, |b| {
        b.local(2).emit(OpCode::Ret);
    });
    let v = run(|b| {
        b.function(f).load_int(1).load_int(2).load_int(3).call(3).emit(OpCode::Ret);
    });
    assert_null(&v);
}

#[test]
fn test_ret0_and_falling_off_end_give_null() {
    let f = function("nothing", 0, |b| {
        b.load_int(1).emit(OpCode::Pop).emit(OpCode::Ret0);
    });
    let g = function("fall", 0, |b| {
        b.load_int(1).emit(OpCode::Pop);
    });
    let v = run(|b| {
        b.function(f).call(0).function(g).call(0).emit(OpCode::Eq).emit(OpCode::Ret);
    });
    assert_true(&v);
}

#[test]
fn test_recursion() {
    // fact = fn(n) { if n <= 1 return 1; return n * fact(n - 1) }
    let fact = function("fact", 1, |b| {
        let recurse = b.label();
        b.local(0).load_int(1).emit(OpCode::Le).jump(OpCode::Jz, recurse);
        b.load_int(1).emit(OpCode::Ret);
        b.bind(recurse);
        b.local(0).global("fact").local(0).load_int(1).emit(OpCode::Sub).call(1);
        b.emit(OpCode::Mul).emit(OpCode::Ret);
    });
    let v = run(|b| {
        b.global_addr("fact").function(fact).emit(OpCode::Assign).emit(OpCode::Pop);
        b.global("fact").load_int(10).call(1).emit(OpCode::Ret);
    });
    assert_int(&v, 3_628_800);
}

#[test]
fn test_stack_overflow() {
    let forever = function("forever", 0, |b| {
        b.global("forever").call(0).emit(OpCode::Ret);
    });
    let mut vm = Vm::with_config(VmConfig::default().with_max_call_depth(50));
    let code = assemble(|b| {
        b.global_addr("forever").function(forever).emit(OpCode::Assign).emit(OpCode::Pop);
        b.global("forever").call(0).emit(OpCode::Ret);
    });
    let err = vm.eval(code).unwrap_err();
    assert!(matches!(err, VmError::StackOverflow(50)), "{err}");
    assert_eq!(vm.stack_len(), 0);
    assert_eq!(vm.call_depth(), 0);
}

#[test]
fn test_call_non_callable() {
    let err = run_err(|b| {
        b.load_str("nope").call(0);
    });
    assert!(matches!(err, VmError::NotCallable("string")), "{err}");
    let err = run_err(|b| {
        b.global("undefined").load_int(1).call(1);
    });
    assert!(matches!(err, VmError::NotCallable("null")), "{err}");
}

#[test]
fn test_native_call() {
    let mut vm = Vm::new();
    vm.register_native("sum", native_sum);
    let v = run_in(&mut vm, |b| {
        b.global("sum").load_int(1).load_int(2).load_int(3).call(3).emit(OpCode::Ret);
    });
    assert_int(&v, 6);
}

#[test]
fn test_native_sees_exact_argument_count() {
    let mut vm = Vm::new();
    vm.register_native("argc", native_argc);
    let v = run_in(&mut vm, |b| {
        b.global("argc").call(0);
        b.global("argc").load_null().load_null().call(2);
        b.emit(OpCode::Cat).emit(OpCode::Ret);
    });
    assert_str(&v, "02");
}

#[test]
fn test_native_without_result_pushes_null() {
    let mut vm = Vm::new();
    vm.register_native("silent", native_silent);
    let v = run_in(&mut vm, |b| {
        b.load_int(5).global("silent").load_int(1).call(1);
        b.emit1(OpCode::CatN, 2).emit(OpCode::Ret);
    });
    assert_str(&v, "5");
}

#[test]
fn test_native_reenters_vm() {
    // apply(fn(x) { return x * 2 }, apply(fn(x) { return x + 1 }, 20))
    let double = function("double", 1, |b| {
        b.local(0).load_int(2).emit(OpCode::Mul).emit(OpCode::Ret);
    });
    let inc = function("inc", 1, |b| {
        b.local(0).load_int(1).emit(OpCode::Add).emit(OpCode::Ret);
    });
    let mut vm = Vm::new();
    vm.register_native("apply", native_apply);
    let v = run_in(&mut vm, |b| {
        b.local_addr(0).load_int(100).emit(OpCode::Assign).emit(OpCode::Pop);
        b.global("apply").function(double);
        b.global("apply").function(inc).load_int(20).call(2);
        b.call(2);
        // the caller's local survives the nested runs
        b.local(0).emit(OpCode::Add).emit(OpCode::Ret);
    });
    assert_int(&v, 142);
    assert_eq!(vm.stack_len(), 0);
}

#[test]
fn test_script_native_script_recursion() {
    // down = fn(n) { if n == 0 return 0; return apply(down, n - 1) + 1 }
    let down = function("down", 1, |b| {
        let more = b.label();
        b.local(0).load_int(0).emit(OpCode::Eq).jump(OpCode::Jz, more);
        b.load_int(0).emit(OpCode::Ret);
        b.bind(more);
        b.global("apply").global("down").local(0).load_int(1).emit(OpCode::Sub).call(2);
        b.load_int(1).emit(OpCode::Add).emit(OpCode::Ret);
    });
    let mut vm = Vm::new();
    vm.register_native("apply", native_apply);
    let v = run_in(&mut vm, |b| {
        b.global_addr("down").function(down).emit(OpCode::Assign).emit(OpCode::Pop);
        b.global("down").load_int(30).call(1).emit(OpCode::Ret);
    });
    assert_int(&v, 30);
}

#[test]
fn test_native_recursion_hits_depth_limit() {
    let down = function("down", 1, |b| {
        b.global("apply").global("down").local(0).call(2).emit(OpCode::Ret);
    });
    let mut vm = Vm::with_config(VmConfig::default().with_max_call_depth(40));
    vm.register_native("apply", native_apply);
    let code = assemble(|b| {
        b.global_addr("down").function(down).emit(OpCode::Assign).emit(OpCode::Pop);
        b.global("down").load_int(0).call(1).emit(OpCode::Ret);
    });
    let err = vm.eval(code).unwrap_err();
    assert!(matches!(err, VmError::StackOverflow(40)), "{err}");
    assert_eq!(vm.stack_len(), 0);
}

#[test]
fn test_nested_eval_shares_globals() {
    let mut vm = Vm::new();
    vm.register_native("eval_add", native_eval_add);
    let v = run_in(&mut vm, |b| {
        b.global_addr("base").load_int(40).emit(OpCode::Assign).emit(OpCode::Pop);
        b.local_addr(0).load_str("kept").emit(OpCode::Assign).emit(OpCode::Pop);
        b.global("eval_add").load_int(2).call(1);
        b.local(0).emit(OpCode::Cat).emit(OpCode::Ret);
    });
    assert_str(&v, "42kept");
}

#[test]
fn test_native_error_is_fatal_and_resets() {
    let mut vm = Vm::new();
    vm.register_native("fail", native_fail);
    vm.register_native("apply", native_apply);
    let code = assemble(|b| {
        b.load_int(1).load_int(2);
        b.global("apply").global("fail").load_int(0).call(2).emit(OpCode::Ret);
    });
    let err = vm.eval(code).unwrap_err();
    assert_eq!(err.to_string(), "missing.txt: not found");
    assert_eq!(vm.stack_len(), 0);
    assert_eq!(vm.call_depth(), 0);

    // the VM is still usable
    let v = run_in(&mut vm, |b| {
        b.load_int(1).emit(OpCode::Ret);
    });
    assert_int(&v, 1);
}

#[test]
fn test_call_value_from_host() {
    let mut vm = Vm::new();
    let square = function("square", 1, |b| {
        b.local(0).local(0).emit(OpCode::Mul).emit(OpCode::Ret);
    });
    let f = run_in(&mut vm, |b| {
        b.function(square).emit(OpCode::Ret);
    });
    assert_int(&vm.call_value(&f, &[Value::Int(9)]).unwrap(), 81);
    let err = vm.call_value(&Value::Int(1), &[]).unwrap_err();
    assert!(matches!(err, VmError::NotCallable("int")));
}

#[test]
fn test_functions_are_values() {
    let f = function("id", 1, |b| {
        b.local(0).emit(OpCode::Ret);
    });
    let v = run(|b| {
        b.local_addr(0).function(f).emit(OpCode::Assign).emit(OpCode::Pop);
        b.local_addr(1).local(0).emit(OpCode::Assign).emit(OpCode::Pop);
        b.local(0).local(1).emit(OpCode::Eq);
        b.local(0).emit(OpCode::Not);
        b.emit1(OpCode::CatN, 2).emit(OpCode::Ret);
    });
    assert_str(&v, "10");
}
