//! Base functions: `len`, `type`, `keys`, `delete`, `str`, `num`, `int`,
//! `call`.

use crate::ret;
use quill_core::string::Str;
use quill_core::table::Table;
use quill_core::value::Value;
use quill_vm::arith::number_value;
use quill_vm::coerce::{intval, length};
use quill_vm::error::Result;
use quill_vm::Vm;
use std::rc::Rc;

/// Register the base functions as globals.
pub fn register(vm: &mut Vm) {
    vm.register_native("len", native_len);
    vm.register_native("type", native_type);
    vm.register_native("keys", native_keys);
    vm.register_native("delete", native_delete);
    vm.register_native("str", native_str);
    vm.register_native("num", native_num);
    vm.register_native("int", native_int);
    vm.register_native("call", native_call);
}

fn native_len(vm: &mut Vm, fp: usize, argc: usize) -> Result<usize> {
    let v = vm.arg(fp, argc, 0);
    let n = length(&v, vm.heap());
    ret(vm, fp, Value::Int(n))
}

fn native_type(vm: &mut Vm, fp: usize, argc: usize) -> Result<usize> {
    let name = vm.arg(fp, argc, 0).type_name();
    ret(vm, fp, Value::from(name))
}

/// Live keys of a table as a new array, in iteration order. Anything other
/// than a table has no keys.
fn native_keys(vm: &mut Vm, fp: usize, argc: usize) -> Result<usize> {
    let keys = match vm.arg(fp, argc, 0) {
        Value::Table(t) => vm.heap().table(t).collect_keys(),
        _ => Vec::new(),
    };
    let mut out = Table::with_array(keys.len());
    for (i, key) in keys.into_iter().enumerate() {
        out.insert_forced(i, key);
    }
    let t = vm.heap_mut().alloc_table(out);
    ret(vm, fp, Value::Table(t))
}

/// `delete(t, k)` removes the key and returns the value it held.
fn native_delete(vm: &mut Vm, fp: usize, argc: usize) -> Result<usize> {
    let Value::Table(t) = vm.arg(fp, argc, 0) else {
        return Ok(0);
    };
    let key = vm.arg(fp, argc, 1);
    let old = vm.heap_mut().table_mut(t).delete(&key);
    ret(vm, fp, old.unwrap_or_default())
}

fn native_str(vm: &mut Vm, fp: usize, argc: usize) -> Result<usize> {
    let v = match vm.arg(fp, argc, 0) {
        s @ Value::Str(_) => s,
        other => Value::Str(Rc::new(Str::from(other.to_bytes()))),
    };
    ret(vm, fp, v)
}

fn native_num(vm: &mut Vm, fp: usize, argc: usize) -> Result<usize> {
    let v = number_value(&vm.arg(fp, argc, 0));
    ret(vm, fp, v)
}

fn native_int(vm: &mut Vm, fp: usize, argc: usize) -> Result<usize> {
    let i = intval(&vm.arg(fp, argc, 0));
    ret(vm, fp, Value::Int(i))
}

/// `call(f, args...)` calls `f` with the remaining arguments.
fn native_call(vm: &mut Vm, fp: usize, argc: usize) -> Result<usize> {
    let args = vm.args(fp, argc);
    let Some((callee, rest)) = args.split_first() else {
        return Ok(0);
    };
    let result = vm.call_value(callee, rest)?;
    ret(vm, fp, result)
}
