//! String functions backed by the VM's regex and formatter services.

use crate::ret;
use quill_core::string::Str;
use quill_core::value::Value;
use quill_vm::error::Result;
use quill_vm::Vm;
use std::rc::Rc;

/// Register the string functions as globals.
pub fn register(vm: &mut Vm) {
    vm.register_native("match", native_match);
    vm.register_native("sub", native_sub);
    vm.register_native("gsub", native_gsub);
    vm.register_native("format", native_format);
}

fn bytes_value(bytes: Vec<u8>) -> Value {
    Value::Str(Rc::new(Str::from(bytes)))
}

/// `match(subject, pattern)` is `1` when the pattern matches anywhere.
fn native_match(vm: &mut Vm, fp: usize, argc: usize) -> Result<usize> {
    let subject = vm.arg(fp, argc, 0).to_bytes();
    let pattern = vm.arg(fp, argc, 1).to_bytes();
    let found = vm.services_mut().regex.is_match(&pattern, &subject)?;
    ret(vm, fp, Value::Int(i64::from(found)))
}

fn native_sub(vm: &mut Vm, fp: usize, argc: usize) -> Result<usize> {
    replace(vm, fp, argc, false)
}

fn native_gsub(vm: &mut Vm, fp: usize, argc: usize) -> Result<usize> {
    replace(vm, fp, argc, true)
}

/// `sub`/`gsub(subject, pattern, replacement)`. `$1` and `${name}` in the
/// replacement expand to capture groups.
fn replace(vm: &mut Vm, fp: usize, argc: usize, all: bool) -> Result<usize> {
    let subject = vm.arg(fp, argc, 0).to_bytes();
    let pattern = vm.arg(fp, argc, 1).to_bytes();
    let replacement = vm.arg(fp, argc, 2).to_bytes();
    let out = vm
        .services_mut()
        .regex
        .replace(&pattern, &subject, &replacement, all)?;
    ret(vm, fp, bytes_value(out))
}

/// `format(spec, args...)`
fn native_format(vm: &mut Vm, fp: usize, argc: usize) -> Result<usize> {
    let spec = vm.arg(fp, argc, 0).to_bytes();
    let args = vm.args(fp, argc);
    let rest = args.get(1..).unwrap_or_default();
    let out = vm.services_mut().formatter.format(&spec, rest)?;
    ret(vm, fp, bytes_value(out))
}
