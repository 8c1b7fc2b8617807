//! Output and file functions.
//!
//! Files are integer handles into the VM's file table. Failing to open a
//! file is fatal; reading past the end or using a closed handle is not.

use crate::ret;
use quill_core::string::Str;
use quill_core::value::Value;
use quill_vm::coerce::intval;
use quill_vm::error::Result;
use quill_vm::{Vm, VmError};
use std::io::{self, Write};
use std::rc::Rc;
use tracing::trace;

/// Register the io functions as globals.
pub fn register(vm: &mut Vm) {
    vm.register_native("print", native_print);
    vm.register_native("open", native_open);
    vm.register_native("read", native_read);
    vm.register_native("eof", native_eof);
    vm.register_native("write", native_write);
    vm.register_native("close", native_close);
}

fn handle_error(handle: i64, source: io::Error) -> VmError {
    VmError::Resource {
        path: format!("file handle {handle}"),
        source,
    }
}

/// Canonical forms of `args[from..]`, concatenated.
fn joined(vm: &Vm, fp: usize, argc: usize, from: usize) -> Vec<u8> {
    let mut out = Vec::new();
    for i in from..argc {
        vm.arg(fp, argc, i).write_canonical(&mut out);
    }
    out
}

/// `print(args...)` writes every argument followed by a newline.
fn native_print(vm: &mut Vm, fp: usize, argc: usize) -> Result<usize> {
    let mut line = joined(vm, fp, argc, 0);
    line.push(b'\n');
    let output = &mut vm.services_mut().output;
    output.write_all(&line).map_err(VmError::Output)?;
    output.flush().map_err(VmError::Output)?;
    Ok(0)
}

/// `open(path, mode)` returns a handle. Mode defaults to `"r"`.
fn native_open(vm: &mut Vm, fp: usize, argc: usize) -> Result<usize> {
    let path = vm.arg(fp, argc, 0).to_string();
    let mode = vm.arg(fp, argc, 1).to_string();
    let handle = vm
        .services_mut()
        .files
        .open(&path, &mode)
        .map_err(|source| VmError::Resource { path, source })?;
    ret(vm, fp, Value::Int(handle))
}

/// `read(h)` returns the next line, or `Null` at end of file.
fn native_read(vm: &mut Vm, fp: usize, argc: usize) -> Result<usize> {
    let handle = intval(&vm.arg(fp, argc, 0));
    let line = vm
        .services_mut()
        .files
        .read_line(handle)
        .map_err(|e| handle_error(handle, e))?;
    let v = match line {
        Some(bytes) => Value::Str(Rc::new(Str::from(bytes))),
        None => Value::Null,
    };
    ret(vm, fp, v)
}

fn native_eof(vm: &mut Vm, fp: usize, argc: usize) -> Result<usize> {
    let handle = intval(&vm.arg(fp, argc, 0));
    let at_end = vm
        .services_mut()
        .files
        .eof(handle)
        .map_err(|e| handle_error(handle, e))?;
    ret(vm, fp, Value::Int(i64::from(at_end)))
}

/// `write(h, args...)` returns `1` when the handle accepted the text.
fn native_write(vm: &mut Vm, fp: usize, argc: usize) -> Result<usize> {
    let handle = intval(&vm.arg(fp, argc, 0));
    let text = joined(vm, fp, argc, 1);
    let written = vm
        .services_mut()
        .files
        .write(handle, &text)
        .map_err(|e| handle_error(handle, e))?;
    ret(vm, fp, Value::Int(i64::from(written)))
}

fn native_close(vm: &mut Vm, fp: usize, argc: usize) -> Result<usize> {
    let handle = intval(&vm.arg(fp, argc, 0));
    let closed = vm
        .services_mut()
        .files
        .close(handle)
        .map_err(|e| handle_error(handle, e))?;
    trace!(handle, closed, "close");
    ret(vm, fp, Value::Int(i64::from(closed)))
}
