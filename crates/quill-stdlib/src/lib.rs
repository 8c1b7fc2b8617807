//! Quill native library.
//!
//! Every function here uses the native calling convention: it receives the
//! frame pointer and argument count, reads arguments with [`Vm::arg`], and
//! either stores one result at `fp - 1` and reports `1`, or reports `0`.

pub mod base_lib;
pub mod io_lib;
pub mod math;
pub mod string_lib;

use quill_core::value::Value;
use quill_vm::error::Result;
use quill_vm::Vm;
use tracing::debug;

/// Bind every native library function into the VM's globals.
pub fn open_libs(vm: &mut Vm) {
    base_lib::register(vm);
    string_lib::register(vm);
    math::register(vm);
    io_lib::register(vm);
    debug!("opened native libraries");
}

/// Store `value` as the native's single result.
pub(crate) fn ret(vm: &mut Vm, fp: usize, value: Value) -> Result<usize> {
    vm.set_result(fp, value);
    Ok(1)
}
