//! Quill virtual machine: a stack-based bytecode interpreter.

pub mod arith;
pub mod callinfo;
pub mod coerce;
pub mod compare;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod files;
pub mod format;
pub mod iter;
pub mod pattern;
pub mod random;
pub mod services;
pub mod vm;

pub use config::VmConfig;
pub use error::VmError;
pub use vm::{NativeFn, Vm};
