//! Host services used by the VM and its natives.
//!
//! Everything stateful the interpreter talks to lives here, owned by one
//! `Vm`, so two VMs never share regex caches, random state or file handles.

use crate::config::VmConfig;
use crate::files::FileTable;
use crate::format::{Formatter, PrintfFormatter};
use crate::pattern::{RegexCache, RegexEngine};
use crate::random::{FastRandom, RandomSource};
use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

pub struct Services {
    pub regex: Box<dyn RegexEngine>,
    pub random: Box<dyn RandomSource>,
    pub formatter: Box<dyn Formatter>,
    pub files: FileTable,
    /// Sink for `print`.
    pub output: Box<dyn Write>,
}

impl Services {
    /// Default services: `regex` crate matching, `fastrand` numbers, printf
    /// formatting and stdout.
    pub fn from_config(config: &VmConfig) -> Self {
        Services {
            regex: Box::new(RegexCache::new(config.regex_cache_size)),
            random: Box::new(FastRandom::new(config.random_seed)),
            formatter: Box::new(PrintfFormatter),
            files: FileTable::new(),
            output: Box::new(io::stdout()),
        }
    }

    pub fn with_output(mut self, output: Box<dyn Write>) -> Self {
        self.output = output;
        self
    }
}

/// An in-memory output sink whose contents stay readable after it is handed
/// to a VM.
#[derive(Clone, Default)]
pub struct CaptureOutput(Rc<RefCell<Vec<u8>>>);

impl CaptureOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Vec<u8> {
        self.0.borrow().clone()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for CaptureOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
