//! Runtime error types.
//!
//! Every error is fatal to the running script: it propagates out of the
//! dispatch loop, through any native re-entry, to the embedder.

use crate::format::FormatError;
use crate::pattern::RegexError;
use thiserror::Error;

/// Runtime result type
pub type Result<T> = std::result::Result<T, VmError>;

/// A fatal runtime error.
#[derive(Debug, Error)]
pub enum VmError {
    #[error(transparent)]
    Regex(#[from] RegexError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("{path}: {source}")]
    Resource {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("output error: {0}")]
    Output(#[source] std::io::Error),

    #[error("attempt to call a {0} value")]
    NotCallable(&'static str),

    #[error("attempt to assign through a {0} value")]
    NotAssignable(&'static str),

    #[error("stack overflow (call depth limit {0})")]
    StackOverflow(usize),

    #[error("corrupt code at offset {pc}: {reason}")]
    CorruptCode { pc: usize, reason: String },
}

impl VmError {
    pub(crate) fn corrupt(pc: usize, reason: impl Into<String>) -> Self {
        VmError::CorruptCode {
            pc,
            reason: reason.into(),
        }
    }
}
