//! Regular-expression service.
//!
//! The VM only asks two questions of a regex engine: does a pattern match a
//! subject, and what does the subject look like after replacement. The
//! default engine wraps the `regex` crate (byte-oriented API, since script
//! strings are bytes) and caches compiled patterns.

use indexmap::IndexMap;
use regex::bytes::Regex;
use thiserror::Error;
use tracing::trace;

/// An invalid pattern.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("invalid regex /{pattern}/: {message}")]
pub struct RegexError {
    pub pattern: String,
    pub message: String,
}

/// Matching and substitution, as used by the match opcodes and the string
/// natives.
pub trait RegexEngine {
    fn is_match(&mut self, pattern: &[u8], subject: &[u8]) -> Result<bool, RegexError>;

    /// Replace the first match (or every match when `all`) of `pattern` in
    /// `subject`. `$n` and `${name}` in `replacement` expand to groups.
    fn replace(
        &mut self,
        pattern: &[u8],
        subject: &[u8],
        replacement: &[u8],
        all: bool,
    ) -> Result<Vec<u8>, RegexError>;
}

/// `regex`-backed engine with a FIFO cache of compiled patterns.
pub struct RegexCache {
    compiled: IndexMap<Vec<u8>, Regex>,
    capacity: usize,
}

impl RegexCache {
    pub fn new(capacity: usize) -> Self {
        RegexCache {
            compiled: IndexMap::new(),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }

    fn compile(&mut self, pattern: &[u8]) -> Result<Regex, RegexError> {
        if let Some(re) = self.compiled.get(pattern) {
            return Ok(re.clone());
        }
        let source = std::str::from_utf8(pattern).map_err(|e| RegexError {
            pattern: String::from_utf8_lossy(pattern).into_owned(),
            message: e.to_string(),
        })?;
        let re = Regex::new(source).map_err(|e| RegexError {
            pattern: source.to_string(),
            message: e.to_string(),
        })?;
        trace!(pattern = source, cached = self.compiled.len(), "compiled regex");
        if self.capacity > 0 {
            if self.compiled.len() >= self.capacity {
                self.compiled.shift_remove_index(0);
            }
            self.compiled.insert(pattern.to_vec(), re.clone());
        }
        Ok(re)
    }
}

impl RegexEngine for RegexCache {
    fn is_match(&mut self, pattern: &[u8], subject: &[u8]) -> Result<bool, RegexError> {
        Ok(self.compile(pattern)?.is_match(subject))
    }

    fn replace(
        &mut self,
        pattern: &[u8],
        subject: &[u8],
        replacement: &[u8],
        all: bool,
    ) -> Result<Vec<u8>, RegexError> {
        let re = self.compile(pattern)?;
        let out = if all {
            re.replace_all(subject, replacement)
        } else {
            re.replace(subject, replacement)
        };
        Ok(out.into_owned())
    }
}
