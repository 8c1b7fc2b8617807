//! Open file handles owned by a VM.
//!
//! Scripts see files as small integer handles. Unknown or already-closed
//! handles are not errors: reads give nothing, `eof` reports true and
//! writes report failure.

use indexmap::IndexMap;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use tracing::trace;

enum OpenFile {
    Read(BufReader<File>),
    Write(BufWriter<File>),
}

#[derive(Default)]
pub struct FileTable {
    open: IndexMap<i64, OpenFile>,
    next_handle: i64,
}

impl FileTable {
    pub fn new() -> Self {
        FileTable {
            open: IndexMap::new(),
            next_handle: 1,
        }
    }

    /// Open `path`. Mode `"r"` reads, `"w"` truncates, `"a"` appends.
    pub fn open(&mut self, path: &str, mode: &str) -> io::Result<i64> {
        let file = match mode {
            "" | "r" => OpenFile::Read(BufReader::new(File::open(path)?)),
            "w" => OpenFile::Write(BufWriter::new(File::create(path)?)),
            "a" => OpenFile::Write(BufWriter::new(
                OpenOptions::new().append(true).create(true).open(path)?,
            )),
            other => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("invalid file mode '{other}'"),
                ))
            }
        };
        let handle = self.next_handle.max(1);
        self.next_handle = handle + 1;
        self.open.insert(handle, file);
        trace!(handle, path, mode, "opened file");
        Ok(handle)
    }

    /// Next line without its terminator, or `None` at end of file.
    pub fn read_line(&mut self, handle: i64) -> io::Result<Option<Vec<u8>>> {
        let Some(OpenFile::Read(reader)) = self.open.get_mut(&handle) else {
            return Ok(None);
        };
        let mut line = Vec::new();
        if reader.read_until(b'\n', &mut line)? == 0 {
            return Ok(None);
        }
        if line.last() == Some(&b'\n') {
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
        }
        Ok(Some(line))
    }

    pub fn eof(&mut self, handle: i64) -> io::Result<bool> {
        match self.open.get_mut(&handle) {
            Some(OpenFile::Read(reader)) => Ok(reader.fill_buf()?.is_empty()),
            _ => Ok(true),
        }
    }

    /// Returns `false` when the handle is not open for writing.
    pub fn write(&mut self, handle: i64, bytes: &[u8]) -> io::Result<bool> {
        match self.open.get_mut(&handle) {
            Some(OpenFile::Write(writer)) => {
                writer.write_all(bytes)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Flush and release a handle. Returns `false` for unknown handles.
    pub fn close(&mut self, handle: i64) -> io::Result<bool> {
        match self.open.shift_remove(&handle) {
            Some(OpenFile::Write(mut writer)) => {
                writer.flush()?;
                Ok(true)
            }
            Some(OpenFile::Read(_)) => Ok(true),
            None => Ok(false),
        }
    }

    pub fn len(&self) -> usize {
        self.open.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }
}
