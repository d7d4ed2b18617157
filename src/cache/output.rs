// src/cache/output.rs

//! Captured compiler output

use serde::{Deserialize, Serialize};
use std::io::{self, Write};

/// Exit status plus captured streams of one compiler run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Output {
    pub status: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl Output {
    pub fn new(status: i32, stdout: impl Into<Vec<u8>>, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Whether the run produced no output at all
    ///
    /// Such a result is never replayed: a compiler that printed nothing most
    /// likely failed before it could say why.
    pub fn is_empty(&self) -> bool {
        self.stdout.is_empty() && self.stderr.is_empty()
    }

    /// Write stderr then stdout to the process's own streams
    pub fn print(&self) -> io::Result<()> {
        let mut stderr = io::stderr().lock();
        stderr.write_all(&self.stderr)?;
        stderr.flush()?;

        let mut stdout = io::stdout().lock();
        stdout.write_all(&self.stdout)?;
        stdout.flush()
    }
}

/// Uncompressed header stored next to the two compressed streams
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub(crate) struct OutputHeader {
    pub status: i32,
}
