// src/telemetry.rs

//! Per-invocation timing records
//!
//! With `CGOWRAP_PROFILE=<file>` every invocation appends one CSV row:
//!
//! ```text
//! args joined by spaces,elapsed seconds,cached|uncached
//! ```
//!
//! A parallel build runs many wrappers at once, so each append holds an
//! exclusive lock on the file for the duration of the write.

use crate::error::{Error, Result};
use fs2::FileExt;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

/// Whether an invocation was answered from the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Cached,
    Uncached,
}

impl CacheStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cached => "cached",
            Self::Uncached => "uncached",
        }
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One profiling row
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub args: Vec<String>,
    pub elapsed: Duration,
    pub status: CacheStatus,
}

impl Record {
    /// Render as a single CSV line including the trailing newline
    pub fn to_csv(&self) -> String {
        let fields = [
            self.args.join(" "),
            self.elapsed.as_secs_f64().to_string(),
            self.status.to_string(),
        ];
        let mut line = fields
            .iter()
            .map(|f| quote_field(f))
            .collect::<Vec<_>>()
            .join(",");
        line.push('\n');
        line
    }

    /// Append to the profile at `path`, creating it if needed
    pub fn append(&self, path: &Path) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                Error::IoError(format!("Failed to open profile {}: {}", path.display(), e))
            })?;

        file.lock_exclusive().map_err(|e| {
            Error::IoError(format!("Failed to lock profile {}: {}", path.display(), e))
        })?;
        let written = file
            .write_all(self.to_csv().as_bytes())
            .and_then(|_| file.sync_data());
        // Closing the file releases the lock as well
        let _ = FileExt::unlock(&file);

        written.map_err(|e| {
            Error::IoError(format!("Failed to write profile {}: {}", path.display(), e))
        })
    }
}

/// Quote a field per RFC 4180 when it contains a delimiter, quote or newline
fn quote_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
