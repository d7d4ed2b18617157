// src/paths.rs
//! Centralized path derivation for the cgowrap work directory

use crate::error::{Error, Result};
use std::fs;
use std::path::PathBuf;

/// Name of the directory created under the user cache directory
const WORK_DIR_NAME: &str = "cgowrap";

/// Root of everything cgowrap writes to disk
///
/// ```text
/// <root>/cache.db      result store
/// <root>/depfiles/     dependency listings written by the compiler
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkDir {
    root: PathBuf,
}

impl WorkDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The per-user default: `<cache dir>/cgowrap`, or `<tmp>/cgowrap` on
    /// systems without a cache directory
    pub fn default_root() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(WORK_DIR_NAME)
    }

    /// Path of the result store database
    pub fn store_path(&self) -> PathBuf {
        self.root.join("cache.db")
    }

    /// Directory holding dependency listings
    pub fn depfiles_dir(&self) -> PathBuf {
        self.root.join("depfiles")
    }

    /// Create the directory tree if it does not exist yet
    pub fn ensure(&self) -> Result<()> {
        let depfiles = self.depfiles_dir();
        fs::create_dir_all(&depfiles).map_err(|e| {
            Error::InitError(format!(
                "Cannot make working directory {}: {}",
                depfiles.display(),
                e
            ))
        })
    }
}
