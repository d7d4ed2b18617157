// src/config.rs

//! Runtime configuration
//!
//! cgowrap is installed as `CC` for `go build`, so it takes no options of its
//! own; everything comes from the environment.

use crate::cache::Strictness;
use crate::error::{Error, Result};
use crate::paths::WorkDir;
use crate::store::SqliteStore;
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_CC: &str = "CGOWRAP_CC";
pub const ENV_GCC: &str = "GCC";
pub const ENV_CACHE_DIR: &str = "CGOWRAP_CACHE_DIR";
pub const ENV_PROFILE: &str = "CGOWRAP_PROFILE";
pub const ENV_FATAL: &str = "CGOWRAP_FATAL";
pub const ENV_MUST_CACHE: &str = "CGOWRAP_MUST_CACHE";
pub const ENV_LOCK_TIMEOUT: &str = "CGOWRAP_LOCK_TIMEOUT";
pub const ENV_LOG: &str = "CGOWRAP_LOG";

const DEFAULT_CC: &str = "gcc";

/// Everything one invocation needs to know about its environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// The real compiler
    pub cc: String,
    /// Root of the store and dependency listings
    pub work_dir: PathBuf,
    /// CSV file that receives one timing record per invocation
    pub profile: Option<PathBuf>,
    /// Any cache error aborts the invocation
    pub fatal_errors: bool,
    /// A cache miss aborts the invocation
    pub require_hit: bool,
    /// Bound on waiting for another process's store lock
    pub lock_timeout: Duration,
    /// `tracing` filter directive
    pub log_filter: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cc: DEFAULT_CC.to_string(),
            work_dir: WorkDir::default_root(),
            profile: None,
            fatal_errors: false,
            require_hit: false,
            lock_timeout: SqliteStore::DEFAULT_TIMEOUT,
            log_filter: None,
        }
    }
}

impl Config {
    /// Read the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable lookup
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let lock_timeout = match get(ENV_LOCK_TIMEOUT) {
            Some(secs) => {
                let secs: u64 = secs.trim().parse().map_err(|e| {
                    Error::ConfigError(format!("{}={:?}: {}", ENV_LOCK_TIMEOUT, secs, e))
                })?;
                Duration::from_secs(secs)
            }
            None => defaults.lock_timeout,
        };

        Ok(Self {
            cc: get(ENV_CC).or_else(|| get(ENV_GCC)).unwrap_or(defaults.cc),
            work_dir: get(ENV_CACHE_DIR)
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            profile: get(ENV_PROFILE).map(PathBuf::from),
            fatal_errors: get(ENV_FATAL).as_deref() == Some("1"),
            require_hit: get(ENV_MUST_CACHE).as_deref() == Some("1"),
            lock_timeout,
            log_filter: get(ENV_LOG),
        })
    }

    pub fn strictness(&self) -> Strictness {
        Strictness {
            fatal_errors: self.fatal_errors,
            require_hit: self.require_hit,
        }
    }

    pub fn work_dir(&self) -> WorkDir {
        WorkDir::new(&self.work_dir)
    }

    /// Filter directive for the log subscriber, `None` when logging is off
    ///
    /// Compiler stderr is replayed byte for byte, so nothing is logged unless
    /// asked for explicitly or a strict mode is on.
    pub fn effective_log_filter(&self) -> Option<String> {
        match &self.log_filter {
            Some(filter) => Some(filter.clone()),
            None if self.strictness().is_strict() => Some("debug".to_string()),
            None => None,
        }
    }
}
