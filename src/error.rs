// src/error.rs

//! Error types for cgowrap
//!
//! Every cache-specific failure is recoverable: on the read path it turns into
//! a cache miss, on the write path it is logged and the real compiler output
//! is still returned. Only strict mode escalates (see [`Error::CacheMiss`]).

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the invocation cache and its collaborators
#[derive(Error, Debug)]
pub enum Error {
    /// A key is absent at some segment of its path
    #[error("Not found: {0}")]
    NotFound(String),

    /// A dependency listing line that is neither a target nor a continuation
    #[error("Malformed dependency listing line: {0:?}")]
    MalformedManifestLine(String),

    /// The backing store failed to read or write
    #[error("Store I/O error: {0}")]
    StoreIoError(String),

    /// Stored bytes could not be decompressed or deserialized
    #[error("Store corruption: {0}")]
    StoreCorruption(String),

    /// Another process held the store for longer than the acquisition bound
    #[error("Timed out acquiring the store: {0}")]
    AcquisitionTimeout(String),

    /// A key segment that would collide with the path separator
    #[error("Invalid store key: {0}")]
    InvalidKey(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A value flag without its value
    #[error("Flag error: {0}")]
    FlagError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The work directory or store could not be set up
    #[error("Initialization error: {0}")]
    InitError(String),

    /// A miss while running with `CGOWRAP_MUST_CACHE=1`
    #[error("cache missed: {reason} (args: {args:?}, fingerprint: {fingerprint:?})")]
    CacheMiss {
        reason: String,
        args: Vec<String>,
        fingerprint: String,
    },
}

impl Error {
    /// Whether this is the routine "nothing stored yet" case
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Whether the read path should treat this error as a plain miss
    ///
    /// Strict-mode misses and configuration problems are not misses; they are
    /// the caller's to report.
    pub fn is_miss(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_)
                | Self::MalformedManifestLine(_)
                | Self::StoreIoError(_)
                | Self::StoreCorruption(_)
                | Self::AcquisitionTimeout(_)
                | Self::InvalidKey(_)
                | Self::IoError(_)
                | Self::Io(_)
        )
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        use rusqlite::ErrorCode;

        match err.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
                Error::AcquisitionTimeout(err.to_string())
            }
            Some(ErrorCode::DatabaseCorrupt) | Some(ErrorCode::NotADatabase) => {
                Error::StoreCorruption(err.to_string())
            }
            _ => Error::StoreIoError(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::StoreCorruption(format!("invalid record: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_miss() {
        let err = Error::NotFound("depfile/abc".to_string());
        assert!(err.is_not_found());
        assert!(err.is_miss());
    }

    #[test]
    fn test_cache_miss_is_not_a_plain_miss() {
        let err = Error::CacheMiss {
            reason: "invalid depfile".to_string(),
            args: vec!["-c".to_string()],
            fingerprint: "abc".to_string(),
        };
        assert!(!err.is_miss());
        let msg = err.to_string();
        assert!(msg.contains("cache missed"));
        assert!(msg.contains("invalid depfile"));
        assert!(msg.contains("\"-c\""));
    }

    #[test]
    fn test_malformed_line_display() {
        let err = Error::MalformedManifestLine("garbage".to_string());
        assert_eq!(
            err.to_string(),
            "Malformed dependency listing line: \"garbage\""
        );
    }

    #[test]
    fn test_serde_error_is_corruption() {
        let err: Error = serde_json::from_str::<i32>("{").unwrap_err().into();
        assert!(matches!(err, Error::StoreCorruption(_)));
    }

    #[test]
    fn test_rusqlite_busy_maps_to_timeout() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            Some("database is locked".to_string()),
        );
        assert!(matches!(Error::from(err), Error::AcquisitionTimeout(_)));
    }

    #[test]
    fn test_rusqlite_other_maps_to_store_io() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_FULL),
            None,
        );
        assert!(matches!(Error::from(err), Error::StoreIoError(_)));
    }
}
