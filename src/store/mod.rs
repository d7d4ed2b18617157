// src/store/mod.rs

//! Durable key-value storage for cache records
//!
//! Keys are ordered lists of string segments (`["depfile", fingerprint]`,
//! `["result", fingerprint, "stdout"]`). Segments are joined with `/` into one
//! composite key, so a segment may never contain `/` or be empty; that keeps
//! namespaces from colliding no matter what the fingerprint encoding is.

mod schema;
mod sqlite;

pub use schema::SCHEMA_VERSION;
pub use sqlite::SqliteStore;

use crate::error::{Error, Result};
use std::fmt;

const SEPARATOR: char = '/';

/// Hierarchical store key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPath(Vec<String>);

impl KeyPath {
    /// Build a key from its segments
    pub fn new<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();

        if segments.is_empty() {
            return Err(Error::InvalidKey("key has no segments".to_string()));
        }
        for segment in &segments {
            if segment.is_empty() {
                return Err(Error::InvalidKey(format!(
                    "empty segment in {:?}",
                    segments
                )));
            }
            if segment.contains(SEPARATOR) {
                return Err(Error::InvalidKey(format!(
                    "segment {:?} contains '{}'",
                    segment, SEPARATOR
                )));
            }
        }

        Ok(Self(segments))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// A child key one segment deeper
    pub fn join(&self, segment: impl Into<String>) -> Result<Self> {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self::new(segments)
    }

    /// Composite form used as the physical key
    pub fn encode(&self) -> String {
        self.0.join(&SEPARATOR.to_string())
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

/// Minimal interface the cache needs from a durable store
///
/// Every write is a single transaction; readers never observe half of a
/// `put_batch`.
pub trait KvStore {
    /// Insert or replace one value
    fn put(&mut self, key: &KeyPath, value: &[u8]) -> Result<()>;

    /// Insert or replace several values atomically
    fn put_batch(&mut self, entries: &[(KeyPath, Vec<u8>)]) -> Result<()>;

    /// Fetch a value, or [`Error::NotFound`]
    fn get(&self, key: &KeyPath) -> Result<Vec<u8>>;

    /// Fetch several values as one consistent snapshot
    ///
    /// Values come back in key order. Any missing key fails the whole read
    /// with [`Error::NotFound`].
    fn get_many(&self, keys: &[KeyPath]) -> Result<Vec<Vec<u8>>> {
        keys.iter().map(|key| self.get(key)).collect()
    }
}
