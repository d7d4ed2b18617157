// src/fingerprint.rs

//! Invocation fingerprints
//!
//! A fingerprint identifies one cacheable compiler invocation by hashing the
//! arguments that affect its output, the working directory it runs in, and
//! the full contents of its input file. The input is hashed byte for byte:
//! cgo writes it to a new temporary file for every run, so neither its path
//! nor its mtime says anything about its identity.

use base64::{engine::general_purpose::URL_SAFE, Engine};
use sha2::{Digest, Sha256};
use std::fmt;

/// Key-safe digest of an invocation's inputs
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint an invocation
    ///
    /// `args` must already have cache-irrelevant flags removed; their order is
    /// significant. Every field is length-prefixed so that moving bytes
    /// between adjacent arguments changes the digest.
    pub fn compute(args: &[String], cwd: &str, input: &[u8]) -> Self {
        let mut hasher = Sha256::new();

        hasher.update((args.len() as u64).to_le_bytes());
        for arg in args {
            update_framed(&mut hasher, arg.as_bytes());
        }
        update_framed(&mut hasher, cwd.as_bytes());
        update_framed(&mut hasher, input);

        Self(URL_SAFE.encode(hasher.finalize()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of the dependency listing requested for this invocation
    pub fn depfile_name(&self) -> String {
        format!("cgo.{}.d", self.0)
    }
}

fn update_framed(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Fingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
