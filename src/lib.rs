// src/lib.rs

//! cgowrap: a caching C compiler wrapper for cgo
//!
//! `go build` runs the C compiler on a generated "guess kinds" probe for every
//! cgo package, every build. The answer only changes when the probe, its
//! flags, or one of the headers it includes changes, so cgowrap stores the
//! compiler's output and replays it until then.
//!
//! # Architecture
//!
//! - Fingerprints: SHA-256 over the relevant flags, working directory and
//!   probe contents
//! - Freshness: the compiler's own Make-rule dependency listing, compared by
//!   latest mtime
//! - Storage: one SQLite file of composite keys, shared by every concurrent
//!   wrapper process

pub mod cache;
pub mod classify;
pub mod compression;
pub mod config;
pub mod depfile;
mod error;
pub mod exec;
pub mod fingerprint;
pub mod flags;
pub mod paths;
pub mod store;
pub mod telemetry;
pub mod wrapper;

pub use cache::{Cache, InvocationCache, Lookup, Output, Strictness, Validity};
pub use classify::{classify, CacheableInvocation, Classification};
pub use config::Config;
pub use depfile::DepFile;
pub use error::{Error, Result};
pub use exec::{CompilerExecutor, Executor};
pub use fingerprint::Fingerprint;
pub use paths::WorkDir;
pub use store::{KeyPath, KvStore, SqliteStore};
pub use wrapper::{Outcome, Wrapper};
