// src/cache/validity.rs

//! Cache validity decisions
//!
//! ```text
//!                 classify
//!                    |
//!        +-----------+-----------+
//!        |                       |
//!   Uneligible             load manifest
//!   (pass through)               |
//!                   +------------+------------+
//!                   |            |            |
//!              NoManifest      Stale        Fresh
//!                   |            |            |
//!                   +-----+------+       load result
//!                         |               |        |
//!                       miss        HitNoResult   Hit
//!                                      (miss)   (replay)
//! ```
//!
//! Every miss runs the compiler with a dependency listing requested and then
//! persists the manifest followed by the result.

use super::{Cache, Output};
use crate::error::{Error, Result};
use crate::fingerprint::Fingerprint;
use crate::store::{KvStore, SqliteStore};
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Where an invocation ended up in the validity decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    /// Not a cacheable invocation; run as-is
    Uneligible,
    /// No stored manifest for this fingerprint
    NoManifest,
    /// A dependency changed, vanished, or the manifest was empty
    Stale,
    /// Manifest matches the files on disk
    Fresh,
    /// Manifest was fresh but no usable result was stored
    HitNoResult,
    /// Stored result replayed
    Hit,
}

impl Validity {
    pub fn is_hit(self) -> bool {
        self == Self::Hit
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uneligible => "uneligible",
            Self::NoManifest => "invalid depfile",
            Self::Stale => "stale depfile",
            Self::Fresh => "fresh depfile",
            Self::HitNoResult => "hit without result",
            Self::Hit => "hit",
        }
    }
}

impl fmt::Display for Validity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How cache failures are reported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Strictness {
    /// Propagate cache errors instead of degrading to a miss
    pub fatal_errors: bool,
    /// Treat every miss as an error
    pub require_hit: bool,
}

impl Strictness {
    pub fn is_strict(&self) -> bool {
        self.fatal_errors || self.require_hit
    }
}

/// Outcome of a cache lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Hit(Output),
    Miss(Validity),
}

/// Validity state machine over a [`Cache`]
pub struct InvocationCache<S: KvStore = SqliteStore> {
    cache: Cache<S>,
    strictness: Strictness,
}

impl<S: KvStore> InvocationCache<S> {
    pub fn new(cache: Cache<S>, strictness: Strictness) -> Self {
        Self { cache, strictness }
    }

    /// Path the compiler should write its dependency listing to on a miss
    pub fn depfile_path(&self, fp: &Fingerprint) -> PathBuf {
        self.cache.depfile_path(fp)
    }

    /// Decide whether a stored result can be replayed
    ///
    /// Read failures that [`Error::is_miss`] accepts count as misses; any
    /// other error is returned. With `fatal_errors` anything other than a
    /// missing record is returned too; with `require_hit` a miss is
    /// [`Error::CacheMiss`].
    pub fn lookup(&self, needed_args: &[String], fp: &Fingerprint) -> Result<Lookup> {
        let mut validity = match self.cache.load_depfile(fp) {
            Ok(record) if record.is_fresh() => Validity::Fresh,
            Ok(record) => {
                debug!(
                    "Depfile for {} is stale (saved {:?}, now {:?})",
                    fp,
                    record.latest,
                    record.file.mod_time()
                );
                Validity::Stale
            }
            Err(e) => {
                self.read_failed("depfile", fp, e)?;
                Validity::NoManifest
            }
        };

        if validity == Validity::Fresh {
            match self.cache.load_output(fp) {
                Ok(output) if !output.is_empty() => {
                    debug!("Cache hit for {}", fp);
                    return Ok(Lookup::Hit(output));
                }
                Ok(_) => debug!("Stored result for {} is empty", fp),
                Err(e) => self.read_failed("result", fp, e)?,
            }
            validity = Validity::HitNoResult;
        }

        if self.strictness.require_hit {
            return Err(Error::CacheMiss {
                reason: validity.to_string(),
                args: needed_args.to_vec(),
                fingerprint: fp.to_string(),
            });
        }

        info!("Cache miss for {}: {}", fp, validity);
        Ok(Lookup::Miss(validity))
    }

    /// Remove any listing an earlier run left at [`Self::depfile_path`]
    ///
    /// Call before running the compiler so that `persist` only ever sees a
    /// listing written by this run. Failures follow the write-error policy.
    pub fn clear_depfile(&self, fp: &Fingerprint) -> Result<()> {
        match self.cache.remove_depfile(fp) {
            Ok(()) => Ok(()),
            Err(e) => self.write_failed("old listing", fp, e),
        }
    }

    /// Store the manifest the compiler just wrote, then its result
    ///
    /// The result is only stored when the manifest was. Failures are logged
    /// and swallowed unless `fatal_errors` is set.
    pub fn persist(&mut self, fp: &Fingerprint, output: &Output) -> Result<()> {
        if let Err(e) = self.cache.save_depfile(fp) {
            return self.write_failed("depfile", fp, e);
        }
        if let Err(e) = self.cache.save_output(fp, output) {
            return self.write_failed("result", fp, e);
        }
        debug!("Stored result for {} (status {})", fp, output.status);
        Ok(())
    }

    fn read_failed(&self, what: &str, fp: &Fingerprint, err: Error) -> Result<()> {
        if err.is_not_found() {
            debug!("No {} stored for {}", what, fp);
            return Ok(());
        }
        if !err.is_miss() || self.strictness.fatal_errors {
            return Err(err);
        }
        warn!("Failed to load {} for {}: {}", what, fp, err);
        Ok(())
    }

    fn write_failed(&self, what: &str, fp: &Fingerprint, err: Error) -> Result<()> {
        if self.strictness.fatal_errors {
            return Err(err);
        }
        warn!("Failed to save {} for {}: {}", what, fp, err);
        Ok(())
    }
}
