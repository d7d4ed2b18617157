// src/cache/mod.rs

//! Invocation cache
//!
//! Two records are kept per fingerprint:
//!
//! - `depfile/<fp>`: the dependency listing of the last run (primary input
//!   removed) together with the latest mtime of those dependencies at the
//!   time it was saved. Stored as one JSON value, so it is written atomically.
//! - `result/<fp>/{status,stdout,stderr}`: the exit status as JSON and both
//!   streams zlib-compressed.
//!
//! The result is only trusted while the dependency record is fresh; see
//! [`InvocationCache`] for the full decision.

mod output;
mod validity;

pub use output::Output;
pub use validity::{InvocationCache, Lookup, Strictness, Validity};

use crate::compression;
use crate::depfile::DepFile;
use crate::error::{Error, Result};
use crate::fingerprint::Fingerprint;
use crate::paths::WorkDir;
use crate::store::{KeyPath, KvStore, SqliteStore};
use chrono::{DateTime, Utc};
use output::OutputHeader;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

const DEPFILE_NAMESPACE: &str = "depfile";
const RESULT_NAMESPACE: &str = "result";
const STATUS_KEY: &str = "status";
const STDOUT_KEY: &str = "stdout";
const STDERR_KEY: &str = "stderr";

/// Persisted dependency listing with its freshness snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepfileRecord {
    pub file: DepFile,
    /// Latest dependency mtime when the record was saved
    pub latest: Option<DateTime<Utc>>,
}

impl DepfileRecord {
    /// Snapshot a listing whose primary inputs are already removed
    pub fn snapshot(file: DepFile) -> Self {
        let latest = file.mod_time();
        Self { file, latest }
    }

    /// Whether the dependencies are exactly as they were at save time
    ///
    /// An empty or entirely missing dependency set is never fresh.
    pub fn is_fresh(&self) -> bool {
        match (self.latest, self.file.mod_time()) {
            (Some(saved), Some(now)) => saved == now,
            _ => false,
        }
    }
}

/// Typed access to the two record kinds on top of a [`KvStore`]
pub struct Cache<S: KvStore = SqliteStore> {
    store: S,
    depfile_dir: PathBuf,
}

impl Cache<SqliteStore> {
    /// Open the cache in a work directory, creating it if needed
    pub fn open(work: &WorkDir, timeout: Duration) -> Result<Self> {
        work.ensure()?;
        let store = SqliteStore::open(&work.store_path(), timeout)?;
        Ok(Self::new(store, work.depfiles_dir()))
    }
}

impl<S: KvStore> Cache<S> {
    pub fn new(store: S, depfile_dir: PathBuf) -> Self {
        Self { store, depfile_dir }
    }

    /// Where the compiler should write the dependency listing for `fp`
    pub fn depfile_path(&self, fp: &Fingerprint) -> PathBuf {
        self.depfile_dir.join(fp.depfile_name())
    }

    /// Load the stored dependency record
    pub fn load_depfile(&self, fp: &Fingerprint) -> Result<DepfileRecord> {
        let bytes = self.store.get(&depfile_key(fp)?)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Parse the listing the compiler just wrote and store its snapshot
    pub fn save_depfile(&mut self, fp: &Fingerprint) -> Result<DepfileRecord> {
        let mut file = DepFile::parse_file(&self.depfile_path(fp))?;
        file.pop_first_sources();

        let record = DepfileRecord::snapshot(file);
        let json = serde_json::to_vec(&record)?;
        self.store.put(&depfile_key(fp)?, &json)?;

        debug!(
            "Saved depfile {} ({} dependencies, latest {:?})",
            fp,
            record.file.dependency_count(),
            record.latest
        );
        Ok(record)
    }

    /// Load a captured result
    ///
    /// All sub-keys are read from one snapshot, so the status and streams
    /// always belong to the same run. Every sub-key must be present; a
    /// partially written result is [`crate::Error::NotFound`] just like a
    /// missing one.
    pub fn load_output(&self, fp: &Fingerprint) -> Result<Output> {
        let base = result_key(fp)?;
        let keys = [
            base.join(STATUS_KEY)?,
            base.join(STDOUT_KEY)?,
            base.join(STDERR_KEY)?,
        ];

        let [status, stdout, stderr]: [Vec<u8>; 3] = self
            .store
            .get_many(&keys)?
            .try_into()
            .map_err(|values: Vec<Vec<u8>>| {
                Error::StoreCorruption(format!(
                    "expected 3 result values for {}, got {}",
                    fp,
                    values.len()
                ))
            })?;
        let header: OutputHeader = serde_json::from_slice(&status)?;

        Ok(Output {
            status: header.status,
            stdout: compression::decompress(&stdout)?,
            stderr: compression::decompress(&stderr)?,
        })
    }

    /// Remove the listing file left by an earlier run, if any
    pub fn remove_depfile(&self, fp: &Fingerprint) -> Result<()> {
        let path = self.depfile_path(fp);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!("Removed old listing {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::IoError(format!(
                "Failed to remove listing {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Store a captured result, replacing any previous one
    pub fn save_output(&mut self, fp: &Fingerprint, output: &Output) -> Result<()> {
        let base = result_key(fp)?;
        let header = serde_json::to_vec(&OutputHeader {
            status: output.status,
        })?;

        self.store.put_batch(&[
            (base.join(STATUS_KEY)?, header),
            (base.join(STDOUT_KEY)?, compression::compress(&output.stdout)?),
            (base.join(STDERR_KEY)?, compression::compress(&output.stderr)?),
        ])
    }
}

fn depfile_key(fp: &Fingerprint) -> Result<KeyPath> {
    KeyPath::new([DEPFILE_NAMESPACE, fp.as_str()])
}

fn result_key(fp: &Fingerprint) -> Result<KeyPath> {
    KeyPath::new([RESULT_NAMESPACE, fp.as_str()])
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::FileTime;
    use tempfile::TempDir;

    fn open_temp() -> (TempDir, Cache) {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::open(&WorkDir::new(dir.path().join("work")), Duration::from_secs(5)).unwrap();
        (dir, cache)
    }

    fn fingerprint() -> Fingerprint {
        Fingerprint::compute(&["-c".to_string()], "/build", b"int x;")
    }

    #[test]
    fn test_output_round_trip() {
        let (_dir, mut cache) = open_temp();
        let fp = fingerprint();
        let output = Output::new(1, b"out".to_vec(), b"error: x\n".repeat(100));

        cache.save_output(&fp, &output).unwrap();
        assert_eq!(cache.load_output(&fp).unwrap(), output);
        // Replaying twice gives identical bytes
        assert_eq!(cache.load_output(&fp).unwrap(), output);
    }

    #[test]
    fn test_load_output_missing() {
        let (_dir, cache) = open_temp();
        assert!(cache.load_output(&fingerprint()).unwrap_err().is_not_found());
    }

    #[test]
    fn test_load_output_missing_stream_is_not_found() {
        let (_dir, mut cache) = open_temp();
        let fp = fingerprint();
        let status = result_key(&fp).unwrap().join(STATUS_KEY).unwrap();
        cache.store.put(&status, br#"{"status":0}"#).unwrap();

        assert!(cache.load_output(&fp).unwrap_err().is_not_found());
    }

    #[test]
    fn test_load_output_corrupt_stream() {
        let (_dir, mut cache) = open_temp();
        let fp = fingerprint();
        cache.save_output(&fp, &Output::new(0, "out", "err")).unwrap();

        let stdout = result_key(&fp).unwrap().join(STDOUT_KEY).unwrap();
        cache.store.put(&stdout, b"garbage").unwrap();

        let err = cache.load_output(&fp).unwrap_err();
        assert!(matches!(err, Error::StoreCorruption(_)));
    }

    #[test]
    fn test_save_depfile_drops_primary_input() {
        let (dir, mut cache) = open_temp();
        let fp = fingerprint();

        let input = dir.path().join("in.c");
        let header = dir.path().join("stdio.h");
        fs::write(&input, "int x;").unwrap();
        fs::write(&header, "").unwrap();
        filetime::set_file_mtime(&input, FileTime::from_unix_time(3_000_000, 0)).unwrap();
        filetime::set_file_mtime(&header, FileTime::from_unix_time(1_000_000, 0)).unwrap();

        fs::write(
            cache.depfile_path(&fp),
            format!("out.o: {} \\\n  {}\n", input.display(), header.display()),
        )
        .unwrap();

        let record = cache.save_depfile(&fp).unwrap();
        assert_eq!(record.file.dependency_count(), 1);
        assert_eq!(record.latest.unwrap().timestamp(), 1_000_000);
        assert_eq!(cache.load_depfile(&fp).unwrap(), record);
        assert!(record.is_fresh());
    }

    #[test]
    fn test_save_depfile_malformed() {
        let (_dir, mut cache) = open_temp();
        let fp = fingerprint();
        fs::write(cache.depfile_path(&fp), "not a rule\n").unwrap();

        let err = cache.save_depfile(&fp).unwrap_err();
        assert!(matches!(err, Error::MalformedManifestLine(_)));
        assert!(cache.load_depfile(&fp).unwrap_err().is_not_found());
    }

    #[test]
    fn test_load_depfile_corrupt() {
        let (_dir, mut cache) = open_temp();
        let fp = fingerprint();
        cache.store.put(&depfile_key(&fp).unwrap(), b"{not json").unwrap();

        let err = cache.load_depfile(&fp).unwrap_err();
        assert!(matches!(err, Error::StoreCorruption(_)));
    }

    #[test]
    fn test_remove_depfile() {
        let (_dir, cache) = open_temp();
        let fp = fingerprint();
        fs::write(cache.depfile_path(&fp), "out.o: in.c\n").unwrap();

        cache.remove_depfile(&fp).unwrap();
        assert!(!cache.depfile_path(&fp).exists());
        // Nothing left to remove is fine
        cache.remove_depfile(&fp).unwrap();
    }

    #[test]
    fn test_empty_record_is_never_fresh() {
        let record = DepfileRecord::snapshot(DepFile::default());
        assert_eq!(record.latest, None);
        assert!(!record.is_fresh());
    }
}
