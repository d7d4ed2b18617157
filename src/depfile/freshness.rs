// src/depfile/freshness.rs

//! Modification-time snapshots over dependency lists

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Ordered list of dependency paths for one target
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileList(Vec<String>);

impl FileList {
    pub fn push(&mut self, path: String) {
        self.0.push(path);
    }

    /// Remove and return the first path, if any
    pub fn pop_first(&mut self) -> Option<String> {
        if self.0.is_empty() {
            None
        } else {
            Some(self.0.remove(0))
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Latest modification time of the listed files
    ///
    /// Files that cannot be stat'd are skipped. `None` if the list is empty or
    /// nothing could be stat'd.
    pub fn mod_time(&self) -> Option<DateTime<Utc>> {
        latest_mtime(&self.0)
    }
}

impl From<Vec<String>> for FileList {
    fn from(paths: Vec<String>) -> Self {
        Self(paths)
    }
}

impl<'a> IntoIterator for &'a FileList {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Latest modification time among `paths` that exist
pub fn latest_mtime<P: AsRef<Path>>(paths: &[P]) -> Option<DateTime<Utc>> {
    let mut latest: Option<DateTime<Utc>> = None;

    for path in paths {
        let path = path.as_ref();
        let modified = match std::fs::metadata(path).and_then(|m| m.modified()) {
            Ok(modified) => DateTime::<Utc>::from(modified),
            Err(e) => {
                debug!("Missing dependency {}: {}", path.display(), e);
                continue;
            }
        };

        if latest.is_none_or(|t| modified > t) {
            latest = Some(modified);
        }
    }

    latest
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::FileTime;
    use std::fs;

    #[test]
    fn test_empty_list_has_no_mod_time() {
        assert_eq!(FileList::default().mod_time(), None);
    }

    #[test]
    fn test_all_missing_has_no_mod_time() {
        let list = FileList::from(vec![
            "/nonexistent/a.h".to_string(),
            "/nonexistent/b.h".to_string(),
        ]);
        assert_eq!(list.mod_time(), None);
    }

    #[test]
    fn test_mod_time_is_maximum() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("old.h");
        let new = dir.path().join("new.h");
        fs::write(&old, "old").unwrap();
        fs::write(&new, "new").unwrap();
        filetime::set_file_mtime(&old, FileTime::from_unix_time(1_000_000, 0)).unwrap();
        filetime::set_file_mtime(&new, FileTime::from_unix_time(2_000_000, 500)).unwrap();

        let list = FileList::from(vec![
            new.to_string_lossy().into_owned(),
            old.to_string_lossy().into_owned(),
        ]);
        let latest = list.mod_time().unwrap();
        assert_eq!(latest.timestamp(), 2_000_000);
        assert_eq!(latest.timestamp_subsec_nanos(), 500);
    }

    #[test]
    fn test_missing_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("present.h");
        fs::write(&present, "x").unwrap();
        filetime::set_file_mtime(&present, FileTime::from_unix_time(1_500_000, 0)).unwrap();

        let list = FileList::from(vec![
            dir.path().join("gone.h").to_string_lossy().into_owned(),
            present.to_string_lossy().into_owned(),
        ]);
        assert_eq!(list.mod_time().unwrap().timestamp(), 1_500_000);
    }

    #[test]
    fn test_pop_first() {
        let mut list = FileList::from(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(list.pop_first().as_deref(), Some("a"));
        assert_eq!(list.pop_first().as_deref(), Some("b"));
        assert_eq!(list.pop_first(), None);
        assert!(list.is_empty());
    }
}
