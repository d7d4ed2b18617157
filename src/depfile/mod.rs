// src/depfile/mod.rs

//! Make-rule dependency listings emitted by the compiler (`-MD -MF <path>`)
//!
//! Only the subset of the Make grammar that GCC and Clang produce is
//! understood:
//!
//! ```text
//! _obj/_cgo_.o: /tmp/cgo-gcc-input.c \
//!   /usr/include/stdlib.h \
//!   /usr/include/features.h
//! ```
//!
//! A line that does not start with whitespace and contains `": "` opens a new
//! target; the text after the separator is its first dependency. Lines that
//! start with two spaces are further dependencies of the current target; such
//! a line before any target is dropped.

mod freshness;

pub use freshness::{latest_mtime, FileList};

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use tracing::debug;

const TARGET_SEPARATOR: &str = ": ";
const CONTINUATION_INDENT: &str = "  ";
const CONTINUATION_MARKER: &str = " \\";

/// A parsed dependency listing: build target to its ordered dependencies
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepFile {
    pub targets: BTreeMap<String, FileList>,
}

impl DepFile {
    /// Parse a dependency listing from disk
    pub fn parse_file(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            Error::IoError(format!(
                "Failed to open dependency listing {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::parse(file)
    }

    /// Parse a dependency listing from a reader
    pub fn parse<R: Read>(reader: R) -> Result<Self> {
        let mut depfile = DepFile::default();
        let mut current: Option<(String, FileList)> = None;

        for line in BufReader::new(reader).lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }

            if line.starts_with(CONTINUATION_INDENT) {
                // A continuation before any target has nowhere to go
                let Some((_, deps)) = current.as_mut() else {
                    debug!("Skipping continuation before any target: {:?}", line);
                    continue;
                };
                let dep = strip_line(&line);
                if !dep.is_empty() {
                    deps.push(dep);
                }
                continue;
            }

            let Some((target, first)) = line.split_once(TARGET_SEPARATOR) else {
                return Err(Error::MalformedManifestLine(line));
            };

            if let Some((target, deps)) = current.take() {
                depfile.targets.insert(target, deps);
            }
            let mut deps = FileList::default();
            let first = strip_line(first);
            if !first.is_empty() {
                deps.push(first);
            }
            current = Some((target.to_string(), deps));
        }

        if let Some((target, deps)) = current {
            depfile.targets.insert(target, deps);
        }

        Ok(depfile)
    }

    /// Render back into Make-rule syntax
    pub fn to_make_rules(&self) -> String {
        let mut out = String::new();
        for (target, deps) in &self.targets {
            out.push_str(target);
            out.push_str(TARGET_SEPARATOR);
            for (i, dep) in deps.iter().enumerate() {
                if i > 0 {
                    out.push_str(CONTINUATION_INDENT);
                }
                out.push_str(dep);
                if i + 1 < deps.len() {
                    out.push_str(CONTINUATION_MARKER);
                }
                out.push('\n');
            }
            if deps.is_empty() {
                out.push('\n');
            }
        }
        out
    }

    /// Drop the first dependency of every target
    ///
    /// The compiler lists the translation unit itself first. Its contents are
    /// already part of the fingerprint, and cgo writes it to a fresh temporary
    /// file every time, so its mtime would make every entry stale.
    pub fn pop_first_sources(&mut self) {
        for deps in self.targets.values_mut() {
            deps.pop_first();
        }
    }

    /// Latest modification time across every target's dependencies
    ///
    /// `None` when there are no targets or no dependency could be stat'd.
    pub fn mod_time(&self) -> Option<DateTime<Utc>> {
        self.targets.values().filter_map(FileList::mod_time).max()
    }

    /// Total number of dependency paths across all targets
    pub fn dependency_count(&self) -> usize {
        self.targets.values().map(FileList::len).sum()
    }
}

fn strip_line(line: &str) -> String {
    let line = line.strip_prefix(CONTINUATION_INDENT).unwrap_or(line);
    let line = line.strip_suffix(CONTINUATION_MARKER).unwrap_or(line);
    // `target: \` puts the first dependency on the next line
    if line == "\\" {
        return String::new();
    }
    line.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "_obj/_7_cgo_.o: /tmp/cgo-gcc-input-2620350145.c \\
  /usr/include/stdlib.h \\
  /usr/include/bits/libc-header-start.h \\
  /usr/include/features.h
";

    fn list(items: &[&str]) -> FileList {
        FileList::from(items.iter().map(|s| s.to_string()).collect::<Vec<_>>())
    }

    #[test]
    fn test_parse_single_target() {
        let depfile = DepFile::parse(LISTING.as_bytes()).unwrap();
        assert_eq!(depfile.targets.len(), 1);
        assert_eq!(
            depfile.targets["_obj/_7_cgo_.o"],
            list(&[
                "/tmp/cgo-gcc-input-2620350145.c",
                "/usr/include/stdlib.h",
                "/usr/include/bits/libc-header-start.h",
                "/usr/include/features.h",
            ])
        );
    }

    #[test]
    fn test_parse_multiple_targets_and_blank_lines() {
        let input = "a.o: a.c \\\n  a.h\n\nb.o: b.c\n";
        let depfile = DepFile::parse(input.as_bytes()).unwrap();
        assert_eq!(depfile.targets["a.o"], list(&["a.c", "a.h"]));
        assert_eq!(depfile.targets["b.o"], list(&["b.c"]));
    }

    #[test]
    fn test_parse_redeclared_target_last_wins() {
        let input = "a.o: first.c \\\n  first.h\na.o: second.c\n";
        let depfile = DepFile::parse(input.as_bytes()).unwrap();
        assert_eq!(depfile.targets.len(), 1);
        assert_eq!(depfile.targets["a.o"], list(&["second.c"]));
    }

    #[test]
    fn test_parse_rejects_line_without_separator() {
        let input = "a.o: a.c\nthis is not a rule\n";
        let err = DepFile::parse(input.as_bytes()).unwrap_err();
        match err {
            Error::MalformedManifestLine(line) => assert_eq!(line, "this is not a rule"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_skips_leading_continuation() {
        let depfile = DepFile::parse("  orphan.h\nout.o: in.c \\\n  in.h\n".as_bytes()).unwrap();
        assert_eq!(depfile.targets.len(), 1);
        assert_eq!(depfile.targets["out.o"], list(&["in.c", "in.h"]));

        let depfile = DepFile::parse("  orphan.h\n".as_bytes()).unwrap();
        assert!(depfile.targets.is_empty());
    }

    #[test]
    fn test_parse_target_with_wrapped_first_dependency() {
        let input = "very/long/target.o: \\\n  in.c \\\n  in.h\n";
        let depfile = DepFile::parse(input.as_bytes()).unwrap();
        assert_eq!(depfile.targets["very/long/target.o"], list(&["in.c", "in.h"]));
    }

    #[test]
    fn test_empty_target_round_trip() {
        let mut depfile = DepFile::default();
        depfile.targets.insert("empty.o".to_string(), FileList::default());
        let parsed = DepFile::parse(depfile.to_make_rules().as_bytes()).unwrap();
        assert_eq!(parsed, depfile);
    }

    #[test]
    fn test_parse_empty_input() {
        let depfile = DepFile::parse("".as_bytes()).unwrap();
        assert!(depfile.targets.is_empty());
        assert_eq!(depfile.mod_time(), None);
    }

    #[test]
    fn test_make_rules_round_trip() {
        let mut depfile = DepFile::default();
        depfile
            .targets
            .insert("out.o".to_string(), list(&["in.c", "/usr/include/stdio.h"]));
        depfile.targets.insert("other.o".to_string(), list(&["other.c"]));

        let rendered = depfile.to_make_rules();
        let parsed = DepFile::parse(rendered.as_bytes()).unwrap();
        assert_eq!(parsed, depfile);
    }

    #[test]
    fn test_pop_first_sources() {
        let mut depfile = DepFile::parse(LISTING.as_bytes()).unwrap();
        depfile.pop_first_sources();
        assert_eq!(
            depfile.targets["_obj/_7_cgo_.o"],
            list(&[
                "/usr/include/stdlib.h",
                "/usr/include/bits/libc-header-start.h",
                "/usr/include/features.h",
            ])
        );
        assert_eq!(depfile.dependency_count(), 3);
    }

    #[test]
    fn test_pop_first_sources_on_single_entry() {
        let mut depfile = DepFile::parse("a.o: a.c\n".as_bytes()).unwrap();
        depfile.pop_first_sources();
        assert!(depfile.targets["a.o"].is_empty());
        assert_eq!(depfile.mod_time(), None);
    }

    #[test]
    fn test_parse_file_missing() {
        let err = DepFile::parse_file(Path::new("/nonexistent/cgo.d")).unwrap_err();
        assert!(matches!(err, Error::IoError(_)));
    }
}
