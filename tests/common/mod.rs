// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use cgowrap::{Config, Executor, Output, Result, WorkDir};
use filetime::FileTime;
use std::cell::RefCell;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A minimal guess-kinds probe as cgo writes it
pub const PROBE: &str = r#"#line 1 "cgo-builtin-prolog"
#include <stddef.h>
#line 1 "cgo-generated-wrapper"
#line 1 "not-declared"
void __cgo_f_1_1(void) { __typeof__(puts) *__cgo_undefined__1; }
#line 1 "not-type"
void __cgo_f_1_2(void) { puts *__cgo_undefined__2; }
#line 1 "completed"
int __cgo__1 = __cgo__2;
"#;

/// Temporary directory holding a work dir, a probe and some headers
pub struct Sandbox {
    pub dir: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn work_dir(&self) -> WorkDir {
        WorkDir::new(self.path().join("work"))
    }

    /// Config pointing at this sandbox's work dir
    pub fn config(&self) -> Config {
        Config {
            work_dir: self.path().join("work"),
            ..Config::default()
        }
    }

    /// Write the probe to a cgo-style temporary file name
    pub fn probe(&self, name: &str) -> PathBuf {
        let path = self.path().join(name);
        fs::write(&path, PROBE).unwrap();
        path
    }

    /// Create a header with a fixed mtime
    pub fn header(&self, name: &str, mtime: i64) -> PathBuf {
        let path = self.path().join(name);
        fs::write(&path, format!("/* {} */\n", name)).unwrap();
        touch(&path, mtime);
        path
    }
}

/// Set a file's mtime to `secs` after the epoch
pub fn touch(path: &Path, secs: i64) {
    filetime::set_file_mtime(path, FileTime::from_unix_time(secs, 0)).unwrap();
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Write a listing in the shape GCC produces for `-MD -MF <path>`
pub fn write_listing<P: AsRef<Path>>(path: &Path, target: &str, deps: &[P]) {
    let mut listing = format!("{}:", target);
    for (i, dep) in deps.iter().enumerate() {
        if i == 0 {
            listing.push(' ');
        } else {
            listing.push_str(" \\\n  ");
        }
        listing.push_str(&dep.as_ref().display().to_string());
    }
    listing.push('\n');
    fs::write(path, listing).unwrap();
}

/// Executor that behaves like a compiler asked for a dependency listing
///
/// Every call is recorded. When `-MF <path>` is present, a listing naming the
/// last argument followed by `headers` is written there, unless the compiler
/// was built with [`FakeCompiler::failing_early`].
pub struct FakeCompiler {
    pub headers: Vec<PathBuf>,
    pub output: Output,
    pub writes_listing: bool,
    pub calls: RefCell<Vec<Vec<String>>>,
}

impl FakeCompiler {
    pub fn new(headers: Vec<PathBuf>, output: Output) -> Self {
        Self {
            headers,
            output,
            writes_listing: true,
            calls: RefCell::new(Vec::new()),
        }
    }

    /// A compiler that dies before writing any listing, as gcc does when an
    /// included header is missing
    pub fn failing_early(output: Output) -> Self {
        Self {
            writes_listing: false,
            ..Self::new(Vec::new(), output)
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn last_call(&self) -> Vec<String> {
        self.calls.borrow().last().cloned().unwrap_or_default()
    }
}

impl Executor for FakeCompiler {
    fn run(&self, args: &[OsString]) -> Result<Output> {
        let args: Vec<String> = args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        self.calls.borrow_mut().push(args.clone());

        if !self.writes_listing {
            return Ok(self.output.clone());
        }
        if let Some(pos) = args.iter().position(|a| a == "-MF") {
            let depfile = Path::new(&args[pos + 1]);
            let input = PathBuf::from(args.last().unwrap());
            let mut deps: Vec<&Path> = vec![input.as_path()];
            deps.extend(self.headers.iter().map(PathBuf::as_path));
            write_listing(depfile, "_cgo_.o", &deps);
        }

        Ok(self.output.clone())
    }
}

impl Executor for &FakeCompiler {
    fn run(&self, args: &[OsString]) -> Result<Output> {
        (**self).run(args)
    }
}
