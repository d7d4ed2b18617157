// src/exec.rs

//! Running the real compiler

use crate::cache::Output;
use crate::error::Result;
use std::ffi::OsString;
use std::process::{Command, Stdio};
use tracing::{debug, warn};

/// Exit status reported when the compiler could not be started at all
pub const SPAWN_FAILURE_STATUS: i32 = 127;

/// Runs one compiler invocation and captures everything it produced
///
/// Arguments are OS strings so that paths which are not valid UTF-8 reach
/// the compiler untouched.
pub trait Executor {
    fn run(&self, args: &[OsString]) -> Result<Output>;
}

/// Executes the configured C compiler
#[derive(Debug, Clone)]
pub struct CompilerExecutor {
    program: String,
}

impl CompilerExecutor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Executor for CompilerExecutor {
    fn run(&self, args: &[OsString]) -> Result<Output> {
        debug!("Executing {} {:?}", self.program, args);

        // cgo may feed the probe through stdin, so it stays inherited
        let child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) => {
                warn!("Failed to spawn {}: {}", self.program, e);
                let message = format!("cgowrap: cannot run {}: {}\n", self.program, e);
                return Ok(Output::new(SPAWN_FAILURE_STATUS, Vec::new(), message));
            }
        };

        let output = child.wait_with_output()?;
        // Killed by a signal
        let status = output.status.code().unwrap_or(-1);

        Ok(Output::new(status, output.stdout, output.stderr))
    }
}
