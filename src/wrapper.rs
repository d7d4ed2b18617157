// src/wrapper.rs

//! One wrapped compiler invocation from arguments to output
//!
//! 1. Classify the arguments. Anything that is not a guess-kinds probe runs
//!    unchanged.
//! 2. Open the cache. If that fails the invocation runs uncached.
//! 3. Look up the fingerprint; a hit is returned without running anything.
//! 4. On a miss, run the compiler with `-MD -MF <depfile>` prepended and
//!    persist the dependency listing and the result.

use crate::cache::{Cache, InvocationCache, Lookup, Output, Validity};
use crate::classify::{classify, CacheableInvocation, Classification};
use crate::config::Config;
use crate::error::Result;
use crate::exec::Executor;
use crate::fingerprint::Fingerprint;
use crate::telemetry::{CacheStatus, Record};
use std::ffi::OsString;
use std::time::Instant;
use tracing::{debug, warn};

/// Result of a wrapped invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub output: Output,
    /// How the cache treated the invocation; `Uneligible` also covers a cache
    /// that could not be opened
    pub validity: Validity,
}

impl Outcome {
    pub fn cache_status(&self) -> CacheStatus {
        if self.validity.is_hit() {
            CacheStatus::Cached
        } else {
            CacheStatus::Uncached
        }
    }
}

pub struct Wrapper<E: Executor> {
    config: Config,
    args: Vec<OsString>,
    cwd: String,
    executor: E,
}

impl<E: Executor> Wrapper<E> {
    pub fn new<I, A>(config: Config, args: I, cwd: impl Into<String>, executor: E) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<OsString>,
    {
        Self {
            config,
            args: args.into_iter().map(Into::into).collect(),
            cwd: cwd.into(),
            executor,
        }
    }

    /// Produce the invocation's output, from the cache when possible
    ///
    /// Errors are only returned in a strict mode or when the compiler itself
    /// could not be waited on.
    pub fn run(&self) -> Result<Outcome> {
        let start = Instant::now();
        let outcome = self.execute()?;

        if let Some(profile) = &self.config.profile {
            let record = Record {
                args: self
                    .args
                    .iter()
                    .map(|arg| arg.to_string_lossy().into_owned())
                    .collect(),
                elapsed: start.elapsed(),
                status: outcome.cache_status(),
            };
            if let Err(e) = record.append(profile) {
                if self.config.fatal_errors {
                    return Err(e);
                }
                warn!("Failed to write profile record: {}", e);
            }
        }

        Ok(outcome)
    }

    fn execute(&self) -> Result<Outcome> {
        let strictness = self.config.strictness();

        // Only UTF-8 arguments are classified; anything else runs as given
        let Some(args) = self
            .args
            .iter()
            .map(|arg| arg.to_str().map(str::to_string))
            .collect::<Option<Vec<String>>>()
        else {
            debug!("Not caching: arguments are not valid UTF-8");
            return self.pass_through();
        };

        let invocation = match classify(&args) {
            Ok(Classification::Eligible(invocation)) => invocation,
            Ok(Classification::Uneligible(reason)) => {
                debug!("Not caching: {}", reason);
                return self.pass_through();
            }
            Err(e) if strictness.fatal_errors => return Err(e),
            Err(e) => {
                warn!("Failed to classify invocation: {}", e);
                return self.pass_through();
            }
        };

        let cache = match Cache::open(&self.config.work_dir(), self.config.lock_timeout) {
            Ok(cache) => cache,
            Err(e) if strictness.is_strict() => return Err(e),
            Err(e) => {
                warn!("Cannot open cache, running uncached: {}", e);
                return self.pass_through();
            }
        };

        self.execute_cached(InvocationCache::new(cache, strictness), invocation)
    }

    fn execute_cached(
        &self,
        mut cache: InvocationCache,
        invocation: CacheableInvocation,
    ) -> Result<Outcome> {
        let CacheableInvocation { input, needed_args } = invocation;
        let fp = Fingerprint::compute(&needed_args, &self.cwd, &input);

        let validity = match cache.lookup(&needed_args, &fp)? {
            Lookup::Hit(output) => {
                return Ok(Outcome {
                    output,
                    validity: Validity::Hit,
                });
            }
            Lookup::Miss(validity) => validity,
        };

        // The listing must come from this run, never from an earlier one
        cache.clear_depfile(&fp)?;

        let mut args = vec![
            OsString::from("-MD"),
            OsString::from("-MF"),
            cache.depfile_path(&fp).into_os_string(),
        ];
        args.extend(self.args.iter().cloned());

        let output = self.executor.run(&args)?;
        cache.persist(&fp, &output)?;

        Ok(Outcome { output, validity })
    }

    fn pass_through(&self) -> Result<Outcome> {
        Ok(Outcome {
            output: self.executor.run(&self.args)?,
            validity: Validity::Uneligible,
        })
    }
}
