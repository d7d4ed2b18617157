// src/classify.rs

//! Recognizing cgo's "guess kinds" probe
//!
//! `go build` asks the C compiler about every C name a package references by
//! compiling a generated translation unit and reading back the diagnostics.
//! That probe is the only invocation worth caching: it is expensive, its
//! output depends only on its flags and the headers it includes, and cgo
//! writes it to a fresh temporary file every time. A probe is always the last
//! argument and is recognized by content.

use crate::error::Result;
use crate::flags::{self, FlagOpts, Flags};
use std::fs;
use tracing::debug;

/// Lines cgo puts into every guess-kinds probe
pub const GUESS_KINDS_MARKERS: [&str; 3] = [
    r#"#line 1 "cgo-generated-wrapper""#,
    r#"#line 1 "completed""#,
    "int __cgo__1 = __cgo__2;",
];

/// Flags that never affect the probe's output
const IRRELEVANT_VALUE_FLAGS: &[&str] = &["-o"];

/// Whether `input` is a guess-kinds probe
pub fn is_guess_kinds(input: &[u8]) -> bool {
    GUESS_KINDS_MARKERS
        .iter()
        .all(|marker| contains(input, marker.as_bytes()))
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// What the fingerprint of an eligible invocation is computed from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheableInvocation {
    /// Contents of the probe file
    pub input: Vec<u8>,
    /// Flags with `-o` and every input path removed
    pub needed_args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Eligible(CacheableInvocation),
    Uneligible(String),
}

/// Decide whether `args` is a cacheable invocation
///
/// Anything that is not clearly a probe is uneligible, including an
/// unreadable last argument. A malformed `-o` is an error.
pub fn classify(args: &[String]) -> Result<Classification> {
    let Some(last) = args.last() else {
        return Ok(Classification::Uneligible("no arguments".to_string()));
    };

    let input = match fs::read(last) {
        Ok(input) => input,
        Err(e) => {
            debug!("Last argument {:?} is not a readable input: {}", last, e);
            return Ok(Classification::Uneligible(format!(
                "cannot read {}: {}",
                last, e
            )));
        }
    };

    if !is_guess_kinds(&input) {
        return Ok(Classification::Uneligible(format!(
            "{} is not a guess-kinds probe",
            last
        )));
    }

    let opts = FlagOpts {
        value_flags: IRRELEVANT_VALUE_FLAGS,
        ..Default::default()
    };
    let parsed = Flags::parse(args, &opts).map_err(|(_, e)| e)?;
    let needed_args = flags::omit_non_flags(&parsed.args);

    Ok(Classification::Eligible(CacheableInvocation { input, needed_args }))
}
