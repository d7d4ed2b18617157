// src/flags.rs

//! Compiler-style short flag parsing
//!
//! Compiler drivers accept single-dash flags whose value is either glued to
//! the flag (`-ofoo`, `-I/usr/include`) or passed as the next argument
//! (`-o foo`). Only the flags named in [`FlagOpts`] are recognized; every
//! other argument, dashed or not, is kept in [`Flags::args`] in order.

use crate::error::Error;

/// A recognized flag and every value it was given
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flag {
    /// Name including the leading dashes
    pub name: String,
    /// Values in order of appearance; empty for blank flags
    pub values: Vec<String>,
}

/// Which flags to recognize
#[derive(Debug, Clone, Default)]
pub struct FlagOpts<'a> {
    /// Flags that take a value
    pub value_flags: &'a [&'a str],
    /// Flags that take no value
    pub blank_flags: &'a [&'a str],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagKind {
    NotFlag,
    Value,
    Blank,
}

impl FlagOpts<'_> {
    fn kind(&self, name: &str) -> FlagKind {
        if self.value_flags.contains(&name) {
            FlagKind::Value
        } else if self.blank_flags.contains(&name) {
            FlagKind::Blank
        } else {
            FlagKind::NotFlag
        }
    }
}

/// Parsed arguments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Flags {
    /// Everything that was not a recognized flag or flag value
    pub args: Vec<String>,
    /// Recognized flags in order of first appearance
    pub flags: Vec<Flag>,
}

impl Flags {
    /// Parse `args`
    ///
    /// A value flag at the very end has nothing to consume; that is a
    /// [`Error::FlagError`] carrying what was parsed up to that point.
    pub fn parse(args: &[String], opts: &FlagOpts<'_>) -> Result<Self, (Self, Error)> {
        let mut parsed = Flags {
            args: Vec::with_capacity(args.len()),
            flags: Vec::with_capacity(opts.value_flags.len() + opts.blank_flags.len()),
        };
        let mut pending: Option<String> = None;

        for arg in args {
            if let Some(name) = pending.take() {
                parsed.flag_mut(&name).values.push(arg.clone());
                continue;
            }

            if !arg.starts_with('-') {
                parsed.args.push(arg.clone());
                continue;
            }

            let dashes = arg.bytes().take_while(|&b| b == b'-').count();
            // A single-dash flag is only ever its first two characters
            let name = match arg.char_indices().nth(2) {
                Some((end, _)) if dashes == 1 => &arg[..end],
                _ => arg.as_str(),
            };

            match opts.kind(name) {
                FlagKind::NotFlag => parsed.args.push(arg.clone()),
                FlagKind::Blank => {
                    parsed.flag_mut(name);
                }
                FlagKind::Value if dashes == 1 && name.len() < arg.len() => {
                    let value = arg[name.len()..].to_string();
                    parsed.flag_mut(name).values.push(value);
                }
                FlagKind::Value => pending = Some(name.to_string()),
            }
        }

        match pending {
            Some(name) => {
                let err = Error::FlagError(format!("flag {:?} missing value", name));
                Err((parsed, err))
            }
            None => Ok(parsed),
        }
    }

    #[cfg(test)]
    fn flag(&self, name: &str) -> Option<&Flag> {
        self.flags.iter().find(|f| f.name == name)
    }

    fn flag_mut(&mut self, name: &str) -> &mut Flag {
        let index = match self.flags.iter().position(|f| f.name == name) {
            Some(index) => index,
            None => {
                self.flags.push(Flag {
                    name: name.to_string(),
                    values: Vec::new(),
                });
                self.flags.len() - 1
            }
        };
        &mut self.flags[index]
    }
}

/// Parse and return only the unrecognized arguments
///
/// On a parse error the input is returned unchanged.
pub fn omit(args: &[String], opts: &FlagOpts<'_>) -> Vec<String> {
    match Flags::parse(args, opts) {
        Ok(parsed) => parsed.args,
        Err(_) => args.to_vec(),
    }
}

/// Arguments that do not start with a dash
pub fn non_flags(args: &[String]) -> Vec<String> {
    args.iter().filter(|a| !a.starts_with('-')).cloned().collect()
}

/// Arguments that start with a dash
pub fn omit_non_flags(args: &[String]) -> Vec<String> {
    args.iter().filter(|a| a.starts_with('-')).cloned().collect()
}
