//! Scanner command line utilities
//!
//! Builds the default scanner invocation, splits an edited command line
//! into program and arguments, and decides whether the user asked for
//! uncolored output.

use crate::config::NoColorMatch;
use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::path::Path;

/// Tokenized form of the scanner's no-color flag
static NO_COLOR_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|\s)-(?:nc|no-color)(?:=\S*)?(?:\s|$)")
        .expect("no-color pattern is valid")
});

/// Default scanner invocation: `{tool} -v -t {template} -u {target}`
pub fn build_command_line(tool: &Path, template: &Path, target: impl fmt::Display) -> String {
    format!(
        "{} -v -t {} -u {}",
        tool.display(),
        template.display(),
        target
    )
}

/// Split a command line into program and arguments on whitespace.
///
/// Quotes are not interpreted: a path containing spaces is split like any
/// other word.
pub fn split_command_line(command_line: &str) -> Result<(String, Vec<String>)> {
    let mut words = command_line.split_whitespace().map(str::to_string);
    let program = words.next().ok_or(Error::EmptyCommand)?;
    Ok((program, words.collect()))
}

/// Whether `command_line` disables colored scanner output
pub fn is_no_color(command_line: &str, mode: NoColorMatch) -> bool {
    match mode {
        NoColorMatch::Literal => {
            command_line.contains(" -nc ") || command_line.contains(" -no-color ")
        }
        NoColorMatch::Tokenized => NO_COLOR_TOKEN.is_match(command_line),
    }
}
