//! Configuration management for Scanpane
//!
//! Runner, template file, output and tool settings, loadable from TOML or
//! JSON through [`loader::ConfigLoader`].

pub mod loader;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure for Scanpane
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Subprocess execution
    pub runner: RunnerConfig,

    /// Temporary template file
    pub template: TemplateConfig,

    /// Output rendering
    pub output: OutputConfig,

    /// Scanner executable
    pub tool: ToolConfig,
}

/// Subprocess execution settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Lines buffered between the reader and the display consumer
    pub channel_capacity: usize,

    /// Deliver standard error through the same line stream
    pub merge_stderr: bool,

    /// Time between SIGTERM and a hard kill when cancelling
    pub terminate_grace_ms: u64,

    /// Working directory of the scanner process
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<PathBuf>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
            merge_stderr: true,
            terminate_grace_ms: 2000,
            working_directory: None,
        }
    }
}

/// Temporary template file naming
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    pub temp_prefix: String,
    pub temp_suffix: String,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            temp_prefix: "nuclei".to_string(),
            temp_suffix: ".yaml".to_string(),
        }
    }
}

/// How the no-color flag is detected on the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoColorMatch {
    /// Substring search for `" -nc "` or `" -no-color "`
    #[default]
    Literal,
    /// Whitespace tokens `-nc`, `-no-color`, optionally with `=value`
    Tokenized,
}

/// Output rendering settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub no_color_match: NoColorMatch,

    /// Append the exit status line after a run
    pub show_exit_status: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            no_color_match: NoColorMatch::Literal,
            show_exit_status: true,
        }
    }
}

/// Scanner executable settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Used when the caller does not name a tool
    pub default_path: PathBuf,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            default_path: PathBuf::from("nuclei"),
        }
    }
}
