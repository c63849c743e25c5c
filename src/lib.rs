//! Scanpane - ANSI output rendering and scanner invocation for template editors
//!
//! This library provides the non-visual core of a scan template editor
//! window: it writes the edited template to a temporary file, runs the
//! scanner against a target, and renders the scanner's colored output into
//! styled text runs for whatever display the host provides.
//!
//! ## Module Organization
//!
//! - [`ansi`] - Streaming SGR renderer producing styled runs
//! - [`terminal`] - Display surfaces and the renderer/surface pair
//! - [`execution`] - Scanner process launch, line streaming, cancellation
//! - [`commands`] - Command line construction and no-color detection
//! - [`session`] - Per-window template session
//! - [`completion`] - Template field name completion
//! - [`sinks`] - Error log and clipboard collaborators
//! - [`config`] - Configuration loading and validation
//! - [`mod@error`] - Error types and Result aliases
//!
//! ## Quick Start
//!
//! ```no_run
//! use scanpane::{Config, TemplateSession};
//! use std::path::Path;
//!
//! # async fn run() -> scanpane::Result<()> {
//! let mut session = TemplateSession::new(
//!     Path::new("nuclei"),
//!     "http://localhost:8081",
//!     "id: example\n",
//!     Config::default(),
//! )?;
//! session.execute().await?;
//! let code = session.wait().await;
//! println!("{}\nexit: {:?}", session.output_text(), code);
//! # Ok(())
//! # }
//! ```
//!
//! ## Threading
//!
//! Scanner output is read on tokio tasks and handed over a bounded channel
//! to one consumer task per run, which alone feeds the renderer and the
//! display surface. Entry points that start processes need a tokio runtime.

#![allow(unexpected_cfgs)]

#[macro_use]
extern crate tracing;

pub mod ansi;
pub mod commands;
pub mod completion;
pub mod config;
pub mod error;
pub mod execution;
pub mod session;
pub mod sinks;
pub mod terminal;

// Re-exports for core functionality
pub use ansi::{AnsiColor, AnsiRenderer, SgrState, StyledRun};
pub use config::loader::ConfigLoader;
pub use config::Config;
pub use error::{Error, Result};
pub use execution::{CommandRunner, RunEvent, RunHandle, RunTask};
pub use session::TemplateSession;
pub use terminal::{AnsiWriter, DisplaySurface, OutputPane, RunBuffer};

// Version information
/// The current version of Scanpane from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The application name from Cargo.toml
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// The application description from Cargo.toml
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Load configuration from the default locations, falling back to defaults
///
/// A configuration file that exists but fails validation is an error; a
/// missing one is not.
pub fn init() -> Result<Config> {
    info!("Initializing {} v{}", NAME, VERSION);

    match ConfigLoader::load() {
        Ok(config) => Ok(config),
        Err(e @ Error::ConfigValidationFailed { .. }) => Err(e),
        Err(e) => {
            warn!("Failed to load configuration: {}. Using defaults", e);
            Ok(Config::default())
        }
    }
}

/// Load configuration from an explicit file
pub fn init_with_config(config_path: &std::path::Path) -> Result<Config> {
    info!(
        "Initializing {} v{} with config: {}",
        NAME,
        VERSION,
        config_path.display()
    );

    if !config_path.exists() {
        return Err(Error::ConfigLoadFailed {
            path: config_path.to_path_buf(),
            reason: "Configuration file does not exist".to_string(),
        });
    }

    ConfigLoader::load_from_path(config_path).map_err(|e| {
        error!(
            "Failed to load configuration from {}: {}",
            config_path.display(),
            e
        );
        e
    })
}

/// Startup error text with a hint for the user
pub fn handle_startup_error(error: &Error) -> String {
    match error {
        Error::ConfigLoadFailed { path, reason } => {
            format!(
                "Configuration Error: Failed to load config from '{}': {}\n\nTry:\n• Check the file path and permissions\n• Run without --config to use defaults",
                path.display(),
                reason
            )
        }
        Error::ConfigParseFailed { format, reason } => {
            format!(
                "Configuration Error: Failed to parse {} config: {}\n\nTry:\n• Check configuration file syntax",
                format, reason
            )
        }
        Error::ConfigValidationFailed { field, reason } => {
            format!(
                "Configuration Error: Validation failed for '{}': {}",
                field, reason
            )
        }
        Error::ProcessLaunchFailed { command, reason } => {
            format!(
                "Launch Error: Could not start '{}': {}\n\nTry:\n• Pass the scanner path with --tool\n• Check that the scanner is installed",
                command, reason
            )
        }
        Error::TempFileCreateFailed { reason } => {
            format!(
                "I/O Error: Could not create the temporary template file: {}\n\nTry:\n• Check that the temp directory is writable",
                reason
            )
        }
        _ => format!("Error: {}", error),
    }
}
