//! Error types and Result aliases for Scanpane

use std::fmt;
use std::path::PathBuf;

/// Result type alias for Scanpane operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Scanpane
#[derive(Debug)]
pub enum Error {
    // === Template file errors ===
    /// Failed to create the temporary template file
    TempFileCreateFailed {
        reason: String,
    },

    /// Failed to write the template before a run
    TemplateWriteFailed {
        path: PathBuf,
        reason: String,
    },

    /// Failed to delete the temporary template file on close
    TempFileCleanupFailed {
        path: PathBuf,
        reason: String,
    },

    // === Process errors ===
    /// Executable missing or not runnable
    ProcessLaunchFailed {
        command: String,
        reason: String,
    },

    /// Reading the process output failed mid-run
    ProcessIoFailed {
        reason: String,
    },

    /// Empty command line
    EmptyCommand,

    // === Collaborator errors ===
    /// Clipboard unavailable or rejected the text
    ClipboardFailed {
        reason: String,
    },

    // === Configuration errors ===
    /// Failed to load configuration file
    ConfigLoadFailed {
        path: PathBuf,
        reason: String,
    },

    /// Failed to save configuration file
    ConfigSaveFailed {
        path: PathBuf,
        reason: String,
    },

    /// Configuration file not found
    ConfigNotFound,

    /// Configuration validation failed
    ConfigValidationFailed {
        field: String,
        reason: String,
    },

    /// Failed to serialize configuration
    ConfigSerializationFailed {
        format: String,
        reason: String,
    },

    /// Failed to parse configuration
    ConfigParseFailed {
        format: String,
        reason: String,
    },

    // === I/O and serialization errors ===
    /// I/O errors
    Io(std::io::Error),

    /// Serialization errors
    Serde(serde_json::Error),

    /// TOML parsing errors
    Toml(toml::de::Error),

    /// Generic errors
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Template file errors
            Error::TempFileCreateFailed { reason } => {
                write!(f, "Could not create temporary file: {}", reason)
            }
            Error::TemplateWriteFailed { path, reason } => {
                write!(f, "Could not write template to '{}': {}", path.display(), reason)
            }
            Error::TempFileCleanupFailed { path, reason } => {
                write!(f, "Could not delete temporary file '{}': {}", path.display(), reason)
            }

            // Process errors
            Error::ProcessLaunchFailed { command, reason } => {
                write!(f, "Failed to launch '{}': {}", command, reason)
            }
            Error::ProcessIoFailed { reason } => {
                write!(f, "Failed to read process output: {}", reason)
            }
            Error::EmptyCommand => {
                write!(f, "Command cannot be empty")
            }

            // Collaborator errors
            Error::ClipboardFailed { reason } => {
                write!(f, "Clipboard error: {}", reason)
            }

            // Configuration errors
            Error::ConfigLoadFailed { path, reason } => {
                write!(f, "Failed to load config from '{}': {}", path.display(), reason)
            }
            Error::ConfigSaveFailed { path, reason } => {
                write!(f, "Failed to save config to '{}': {}", path.display(), reason)
            }
            Error::ConfigNotFound => {
                write!(f, "Configuration file not found")
            }
            Error::ConfigValidationFailed { field, reason } => {
                write!(f, "Configuration validation failed for '{}': {}", field, reason)
            }
            Error::ConfigSerializationFailed { format, reason } => {
                write!(f, "Failed to serialize config as {}: {}", format, reason)
            }
            Error::ConfigParseFailed { format, reason } => {
                write!(f, "Failed to parse {} config: {}", format, reason)
            }

            // I/O and serialization errors
            Error::Io(err) => write!(f, "I/O error: {}", err),
            Error::Serde(err) => write!(f, "Serialization error: {}", err),
            Error::Toml(err) => write!(f, "TOML parsing error: {}", err),

            Error::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Serde(err) => Some(err),
            Error::Toml(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serde(err)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Toml(err)
    }
}

impl From<String> for Error {
    fn from(err: String) -> Self {
        Error::Other(err)
    }
}

impl From<&str> for Error {
    fn from(err: &str) -> Self {
        Error::Other(err.to_string())
    }
}
