//! Host collaborators: error log and clipboard
//!
//! The session never talks to a UI toolkit directly. Failures are reported
//! as human-readable messages to an [`ErrorSink`], and template text goes to
//! a [`ClipboardSink`].

use crate::error::{Error, Result};
use std::sync::{Arc, Mutex};

/// Receives human-readable error messages
pub trait ErrorSink: Send + Sync {
    fn report(&self, message: &str);
}

/// Forwards reports to `tracing` at error level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn report(&self, message: &str) {
        error!("{}", message);
    }
}

/// Keeps every reported message; also logs them
#[derive(Debug, Clone, Default)]
pub struct CollectingErrorSink {
    messages: Arc<Mutex<Vec<String>>>,
}

impl CollectingErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages reported so far, oldest first
    pub fn messages(&self) -> Vec<String> {
        match self.messages.lock() {
            Ok(messages) => messages.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ErrorSink for CollectingErrorSink {
    fn report(&self, message: &str) {
        error!("{}", message);
        match self.messages.lock() {
            Ok(mut messages) => messages.push(message.to_string()),
            Err(poisoned) => poisoned.into_inner().push(message.to_string()),
        }
    }
}

/// Receives the editor text verbatim
pub trait ClipboardSink {
    fn set_text(&mut self, text: &str) -> Result<()>;
}

/// System clipboard via `arboard`, opened on first use
#[derive(Default)]
pub struct SystemClipboard {
    clipboard: Option<arboard::Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClipboardSink for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<()> {
        if self.clipboard.is_none() {
            let clipboard = arboard::Clipboard::new().map_err(|e| Error::ClipboardFailed {
                reason: e.to_string(),
            })?;
            self.clipboard = Some(clipboard);
        }

        match self.clipboard.as_mut() {
            Some(clipboard) => clipboard
                .set_text(text.to_string())
                .map_err(|e| Error::ClipboardFailed {
                    reason: e.to_string(),
                }),
            None => Err(Error::ClipboardFailed {
                reason: "clipboard unavailable".to_string(),
            }),
        }
    }
}

/// In-memory clipboard, for hosts without one and for tests
#[derive(Debug, Clone, Default)]
pub struct MemoryClipboard {
    contents: Option<String>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Option<&str> {
        self.contents.as_deref()
    }
}

impl ClipboardSink for MemoryClipboard {
    fn set_text(&mut self, text: &str) -> Result<()> {
        self.contents = Some(text.to_string());
        Ok(())
    }
}
