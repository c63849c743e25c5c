//! Display surface that re-emits runs to a byte stream
//!
//! Used by the command-line front end to print scanner output with its
//! colors intact, after it went through the same renderer a GUI would use.

use super::output::DisplaySurface;
use crate::ansi::StyledRun;
use std::io::Write;

/// Writes runs to `W`, with or without SGR sequences
#[derive(Debug)]
pub struct AnsiWriter<W: Write + Send> {
    writer: W,
    color: bool,
    failed: bool,
}

impl<W: Write + Send> AnsiWriter<W> {
    /// Create a writer; `color` selects SGR re-encoding
    pub fn new(writer: W, color: bool) -> Self {
        Self {
            writer,
            color,
            failed: false,
        }
    }

    /// Whether a write has failed; later runs are discarded once it has
    pub fn has_failed(&self) -> bool {
        self.failed
    }

    /// Consume the surface, returning the inner writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> DisplaySurface for AnsiWriter<W> {
    fn append_run(&mut self, run: StyledRun) {
        if self.failed {
            return;
        }

        let encoded = if self.color {
            run.to_ansi_string()
        } else {
            run.text
        };
        let mut result = self.writer.write_all(encoded.as_bytes());
        if result.is_ok() && encoded.ends_with('\n') {
            result = self.writer.flush();
        }
        if let Err(e) = result {
            warn!("Dropping output, display stream failed: {}", e);
            self.failed = true;
        }
    }

    fn clear(&mut self) {
        // A byte stream cannot take back what it printed
        let _ = self.writer.flush();
    }
}
