//! Output display surfaces
//!
//! The renderer produces [`StyledRun`](crate::ansi::StyledRun)s; a display
//! surface owned by the host receives them. [`OutputPane`] ties one renderer
//! to one surface so that clearing the display also resets the parser.

pub mod output;
pub mod writer;

// Re-exports for convenience
pub use output::{DisplaySurface, OutputPane, RunBuffer};
pub use writer::AnsiWriter;
