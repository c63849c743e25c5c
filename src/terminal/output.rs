//! Output pane and in-memory display surface

use crate::ansi::{AnsiRenderer, StyledRun};

/// Something styled runs can be appended to
///
/// Implementations are mutated from a single consumer task only; they do
/// not need interior synchronization.
pub trait DisplaySurface: Send {
    /// Append one run after everything appended so far
    fn append_run(&mut self, run: StyledRun);

    /// Remove everything from the display
    fn clear(&mut self);
}

impl<S: DisplaySurface + ?Sized> DisplaySurface for Box<S> {
    fn append_run(&mut self, run: StyledRun) {
        (**self).append_run(run);
    }

    fn clear(&mut self) {
        (**self).clear();
    }
}

/// Display surface that keeps every run in memory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunBuffer {
    runs: Vec<StyledRun>,
}

impl RunBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// All runs in append order
    pub fn runs(&self) -> &[StyledRun] {
        &self.runs
    }

    /// Visible text with styling dropped
    pub fn text(&self) -> String {
        self.runs.iter().map(|run| run.text.as_str()).collect()
    }

    /// Number of runs
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// Check if nothing has been appended
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

impl DisplaySurface for RunBuffer {
    fn append_run(&mut self, run: StyledRun) {
        self.runs.push(run);
    }

    fn clear(&mut self) {
        self.runs.clear();
    }
}

/// One renderer feeding one display surface
#[derive(Debug)]
pub struct OutputPane<S: DisplaySurface> {
    renderer: AnsiRenderer,
    surface: S,
}

impl<S: DisplaySurface> OutputPane<S> {
    /// Create a pane over `surface`
    pub fn new(surface: S) -> Self {
        Self {
            renderer: AnsiRenderer::new(),
            surface,
        }
    }

    /// Render `raw` and append the resulting runs; returns how many were appended
    pub fn append_text(&mut self, raw: &str, plain: bool) -> usize {
        let runs = self.renderer.append_text(raw, plain);
        let count = runs.len();
        for run in runs {
            self.surface.append_run(run);
        }
        count
    }

    /// Clear the display and reset the renderer with it
    pub fn clear(&mut self) {
        self.surface.clear();
        self.renderer.reset();
    }

    /// The display surface
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Mutable access to the display surface
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// The renderer driving this pane
    pub fn renderer(&self) -> &AnsiRenderer {
        &self.renderer
    }

    /// Consume the pane, returning its surface
    pub fn into_surface(self) -> S {
        self.surface
    }
}

impl Default for OutputPane<RunBuffer> {
    fn default() -> Self {
        Self::new(RunBuffer::new())
    }
}
