//! ANSI escape code rendering
//!
//! Converts raw process output containing SGR escape sequences into
//! [`StyledRun`]s. The renderer is long-lived: style state and any escape
//! sequence left dangling at the end of one call carry over into the next,
//! so output may arrive in arbitrary fragments.

use std::fmt;
use vte::{Params, Parser, Perform};

/// Clamp a parameter value into a color channel
#[inline]
const fn to_channel(value: u16) -> u8 {
    if value > 255 {
        255
    } else {
        value as u8
    }
}

/// ANSI color representation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnsiColor {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    BrightBlack,
    BrightRed,
    BrightGreen,
    BrightYellow,
    BrightBlue,
    BrightMagenta,
    BrightCyan,
    BrightWhite,
    /// Entry of the 256-color palette (`38;5;n`)
    Indexed(u8),
    /// 24-bit color (`38;2;r;g;b`)
    Rgb(u8, u8, u8),
}

impl AnsiColor {
    /// Create color from standard ANSI code (0-7)
    pub fn from_ansi_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(AnsiColor::Black),
            1 => Some(AnsiColor::Red),
            2 => Some(AnsiColor::Green),
            3 => Some(AnsiColor::Yellow),
            4 => Some(AnsiColor::Blue),
            5 => Some(AnsiColor::Magenta),
            6 => Some(AnsiColor::Cyan),
            7 => Some(AnsiColor::White),
            _ => None,
        }
    }

    /// Create color from bright ANSI code (0-7)
    pub fn from_bright_ansi_code(code: u16) -> Option<Self> {
        match code {
            0 => Some(AnsiColor::BrightBlack),
            1 => Some(AnsiColor::BrightRed),
            2 => Some(AnsiColor::BrightGreen),
            3 => Some(AnsiColor::BrightYellow),
            4 => Some(AnsiColor::BrightBlue),
            5 => Some(AnsiColor::BrightMagenta),
            6 => Some(AnsiColor::BrightCyan),
            7 => Some(AnsiColor::BrightWhite),
            _ => None,
        }
    }

    /// RGB value a GUI host can paint this color with
    pub fn to_rgb(self) -> (u8, u8, u8) {
        match self {
            AnsiColor::Black => (0, 0, 0),
            AnsiColor::Red => (128, 0, 0),
            AnsiColor::Green => (0, 128, 0),
            AnsiColor::Yellow => (128, 128, 0),
            AnsiColor::Blue => (0, 0, 128),
            AnsiColor::Magenta => (128, 0, 128),
            AnsiColor::Cyan => (0, 128, 128),
            AnsiColor::White => (192, 192, 192),
            AnsiColor::BrightBlack => (128, 128, 128),
            AnsiColor::BrightRed => (255, 0, 0),
            AnsiColor::BrightGreen => (0, 255, 0),
            AnsiColor::BrightYellow => (255, 255, 0),
            AnsiColor::BrightBlue => (0, 0, 255),
            AnsiColor::BrightMagenta => (255, 0, 255),
            AnsiColor::BrightCyan => (0, 255, 255),
            AnsiColor::BrightWhite => (255, 255, 255),
            AnsiColor::Indexed(index) => indexed_to_rgb(index),
            AnsiColor::Rgb(r, g, b) => (r, g, b),
        }
    }

    /// SGR parameters selecting this color as foreground or background
    pub fn sgr_params(self, background: bool) -> String {
        let base: u16 = if background { 40 } else { 30 };
        match self {
            AnsiColor::Indexed(index) => format!("{};5;{}", base + 8, index),
            AnsiColor::Rgb(r, g, b) => format!("{};2;{};{};{}", base + 8, r, g, b),
            standard => {
                let (offset, bright) = standard.palette_slot();
                let code = if bright { base + 60 + offset } else { base + offset };
                code.to_string()
            }
        }
    }

    /// Offset within the 8-color table and whether it is the bright half
    fn palette_slot(self) -> (u16, bool) {
        match self {
            AnsiColor::Black => (0, false),
            AnsiColor::Red => (1, false),
            AnsiColor::Green => (2, false),
            AnsiColor::Yellow => (3, false),
            AnsiColor::Blue => (4, false),
            AnsiColor::Magenta => (5, false),
            AnsiColor::Cyan => (6, false),
            AnsiColor::White => (7, false),
            AnsiColor::BrightBlack => (0, true),
            AnsiColor::BrightRed => (1, true),
            AnsiColor::BrightGreen => (2, true),
            AnsiColor::BrightYellow => (3, true),
            AnsiColor::BrightBlue => (4, true),
            AnsiColor::BrightMagenta => (5, true),
            AnsiColor::BrightCyan => (6, true),
            AnsiColor::BrightWhite => (7, true),
            AnsiColor::Indexed(index) => (u16::from(index), false),
            AnsiColor::Rgb(..) => (0, false),
        }
    }
}

/// xterm 256-color palette lookup
fn indexed_to_rgb(index: u8) -> (u8, u8, u8) {
    const CUBE_LEVELS: [u8; 6] = [0, 95, 135, 175, 215, 255];
    match index {
        0..=7 => AnsiColor::from_ansi_code(u16::from(index))
            .map(AnsiColor::to_rgb)
            .unwrap_or((0, 0, 0)),
        8..=15 => AnsiColor::from_bright_ansi_code(u16::from(index - 8))
            .map(AnsiColor::to_rgb)
            .unwrap_or((255, 255, 255)),
        16..=231 => {
            let i = index - 16;
            (
                CUBE_LEVELS[usize::from(i / 36)],
                CUBE_LEVELS[usize::from((i / 6) % 6)],
                CUBE_LEVELS[usize::from(i % 6)],
            )
        }
        _ => {
            let level = 8 + (index - 232) * 10;
            (level, level, level)
        }
    }
}

/// Style attributes in effect at a point of the stream
///
/// `None` colors mean "use the display's default".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SgrState {
    pub foreground: Option<AnsiColor>,
    pub background: Option<AnsiColor>,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

impl SgrState {
    /// Whether every attribute is at its default
    pub fn is_default(&self) -> bool {
        *self == SgrState::default()
    }

    /// Reset all attributes to default
    pub fn reset(&mut self) {
        *self = SgrState::default();
    }

    /// Apply the parameters of one `ESC [ ... m` sequence, left to right
    fn apply_sgr(&mut self, params: &Params) {
        if params.is_empty() {
            self.reset();
            return;
        }

        let mut iter = params.iter();
        while let Some(param) = iter.next() {
            let code = param.first().copied().unwrap_or(0);
            match code {
                0 => self.reset(),
                1 => self.bold = true,
                3 => self.italic = true,
                4 => self.underline = true,
                22 => self.bold = false,
                23 => self.italic = false,
                24 => self.underline = false,
                30..=37 => self.foreground = AnsiColor::from_ansi_code(code - 30),
                38 => {
                    if let Some(color) = extended_color(param, &mut iter) {
                        self.foreground = Some(color);
                    }
                }
                39 => self.foreground = None,
                40..=47 => self.background = AnsiColor::from_ansi_code(code - 40),
                48 => {
                    if let Some(color) = extended_color(param, &mut iter) {
                        self.background = Some(color);
                    }
                }
                49 => self.background = None,
                90..=97 => self.foreground = AnsiColor::from_bright_ansi_code(code - 90),
                100..=107 => self.background = AnsiColor::from_bright_ansi_code(code - 100),
                _ => {
                    // Unknown codes are consumed and ignored
                }
            }
        }
    }

    /// SGR parameter list that recreates this state from a reset
    pub fn sgr_params(&self) -> Vec<String> {
        let mut codes = Vec::new();
        if self.bold {
            codes.push("1".to_string());
        }
        if self.italic {
            codes.push("3".to_string());
        }
        if self.underline {
            codes.push("4".to_string());
        }
        if let Some(fg) = self.foreground {
            codes.push(fg.sgr_params(false));
        }
        if let Some(bg) = self.background {
            codes.push(bg.sgr_params(true));
        }
        codes
    }
}

/// Decode the arguments of `38`/`48`, in semicolon or colon form.
///
/// Arguments are always consumed from `rest`, even when they turn out to be
/// invalid, so they never get interpreted as attributes of their own.
fn extended_color<'a>(
    param: &[u16],
    rest: &mut impl Iterator<Item = &'a [u16]>,
) -> Option<AnsiColor> {
    if param.len() > 1 {
        // 38:5:n, 38:2:r:g:b or 38:2:colorspace:r:g:b
        return match param[1] {
            5 => param.get(2).map(|&n| AnsiColor::Indexed(to_channel(n))),
            2 => {
                let channels = if param.len() >= 6 {
                    &param[3..6]
                } else {
                    param.get(2..5)?
                };
                Some(AnsiColor::Rgb(
                    to_channel(channels[0]),
                    to_channel(channels[1]),
                    to_channel(channels[2]),
                ))
            }
            _ => None,
        };
    }

    let mut next_value = || rest.next().and_then(|p| p.first().copied());
    match next_value()? {
        5 => next_value().map(|n| AnsiColor::Indexed(to_channel(n))),
        2 => {
            let r = next_value();
            let g = next_value();
            let b = next_value();
            match (r, g, b) {
                (Some(r), Some(g), Some(b)) => Some(AnsiColor::Rgb(
                    to_channel(r),
                    to_channel(g),
                    to_channel(b),
                )),
                _ => None,
            }
        }
        _ => None,
    }
}

/// A contiguous span of text sharing one style
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledRun {
    pub text: String,
    pub foreground: Option<AnsiColor>,
    pub background: Option<AnsiColor>,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

impl StyledRun {
    /// Run with default styling
    pub fn plain(text: impl Into<String>) -> Self {
        Self::styled(text, &SgrState::default())
    }

    /// Run carrying a snapshot of `state`
    pub fn styled(text: impl Into<String>, state: &SgrState) -> Self {
        Self {
            text: text.into(),
            foreground: state.foreground,
            background: state.background,
            bold: state.bold,
            italic: state.italic,
            underline: state.underline,
        }
    }

    /// The style of this run
    pub fn style(&self) -> SgrState {
        SgrState {
            foreground: self.foreground,
            background: self.background,
            bold: self.bold,
            italic: self.italic,
            underline: self.underline,
        }
    }

    /// Re-encode the run as text with SGR sequences, closed by a reset
    pub fn to_ansi_string(&self) -> String {
        let style = self.style();
        if style.is_default() {
            return self.text.clone();
        }
        format!("\x1b[{}m{}\x1b[0m", style.sgr_params().join(";"), self.text)
    }
}

/// Long-lived ANSI to styled-run converter
///
/// Holds the SGR state and the `vte` parser state between calls. A sequence
/// cut in half by a call boundary is completed by the next call instead of
/// leaking into the visible text.
pub struct AnsiRenderer {
    parser: Parser,
    state: SgrState,
    strings: StringState,
}

/// Whether the parser is inside an OSC, DCS, SOS, PM or APC string.
///
/// `vte` keeps such a string open until BEL or ST, swallowing everything in
/// between. A newline inside one closes it here instead, so a stray
/// `ESC ]` costs at most the rest of its line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum StringState {
    #[default]
    Ground,
    Escape,
    Open,
    OpenEscape,
}

impl StringState {
    fn advance(self, byte: u8) -> Self {
        use StringState::*;
        match (self, byte) {
            // CAN and SUB abort any sequence
            (_, 0x18 | 0x1a) => Ground,
            (Open, 0x1b) => OpenEscape,
            (_, 0x1b) => Escape,
            (Escape | OpenEscape, b']' | b'P' | b'X' | b'^' | b'_') => Open,
            (Open, 0x07) => Ground,
            (Open, _) => Open,
            _ => Ground,
        }
    }

    fn is_open(self) -> bool {
        self == StringState::Open
    }
}

impl AnsiRenderer {
    /// Create a renderer with default style state
    pub fn new() -> Self {
        Self {
            parser: Parser::new(),
            state: SgrState::default(),
            strings: StringState::default(),
        }
    }

    /// Current style state
    pub fn state(&self) -> SgrState {
        self.state
    }

    /// Convert `raw` into styled runs.
    ///
    /// With `plain` set, escape sequences are still scanned and removed but
    /// do not change the style, and every run uses the default style.
    pub fn append_text(&mut self, raw: &str, plain: bool) -> Vec<StyledRun> {
        let mut collector = RunCollector {
            state: &mut self.state,
            plain,
            pending: String::new(),
            runs: Vec::new(),
        };
        let bytes = raw.as_bytes();
        let mut start = 0;
        for (i, &byte) in bytes.iter().enumerate() {
            if byte == b'\n' && self.strings.is_open() {
                // Unterminated string sequence: drop it, keep the newline
                self.parser.advance(&mut collector, &bytes[start..i]);
                self.parser = Parser::new();
                start = i;
            }
            self.strings = self.strings.advance(byte);
        }
        self.parser.advance(&mut collector, &bytes[start..]);
        collector.flush();
        collector.runs
    }

    /// Drop style state and any partially received sequence
    pub fn reset(&mut self) {
        self.parser = Parser::new();
        self.strings = StringState::default();
        self.state.reset();
    }
}

impl Default for AnsiRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AnsiRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnsiRenderer")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Per-call `vte` performer that cuts text into runs at escape sequences
struct RunCollector<'a> {
    state: &'a mut SgrState,
    plain: bool,
    pending: String,
    runs: Vec<StyledRun>,
}

impl RunCollector<'_> {
    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.pending);
        let run = if self.plain {
            StyledRun::plain(text)
        } else {
            StyledRun::styled(text, &*self.state)
        };
        self.runs.push(run);
    }
}

impl Perform for RunCollector<'_> {
    fn print(&mut self, c: char) {
        self.pending.push(c);
    }

    fn execute(&mut self, byte: u8) {
        // Newlines, tabs and other C0 controls are text for the display
        self.pending.push(char::from(byte));
    }

    fn csi_dispatch(&mut self, params: &Params, intermediates: &[u8], ignore: bool, action: char) {
        self.flush();
        if self.plain || ignore || action != 'm' || !intermediates.is_empty() {
            return;
        }
        self.state.apply_sgr(params);
    }

    fn esc_dispatch(&mut self, _intermediates: &[u8], _ignore: bool, _byte: u8) {
        self.flush();
    }

    fn osc_dispatch(&mut self, _params: &[&[u8]], _bell_terminated: bool) {
        self.flush();
    }

    fn hook(&mut self, _params: &Params, _intermediates: &[u8], _ignore: bool, _action: char) {
        self.flush();
    }
}

/// Remove escape sequences from `raw` without any state carried over
pub fn strip_ansi(raw: &str) -> String {
    AnsiRenderer::new()
        .append_text(raw, true)
        .into_iter()
        .map(|run| run.text)
        .collect()
}
