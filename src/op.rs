//! Terminal Operations
//!
//! The typed operation stream produced by the interpreter and consumed by
//! the renderer. Each op corresponds to one observable effect on the
//! output terminal.

use serde::{Deserialize, Serialize};

/// A single terminal-write operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminalOp {
    /// Print one glyph at the current cursor position with the given
    /// attributes. The glyph is already codepage-mapped to Unicode.
    WriteGlyph(char, Attributes),

    /// Move the cursor to an absolute position (0-based row/column).
    MoveCursor { row: u16, col: u16 },

    /// Move the cursor up by `n` rows.
    CursorUp(u16),
    /// Move the cursor down by `n` rows.
    CursorDown(u16),
    /// Move the cursor forward (right) by `n` columns.
    CursorForward(u16),
    /// Move the cursor backward (left) by `n` columns.
    CursorBack(u16),

    /// Erase all or part of the display.
    ClearScreen(EraseMode),
    /// Erase all or part of the current line.
    ClearLine(EraseMode),

    /// Replace the current graphics attributes.
    SetAttributes(Attributes),

    /// Advance to the start of the next line.
    LineBreak,
}

impl TerminalOp {
    /// Check if this op prints a glyph
    pub fn is_glyph(&self) -> bool {
        matches!(self, TerminalOp::WriteGlyph(..))
    }

    /// Check if this op moves the cursor (relative or absolute)
    pub fn is_cursor_move(&self) -> bool {
        matches!(
            self,
            TerminalOp::MoveCursor { .. }
                | TerminalOp::CursorUp(_)
                | TerminalOp::CursorDown(_)
                | TerminalOp::CursorForward(_)
                | TerminalOp::CursorBack(_)
        )
    }
}

/// Which part of the display or line an erase op covers.
///
/// The numeric CSI parameter maps 0/1/2; out-of-range values are dropped
/// before an op is ever built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EraseMode {
    /// From the cursor to the end (CSI 0)
    ToEnd,
    /// From the start to the cursor (CSI 1)
    ToStart,
    /// Everything (CSI 2)
    All,
}

impl EraseMode {
    /// Map a CSI erase parameter. Values above 2 are unsupported.
    pub fn from_param(param: u16) -> Option<Self> {
        match param {
            0 => Some(EraseMode::ToEnd),
            1 => Some(EraseMode::ToStart),
            2 => Some(EraseMode::All),
            _ => None,
        }
    }

    /// The CSI parameter value for this mode.
    pub fn param(&self) -> u16 {
        match self {
            EraseMode::ToEnd => 0,
            EraseMode::ToStart => 1,
            EraseMode::All => 2,
        }
    }
}

/// Color for a glyph cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Color {
    /// Default terminal color (foreground or background)
    Default,
    /// Indexed palette color. 0-7 from SGR 30-37/40-47, 8-15 from the
    /// bright ranges, 16-255 from extended 38;5/48;5 sequences.
    Indexed(u8),
}

impl Default for Color {
    fn default() -> Self {
        Color::Default
    }
}

impl Color {
    /// Standard ANSI colors (0-7)
    pub const BLACK: Color = Color::Indexed(0);
    pub const RED: Color = Color::Indexed(1);
    pub const GREEN: Color = Color::Indexed(2);
    pub const YELLOW: Color = Color::Indexed(3);
    pub const BLUE: Color = Color::Indexed(4);
    pub const MAGENTA: Color = Color::Indexed(5);
    pub const CYAN: Color = Color::Indexed(6);
    pub const WHITE: Color = Color::Indexed(7);
}

/// Graphics attributes carried by every printed glyph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    pub fg: Color,
    pub bg: Color,
    pub bold: bool,
    pub blink: bool,
    pub inverse: bool,
}

impl Attributes {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Check if these are the default attributes
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}
