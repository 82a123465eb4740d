//! Art Stream Interpreter
//!
//! Drives the parser over the art byte region and turns its actions into
//! an ordered stream of [`TerminalOp`]s, tracking cursor position and
//! graphics attributes along the way. One instance per render; never
//! shared, never fails.
//!
//! Cursor coordinates are 0-based. The column is bounded by the configured
//! width and wraps with an implicit line break; the row only grows (the
//! output terminal scrolls). Every parameter is clamped to its command's
//! valid range before an op is built, so no input can move the cursor out
//! of bounds.

use tracing::debug;

use crate::codepage;
use crate::op::{Attributes, Color, EraseMode, TerminalOp};
use crate::parser::{Action, CsiAction, Parser};

/// Tab stops every 8 columns, DOS convention.
const TAB_WIDTH: u16 = 8;

/// Interprets the art byte stream into terminal operations.
#[derive(Debug)]
pub struct Interpreter {
    parser: Parser,
    width: u16,
    row: u16,
    col: u16,
    attrs: Attributes,
    saved_cursor: Option<(u16, u16)>,
}

impl Interpreter {
    /// Create a fresh interpreter for one render at the given width.
    pub fn new(width: u16) -> Self {
        Self {
            parser: Parser::new(),
            width: width.max(1),
            row: 0,
            col: 0,
            attrs: Attributes::default(),
            saved_cursor: None,
        }
    }

    /// Configured wrap width in columns.
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Current cursor position (row, col), 0-based.
    pub fn cursor(&self) -> (u16, u16) {
        (self.row, self.col)
    }

    /// Current graphics attributes.
    pub fn attributes(&self) -> Attributes {
        self.attrs
    }

    /// Process an entire art byte region into an op stream.
    pub fn process(&mut self, bytes: &[u8]) -> Vec<TerminalOp> {
        let mut ops = Vec::with_capacity(bytes.len());
        self.advance(bytes, &mut ops);
        ops
    }

    /// Incremental form of [`process`](Self::process); handles arbitrary
    /// chunk boundaries, appending ops as they complete.
    pub fn advance(&mut self, bytes: &[u8], ops: &mut Vec<TerminalOp>) {
        for &byte in bytes {
            if let Some(action) = self.parser.process_byte(byte) {
                self.apply(action, ops);
            }
        }
    }

    fn apply(&mut self, action: Action, ops: &mut Vec<TerminalOp>) {
        match action {
            Action::Print(byte) => self.write_glyph(byte, ops),
            Action::Execute(byte) => self.execute(byte, ops),
            Action::CsiDispatch(csi) => self.apply_csi(&csi, ops),
        }
    }

    fn write_glyph(&mut self, byte: u8, ops: &mut Vec<TerminalOp>) {
        ops.push(TerminalOp::WriteGlyph(codepage::map(byte), self.attrs));
        self.col += 1;
        if self.col >= self.width {
            self.line_break(ops);
        }
    }

    fn line_break(&mut self, ops: &mut Vec<TerminalOp>) {
        ops.push(TerminalOp::LineBreak);
        self.col = 0;
        self.row = self.row.saturating_add(1);
    }

    fn execute(&mut self, byte: u8, ops: &mut Vec<TerminalOp>) {
        match byte {
            // LF
            0x0A => self.line_break(ops),
            // CR: column zero, expressed relative so the renderer does not
            // need to know the output terminal's absolute row
            0x0D => {
                if self.col > 0 {
                    ops.push(TerminalOp::CursorBack(self.col));
                    self.col = 0;
                }
            }
            // HT: next 8-column stop, no wrap
            0x09 => {
                let stop = (self.col / TAB_WIDTH + 1) * TAB_WIDTH;
                let target = stop.min(self.width - 1);
                if target > self.col {
                    ops.push(TerminalOp::CursorForward(target - self.col));
                    self.col = target;
                }
            }
            // BS
            0x08 => {
                if self.col > 0 {
                    ops.push(TerminalOp::CursorBack(1));
                    self.col -= 1;
                }
            }
            // Remaining C0 bytes (BEL, SO/SI, the stray NUL) do nothing
            _ => {}
        }
    }

    fn apply_csi(&mut self, csi: &CsiAction, ops: &mut Vec<TerminalOp>) {
        if csi.private {
            debug!("Discarding private CSI sequence: {}", csi.final_byte as char);
            return;
        }

        match csi.final_byte {
            b'A' => {
                let n = csi.count_or_one(0).min(self.row);
                if n > 0 {
                    ops.push(TerminalOp::CursorUp(n));
                    self.row -= n;
                }
            }
            b'B' => {
                let n = csi.count_or_one(0);
                ops.push(TerminalOp::CursorDown(n));
                self.row = self.row.saturating_add(n);
            }
            b'C' => {
                let n = csi.count_or_one(0).min(self.width - 1 - self.col);
                if n > 0 {
                    ops.push(TerminalOp::CursorForward(n));
                    self.col += n;
                }
            }
            b'D' => {
                let n = csi.count_or_one(0).min(self.col);
                if n > 0 {
                    ops.push(TerminalOp::CursorBack(n));
                    self.col -= n;
                }
            }
            // CUP; params are 1-based
            b'H' | b'f' => {
                let row = csi.count_or_one(0) - 1;
                let col = (csi.count_or_one(1) - 1).min(self.width - 1);
                self.row = row;
                self.col = col;
                ops.push(TerminalOp::MoveCursor { row, col });
            }
            b'J' => match EraseMode::from_param(csi.param_or(0, 0)) {
                Some(mode) => {
                    ops.push(TerminalOp::ClearScreen(mode));
                    if mode == EraseMode::All {
                        // ANSI.SYS homes the cursor on a full clear, and
                        // art files draw assuming it does
                        self.row = 0;
                        self.col = 0;
                        ops.push(TerminalOp::MoveCursor { row: 0, col: 0 });
                    }
                }
                None => debug!("Unsupported erase-display mode: {}", csi.param_or(0, 0)),
            },
            b'K' => match EraseMode::from_param(csi.param_or(0, 0)) {
                Some(mode) => ops.push(TerminalOp::ClearLine(mode)),
                None => debug!("Unsupported erase-line mode: {}", csi.param_or(0, 0)),
            },
            b'm' => {
                self.apply_sgr(&csi.params);
                ops.push(TerminalOp::SetAttributes(self.attrs));
            }
            b's' => {
                self.saved_cursor = Some((self.row, self.col));
            }
            b'u' => {
                if let Some((row, col)) = self.saved_cursor {
                    self.row = row;
                    self.col = col;
                    ops.push(TerminalOp::MoveCursor { row, col });
                }
            }
            final_byte => {
                debug!("Unhandled CSI verb: {}", final_byte as char);
            }
        }
    }

    fn apply_sgr(&mut self, params: &[u16]) {
        if params.is_empty() {
            self.attrs.reset();
            return;
        }

        let mut i = 0;
        while i < params.len() {
            match params[i] {
                0 => self.attrs.reset(),
                1 => self.attrs.bold = true,
                5 | 6 => self.attrs.blink = true,
                7 => self.attrs.inverse = true,
                22 => self.attrs.bold = false,
                25 => self.attrs.blink = false,
                27 => self.attrs.inverse = false,
                30..=37 => self.attrs.fg = Color::Indexed((params[i] - 30) as u8),
                38 => {
                    if let Some(color) = parse_extended_color(params, &mut i) {
                        self.attrs.fg = color;
                    }
                }
                39 => self.attrs.fg = Color::Default,
                40..=47 => self.attrs.bg = Color::Indexed((params[i] - 40) as u8),
                48 => {
                    if let Some(color) = parse_extended_color(params, &mut i) {
                        self.attrs.bg = color;
                    }
                }
                49 => self.attrs.bg = Color::Default,
                90..=97 => self.attrs.fg = Color::Indexed((params[i] - 90 + 8) as u8),
                100..=107 => self.attrs.bg = Color::Indexed((params[i] - 100 + 8) as u8),
                other => debug!("Ignoring SGR parameter: {}", other),
            }
            i += 1;
        }
    }
}

/// Parse a 38;5;n / 48;5;n extended color group, advancing `i` past it.
/// True-color 38;2 groups are consumed but unsupported by the palette.
fn parse_extended_color(params: &[u16], i: &mut usize) -> Option<Color> {
    match params.get(*i + 1) {
        Some(5) => {
            let index = *params.get(*i + 2)?;
            *i += 2;
            Some(Color::Indexed(index.min(255) as u8))
        }
        Some(2) => {
            // r;g;b follows; skip the whole group
            *i += params.len().saturating_sub(*i + 1).min(4);
            None
        }
        _ => None,
    }
}
