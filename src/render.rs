//! Renderer and Pacer
//!
//! Applies the interpreter's op stream to the output terminal, optionally
//! throttled to an emulated serial line rate. This is the only module
//! besides `main` with observable I/O; everything is written through an
//! injected `io::Write` sink so tests can capture the byte stream.
//!
//! The renderer brackets each work: terminal auto-wrap is switched off and
//! the cursor hidden for the duration, and wrap, cursor, and graphics
//! state are restored on every exit path, including cancellation.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};

use crate::interp::Interpreter;
use crate::op::{Attributes, Color, TerminalOp};
use crate::sauce;

/// Default line rate: the 110 bps acoustic-coupler rate this tool has
/// always defaulted to. Art draws the way it did over a phone line.
pub const DEFAULT_SPEED_BPS: u32 = 110;
/// Speed sentinel that disables pacing entirely.
pub const UNLIMITED_SPEED: u32 = 0;
/// Default terminal width in columns.
pub const DEFAULT_WIDTH: u16 = 80;
/// Narrowest width the renderer accepts. Art assumes 80 columns; anything
/// narrower shreds it.
pub const MIN_WIDTH: u16 = 80;

/// One glyph costs a full 8-N-1 serial frame on the emulated line.
const BITS_PER_GLYPH: u64 = 10;
/// Sub-millisecond per-glyph delays accumulate until at least this much is
/// owed, keeping pacing accurate at high rates where individual sleeps
/// would be dominated by scheduler noise.
const SLEEP_BATCH: Duration = Duration::from_millis(2);
/// Longest uninterruptible sleep slice; cancellation latency is bounded by
/// this regardless of the configured rate.
const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Errors from rendering. Malformed art content is never an error; only
/// configuration and file I/O propagate (format leniency is handled by the
/// parser and SAUCE detection).
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("terminal width {width} is below the minimum of {min} columns", min = MIN_WIDTH)]
    WidthTooSmall { width: u16 },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write to the terminal: {0}")]
    Output(#[source] io::Error),

    #[error("no files to render in {path}")]
    NoArtFiles { path: PathBuf },
}

/// Shared cancellation flag, flipped from a signal handler and polled at
/// every emitted op.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Safe from a signal handler.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Validated rendering configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Emulated line rate in bits per second; [`UNLIMITED_SPEED`] disables
    /// pacing.
    pub speed_bps: u32,
    /// Wrap width in columns, at least [`MIN_WIDTH`].
    pub width: u16,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            speed_bps: DEFAULT_SPEED_BPS,
            width: DEFAULT_WIDTH,
        }
    }
}

impl RenderOptions {
    /// Reject configurations the renderer cannot honor. Called before any
    /// output is written.
    pub fn validate(&self) -> Result<(), RenderError> {
        if self.width < MIN_WIDTH {
            return Err(RenderError::WidthTooSmall { width: self.width });
        }
        Ok(())
    }
}

/// Computes inter-glyph delays for an emulated line rate.
#[derive(Debug)]
pub struct Pacer {
    per_glyph: Duration,
    pending: Duration,
}

impl Pacer {
    pub fn new(speed_bps: u32) -> Self {
        let per_glyph = if speed_bps == UNLIMITED_SPEED {
            Duration::ZERO
        } else {
            Duration::from_nanos(BITS_PER_GLYPH * 1_000_000_000 / speed_bps as u64)
        };
        Self {
            per_glyph,
            pending: Duration::ZERO,
        }
    }

    /// The emulated transmission time of one glyph.
    pub fn delay_per_glyph(&self) -> Duration {
        self.per_glyph
    }

    /// Account one emitted glyph. Returns the duration to sleep now, if
    /// enough delay has accumulated to be worth a syscall.
    pub fn on_glyph(&mut self) -> Option<Duration> {
        if self.per_glyph.is_zero() {
            return None;
        }
        self.pending += self.per_glyph;
        if self.pending >= SLEEP_BATCH {
            Some(std::mem::take(&mut self.pending))
        } else {
            None
        }
    }
}

/// Sleep in bounded slices so a pending SIGINT is honored promptly.
pub(crate) fn sleep_cancellable(total: Duration, cancel: &CancelToken) {
    let mut remaining = total;
    while !remaining.is_zero() && !cancel.is_cancelled() {
        let slice = remaining.min(SLEEP_SLICE);
        std::thread::sleep(slice);
        remaining -= slice;
    }
}

/// Emit the SGR sequence for a full attribute set, reset-first so the
/// result is independent of whatever state the terminal was in.
fn write_sgr<W: Write>(out: &mut W, attrs: &Attributes) -> io::Result<()> {
    let mut params = String::from("0");
    if attrs.bold {
        params.push_str(";1");
    }
    if attrs.blink {
        params.push_str(";5");
    }
    if attrs.inverse {
        params.push_str(";7");
    }
    match attrs.fg {
        Color::Default => {}
        Color::Indexed(i @ 0..=7) => params.push_str(&format!(";{}", 30 + i as u16)),
        Color::Indexed(i @ 8..=15) => params.push_str(&format!(";{}", 90 + (i - 8) as u16)),
        Color::Indexed(i) => params.push_str(&format!(";38;5;{i}")),
    }
    match attrs.bg {
        Color::Default => {}
        Color::Indexed(i @ 0..=7) => params.push_str(&format!(";{}", 40 + i as u16)),
        Color::Indexed(i @ 8..=15) => params.push_str(&format!(";{}", 100 + (i - 8) as u16)),
        Color::Indexed(i) => params.push_str(&format!(";48;5;{i}")),
    }
    write!(out, "\x1b[{params}m")
}

/// Write one op to the output stream as real escape sequences.
fn apply_op<W: Write>(out: &mut W, op: &TerminalOp) -> io::Result<()> {
    match op {
        TerminalOp::WriteGlyph(c, _) => write!(out, "{c}"),
        TerminalOp::MoveCursor { row, col } => {
            write!(out, "\x1b[{};{}H", row + 1, col + 1)
        }
        TerminalOp::CursorUp(n) => write!(out, "\x1b[{n}A"),
        TerminalOp::CursorDown(n) => write!(out, "\x1b[{n}B"),
        TerminalOp::CursorForward(n) => write!(out, "\x1b[{n}C"),
        TerminalOp::CursorBack(n) => write!(out, "\x1b[{n}D"),
        TerminalOp::ClearScreen(mode) => write!(out, "\x1b[{}J", mode.param()),
        TerminalOp::ClearLine(mode) => write!(out, "\x1b[{}K", mode.param()),
        TerminalOp::SetAttributes(attrs) => write_sgr(out, attrs),
        TerminalOp::LineBreak => writeln!(out),
    }
}

/// Disable auto-wrap and hide the cursor for the duration of a work.
fn enter_render_state<W: Write>(out: &mut W) -> io::Result<()> {
    write!(out, "\x1b[0m\x1b[?7l\x1b[?25l")
}

/// Restore wrap, cursor, and graphics state.
fn leave_render_state<W: Write>(out: &mut W) -> io::Result<()> {
    write!(out, "\x1b[0m\x1b[?25h\x1b[?7h")?;
    writeln!(out)?;
    out.flush()
}

/// Render one art file to an arbitrary sink.
///
/// The SAUCE boundary is honored: bytes past the detected art length are
/// never interpreted. Cancellation mid-stream restores terminal state and
/// returns `Ok` (it is a termination, not a failure).
pub fn render_to<W: Write>(
    path: &Path,
    options: &RenderOptions,
    cancel: &CancelToken,
    out: &mut W,
) -> Result<(), RenderError> {
    options.validate()?;

    let bytes = std::fs::read(path).map_err(|source| RenderError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let (art_len, record) = sauce::detect(&bytes);
    match &record {
        Some(rec) => info!(
            "Rendering {} ({} art bytes, SAUCE: {})",
            path.display(),
            art_len,
            rec.title
        ),
        None => debug!("Rendering {} ({} art bytes, no SAUCE)", path.display(), art_len),
    }

    let mut interp = Interpreter::new(options.width);
    let ops = interp.process(&bytes[..art_len]);

    let mut pacer = Pacer::new(options.speed_bps);
    enter_render_state(out).map_err(RenderError::Output)?;

    for op in &ops {
        if cancel.is_cancelled() {
            info!("Render of {} cancelled", path.display());
            break;
        }
        apply_op(out, op).map_err(RenderError::Output)?;
        if op.is_glyph() {
            if let Some(delay) = pacer.on_glyph() {
                out.flush().map_err(RenderError::Output)?;
                sleep_cancellable(delay, cancel);
            }
        }
    }

    leave_render_state(out).map_err(RenderError::Output)?;
    Ok(())
}

/// Full pipeline entry point: read, detect, interpret, pace, write to
/// stdout.
pub fn render_art(
    path: &Path,
    options: &RenderOptions,
    cancel: &CancelToken,
) -> Result<(), RenderError> {
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    render_to(path, options, cancel, &mut out)
}
