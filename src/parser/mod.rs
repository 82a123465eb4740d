//! Escape sequence parser
//!
//! A stateful parser that converts raw art bytes into low-level actions.
//! Follows the VT500-series state machine model, reduced to the grammar
//! ANSI art actually uses: CP437 ground bytes, C0 controls, and CSI
//! sequences. High bytes (0x80-0xFF) are art glyphs here, never C1
//! controls.

mod actions;
mod state;

pub use actions::{Action, CsiAction};
pub use state::Parser;
