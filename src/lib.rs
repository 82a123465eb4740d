//! ansiview
//!
//! Renders legacy CP437 "ANSI art" files on a modern UTF-8 terminal. This
//! crate provides the core pipeline behind the CLI:
//!
//! - `codepage`: CP437 byte to Unicode glyph mapping
//! - `sauce`: trailing SAUCE metadata detection and decoding
//! - `parser`: escape-sequence state machine over the art byte stream
//! - `interp`: cursor/attribute tracking, emitting terminal operations
//! - `op`: the terminal operation types
//! - `render`: op application, baud-rate pacing, cancellation
//! - `screensaver`: unattended directory cycling
//!
//! Data flow: raw file bytes -> SAUCE detection (bounds the art region) ->
//! interpreter (via the codepage) -> ordered terminal ops -> renderer.

pub mod codepage;
pub mod interp;
pub mod op;
pub mod parser;
pub mod render;
pub mod sauce;
pub mod screensaver;

pub use codepage::enumerate as show_codepage;
pub use render::{render_art, CancelToken, RenderError, RenderOptions};
pub use sauce::{show_metadata, SauceError, SauceRecord};
pub use screensaver::screensaver;
