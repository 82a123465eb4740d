//! End-to-end tests for the render pipeline
//!
//! Each test builds a real art file on disk, runs it through the public
//! entry points, and checks the op stream or the emitted terminal bytes.

use std::path::PathBuf;

use ansiview::interp::Interpreter;
use ansiview::op::{Attributes, Color, TerminalOp};
use ansiview::render::{render_to, CancelToken, RenderOptions, UNLIMITED_SPEED};
use ansiview::{sauce, show_metadata};

fn write_art(dir: &tempfile::TempDir, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

/// A syntactically valid SAUCE record with the given title and a correct
/// FileSize, no comments.
fn sauce_tail(title: &str, art_len: usize) -> Vec<u8> {
    let mut rec = vec![0u8; sauce::RECORD_SIZE];
    rec[0..5].copy_from_slice(b"SAUCE");
    rec[5..7].copy_from_slice(b"00");
    let mut field = [b' '; 35];
    field[..title.len()].copy_from_slice(title.as_bytes());
    rec[7..42].copy_from_slice(&field);
    rec[90..94].copy_from_slice(&(art_len as u32).to_le_bytes());
    rec[94] = 1;
    rec[95] = 1;
    rec
}

#[test]
fn plain_ascii_renders_as_five_glyphs() {
    // A file containing only "HELLO": five glyph ops with default
    // attributes, no cursor moves, nothing else.
    let mut interp = Interpreter::new(80);
    let ops = interp.process(b"HELLO");

    assert_eq!(ops.len(), 5);
    let expected: Vec<TerminalOp> = "HELLO"
        .chars()
        .map(|c| TerminalOp::WriteGlyph(c, Attributes::default()))
        .collect();
    assert_eq!(ops, expected);
    assert!(!ops.iter().any(|op| op.is_cursor_move()));
}

#[test]
fn sauce_tail_is_detected_and_bounded() {
    let dir = tempfile::tempdir().unwrap();
    let mut bytes = b"HELLO".to_vec();
    bytes.extend_from_slice(&sauce_tail("TESTART", 5));
    let path = write_art(&dir, "titled.ans", &bytes);

    let record = show_metadata(&path).unwrap();
    assert_eq!(record.title, "TESTART");

    let file_bytes = std::fs::read(&path).unwrap();
    let (art_len, detected) = sauce::detect(&file_bytes);
    assert!(detected.is_some());
    assert_eq!(art_len, file_bytes.len() - sauce::RECORD_SIZE);
}

#[test]
fn no_glyph_ops_beyond_art_length() {
    let mut bytes = b"AB".to_vec();
    bytes.extend_from_slice(&sauce_tail("X", 2));

    let (art_len, _) = sauce::detect(&bytes);
    let mut interp = Interpreter::new(80);
    let ops = interp.process(&bytes[..art_len]);

    let glyphs: Vec<_> = ops.iter().filter(|op| op.is_glyph()).collect();
    assert_eq!(glyphs.len(), 2);
}

#[test]
fn foreground_escape_attributes_following_glyphs() {
    // ESC[34m then two glyphs: one SetAttributes op, then exactly two
    // glyph ops carrying fg=4.
    let mut interp = Interpreter::new(80);
    let ops = interp.process(b"\x1b[34mOK");

    let blue = Attributes {
        fg: Color::Indexed(4),
        ..Default::default()
    };
    assert_eq!(
        ops,
        vec![
            TerminalOp::SetAttributes(blue),
            TerminalOp::WriteGlyph('O', blue),
            TerminalOp::WriteGlyph('K', blue),
        ]
    );
}

#[test]
fn rendered_file_reaches_the_sink() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_art(&dir, "hello.ans", b"\x1b[2J\x1b[1;34mHELLO\x1b[0m");

    let options = RenderOptions {
        speed_bps: UNLIMITED_SPEED,
        ..Default::default()
    };
    let cancel = CancelToken::new();
    let mut out = Vec::new();
    render_to(&path, &options, &cancel, &mut out).unwrap();

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("HELLO"));
    assert!(text.contains("\x1b[2J"));
    assert!(text.contains("\x1b[0;1;34m"));
}

#[test]
fn full_width_line_emits_single_break() {
    let dir = tempfile::tempdir().unwrap();
    let row: Vec<u8> = vec![0xDB; 81];
    let path = write_art(&dir, "row.ans", &row);

    let options = RenderOptions {
        speed_bps: UNLIMITED_SPEED,
        ..Default::default()
    };
    let cancel = CancelToken::new();
    let mut out = Vec::new();
    render_to(&path, &options, &cancel, &mut out).unwrap();

    let text = String::from_utf8(out).unwrap();
    // 80 blocks, the implicit break, the 81st block, then the closing
    // restore line
    let body = text.trim_start_matches("\x1b[0m\x1b[?7l\x1b[?25l");
    let first_line = body.lines().next().unwrap();
    assert_eq!(first_line.chars().filter(|&c| c == '\u{2588}').count(), 80);
    assert_eq!(text.matches('\u{2588}').count(), 81);
}

#[test]
fn malformed_sequences_never_fail_a_render() {
    let dir = tempfile::tempdir().unwrap();
    // Truncated CSI at EOF, unknown verb, oversized params, stray ESC
    let path = write_art(
        &dir,
        "mangled.ans",
        b"A\x1b[999999999999mB\x1b[zC\x1bQD\x1b[12;34",
    );

    let options = RenderOptions {
        speed_bps: UNLIMITED_SPEED,
        ..Default::default()
    };
    let cancel = CancelToken::new();
    let mut out = Vec::new();
    render_to(&path, &options, &cancel, &mut out).unwrap();

    let text = String::from_utf8(out).unwrap();
    for glyph in ["A", "B", "C", "D"] {
        assert!(text.contains(glyph), "missing {glyph} in {text:?}");
    }
}
