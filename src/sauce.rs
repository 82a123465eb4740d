//! SAUCE Metadata
//!
//! Parser for the SAUCE v00 record: a fixed 128-byte block appended to the
//! end of an art file, optionally preceded by a comment block. Detection
//! splits a file into the art byte region and the metadata so the
//! interpreter never renders metadata bytes as art.
//!
//! Layout (offsets within the 128-byte record):
//!
//! | field    | offset | width |
//! |----------|--------|-------|
//! | ID       | 0      | 5     |
//! | Version  | 5      | 2     |
//! | Title    | 7      | 35    |
//! | Author   | 42     | 20    |
//! | Group    | 62     | 20    |
//! | Date     | 82     | 8     |
//! | FileSize | 90     | 4     |
//! | DataType | 94     | 1     |
//! | FileType | 95     | 1     |
//! | TInfo1-4 | 96     | 2 x 4 |
//! | Comments | 104    | 1     |
//! | TFlags   | 105    | 1     |
//! | TInfoS   | 106    | 22    |
//!
//! The comment block is `COMNT` followed by `Comments` 64-byte lines,
//! sitting immediately before the record.

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::codepage;

/// Size of the fixed trailing record.
pub const RECORD_SIZE: usize = 128;
/// Width of one comment line.
pub const COMMENT_LINE_SIZE: usize = 64;

const SAUCE_ID: &[u8; 5] = b"SAUCE";
const COMMENT_ID: &[u8; 5] = b"COMNT";
const COMMENT_ID_SIZE: usize = 5;

/// DOS end-of-file marker conventionally written between the art content
/// and the metadata block. Not art.
const EOF_MARKER: u8 = 0x1A;

/// TFlags bit 0: background colors do not blink (ice colors).
const FLAG_NON_BLINK: u8 = 0b0000_0001;
/// TFlags bits 1-2: letter spacing.
const MASK_LETTER_SPACING: u8 = 0b0000_0110;

/// Errors from the metadata entry points. Absence of a record is reported
/// here as an error kind so the CLI can show a one-line diagnostic; `detect`
/// itself never fails.
#[derive(Debug, Error)]
pub enum SauceError {
    #[error("no SAUCE record in {path}")]
    Absent { path: PathBuf },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Letter spacing hint from TFlags bits 1-2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LetterSpacing {
    Legacy,
    EightPixel,
    NinePixel,
    Reserved,
}

/// A decoded SAUCE record.
///
/// Text fields are CP437 decoded with padding trimmed. Immutable once
/// constructed; a file either yields a fully decoded record or none at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SauceRecord {
    pub title: String,
    pub author: String,
    pub group: String,
    /// CCYYMMDD creation date, as written.
    pub date: String,
    /// Declared art content length in bytes.
    pub file_size: u32,
    pub data_type: u8,
    pub file_type: u8,
    /// For character art: columns.
    pub tinfo1: u16,
    /// For character art: rows.
    pub tinfo2: u16,
    pub tinfo3: u16,
    pub tinfo4: u16,
    pub comments: Vec<String>,
    pub flags: u8,
    /// Type-dependent string, for ANSI art the font name.
    pub tinfo_s: String,
}

impl SauceRecord {
    /// Background colors are non-blinking brights (ice colors).
    pub fn ice_colors(&self) -> bool {
        self.flags & FLAG_NON_BLINK != 0
    }

    /// Letter spacing hint.
    pub fn letter_spacing(&self) -> LetterSpacing {
        match (self.flags & MASK_LETTER_SPACING) >> 1 {
            0 => LetterSpacing::Legacy,
            1 => LetterSpacing::EightPixel,
            2 => LetterSpacing::NinePixel,
            _ => LetterSpacing::Reserved,
        }
    }

    /// Declared column count, when this is character art and the field is set.
    pub fn columns(&self) -> Option<u16> {
        (self.data_type == 1 && self.tinfo1 > 0).then_some(self.tinfo1)
    }

    /// Declared row count, when this is character art and the field is set.
    pub fn rows(&self) -> Option<u16> {
        (self.data_type == 1 && self.tinfo2 > 0).then_some(self.tinfo2)
    }

    /// Human-readable DataType name from the v00 standard.
    pub fn data_type_name(&self) -> &'static str {
        match self.data_type {
            0 => "None",
            1 => "Character",
            2 => "Bitmap",
            3 => "Vector",
            4 => "Audio",
            5 => "BinaryText",
            6 => "XBin",
            7 => "Archive",
            8 => "Executable",
            _ => "Unknown",
        }
    }

    /// Human-readable FileType name for character art.
    pub fn file_type_name(&self) -> &'static str {
        if self.data_type != 1 {
            return "-";
        }
        match self.file_type {
            0 => "ASCII",
            1 => "ANSI",
            2 => "ANSiMation",
            3 => "RIPScript",
            4 => "PCBoard",
            5 => "Avatar",
            6 => "HTML",
            7 => "Source",
            8 => "TundraDraw",
            _ => "Unknown",
        }
    }
}

fn read_u16_le(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn read_u32_le(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// Decode the fixed fields of a 128-byte record slice.
///
/// Returns `None` when the signature or version field does not decode as
/// advertised; a record is either whole or absent, never partial.
fn decode_record(rec: &[u8]) -> Option<SauceRecord> {
    debug_assert_eq!(rec.len(), RECORD_SIZE);

    if &rec[0..5] != SAUCE_ID {
        return None;
    }
    // Version is two ASCII digits ("00" for every record in the wild).
    if !rec[5].is_ascii_digit() || !rec[6].is_ascii_digit() {
        return None;
    }

    Some(SauceRecord {
        title: codepage::decode_field(&rec[7..42]),
        author: codepage::decode_field(&rec[42..62]),
        group: codepage::decode_field(&rec[62..82]),
        date: codepage::decode_field(&rec[82..90]),
        file_size: read_u32_le(rec, 90),
        data_type: rec[94],
        file_type: rec[95],
        tinfo1: read_u16_le(rec, 96),
        tinfo2: read_u16_le(rec, 98),
        tinfo3: read_u16_le(rec, 100),
        tinfo4: read_u16_le(rec, 102),
        comments: Vec::new(),
        flags: rec[105],
        tinfo_s: codepage::decode_field(&rec[106..128]),
    })
}

/// Decode the comment block sitting immediately before the record.
///
/// Returns the comment lines and the block's byte size, or `None` when the
/// `COMNT` signature is not where the flagged line count says it should be.
fn decode_comments(bytes: &[u8], line_count: usize) -> Option<(Vec<String>, usize)> {
    let block_size = COMMENT_ID_SIZE + line_count * COMMENT_LINE_SIZE;
    let record_start = bytes.len() - RECORD_SIZE;
    let block_start = record_start.checked_sub(block_size)?;

    if &bytes[block_start..block_start + COMMENT_ID_SIZE] != COMMENT_ID {
        return None;
    }

    let mut lines = Vec::with_capacity(line_count);
    let mut offset = block_start + COMMENT_ID_SIZE;
    for _ in 0..line_count {
        lines.push(codepage::decode_field(&bytes[offset..offset + COMMENT_LINE_SIZE]));
        offset += COMMENT_LINE_SIZE;
    }
    Some((lines, block_size))
}

/// Locate and decode a trailing SAUCE record.
///
/// Returns the art byte count and the record, if one is present. The art
/// count strictly bounds which bytes may be interpreted as art; on any
/// signature or decode mismatch the whole file is art.
pub fn detect(bytes: &[u8]) -> (usize, Option<SauceRecord>) {
    if bytes.len() < RECORD_SIZE {
        return (bytes.len(), None);
    }

    let record_start = bytes.len() - RECORD_SIZE;
    let Some(mut record) = decode_record(&bytes[record_start..]) else {
        return (bytes.len(), None);
    };

    let comment_lines = bytes[record_start + 104] as usize;
    let mut boundary = record_start;
    if comment_lines > 0 {
        match decode_comments(bytes, comment_lines) {
            Some((lines, block_size)) => {
                record.comments = lines;
                boundary -= block_size;
            }
            None => {
                // Flagged comments with no COMNT block is a downgrade, not
                // a reason to drop the record.
                warn!(
                    "SAUCE comment flag set ({} lines) but no comment block found",
                    comment_lines
                );
            }
        }
    }

    if boundary > 0 && bytes[boundary - 1] == EOF_MARKER {
        boundary -= 1;
    }

    // The declared content length wins when it is plausible; files with a
    // zero or overlong FileSize fall back to the positional boundary.
    let declared = record.file_size as usize;
    let art_len = if declared > 0 && declared <= boundary {
        declared
    } else {
        boundary
    };

    (art_len, Some(record))
}

/// Read a file and run detection on its contents.
pub fn read_from(path: &Path) -> Result<(Vec<u8>, usize, Option<SauceRecord>), SauceError> {
    let bytes = std::fs::read(path).map_err(|source| SauceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let (art_len, record) = detect(&bytes);
    Ok((bytes, art_len, record))
}

/// Detect-and-decode entry point for metadata display.
pub fn show_metadata(path: &Path) -> Result<SauceRecord, SauceError> {
    let (_, _, record) = read_from(path)?;
    record.ok_or_else(|| SauceError::Absent {
        path: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a file: `art` content, EOF marker, optional COMNT block, record.
    fn fixture(art: &[u8], title: &str, comments: &[&str], flag_count: Option<u8>) -> Vec<u8> {
        let mut buf = art.to_vec();
        buf.push(EOF_MARKER);

        if !comments.is_empty() {
            buf.extend_from_slice(COMMENT_ID);
            for line in comments {
                let mut field = [b' '; COMMENT_LINE_SIZE];
                field[..line.len()].copy_from_slice(line.as_bytes());
                buf.extend_from_slice(&field);
            }
        }

        let mut rec = [0u8; RECORD_SIZE];
        rec[0..5].copy_from_slice(SAUCE_ID);
        rec[5..7].copy_from_slice(b"00");
        let mut field = [b' '; 35];
        field[..title.len()].copy_from_slice(title.as_bytes());
        rec[7..42].copy_from_slice(&field);
        rec[42..62].copy_from_slice(b"An Author           ");
        rec[62..82].copy_from_slice(b"A Group             ");
        rec[82..90].copy_from_slice(b"20240225");
        rec[90..94].copy_from_slice(&(art.len() as u32).to_le_bytes());
        rec[94] = 1; // Character
        rec[95] = 1; // ANSI
        rec[96..98].copy_from_slice(&80u16.to_le_bytes());
        rec[98..100].copy_from_slice(&25u16.to_le_bytes());
        rec[104] = flag_count.unwrap_or(comments.len() as u8);
        rec[105] = 0b0000_0001; // ice colors
        buf.extend_from_slice(&rec);
        buf
    }

    #[test]
    fn test_detect_no_signature() {
        let bytes = b"just some art with no trailer".to_vec();
        let (art_len, record) = detect(&bytes);
        assert_eq!(art_len, bytes.len());
        assert!(record.is_none());
    }

    #[test]
    fn test_detect_short_file() {
        let (art_len, record) = detect(b"tiny");
        assert_eq!(art_len, 4);
        assert!(record.is_none());
    }

    #[test]
    fn test_detect_well_formed() {
        let bytes = fixture(b"HELLO ART", "TESTART", &[], None);
        let (art_len, record) = detect(&bytes);
        let record = record.expect("record present");

        assert_eq!(art_len, 9);
        assert_eq!(record.title, "TESTART");
        assert_eq!(record.author, "An Author");
        assert_eq!(record.group, "A Group");
        assert_eq!(record.date, "20240225");
        assert_eq!(record.file_size, 9);
        assert_eq!(record.data_type, 1);
        assert_eq!(record.file_type, 1);
        assert_eq!(record.columns(), Some(80));
        assert_eq!(record.rows(), Some(25));
        assert!(record.ice_colors());
        assert!(record.comments.is_empty());
    }

    #[test]
    fn test_detect_is_idempotent() {
        let bytes = fixture(b"ART", "T", &[], None);
        let first = detect(&bytes);
        let second = detect(&bytes);
        assert_eq!(first, second);
    }

    #[test]
    fn test_detect_art_length_without_filesize() {
        // FileSize of zero falls back to the positional boundary, which
        // also strips the EOF marker.
        let mut bytes = fixture(b"ABCDEF", "T", &[], None);
        let record_start = bytes.len() - RECORD_SIZE;
        bytes[record_start + 90..record_start + 94].copy_from_slice(&0u32.to_le_bytes());

        let (art_len, record) = detect(&bytes);
        assert!(record.is_some());
        assert_eq!(art_len, 6);
    }

    #[test]
    fn test_detect_implausible_filesize_falls_back() {
        let mut bytes = fixture(b"ABCDEF", "T", &[], None);
        let record_start = bytes.len() - RECORD_SIZE;
        bytes[record_start + 90..record_start + 94]
            .copy_from_slice(&(u32::MAX).to_le_bytes());

        let (art_len, _) = detect(&bytes);
        assert_eq!(art_len, 6);
    }

    #[test]
    fn test_detect_comments() {
        let bytes = fixture(b"ART", "T", &["first line", "second line"], None);
        let (art_len, record) = detect(&bytes);
        let record = record.expect("record present");

        assert_eq!(art_len, 3);
        assert_eq!(record.comments, vec!["first line", "second line"]);
    }

    #[test]
    fn test_detect_flagged_comments_missing_block() {
        // Comment count claims two lines but no COMNT block exists: the
        // record survives, comments are absent.
        let bytes = fixture(b"ART", "T", &[], Some(2));
        let (art_len, record) = detect(&bytes);
        let record = record.expect("record still present");

        assert!(record.comments.is_empty());
        assert_eq!(art_len, 3);
    }

    #[test]
    fn test_detect_bad_version_downgrades() {
        let mut bytes = fixture(b"ART", "T", &[], None);
        let record_start = bytes.len() - RECORD_SIZE;
        bytes[record_start + 5] = b'X';

        let (art_len, record) = detect(&bytes);
        assert!(record.is_none());
        assert_eq!(art_len, bytes.len());
    }

    #[test]
    fn test_detect_cp437_title() {
        // 0x8E -> A-umlaut
        let mut bytes = fixture(b"ART", "", &[], None);
        let record_start = bytes.len() - RECORD_SIZE;
        bytes[record_start + 7] = 0x8E;

        let (_, record) = detect(&bytes);
        assert_eq!(record.unwrap().title, "\u{00C4}");
    }

    #[test]
    fn test_letter_spacing_decode() {
        let mut bytes = fixture(b"ART", "T", &[], None);
        let record_start = bytes.len() - RECORD_SIZE;
        bytes[record_start + 105] = 0b0000_0100;

        let (_, record) = detect(&bytes);
        assert_eq!(record.unwrap().letter_spacing(), LetterSpacing::NinePixel);
    }

    #[test]
    fn test_show_metadata_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.ans");
        std::fs::write(&path, b"no metadata here").unwrap();

        match show_metadata(&path) {
            Err(SauceError::Absent { path: p }) => assert_eq!(p, path),
            other => panic!("expected Absent, got {other:?}"),
        }
    }

    #[test]
    fn test_show_metadata_missing_file() {
        let err = show_metadata(Path::new("/nonexistent/art.ans")).unwrap_err();
        assert!(matches!(err, SauceError::Io { .. }));
    }
}
