// Encoding-robust text ingestion.
//
// Raw bytes are run through a statistical encoding detector (chardetng) and
// decoded with encoding_rs. Undecodable sequences become U+FFFD; nothing in
// this module fails on bad input.

use std::path::{Path, PathBuf};

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};
use thiserror::Error;
use tracing::debug;

/// Prefix of the string returned by [`read_file_with_encoding`] when the file
/// cannot be read.
pub const READ_ERROR_PREFIX: &str = "\u{26a0} Error reading file: ";

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Text decoded from a byte buffer, plus what it took to get there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    /// WHATWG name of the encoding actually used (e.g. `UTF-8`, `windows-1252`).
    pub encoding: &'static str,
    /// True when at least one malformed sequence was replaced with U+FFFD.
    pub had_replacements: bool,
}

/// Guess the encoding of `bytes`.
///
/// A byte-order mark wins outright, and valid UTF-8 is always UTF-8. Otherwise
/// the detector's guess is returned only when it is confident; `None` means
/// the caller should fall back.
///
/// The detector only knows ASCII-compatible legacy encodings, so a buffer
/// holding NUL bytes (BOM-less UTF-16, binary data) gets no answer at all.
pub fn detect_encoding(bytes: &[u8]) -> Option<&'static Encoding> {
    if let Some((encoding, _bom_len)) = Encoding::for_bom(bytes) {
        return Some(encoding);
    }
    if std::str::from_utf8(bytes).is_ok() {
        return Some(UTF_8);
    }
    if bytes.contains(&0) {
        return None;
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let (guess, confident) = detector.guess_assess(None, true);
    confident.then_some(guess)
}

/// Decode `bytes` with `encoding`, or UTF-8 when `None`. Malformed sequences
/// are replaced, never rejected.
pub fn decode_as(bytes: &[u8], encoding: Option<&'static Encoding>) -> DecodedText {
    let encoding = encoding.unwrap_or(UTF_8);
    let (text, used, had_replacements) = encoding.decode(bytes);
    DecodedText {
        text: text.into_owned(),
        encoding: used.name(),
        had_replacements,
    }
}

/// Detect and decode in one step. Infallible.
pub fn decode_bytes(bytes: &[u8]) -> DecodedText {
    let detected = detect_encoding(bytes);
    let decoded = decode_as(bytes, detected);
    debug!(
        len = bytes.len(),
        confident = detected.is_some(),
        encoding = decoded.encoding,
        had_replacements = decoded.had_replacements,
        "decoded byte buffer"
    );
    decoded
}

/// Read and decode a file, surfacing I/O failures as a typed error.
pub fn try_read_file(path: &Path) -> Result<DecodedText, ReadError> {
    let bytes = std::fs::read(path).map_err(|source| ReadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(decode_bytes(&bytes))
}

/// Read a file as text, never failing: an I/O error comes back as a string
/// starting with [`READ_ERROR_PREFIX`] in place of the content.
pub fn read_file_with_encoding(path: &Path) -> String {
    match try_read_file(path) {
        Ok(decoded) => decoded.text,
        Err(e) => format!("{READ_ERROR_PREFIX}{e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn utf8_round_trips_unchanged() {
        let decoded = decode_bytes("Grüße aus Köln, 大谷翔平".as_bytes());
        assert_eq!(decoded.text, "Grüße aus Köln, 大谷翔平");
        assert_eq!(decoded.encoding, "UTF-8");
        assert!(!decoded.had_replacements);
    }

    #[test]
    fn empty_input_is_empty_utf8() {
        let decoded = decode_bytes(&[]);
        assert_eq!(decoded.text, "");
        assert_eq!(decoded.encoding, "UTF-8");
    }

    #[test]
    fn utf16le_bom_is_honoured() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "hi there".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let decoded = decode_bytes(&bytes);
        assert_eq!(decoded.encoding, "UTF-16LE");
        assert_eq!(decoded.text, "hi there");
    }

    #[test]
    fn utf8_bom_is_stripped() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"plain");
        let decoded = decode_bytes(&bytes);
        assert_eq!(decoded.text, "plain");
    }

    #[test]
    fn latin1_text_is_detected() {
        let text = "La cr\u{e8}me br\u{fb}l\u{e9}e est un dessert fran\u{e7}ais. \
                    Le caf\u{e9} de la rue est tr\u{e8}s appr\u{e9}ci\u{e9} \
                    des \u{e9}tudiants et des r\u{e9}sidents du quartier.";
        let (bytes, _, _) = encoding_rs::WINDOWS_1252.encode(text);
        assert!(std::str::from_utf8(&bytes).is_err());

        let decoded = decode_bytes(&bytes);
        assert_eq!(decoded.text, text);
        assert!(!decoded.had_replacements);
    }

    #[test]
    fn fallback_is_utf8_with_replacement() {
        let decoded = decode_as(b"abc\x80\xFFdef", None);
        assert_eq!(decoded.encoding, "UTF-8");
        assert!(decoded.had_replacements);
        assert_eq!(decoded.text, "abc\u{FFFD}\u{FFFD}def");
    }

    #[test]
    fn garbage_bytes_always_decode() {
        let bytes: Vec<u8> = (0..=255u8).cycle().take(2048).collect();
        let decoded = decode_bytes(&bytes);
        assert!(!decoded.text.is_empty());
    }

    #[test]
    fn undetectable_bytes_fall_back_to_utf8() {
        let bytes = b"ab\x00\xFF\x00cd";
        assert!(detect_encoding(bytes).is_none());

        let decoded = decode_bytes(bytes);
        assert_eq!(decoded.encoding, "UTF-8");
        assert!(decoded.had_replacements);
        assert_eq!(decoded.text, "ab\0\u{FFFD}\0cd");
    }

    #[test]
    fn read_file_with_encoding_reads_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.txt");
        fs::write(&path, "hello from disk").unwrap();
        assert_eq!(read_file_with_encoding(&path), "hello from disk");
    }

    #[test]
    fn read_file_with_encoding_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does-not-exist.txt");
        let text = read_file_with_encoding(&path);
        assert!(text.starts_with(READ_ERROR_PREFIX), "got {text:?}");
        assert!(text.contains("does-not-exist.txt"));
    }

    #[test]
    fn try_read_file_returns_typed_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = try_read_file(&dir.path().join("missing")).unwrap_err();
        let ReadError::Io { source, .. } = err;
        assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
    }
}
