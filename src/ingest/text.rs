//! Plain text and source code.

use encoding_rs::{Encoding, GBK, UTF_16LE};
use std::path::Path;
use tracing::trace;

use super::{DocumentParser, IngestError, ParsedContent};

pub struct TextParser;

/// Source files are read the same way as text.
pub struct CodeParser;

impl DocumentParser for TextParser {
    fn name(&self) -> &'static str {
        "text"
    }

    fn parse(&self, path: &Path) -> Result<ParsedContent, IngestError> {
        let bytes = std::fs::read(path).map_err(|e| IngestError::read(path, e))?;
        Ok(ParsedContent::text(decode_text(&bytes)))
    }
}

impl DocumentParser for CodeParser {
    fn name(&self) -> &'static str {
        "code"
    }

    fn parse(&self, path: &Path) -> Result<ParsedContent, IngestError> {
        TextParser.parse(path)
    }
}

/// Decode with the fallback chain UTF-8, GBK, UTF-16, lossy UTF-8.
///
/// GBK is a superset of GB2312. UTF-16 honours a BOM and otherwise assumes little-endian.
pub fn decode_text(bytes: &[u8]) -> String {
    let body = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    if let Ok(s) = std::str::from_utf8(body) {
        return s.to_string();
    }

    if let Some(s) = GBK.decode_without_bom_handling_and_without_replacement(bytes) {
        trace!("decoded as GBK");
        return s.into_owned();
    }

    if let Some(s) = decode_utf16(bytes) {
        trace!("decoded as UTF-16");
        return s;
    }

    String::from_utf8_lossy(bytes).into_owned()
}

fn decode_utf16(bytes: &[u8]) -> Option<String> {
    let (encoding, body) = match Encoding::for_bom(bytes) {
        Some((enc, bom_len)) if enc != encoding_rs::UTF_8 => (enc, &bytes[bom_len..]),
        _ => (UTF_16LE, bytes),
    };
    encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .map(|s| s.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_passes_through() {
        assert_eq!(decode_text("héllo 世界".as_bytes()), "héllo 世界");
    }

    #[test]
    fn utf8_bom_is_stripped() {
        assert_eq!(decode_text(b"\xEF\xBB\xBFabc"), "abc");
    }

    #[test]
    fn gbk_fallback() {
        let (bytes, _, had_errors) = GBK.encode("股票分析");
        assert!(!had_errors);
        assert!(std::str::from_utf8(&bytes).is_err());
        assert_eq!(decode_text(&bytes), "股票分析");
    }

    #[test]
    fn utf16_with_bom() {
        // FF FE is not a valid GBK lead byte, so the chain reaches UTF-16.
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "hi 你好".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        assert_eq!(decode_text(&bytes), "hi 你好");
    }

    #[test]
    fn code_parser_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.rs");
        std::fs::write(&path, "fn main() {}\n").unwrap();
        let parsed = CodeParser.parse(&path).unwrap();
        assert_eq!(parsed.text, "fn main() {}\n");
        assert!(parsed.flags.is_empty());
    }

    #[test]
    fn missing_file() {
        let err = TextParser.parse(Path::new("/definitely/not/here.txt")).unwrap_err();
        assert!(matches!(err, IngestError::NotFound(_)));
    }
}
