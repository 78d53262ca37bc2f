//! services/api/src/adapters/convert.rs
//!
//! Implements the `DocumentConverter` port for plain-text uploads.

use async_trait::async_trait;
use lesson_deck_core::ports::{DocumentConverter, PortError, PortResult};

const BOM: char = '\u{feff}';

#[derive(Clone, Default)]
pub struct PlainTextConverter;

impl PlainTextConverter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DocumentConverter for PlainTextConverter {
    async fn convert(&self, file_name: &str, data: &[u8]) -> PortResult<String> {
        let text = std::str::from_utf8(data).map_err(|e| {
            PortError::Validation(format!("{} is not valid UTF-8 text: {}", file_name, e))
        })?;
        if text.contains('\0') {
            return Err(PortError::Validation(format!(
                "{} looks like a binary file",
                file_name
            )));
        }
        Ok(text.strip_prefix(BOM).unwrap_or(text).replace("\r\n", "\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn strips_bom_and_normalises_line_endings() {
        let text = PlainTextConverter::new()
            .convert("a.txt", "\u{feff}line one\r\nline two".as_bytes())
            .await
            .unwrap();
        assert_eq!(text, "line one\nline two");
    }

    #[tokio::test]
    async fn rejects_binary_and_invalid_utf8() {
        let converter = PlainTextConverter::new();
        assert!(matches!(
            converter.convert("a.bin", &[0xff, 0xfe, 0x00]).await,
            Err(PortError::Validation(_))
        ));
        assert!(matches!(
            converter.convert("a.bin", b"abc\0def").await,
            Err(PortError::Validation(_))
        ));
    }
}
