//! Document-to-text conversion boundary.
//!
//! Rich formats (PDF, Word) are converted by an external collaborator that
//! implements [`DocumentConverter`]. [`PlainTextConverter`] covers text and
//! markdown uploads.

use std::path::Path;

use crate::error::{RagError, Result};

/// Converts an uploaded file into plain or markdown text.
pub trait DocumentConverter: Send + Sync {
    /// Convert the raw bytes of `filename`.
    fn convert(&self, filename: &str, bytes: &[u8]) -> Result<String>;

    /// Read and convert a file from disk.
    fn convert_path(&self, path: &Path) -> Result<String> {
        let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        let bytes = std::fs::read(path).map_err(|e| RagError::ConversionError {
            filename: filename.to_string(),
            message: format!("failed to read {}: {e}", path.display()),
        })?;
        self.convert(filename, &bytes)
    }
}

/// File extensions accepted by [`PlainTextConverter`].
pub const PLAIN_TEXT_EXTENSIONS: &[&str] = &["txt", "md", "markdown"];

/// Decodes text files as UTF-8, falling back to Latin-1.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextConverter;

impl DocumentConverter for PlainTextConverter {
    fn convert(&self, filename: &str, bytes: &[u8]) -> Result<String> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if !PLAIN_TEXT_EXTENSIONS.contains(&extension.as_str()) {
            return Err(RagError::ConversionError {
                filename: filename.to_string(),
                message: format!("unsupported file format: .{extension}"),
            });
        }

        Ok(match std::str::from_utf8(bytes) {
            Ok(text) => text.to_string(),
            // Every byte is a valid Latin-1 code point.
            Err(_) => bytes.iter().map(|&b| char::from(b)).collect(),
        })
    }
}

/// Text substituted for documents that could not be converted or are empty.
pub fn placeholder_text(filename: &str) -> String {
    format!("# {filename}\n\nDocument appears to be empty or corrupted.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_text_is_passed_through() {
        let text = PlainTextConverter.convert("notes.TXT", "héllo wörld".as_bytes()).unwrap();
        assert_eq!(text, "héllo wörld");
    }

    #[test]
    fn invalid_utf8_falls_back_to_latin1() {
        let text = PlainTextConverter.convert("legacy.txt", &[0x63, 0x61, 0x66, 0xe9]).unwrap();
        assert_eq!(text, "café");
    }

    #[test]
    fn unsupported_extensions_are_conversion_errors() {
        let result = PlainTextConverter.convert("report.pdf", b"%PDF-1.7");
        assert!(matches!(result, Err(RagError::ConversionError { ref filename, .. }) if filename == "report.pdf"));
    }

    #[test]
    fn missing_file_is_a_conversion_error() {
        let result = PlainTextConverter.convert_path(Path::new("/nonexistent/dir/missing.txt"));
        assert!(matches!(result, Err(RagError::ConversionError { .. })));
    }

    #[test]
    fn placeholder_names_the_file() {
        assert_eq!(
            placeholder_text("scan.pdf"),
            "# scan.pdf\n\nDocument appears to be empty or corrupted."
        );
    }
}
