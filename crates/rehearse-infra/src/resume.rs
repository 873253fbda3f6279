//! Resume text extraction from uploaded files.
//!
//! Only text-like formats are accepted; binary document parsing is an
//! external concern behind the [`ResumeExtractor`] seam.

use rehearse_core::clients::ResumeExtractor;
use rehearse_types::error::ExtractError;

/// Upload size cap: 2 MiB of resume text is already generous.
pub const MAX_RESUME_BYTES: usize = 2 * 1024 * 1024;

const ALLOWED_MIMES: &[&str] = &[
    "text/plain",
    "text/markdown",
    "text/x-markdown",
    "application/octet-stream",
];

/// Extractor for plain-text and markdown resumes.
pub struct PlainTextExtractor;

impl ResumeExtractor for PlainTextExtractor {
    async fn extract(&self, bytes: &[u8], mime: &str) -> Result<String, ExtractError> {
        if bytes.len() > MAX_RESUME_BYTES {
            return Err(ExtractError::TooLarge {
                size: bytes.len(),
                limit: MAX_RESUME_BYTES,
            });
        }
        let base_mime = mime.split(';').next().unwrap_or(mime).trim();
        if !ALLOWED_MIMES.contains(&base_mime) {
            return Err(ExtractError::UnsupportedMime(base_mime.to_string()));
        }
        let text =
            std::str::from_utf8(bytes).map_err(|_| ExtractError::InvalidEncoding)?;
        Ok(text.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_plain_text_extraction() {
        let text = PlainTextExtractor
            .extract(b"  Five years of Rust.  ", "text/plain")
            .await
            .unwrap();
        assert_eq!(text, "Five years of Rust.");
    }

    #[tokio::test]
    async fn test_mime_with_charset_parameter() {
        let text = PlainTextExtractor
            .extract(b"resume", "text/plain; charset=utf-8")
            .await
            .unwrap();
        assert_eq!(text, "resume");
    }

    #[tokio::test]
    async fn test_unsupported_mime_rejected() {
        let err = PlainTextExtractor
            .extract(b"%PDF-1.4", "application/pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::UnsupportedMime(_)));
    }

    #[tokio::test]
    async fn test_oversized_rejected() {
        let big = vec![b'a'; MAX_RESUME_BYTES + 1];
        let err = PlainTextExtractor
            .extract(&big, "text/plain")
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::TooLarge { .. }));
    }

    #[tokio::test]
    async fn test_invalid_utf8_rejected() {
        let err = PlainTextExtractor
            .extract(&[0xff, 0xfe, 0x00], "text/plain")
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::InvalidEncoding));
    }
}
