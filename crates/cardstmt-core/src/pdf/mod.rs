//! PDF documents and the structured-text extraction backends.

mod images;
mod lopdf_text;
mod pdf_extract_text;
mod probe;

pub use images::{all_images, page_image, page_images};
pub use lopdf_text::LopdfBackend;
pub use pdf_extract_text::PdfExtractBackend;
pub use probe::{OcrProbe, TextDensityProbe, is_ocr_needed};

use std::path::Path;
use std::sync::Arc;

use lopdf::Document as PdfDocument;
use tracing::debug;

use crate::error::{PdfError, Result};
use crate::models::statement::BackendKind;

/// An input document: raw bytes plus the name it was submitted under.
///
/// Cloning shares the bytes.
#[derive(Debug, Clone)]
pub struct Document {
    pub filename: String,
    bytes: Arc<[u8]>,
}

impl Document {
    pub fn new(filename: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let bytes: Vec<u8> = bytes.into();
        Self {
            filename: filename.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a document from disk, named after its file name.
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(filename, bytes))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// One text-extraction strategy.
///
/// `extract` never fails: a backend that cannot read the document returns
/// an unsuccessful, empty attempt so the caller can move on.
pub trait TextBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    fn extract(&self, document: &Document) -> ExtractionAttempt;
}

/// Output of a single backend run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionAttempt {
    pub backend: BackendKind,
    /// Cleaned text.
    pub text: String,
    pub page_count: usize,
    pub byte_size: usize,
    /// False when the backend failed internally.
    pub success: bool,
}

impl ExtractionAttempt {
    /// Empty attempt for a backend that could not read the document.
    pub fn failed(backend: BackendKind, byte_size: usize) -> Self {
        Self {
            backend,
            text: String::new(),
            page_count: 0,
            byte_size,
            success: false,
        }
    }

    /// Successful attempt; `raw_text` is cleaned first.
    pub fn from_text(backend: BackendKind, raw_text: &str, page_count: usize, byte_size: usize) -> Self {
        let text = clean_text(raw_text);
        debug!("{} extracted {} chars from {} pages", backend, text.chars().count(), page_count);
        Self {
            backend,
            text,
            page_count,
            byte_size,
            success: true,
        }
    }

    /// Character count after trimming.
    pub fn char_count(&self) -> usize {
        self.text.trim().chars().count()
    }

    /// Whether the text meets the sufficiency threshold.
    pub fn is_sufficient(&self, threshold: usize) -> bool {
        self.success && self.char_count() >= threshold
    }
}

/// Trim every line and drop blank ones.
pub fn clean_text(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse PDF bytes, decrypting documents protected by an empty password.
///
/// Returns the parsed document and, when it had to be decrypted, the
/// decrypted bytes for backends that read raw data.
pub fn load_document(data: &[u8]) -> std::result::Result<(PdfDocument, Option<Vec<u8>>), PdfError> {
    let mut doc = PdfDocument::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

    if !doc.is_encrypted() {
        return Ok((doc, None));
    }

    if doc.decrypt("").is_err() {
        return Err(PdfError::Encrypted);
    }
    debug!("Decrypted PDF with empty password");

    let mut decrypted = Vec::new();
    doc.save_to(&mut decrypted)
        .map_err(|e| PdfError::Parse(format!("failed to save decrypted PDF: {}", e)))?;
    Ok((doc, Some(decrypted)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_clean_text() {
        let raw = "  HDFC Bank  \r\n\n\n\t Statement Date:08/06/2019\n   \n";
        assert_eq!(clean_text(raw), "HDFC Bank\nStatement Date:08/06/2019");
        assert_eq!(clean_text(""), "");
    }

    #[test]
    fn test_attempt_sufficiency() {
        let attempt = ExtractionAttempt::from_text(BackendKind::Lopdf, &"x".repeat(100), 1, 2048);
        assert!(attempt.success);
        assert_eq!(attempt.char_count(), 100);
        assert!(attempt.is_sufficient(100));
        assert!(!attempt.is_sufficient(101));
    }

    #[test]
    fn test_whitespace_does_not_count() {
        let attempt = ExtractionAttempt::from_text(BackendKind::PdfExtract, "   \n\n  abc  \n ", 1, 10);
        assert_eq!(attempt.text, "abc");
        assert_eq!(attempt.char_count(), 3);
    }

    #[test]
    fn test_failed_attempt_is_never_sufficient() {
        let attempt = ExtractionAttempt::failed(BackendKind::Ocr, 10);
        assert!(!attempt.success);
        assert!(!attempt.is_sufficient(0));
        assert_eq!(attempt.byte_size, 10);
    }

    #[test]
    fn test_document_shares_bytes() {
        let doc = Document::new("a.pdf", b"%PDF-1.4".to_vec());
        let copy = doc.clone();
        assert_eq!(copy.bytes(), doc.bytes());
        assert_eq!(doc.len(), 8);
        assert!(!doc.is_empty());
    }

    #[test]
    fn test_load_rejects_garbage() {
        assert!(matches!(load_document(b"not a pdf"), Err(PdfError::Parse(_))));
    }
}
