//! Robust structured-text backend built on pdf-extract.

use std::panic::{self, AssertUnwindSafe};

use tracing::warn;

use super::{Document, ExtractionAttempt, TextBackend, load_document};
use crate::error::PdfError;
use crate::models::statement::BackendKind;

/// Full-document text layout through `pdf_extract`.
///
/// Slower than the lopdf walker but handles more font encodings. Panics
/// inside `pdf_extract` are caught and reported as a failed attempt.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractBackend;

impl PdfExtractBackend {
    pub fn new() -> Self {
        Self
    }

    fn read(&self, document: &Document) -> Result<(String, usize), PdfError> {
        let (doc, decrypted) = load_document(document.bytes())?;
        let page_count = doc.get_pages().len();
        if page_count == 0 {
            return Err(PdfError::NoPages);
        }

        let data = decrypted.as_deref().unwrap_or(document.bytes());
        let text = panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(data)))
            .map_err(|_| PdfError::TextExtraction("pdf-extract panicked".to_string()))?
            .map_err(|e| PdfError::TextExtraction(e.to_string()))?;

        Ok((text, page_count))
    }
}

impl TextBackend for PdfExtractBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::PdfExtract
    }

    fn extract(&self, document: &Document) -> ExtractionAttempt {
        match self.read(document) {
            Ok((text, pages)) => ExtractionAttempt::from_text(self.kind(), &text, pages, document.len()),
            Err(e) => {
                warn!("pdf-extract could not read {}: {}", document.filename, e);
                ExtractionAttempt::failed(self.kind(), document.len())
            }
        }
    }
}
