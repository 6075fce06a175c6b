//! Fast structured-text backend: walks pages with lopdf.

use tracing::{debug, trace, warn};

use super::{Document, ExtractionAttempt, TextBackend, load_document};
use crate::error::PdfError;
use crate::models::config::PdfConfig;
use crate::models::statement::BackendKind;

/// Extracts the text operators of each page through lopdf.
#[derive(Debug, Clone, Default)]
pub struct LopdfBackend {
    pdf: PdfConfig,
}

impl LopdfBackend {
    pub fn new(pdf: PdfConfig) -> Self {
        Self { pdf }
    }

    fn read(&self, document: &Document) -> Result<(String, usize), PdfError> {
        let (doc, _) = load_document(document.bytes())?;
        let pages = doc.get_pages();
        if pages.is_empty() {
            return Err(PdfError::NoPages);
        }

        let limit = self.pdf.limit(pages.len());
        let mut text = String::new();
        for &number in pages.keys().take(limit) {
            match doc.extract_text(&[number]) {
                Ok(page_text) => {
                    trace!("Page {}: {} chars", number, page_text.len());
                    if !text.is_empty() {
                        text.push_str("\n\n");
                    }
                    text.push_str(&page_text);
                }
                Err(e) => debug!("Page {}: text extraction failed: {}", number, e),
            }
        }

        Ok((text, pages.len()))
    }
}

impl TextBackend for LopdfBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Lopdf
    }

    fn extract(&self, document: &Document) -> ExtractionAttempt {
        match self.read(document) {
            Ok((text, pages)) => ExtractionAttempt::from_text(self.kind(), &text, pages, document.len()),
            Err(e) => {
                warn!("lopdf could not read {}: {}", document.filename, e);
                ExtractionAttempt::failed(self.kind(), document.len())
            }
        }
    }
}
