//! Decides up front whether a document is probably scanned.

use tracing::{debug, info, warn};

use super::{Document, load_document};

/// Pre-flight check run before any backend.
pub trait OcrProbe: Send + Sync {
    fn is_ocr_needed(&self, document: &Document, threshold: usize) -> bool;
}

/// Counts structured text page by page.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextDensityProbe;

impl OcrProbe for TextDensityProbe {
    fn is_ocr_needed(&self, document: &Document, threshold: usize) -> bool {
        is_ocr_needed(document, threshold)
    }
}

/// True when the document holds less than `threshold` characters of
/// structured text, or cannot be opened at all.
///
/// Stops reading pages as soon as the running count reaches the threshold.
pub fn is_ocr_needed(document: &Document, threshold: usize) -> bool {
    let doc = match load_document(document.bytes()) {
        Ok((doc, _)) => doc,
        Err(e) => {
            warn!("Could not open {} for text probing: {}, assuming OCR needed", document.filename, e);
            return true;
        }
    };

    let mut total_chars = 0;
    for (number, _) in doc.get_pages() {
        let text = doc.extract_text(&[number]).unwrap_or_default();
        total_chars += text.trim().chars().count();
        if total_chars >= threshold {
            debug!("Probe reached {} chars by page {}", total_chars, number);
            return false;
        }
    }

    info!("Detected {} characters, below threshold {}, OCR needed", total_chars, threshold);
    true
}
