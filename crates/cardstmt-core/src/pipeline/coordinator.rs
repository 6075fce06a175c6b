//! Backend ordering and the text sufficiency rule.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{Result, StatementError};
use crate::models::statement::BackendKind;
use crate::pdf::{Document, ExtractionAttempt, OcrProbe, TextBackend};

/// Text accepted from one backend, plus that backend's metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedText {
    pub text: String,
    pub backend: BackendKind,
    pub page_count: usize,
    pub byte_size: usize,
}

impl From<ExtractionAttempt> for ExtractedText {
    fn from(attempt: ExtractionAttempt) -> Self {
        Self {
            text: attempt.text,
            backend: attempt.backend,
            page_count: attempt.page_count,
            byte_size: attempt.byte_size,
        }
    }
}

/// Chooses which backend's text the pipeline runs on.
///
/// OCR goes first when forced or when the probe says the document is
/// scanned. Otherwise the fast backend, then the robust one, then OCR as a
/// last resort. The first attempt reaching `threshold` characters wins.
pub struct ExtractionCoordinator {
    fast: Arc<dyn TextBackend>,
    robust: Arc<dyn TextBackend>,
    ocr: Arc<dyn TextBackend>,
    probe: Arc<dyn OcrProbe>,
    threshold: usize,
}

impl ExtractionCoordinator {
    pub fn new(
        fast: Arc<dyn TextBackend>,
        robust: Arc<dyn TextBackend>,
        ocr: Arc<dyn TextBackend>,
        probe: Arc<dyn OcrProbe>,
        threshold: usize,
    ) -> Self {
        Self {
            fast,
            robust,
            ocr,
            probe,
            threshold,
        }
    }

    /// Run backends in policy order until one produces enough text.
    ///
    /// When OCR ran first because the probe flagged the document and fell
    /// short, the structured backends still get their turn. A forced OCR
    /// run that falls short is final.
    pub fn extract(&self, document: &Document, force_ocr: bool) -> Result<ExtractedText> {
        let mut best_chars = 0;

        let ocr_first = force_ocr || self.probe.is_ocr_needed(document, self.threshold);
        if ocr_first {
            info!(
                "Using OCR first for {} ({})",
                document.filename,
                if force_ocr { "forced" } else { "low text density" }
            );
            match self.attempt(self.ocr.as_ref(), document, &mut best_chars) {
                Some(text) => return Ok(text),
                None if force_ocr => return Err(self.insufficient(best_chars)),
                None => debug!("OCR insufficient, trying structured backends"),
            }
        }

        for backend in [&self.fast, &self.robust] {
            if let Some(text) = self.attempt(backend.as_ref(), document, &mut best_chars) {
                return Ok(text);
            }
        }

        if !ocr_first {
            info!("Structured backends insufficient for {}, falling back to OCR", document.filename);
            if let Some(text) = self.attempt(self.ocr.as_ref(), document, &mut best_chars) {
                return Ok(text);
            }
        }

        Err(self.insufficient(best_chars))
    }

    /// Run exactly one backend under the same sufficiency rule.
    pub fn extract_with(&self, document: &Document, kind: BackendKind) -> Result<ExtractedText> {
        let mut best_chars = 0;
        self.attempt(self.backend(kind), document, &mut best_chars)
            .ok_or_else(|| self.insufficient(best_chars))
    }

    fn backend(&self, kind: BackendKind) -> &dyn TextBackend {
        match kind {
            BackendKind::Lopdf => self.fast.as_ref(),
            BackendKind::PdfExtract => self.robust.as_ref(),
            BackendKind::Ocr => self.ocr.as_ref(),
        }
    }

    fn attempt(&self, backend: &dyn TextBackend, document: &Document, best_chars: &mut usize) -> Option<ExtractedText> {
        let attempt = backend.extract(document);
        let chars = attempt.char_count();
        *best_chars = (*best_chars).max(chars);

        if attempt.is_sufficient(self.threshold) {
            info!("Accepted {} text: {} chars", attempt.backend, chars);
            Some(attempt.into())
        } else {
            debug!(
                "{} produced {} chars (threshold {}, success={})",
                attempt.backend, chars, self.threshold, attempt.success
            );
            None
        }
    }

    fn insufficient(&self, best_chars: usize) -> StatementError {
        StatementError::InsufficientText {
            threshold: self.threshold,
            best_chars,
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::models::statement::BackendKind;
    use crate::pdf::{Document, ExtractionAttempt, OcrProbe, TextBackend};

    /// Backend returning canned text and counting calls.
    pub struct StubBackend {
        pub kind: BackendKind,
        pub text: String,
        pub success: bool,
        pub calls: AtomicUsize,
    }

    impl StubBackend {
        pub fn new(kind: BackendKind, text: impl Into<String>) -> Arc<Self> {
            Arc::new(Self {
                kind,
                text: text.into(),
                success: true,
                calls: AtomicUsize::new(0),
            })
        }

        pub fn failing(kind: BackendKind) -> Arc<Self> {
            Arc::new(Self {
                kind,
                text: String::new(),
                success: false,
                calls: AtomicUsize::new(0),
            })
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl TextBackend for StubBackend {
        fn kind(&self) -> BackendKind {
            self.kind
        }

        fn extract(&self, document: &Document) -> ExtractionAttempt {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.success {
                ExtractionAttempt::from_text(self.kind, &self.text, 2, document.len())
            } else {
                ExtractionAttempt::failed(self.kind, document.len())
            }
        }
    }

    /// Probe with a fixed answer.
    pub struct FixedProbe(pub bool);

    impl OcrProbe for FixedProbe {
        fn is_ocr_needed(&self, _document: &Document, _threshold: usize) -> bool {
            self.0
        }
    }
}
