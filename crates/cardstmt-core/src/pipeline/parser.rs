//! The per-document parse pipeline.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use super::coordinator::{ExtractedText, ExtractionCoordinator};
use super::recovery::RecoveryController;
use crate::error::{Result, StatementError};
use crate::models::config::StatementConfig;
use crate::models::statement::{BackendKind, Currency, DocumentMetadata, Issuer, ParseOutcome};
use crate::ocr::OcrBackend;
use crate::pdf::{Document, LopdfBackend, PdfExtractBackend, TextDensityProbe};
use crate::statement::{ExtractorRegistry, IssuerDetector, PatternCatalog};

/// Runs one document through extraction, issuer detection, field
/// extraction and the recovery pass.
///
/// Holds no per-document state, so one parser serves concurrent calls.
pub struct StatementParser {
    coordinator: ExtractionCoordinator,
    detector: IssuerDetector,
    registry: ExtractorRegistry,
    recovery: Option<RecoveryController>,
}

impl StatementParser {
    /// Parser with the lopdf, pdf-extract and OCR backends and the
    /// configured pattern catalog.
    pub fn new(config: &StatementConfig) -> Result<Self> {
        let mut catalog = PatternCatalog::load(&config.extraction)?;
        catalog.generic.default_currency = Currency::from_str(&config.extraction.default_currency)
            .map_err(|c| StatementError::Config(format!("unsupported default currency: {}", c)))?;

        let coordinator = ExtractionCoordinator::new(
            Arc::new(LopdfBackend::new(config.pdf.clone())),
            Arc::new(PdfExtractBackend::new()),
            Arc::new(OcrBackend::from_config(config)),
            Arc::new(TextDensityProbe),
            config.extraction.min_text_threshold,
        );

        info!(
            "Statement parser ready: catalog {}, {} issuers, threshold {}",
            catalog.version,
            catalog.issuers.len(),
            config.extraction.min_text_threshold
        );

        Ok(Self::from_parts(
            coordinator,
            IssuerDetector::from_config(&catalog, &config.extraction),
            ExtractorRegistry::from_catalog(&catalog),
        )
        .with_recovery(config.extraction.enable_recovery))
    }

    /// Assemble a parser from explicit components. Recovery is enabled.
    pub fn from_parts(
        coordinator: ExtractionCoordinator,
        detector: IssuerDetector,
        registry: ExtractorRegistry,
    ) -> Self {
        Self {
            coordinator,
            detector,
            registry,
            recovery: Some(RecoveryController::new()),
        }
    }

    pub fn with_recovery(mut self, enabled: bool) -> Self {
        self.recovery = enabled.then(RecoveryController::new);
        self
    }

    /// Parse one document.
    ///
    /// Fails only with `InsufficientText` when no backend yields enough
    /// text; every other problem shows up as low confidence.
    pub fn parse(&self, document: &Document, force_ocr: bool) -> Result<ParseOutcome> {
        let start = Instant::now();

        let extracted = self.coordinator.extract(document, force_ocr)?;
        let detection = self.detector.detect(&extracted.text);
        let issuer = detection.issuer;

        let outcome = self.build(document, issuer, extracted);
        let mut outcome = match &self.recovery {
            Some(recovery) => recovery.recover(outcome, |kind| {
                let alternate = self.coordinator.extract_with(document, kind)?;
                Ok(self.build(document, issuer, alternate))
            }),
            None => outcome,
        };

        outcome.metadata.processing_time_ms = start.elapsed().as_millis() as u64;
        info!(
            "Parsed {}: issuer={} backend={} confidence={:.2} in {}ms",
            document.filename,
            outcome.issuer,
            outcome.metadata.backend,
            outcome.confidence,
            outcome.metadata.processing_time_ms
        );
        Ok(outcome)
    }

    fn build(&self, document: &Document, issuer: Issuer, extracted: ExtractedText) -> ParseOutcome {
        let fields = self.registry.get(issuer).extract_all(&extracted.text);
        let metadata = DocumentMetadata {
            filename: document.filename.clone(),
            page_count: extracted.page_count,
            byte_size: extracted.byte_size,
            backend: extracted.backend,
            ocr_used: extracted.backend == BackendKind::Ocr,
            processing_time_ms: 0,
            recovered_from: None,
        };
        ParseOutcome::new(issuer, fields, metadata)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use super::StatementParser;
    use crate::models::config::ExtractionConfig;
    use crate::pdf::TextBackend;
    use crate::pipeline::coordinator::ExtractionCoordinator;
    use crate::pipeline::coordinator::testing::FixedProbe;
    use crate::statement::{ExtractorRegistry, IssuerDetector, PatternCatalog};

    /// Parser over the embedded catalog with the given backends.
    pub fn parser(
        fast: Arc<dyn TextBackend>,
        robust: Arc<dyn TextBackend>,
        ocr: Arc<dyn TextBackend>,
    ) -> StatementParser {
        let catalog = PatternCatalog::embedded().unwrap();
        let config = ExtractionConfig::default();
        let coordinator = ExtractionCoordinator::new(
            fast,
            robust,
            ocr,
            Arc::new(FixedProbe(false)),
            config.min_text_threshold,
        );
        StatementParser::from_parts(
            coordinator,
            IssuerDetector::from_config(&catalog, &config),
            ExtractorRegistry::from_catalog(&catalog),
        )
    }
}
