//! Core library for credit-card statement parsing.
//!
//! This crate provides:
//! - Text extraction with two structured PDF backends and an OCR fallback
//! - Weighted issuer detection over a JSON pattern catalog
//! - Per-issuer field extraction with confidence scores
//! - Optional-field heuristics (minimum due, balances, rewards, transactions)
//! - A recovery pass that re-extracts when the total amount comes back empty

pub mod error;
pub mod models;
pub mod ocr;
pub mod pdf;
pub mod pipeline;
pub mod statement;

pub use error::{ExtractionError, OcrError, PdfError, Result, StatementError};
pub use models::config::{ExtractionConfig, OcrConfig, PdfConfig, StatementConfig};
pub use models::statement::{
    Amount, BackendKind, Currency, DateRange, DocumentMetadata, FieldResult, Issuer, MandatoryFields,
    OptionalFields, ParseOutcome, StatementFields, Transaction,
};
pub use ocr::{EnginePool, OcrBackend, OcrResult, RecognitionEngine, TextBox};
#[cfg(feature = "native")]
pub use ocr::PureOcrEngine;
pub use pdf::{Document, ExtractionAttempt, TextBackend};
pub use pipeline::{ExtractionCoordinator, ParserService, RecoveryController, StatementParser};
pub use statement::{ExtractorRegistry, IssuerDetector, PatternCatalog, StatementExtractor};
