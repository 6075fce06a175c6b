//! Extraction coordinator, recovery pass, parser and async service.

pub mod coordinator;
pub mod parser;
pub mod recovery;
pub mod service;

pub use coordinator::{ExtractedText, ExtractionCoordinator};
pub use parser::StatementParser;
pub use recovery::RecoveryController;
pub use service::ParserService;
