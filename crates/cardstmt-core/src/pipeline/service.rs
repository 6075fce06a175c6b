//! Async front for concurrent document parsing.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::debug;

use super::parser::StatementParser;
use crate::error::{Result, StatementError};
use crate::models::config::StatementConfig;
use crate::models::statement::ParseOutcome;
use crate::pdf::Document;

/// Runs parses on the blocking thread pool, at most `permits` at a time.
///
/// Dropping a returned future does not stop its blocking task: the
/// backend attempt in flight runs to completion and its result is dropped.
#[derive(Clone)]
pub struct ParserService {
    parser: Arc<StatementParser>,
    permits: Arc<Semaphore>,
}

impl ParserService {
    pub fn new(parser: StatementParser, max_concurrent: usize) -> Self {
        Self {
            parser: Arc::new(parser),
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Service bounded by `ocr.workers`.
    pub fn from_config(config: &StatementConfig) -> Result<Self> {
        Ok(Self::new(StatementParser::new(config)?, config.ocr.workers))
    }

    pub fn parser(&self) -> &StatementParser {
        &self.parser
    }

    pub async fn parse(&self, document: Document, force_ocr: bool) -> Result<ParseOutcome> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| StatementError::Worker(e.to_string()))?;

        let parser = self.parser.clone();
        debug!("Scheduling {}", document.filename);
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            parser.parse(&document, force_ocr)
        })
        .await
        .map_err(|e| StatementError::Worker(e.to_string()))?
    }

    /// Read `path` and parse it.
    pub async fn parse_file(&self, path: &Path, force_ocr: bool) -> Result<ParseOutcome> {
        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.parse(Document::new(filename, bytes), force_ocr).await
    }
}
