//! Configuration structures for the statement pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration for the cardstmt pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StatementConfig {
    /// Text extraction and field extraction settings.
    pub extraction: ExtractionConfig,

    /// OCR engine configuration.
    pub ocr: OcrConfig,

    /// PDF processing configuration.
    pub pdf: PdfConfig,
}

/// Extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Minimum trimmed character count for a backend's text to be accepted.
    pub min_text_threshold: usize,

    /// Header window (characters) for issuer detection, weighted double.
    pub header_window: usize,

    /// Body window (characters) for issuer detection.
    pub body_window: usize,

    /// Currency used when an amount carries no marker and the issuer has no default.
    pub default_currency: String,

    /// Optional JSON catalog replacing the embedded pattern tables.
    pub catalog_path: Option<PathBuf>,

    /// Rerun extraction with alternate backends when the total amount is zero.
    pub enable_recovery: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_text_threshold: 100,
            header_window: 2000,
            body_window: 5000,
            default_currency: "INR".to_string(),
            catalog_path: None,
            enable_recovery: true,
        }
    }
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Directory containing model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,

    /// Keep `[UNK]` tokens in recognized text instead of replacing them with spaces.
    pub keep_unk: bool,

    /// Number of OCR engines in the pool, also the number of documents parsed at once.
    pub workers: usize,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "latin_rec.onnx".to_string(),
            dictionary: "latin_dict.txt".to_string(),
            keep_unk: false,
            workers: 2,
        }
    }
}

impl OcrConfig {
    /// Get full path to a model file.
    pub fn model_path(&self, model_name: &str) -> PathBuf {
        self.model_dir.join(model_name)
    }
}

/// PDF processing configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Maximum pages to process (0 = unlimited).
    pub max_pages: usize,
}

impl PdfConfig {
    /// Apply the page limit to a page count.
    pub fn limit(&self, pages: usize) -> usize {
        if self.max_pages == 0 {
            pages
        } else {
            pages.min(self.max_pages)
        }
    }
}

impl StatementConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = StatementConfig::default();
        assert_eq!(config.extraction.min_text_threshold, 100);
        assert_eq!(config.extraction.header_window, 2000);
        assert_eq!(config.extraction.body_window, 5000);
        assert!(config.extraction.enable_recovery);
        assert_eq!(config.ocr.workers, 2);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: StatementConfig =
            serde_json::from_str(r#"{"extraction": {"min_text_threshold": 250}}"#).unwrap();
        assert_eq!(config.extraction.min_text_threshold, 250);
        assert_eq!(config.extraction.body_window, 5000);
        assert_eq!(config.ocr.detection_model, "det.onnx");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = StatementConfig::default();
        config.pdf.max_pages = 3;
        config.save(&path).unwrap();

        let loaded = StatementConfig::from_file(&path).unwrap();
        assert_eq!(loaded.pdf.max_pages, 3);
    }

    #[test]
    fn test_page_limit() {
        let unlimited = PdfConfig::default();
        assert_eq!(unlimited.limit(12), 12);
        let limited = PdfConfig { max_pages: 5 };
        assert_eq!(limited.limit(12), 5);
        assert_eq!(limited.limit(2), 2);
    }
}
