//! Error types for the cardstmt-core library.

use thiserror::Error;

/// Main error type for the cardstmt library.
#[derive(Error, Debug)]
pub enum StatementError {
    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Pattern catalog or field extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Every backend produced less text than the sufficiency threshold.
    #[error("insufficient text: best backend produced {best_chars} chars, {threshold} required")]
    InsufficientText { threshold: usize, best_chars: usize },

    /// Image processing error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// A blocking worker task failed or panicked.
    #[error("worker failed: {0}")]
    Worker(String),
}

/// Errors related to PDF processing.
///
/// These never leave a backend: a failing backend reports an empty attempt.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// Failed to extract images from PDF.
    #[error("failed to extract images: {0}")]
    ImageExtraction(String),

    /// The PDF is encrypted with a non-empty password.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Invalid page number requested.
    #[error("invalid page number: {0}")]
    InvalidPage(u32),
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// Invalid image format or dimensions.
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// No OCR engine is compiled in or configured.
    #[error("OCR engine unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised while compiling the pattern catalog.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// A catalog regex failed to compile.
    #[error("invalid pattern for {issuer}.{field} `{pattern}`: {reason}")]
    InvalidPattern {
        issuer: String,
        field: String,
        pattern: String,
        reason: String,
    },

    /// The catalog names an issuer tag this build does not know.
    #[error("unknown issuer tag: {0}")]
    UnknownIssuer(String),

    /// The catalog document itself is malformed.
    #[error("malformed catalog: {0}")]
    Catalog(String),
}

/// Result type for the cardstmt library.
pub type Result<T> = std::result::Result<T, StatementError>;
