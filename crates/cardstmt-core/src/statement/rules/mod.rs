//! Rule-based normalizers and token extractors for statement text.

pub mod amounts;
pub mod dates;
pub mod patterns;

pub use amounts::{detect_currency, format_amount, parse_amount, validate_amount};
pub use dates::{DateExtractor, PeriodCheck, is_future_date, normalize_date, normalize_date_range, validate_date_range};

/// Scans free text for one kind of token (dates, amounts).
pub trait FieldExtractor {
    type Output;

    /// First token in reading order.
    fn extract(&self, text: &str) -> Option<Self::Output>;

    /// Every token in reading order.
    fn extract_all(&self, text: &str) -> Vec<Self::Output>;
}

/// A normalized token and where it came from.
#[derive(Debug, Clone)]
pub struct ExtractionMatch<T> {
    pub value: T,
    /// In [0, 1].
    pub confidence: f32,
    /// Byte span in the scanned text.
    pub position: Option<(usize, usize)>,
    /// Token as printed.
    pub source: String,
}

impl<T> ExtractionMatch<T> {
    pub fn new(value: T, confidence: f32, source: impl Into<String>) -> Self {
        Self {
            value,
            confidence,
            position: None,
            source: source.into(),
        }
    }

    pub fn with_position(mut self, start: usize, end: usize) -> Self {
        self.position = Some((start, end));
        self
    }
}
