//! Issuer detection and field extraction.

pub mod catalog;
pub mod extractor;
pub mod heuristics;
pub mod issuer;
pub mod registry;
pub mod rules;

pub use catalog::{IssuerProfile, PatternCatalog, Rule};
pub use extractor::CatalogExtractor;
pub use issuer::{Detection, IssuerCandidate, IssuerDetector};
pub use registry::ExtractorRegistry;

use chrono::NaiveDate;

use crate::models::statement::{
    Amount, Currency, DateRange, FieldResult, Issuer, MandatoryFields, StatementFields,
};

/// Field extraction contract every issuer extractor satisfies.
///
/// Each method tries its rules in order and returns the first match that
/// normalizes. A miss is a zero-confidence `FieldResult`, never an error.
pub trait StatementExtractor: Send + Sync {
    /// Issuer this extractor is built for (`Unknown` for the default).
    fn issuer(&self) -> Issuer;

    /// Currency assumed when an amount carries no marker.
    fn default_currency(&self) -> Currency;

    fn extract_issuer_name(&self, text: &str) -> FieldResult<String>;

    fn extract_card_number(&self, text: &str) -> FieldResult<String>;

    fn extract_statement_period(&self, text: &str) -> FieldResult<DateRange>;

    fn extract_due_date(&self, text: &str) -> FieldResult<NaiveDate>;

    fn extract_total_amount(&self, text: &str) -> FieldResult<Amount>;

    /// All five mandatory fields plus the generic optional-field heuristics.
    fn extract_all(&self, text: &str) -> StatementFields {
        let mandatory = MandatoryFields {
            issuer_name: self.extract_issuer_name(text),
            card_number: self.extract_card_number(text),
            statement_period: self.extract_statement_period(text),
            due_date: self.extract_due_date(text),
            total_amount: self.extract_total_amount(text),
        };
        let optional = heuristics::extract_optional(
            text,
            self.default_currency(),
            mandatory.statement_period.value.as_ref(),
        );
        StatementFields { mandatory, optional }
    }
}
