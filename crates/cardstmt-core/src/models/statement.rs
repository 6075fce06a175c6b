//! Statement data models: field results, outcome and metadata.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::statement::rules::amounts::validate_amount;
use crate::statement::rules::dates::{PeriodCheck, validate_date_range};

/// Text extraction backend identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Fast structured-text backend (lopdf page walker).
    Lopdf,
    /// Robust structured-text backend (pdf-extract).
    PdfExtract,
    /// OCR over embedded page images.
    Ocr,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Lopdf => "lopdf",
            BackendKind::PdfExtract => "pdf_extract",
            BackendKind::Ocr => "ocr",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Card issuer. Closed set; `Unknown` when detection finds nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Issuer {
    Kotak,
    Hdfc,
    Icici,
    Idfc,
    Axis,
    Amex,
    CapitalOne,
    Unknown,
}

impl Issuer {
    /// Short tag used in catalogs and serialized output.
    pub fn tag(&self) -> &'static str {
        match self {
            Issuer::Kotak => "kotak",
            Issuer::Hdfc => "hdfc",
            Issuer::Icici => "icici",
            Issuer::Idfc => "idfc",
            Issuer::Axis => "axis",
            Issuer::Amex => "amex",
            Issuer::CapitalOne => "capital_one",
            Issuer::Unknown => "unknown",
        }
    }

    /// Institution name as printed in the issuer-name field.
    pub fn display_name(&self) -> &'static str {
        match self {
            Issuer::Kotak => "Kotak Mahindra Bank",
            Issuer::Hdfc => "HDFC Bank",
            Issuer::Icici => "ICICI Bank",
            Issuer::Idfc => "IDFC First Bank",
            Issuer::Axis => "Axis Bank",
            Issuer::Amex => "American Express Banking Corp",
            Issuer::CapitalOne => "Capital One Europe Plc",
            Issuer::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Issuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Issuer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "kotak" => Ok(Issuer::Kotak),
            "hdfc" => Ok(Issuer::Hdfc),
            "icici" => Ok(Issuer::Icici),
            "idfc" => Ok(Issuer::Idfc),
            "axis" => Ok(Issuer::Axis),
            "amex" => Ok(Issuer::Amex),
            "capital_one" => Ok(Issuer::CapitalOne),
            "unknown" => Ok(Issuer::Unknown),
            other => Err(other.to_string()),
        }
    }
}

/// Supported currencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Inr,
    Usd,
    Gbp,
    Eur,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Inr => "INR",
            Currency::Usd => "USD",
            Currency::Gbp => "GBP",
            Currency::Eur => "EUR",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::Inr => "₹",
            Currency::Usd => "$",
            Currency::Gbp => "£",
            Currency::Eur => "€",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "INR" => Ok(Currency::Inr),
            "USD" => Ok(Currency::Usd),
            "GBP" => Ok(Currency::Gbp),
            "EUR" => Ok(Currency::Eur),
            other => Err(other.to_string()),
        }
    }
}

/// A monetary amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    pub value: Decimal,
    pub currency: Currency,
}

impl Amount {
    pub fn new(value: Decimal, currency: Currency) -> Self {
        Self { value, currency }
    }

    pub fn is_positive(&self) -> bool {
        self.value > Decimal::ZERO
    }
}

/// Statement billing period. A lone statement date fills only `end`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn end_only(end: NaiveDate) -> Self {
        Self {
            start: None,
            end: Some(end),
        }
    }
}

/// Result of extracting one field.
///
/// A miss is represented by an empty `raw`, no `value` and zero confidence,
/// never by omitting the field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldResult<T> {
    /// Matched substring.
    pub raw: String,
    /// Normalized value.
    pub value: Option<T>,
    /// Confidence of the rule that matched, in [0, 1].
    pub confidence: f32,
}

impl<T> FieldResult<T> {
    pub fn new(raw: impl Into<String>, value: T, confidence: f32) -> Self {
        Self {
            raw: raw.into(),
            value: Some(value),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn missing() -> Self {
        Self {
            raw: String::new(),
            value: None,
            confidence: 0.0,
        }
    }

    pub fn is_found(&self) -> bool {
        self.value.is_some()
    }
}

impl<T> Default for FieldResult<T> {
    fn default() -> Self {
        Self::missing()
    }
}

/// The five mandatory fields, always present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MandatoryFields {
    pub issuer_name: FieldResult<String>,
    pub card_number: FieldResult<String>,
    pub statement_period: FieldResult<DateRange>,
    pub due_date: FieldResult<NaiveDate>,
    pub total_amount: FieldResult<Amount>,
}

impl MandatoryFields {
    /// Confidences in field order.
    pub fn confidences(&self) -> [f32; 5] {
        [
            self.issuer_name.confidence,
            self.card_number.confidence,
            self.statement_period.confidence,
            self.due_date.confidence,
            self.total_amount.confidence,
        ]
    }

    /// Arithmetic mean of the five field confidences.
    pub fn average(&self) -> f32 {
        let confidences = self.confidences();
        confidences.iter().sum::<f32>() / confidences.len() as f32
    }
}

/// One line-level transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDate,
    pub description: String,
    pub amount: Amount,
    /// Marked `Cr` on the statement.
    pub credit: bool,
}

/// Secondary fields; each present only when a heuristic matched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionalFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_amount_due: Option<FieldResult<Amount>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_balance: Option<FieldResult<Amount>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_credit_limit: Option<FieldResult<Amount>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward_points: Option<FieldResult<String>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transactions: Vec<Transaction>,
}

impl OptionalFields {
    pub fn is_empty(&self) -> bool {
        self.minimum_amount_due.is_none()
            && self.previous_balance.is_none()
            && self.available_credit_limit.is_none()
            && self.reward_points.is_none()
            && self.transactions.is_empty()
    }
}

/// Output of a field extractor run over one text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementFields {
    pub mandatory: MandatoryFields,
    pub optional: OptionalFields,
}

/// Document-level metadata from the winning backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub filename: String,
    pub page_count: usize,
    pub byte_size: usize,
    pub backend: BackendKind,
    pub ocr_used: bool,
    pub processing_time_ms: u64,
    /// Primary backend, set when the recovery pass replaced the outcome.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovered_from: Option<BackendKind>,
}

/// Final parse result for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseOutcome {
    pub issuer: Issuer,
    pub fields: MandatoryFields,
    #[serde(default, skip_serializing_if = "OptionalFields::is_empty")]
    pub optional: OptionalFields,
    pub metadata: DocumentMetadata,
    pub confidence: f32,
}

impl ParseOutcome {
    pub fn new(issuer: Issuer, fields: StatementFields, metadata: DocumentMetadata) -> Self {
        let confidence = fields.mandatory.average();
        Self {
            issuer,
            fields: fields.mandatory,
            optional: fields.optional,
            metadata,
            confidence,
        }
    }

    /// Mean of the five mandatory confidences.
    pub fn average(&self) -> f32 {
        self.fields.average()
    }

    /// True when the total amount is missing or zero.
    pub fn needs_recovery(&self) -> bool {
        !self
            .fields
            .total_amount
            .value
            .as_ref()
            .is_some_and(|amount| amount.value != Decimal::ZERO)
    }

    /// Sanity checks on extracted values. Does not alter confidence.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.issuer == Issuer::Unknown {
            issues.push("Issuer not recognized".to_string());
        }

        if !self.fields.card_number.is_found() {
            issues.push("Missing card number".to_string());
        }

        match self.fields.statement_period.value {
            Some(DateRange {
                start: Some(start),
                end: Some(end),
            }) => match validate_date_range(start, end) {
                PeriodCheck::Valid => {}
                PeriodCheck::Unusual(days) => {
                    issues.push(format!("Unusual statement period length: {} days", days));
                }
                PeriodCheck::Inverted => {
                    issues.push(format!("Statement period start {} is not before end {}", start, end));
                }
            },
            Some(_) => {}
            None => issues.push("Missing statement period".to_string()),
        }

        match (self.fields.due_date.value, self.fields.statement_period.value) {
            (Some(due), Some(DateRange { end: Some(end), .. })) if due < end => {
                issues.push(format!("Due date {} precedes statement end {}", due, end));
            }
            (None, _) => issues.push("Missing due date".to_string()),
            _ => {}
        }

        match &self.fields.total_amount.value {
            Some(amount) if !validate_amount(amount.value) => {
                issues.push(format!("Total amount {} outside expected range", amount.value));
            }
            Some(_) => {}
            None => issues.push("Missing total amount".to_string()),
        }

        issues
    }
}
