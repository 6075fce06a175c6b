//! Catalog-driven field extractor.

use std::sync::Arc;

use chrono::NaiveDate;
use regex::Captures;
use tracing::{debug, trace};

use super::StatementExtractor;
use super::catalog::{IssuerProfile, PatternCatalog, Rule};
use super::rules::{detect_currency, normalize_date, normalize_date_range, parse_amount};
use crate::models::statement::{Amount, Currency, DateRange, FieldResult, Issuer};

/// Extractor whose rules come from one catalog profile.
///
/// Rules are tried in catalog order. The first match whose captured text
/// normalizes wins and carries its rule's confidence; a match that fails
/// to normalize moves on to the next rule.
#[derive(Debug, Clone)]
pub struct CatalogExtractor {
    profile: IssuerProfile,
    period_fallback: Arc<[Rule]>,
}

impl CatalogExtractor {
    pub fn new(profile: IssuerProfile, period_fallback: Arc<[Rule]>) -> Self {
        Self {
            profile,
            period_fallback,
        }
    }

    /// Extractor for a catalogued issuer.
    pub fn for_issuer(catalog: &PatternCatalog, issuer: Issuer) -> Option<Self> {
        catalog
            .profile(issuer)
            .map(|profile| Self::new(profile.clone(), catalog.period_fallback.clone()))
    }

    /// The default extractor used for unrecognized issuers.
    pub fn generic(catalog: &PatternCatalog) -> Self {
        Self::new(catalog.generic.clone(), catalog.period_fallback.clone())
    }

    fn first_match<'r, T, F>(
        &self,
        field: &str,
        rules: impl IntoIterator<Item = &'r Rule>,
        text: &str,
        normalize: F,
    ) -> FieldResult<T>
    where
        F: Fn(&Captures<'_>) -> Option<(String, T)>,
    {
        for (index, rule) in rules.into_iter().enumerate() {
            let Some(caps) = rule.regex.captures(text) else {
                continue;
            };
            match normalize(&caps) {
                Some((raw, value)) => {
                    debug!(
                        "{} {}: rule {} matched {:?} (confidence {:.2})",
                        self.profile.issuer, field, index, raw, rule.confidence
                    );
                    return FieldResult::new(raw, value, rule.confidence);
                }
                None => trace!(
                    "{} {}: rule {} matched {:?} but did not normalize",
                    self.profile.issuer,
                    field,
                    index,
                    &caps[0]
                ),
            }
        }
        debug!("{} {}: no rule matched", self.profile.issuer, field);
        FieldResult::missing()
    }
}

impl StatementExtractor for CatalogExtractor {
    fn issuer(&self) -> Issuer {
        self.profile.issuer
    }

    fn default_currency(&self) -> Currency {
        self.profile.default_currency
    }

    fn extract_issuer_name(&self, text: &str) -> FieldResult<String> {
        let issuer = self.profile.issuer;
        self.first_match("issuer_name", &self.profile.rules.issuer_name, text, |caps| {
            let raw = caps[0].to_string();
            let name = match caps.get(1) {
                Some(group) => collapse_whitespace(group.as_str()),
                None => issuer.display_name().to_string(),
            };
            (!name.is_empty()).then_some((raw, name))
        })
    }

    fn extract_card_number(&self, text: &str) -> FieldResult<String> {
        self.first_match("card_number", &self.profile.rules.card_number, text, |caps| {
            let matched = if caps.len() == 2 { caps.get(1)? } else { caps.get(0)? };
            let number = collapse_whitespace(matched.as_str()).to_uppercase();
            (!number.is_empty()).then(|| (matched.as_str().to_string(), number))
        })
    }

    fn extract_statement_period(&self, text: &str) -> FieldResult<DateRange> {
        let rules = self
            .profile
            .rules
            .statement_period
            .iter()
            .chain(self.period_fallback.iter());
        self.first_match("statement_period", rules, text, |caps| {
            match (caps.get(1), caps.get(2)) {
                (Some(start), Some(end)) => {
                    let range = normalize_date_range(start.as_str(), end.as_str())?;
                    Some((format!("{} to {}", start.as_str(), end.as_str()), range))
                }
                (Some(end), None) => {
                    let date = normalize_date(end.as_str())?;
                    Some((end.as_str().to_string(), DateRange::end_only(date)))
                }
                _ => None,
            }
        })
    }

    fn extract_due_date(&self, text: &str) -> FieldResult<NaiveDate> {
        self.first_match("due_date", &self.profile.rules.due_date, text, |caps| {
            let matched = caps.get(1).or_else(|| caps.get(0))?;
            let date = normalize_date(matched.as_str())?;
            Some((matched.as_str().to_string(), date))
        })
    }

    fn extract_total_amount(&self, text: &str) -> FieldResult<Amount> {
        let default_currency = self.profile.default_currency;
        self.first_match("total_amount", &self.profile.rules.total_amount, text, |caps| {
            let number = caps.get(1).or_else(|| caps.get(0))?;
            let currency = detect_currency(&caps[0]).unwrap_or(default_currency);
            let amount = parse_amount(number.as_str(), currency)?;
            amount
                .is_positive()
                .then(|| (number.as_str().to_string(), amount))
        })
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;

    fn catalog() -> PatternCatalog {
        PatternCatalog::embedded().unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    const HDFC_TEXT: &str = "HDFC Bank Credit Card Statement\n\
        Card No: 5522 60XX XXXX 1234\n\
        Statement Date:08/06/2019\n\
        Payment Due Date Total Dues Minimum Amount Due\n\
        28/06/2019 45,240.00 2,270.00\n";

    #[test]
    fn test_hdfc_due_date_and_total() {
        let catalog = catalog();
        let extractor = CatalogExtractor::for_issuer(&catalog, Issuer::Hdfc).unwrap();

        let due = extractor.extract_due_date(HDFC_TEXT);
        assert_eq!(due.value, Some(date(2019, 6, 28)));
        assert_eq!(due.raw, "28/06/2019");
        assert_eq!(due.confidence, 1.0);

        let total = extractor.extract_total_amount(HDFC_TEXT);
        assert_eq!(total.value, Some(Amount::new(Decimal::new(4524000, 2), Currency::Inr)));
        assert_eq!(total.raw, "45,240.00");
        assert_eq!(total.confidence, 1.0);
    }

    #[test]
    fn test_hdfc_all_fields() {
        let catalog = catalog();
        let extractor = CatalogExtractor::for_issuer(&catalog, Issuer::Hdfc).unwrap();
        let fields = extractor.extract_all(HDFC_TEXT);
        let mandatory = &fields.mandatory;

        assert_eq!(mandatory.issuer_name.value.as_deref(), Some("HDFC Bank"));
        assert_eq!(mandatory.card_number.value.as_deref(), Some("5522 60XX XXXX 1234"));
        assert_eq!(
            mandatory.statement_period.value,
            Some(DateRange::end_only(date(2019, 6, 8)))
        );
        assert_eq!(mandatory.statement_period.confidence, 0.8);
        assert!((mandatory.average() - 0.96).abs() < 1e-6);

        // The due-date table row has no description, so it is not a transaction
        assert!(fields.optional.transactions.is_empty());
    }

    #[test]
    fn test_generic_fields_scored_independently() {
        let text = "Statement from Acme Savings Bank\n\
            Card Number: 4111 XXXX XXXX 1111\n\
            Due Date: 15/03/2024\n\
            Total Amount Due: $1,234.56\n";
        let extractor = CatalogExtractor::generic(&catalog());
        assert_eq!(extractor.issuer(), Issuer::Unknown);

        let fields = extractor.extract_all(text).mandatory;
        assert_eq!(fields.issuer_name.value.as_deref(), Some("Acme Savings Bank"));
        assert_eq!(fields.issuer_name.confidence, 0.5);
        assert_eq!(fields.card_number.value.as_deref(), Some("4111 XXXX XXXX 1111"));
        assert_eq!(fields.card_number.confidence, 0.8);
        assert_eq!(fields.due_date.value, Some(date(2024, 3, 15)));
        assert_eq!(fields.due_date.confidence, 0.8);
        assert_eq!(
            fields.total_amount.value,
            Some(Amount::new(Decimal::new(123456, 2), Currency::Usd))
        );

        // No period in the text: present but empty
        assert_eq!(fields.statement_period.value, None);
        assert_eq!(fields.statement_period.raw, "");
        assert_eq!(fields.statement_period.confidence, 0.0);
    }

    #[test]
    fn test_zero_amount_falls_through_to_next_rule() {
        let text = "Total Amount Due: 0.00\nNew Balance: 512.40\n";
        let total = CatalogExtractor::generic(&catalog()).extract_total_amount(text);

        assert_eq!(total.value, Some(Amount::new(Decimal::new(51240, 2), Currency::Inr)));
        assert_eq!(total.raw, "512.40");
    }

    #[test]
    fn test_unparsable_date_falls_through() {
        let text = "Payment Due Date: 31-Feb-2024\nDue Date: 10/03/2024\n";
        let due = CatalogExtractor::generic(&catalog()).extract_due_date(text);

        assert_eq!(due.value, Some(date(2024, 3, 10)));
        assert_eq!(due.confidence, 0.8);
    }

    #[test]
    fn test_period_ranges() {
        let extractor = CatalogExtractor::generic(&catalog());

        let period = extractor.extract_statement_period("Statement Period: 01-Jan-2024 to 31-Jan-2024");
        assert_eq!(period.value, Some(DateRange::new(date(2024, 1, 1), date(2024, 1, 31))));
        assert_eq!(period.confidence, 0.9);

        let period = extractor.extract_statement_period("From January 1 to February 1, 2024");
        assert_eq!(period.value, Some(DateRange::new(date(2024, 1, 1), date(2024, 2, 1))));
    }

    #[test]
    fn test_period_fallback_rules() {
        let catalog = catalog();
        let extractor = CatalogExtractor::for_issuer(&catalog, Issuer::Axis).unwrap();

        let period = extractor.extract_statement_period("Billing window 01/05/2024 - 31/05/2024");
        assert_eq!(period.value, Some(DateRange::new(date(2024, 5, 1), date(2024, 5, 31))));
        assert_eq!(period.confidence, 0.7);
    }

    #[test]
    fn test_capital_one_pounds() {
        let catalog = catalog();
        let extractor = CatalogExtractor::for_issuer(&catalog, Issuer::CapitalOne).unwrap();
        let text = "Capital One Europe plc\nStatement date 12 March 2024\nNew balance £1,234.56\n";

        let total = extractor.extract_total_amount(text);
        assert_eq!(total.value, Some(Amount::new(Decimal::new(123456, 2), Currency::Gbp)));

        let period = extractor.extract_statement_period(text);
        assert_eq!(period.value, Some(DateRange::end_only(date(2024, 3, 12))));
    }

    #[test]
    fn test_empty_text_misses_everything() {
        let fields = CatalogExtractor::generic(&catalog()).extract_all("").mandatory;
        assert_eq!(fields.confidences(), [0.0; 5]);
    }
}
