//! Issuer-agnostic heuristics for the optional statement fields.
//!
//! Labeled amounts (minimum due, previous balance, available credit) and
//! the reward-points balance are found by label regexes. Transactions are
//! read line by line: a line with a date token and a trailing amount is one
//! transaction. This is best-effort and will miss wrapped or multi-column
//! rows.

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use tracing::debug;

use super::rules::patterns::{
    AVAILABLE_CREDIT, MINIMUM_DUE, PREVIOUS_BALANCE, REWARD_POINTS, SHORT_DATE_PREFIX,
    SUMMARY_LABEL, TRAILING_AMOUNT,
};
use super::rules::{DateExtractor, FieldExtractor, normalize_date, parse_amount};
use crate::models::statement::{Amount, Currency, DateRange, FieldResult, OptionalFields, Transaction};

const LABELED_CONFIDENCE: f32 = 0.8;
const REWARDS_CONFIDENCE: f32 = 0.7;

/// Run every optional-field heuristic over `text`.
///
/// `period` supplies the year for transaction dates printed without one.
pub fn extract_optional(text: &str, currency: Currency, period: Option<&DateRange>) -> OptionalFields {
    let reference = period.and_then(|p| p.end);
    let optional = OptionalFields {
        minimum_amount_due: labeled_amount(&MINIMUM_DUE, text, currency),
        previous_balance: labeled_amount(&PREVIOUS_BALANCE, text, currency),
        available_credit_limit: labeled_amount(&AVAILABLE_CREDIT, text, currency),
        reward_points: reward_points(text),
        transactions: extract_transactions(text, currency, reference),
    };
    debug!(
        "Optional fields: minimum_due={} previous_balance={} credit={} rewards={} transactions={}",
        optional.minimum_amount_due.is_some(),
        optional.previous_balance.is_some(),
        optional.available_credit_limit.is_some(),
        optional.reward_points.is_some(),
        optional.transactions.len()
    );
    optional
}

fn labeled_amount(pattern: &Regex, text: &str, currency: Currency) -> Option<FieldResult<Amount>> {
    pattern.captures_iter(text).find_map(|caps| {
        let found = caps.get(1)?;
        if starts_date_tail(&text[found.end()..]) {
            debug!("Skipping date fragment {:?} after label", found.as_str());
            return None;
        }
        let raw = found.as_str().trim();
        let amount = parse_amount(raw, currency)?;
        Some(FieldResult::new(raw, amount, LABELED_CONFIDENCE))
    })
}

/// A date separator followed by a digit, as in the rest of "28/06/2019".
fn starts_date_tail(rest: &str) -> bool {
    let mut chars = rest.chars();
    matches!(chars.next(), Some('/' | '.' | '-')) && chars.next().is_some_and(|c| c.is_ascii_digit())
}

fn reward_points(text: &str) -> Option<FieldResult<String>> {
    let raw = REWARD_POINTS.captures(text)?.get(1)?.as_str();
    let points: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    (!points.is_empty()).then(|| FieldResult::new(raw, points, REWARDS_CONFIDENCE))
}

/// Line-level transaction heuristic.
///
/// `reference` is the statement end date; it resolves "Jan 15" style dates,
/// stepping back a year for months after the statement month.
pub fn extract_transactions(text: &str, currency: Currency, reference: Option<NaiveDate>) -> Vec<Transaction> {
    let dates = DateExtractor::new();

    text.lines()
        .filter_map(|line| {
            let line = line.trim();
            let caps = TRAILING_AMOUNT.captures(line)?;
            let amount_match = caps.get(1)?;
            let head = &line[..amount_match.start()];

            let (date, start, end) = match dates.extract(head) {
                Some(found) => {
                    let (start, end) = found.position?;
                    (found.value, start, end)
                }
                None => {
                    let prefix = SHORT_DATE_PREFIX.captures(head)?.get(1)?;
                    let date = resolve_short_date(prefix.as_str(), reference?)?;
                    (date, prefix.start(), prefix.end())
                }
            };

            let description = describe(&head[..start], &head[end..]);
            if !description.chars().any(char::is_alphabetic) || SUMMARY_LABEL.is_match(&description) {
                return None;
            }

            let mut amount = parse_amount(amount_match.as_str(), currency)?;
            if amount.value.is_zero() {
                return None;
            }
            let marked_credit = caps
                .get(2)
                .is_some_and(|m| m.as_str().eq_ignore_ascii_case("cr"));
            let credit = marked_credit || amount.value.is_sign_negative();
            amount.value = amount.value.abs();

            Some(Transaction {
                date,
                description,
                amount,
                credit,
            })
        })
        .collect()
}

fn resolve_short_date(raw: &str, reference: NaiveDate) -> Option<NaiveDate> {
    let date = normalize_date(&format!("{} {}", raw, reference.year()))?;
    if date.month() > reference.month() {
        date.with_year(reference.year() - 1)
    } else {
        Some(date)
    }
}

fn describe(before: &str, after: &str) -> String {
    // A second leading date (posting date) belongs to the date column
    let after = after.trim_start();
    let after = match DateExtractor::new().extract(after).and_then(|found| found.position) {
        Some((0, end)) => &after[end..],
        _ => after,
    };

    format!("{} {}", before, after)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| matches!(c, '-' | '|' | ':' | ','))
        .trim()
        .to_string()
}
