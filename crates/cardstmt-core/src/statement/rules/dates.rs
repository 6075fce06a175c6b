//! Date normalization for statement fields.

use chrono::{Datelike, NaiveDate};

use super::patterns::{
    DATE_COMPACT, DATE_DAY_MONTH_NAME, DATE_ISO, DATE_MONTH_NAME_DAY, DATE_NUMERIC_DMY, DATE_TOKEN,
};
use super::{ExtractionMatch, FieldExtractor};
use crate::models::statement::DateRange;

/// Finds date tokens in free text.
pub struct DateExtractor;

impl DateExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DateExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for DateExtractor {
    type Output = ExtractionMatch<NaiveDate>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        DATE_TOKEN
            .find_iter(text)
            .filter_map(|m| {
                normalize_date(m.as_str()).map(|date| {
                    ExtractionMatch::new(date, 0.9, m.as_str()).with_position(m.start(), m.end())
                })
            })
            .collect()
    }
}

/// Normalize a raw date string into a calendar date.
///
/// Accepts `DD-Mon-YYYY`, `DDMMYYYY`, `Month D, YYYY`, `DD/MM/YYYY`,
/// `YYYY-MM-DD`, `D Month YYYY`, `D Mon YY`, `DD-MM-YYYY`, `DD.MM.YYYY`
/// and `DD/Mon/YYYY`. Numeric dates are day-first. Returns `None` for
/// anything else, including impossible calendar dates.
pub fn normalize_date(raw: &str) -> Option<NaiveDate> {
    let cleaned = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let cleaned = cleaned.trim_matches(|c: char| c == ',' || c == ':' || c == ';');
    if cleaned.is_empty() {
        return None;
    }

    if let Some(caps) = DATE_ISO.captures(cleaned) {
        return ymd(caps[1].parse().ok()?, caps[2].parse().ok()?, caps[3].parse().ok()?);
    }

    if let Some(caps) = DATE_COMPACT.captures(cleaned) {
        return ymd(caps[3].parse().ok()?, caps[2].parse().ok()?, caps[1].parse().ok()?);
    }

    if let Some(caps) = DATE_NUMERIC_DMY.captures(cleaned) {
        return ymd(parse_year(&caps[3])?, caps[2].parse().ok()?, caps[1].parse().ok()?);
    }

    if let Some(caps) = DATE_DAY_MONTH_NAME.captures(cleaned) {
        let month = month_from_name(&caps[2])?;
        return ymd(parse_year(&caps[3])?, month, caps[1].parse().ok()?);
    }

    if let Some(caps) = DATE_MONTH_NAME_DAY.captures(cleaned) {
        let month = month_from_name(&caps[1])?;
        return ymd(parse_year(&caps[3])?, month, caps[2].parse().ok()?);
    }

    None
}

/// Normalize a start/end pair into a range.
///
/// A start without a year ("January 1") borrows the end date's year,
/// stepping back one year if that would place it after the end.
pub fn normalize_date_range(start_raw: &str, end_raw: &str) -> Option<DateRange> {
    let end = normalize_date(end_raw)?;
    let start = match normalize_date(start_raw) {
        Some(start) => start,
        None => {
            let start = normalize_date(&format!("{} {}", start_raw.trim(), end.year()))?;
            if start > end {
                start.with_year(end.year() - 1)?
            } else {
                start
            }
        }
    };
    Some(DateRange::new(start, end))
}

/// Outcome of a billing-period sanity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodCheck {
    /// Start before end, 20 to 40 days apart.
    Valid,
    /// Start before end, but an unusual cycle length in days.
    Unusual(i64),
    /// Start on or after end.
    Inverted,
}

/// Check that a billing period is ordered and roughly one cycle long.
pub fn validate_date_range(start: NaiveDate, end: NaiveDate) -> PeriodCheck {
    if start >= end {
        return PeriodCheck::Inverted;
    }
    let days = (end - start).num_days();
    if !(20..=40).contains(&days) {
        PeriodCheck::Unusual(days)
    } else {
        PeriodCheck::Valid
    }
}

/// True if `date` lies between `today` and `today + tolerance_days`.
pub fn is_future_date(date: NaiveDate, today: NaiveDate, tolerance_days: i64) -> bool {
    let diff = (date - today).num_days();
    (0..=tolerance_days).contains(&diff)
}

/// Resolve a month name or abbreviation ("Mar", "March", "Sept").
pub fn month_from_name(name: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "january", "february", "march", "april", "may", "june", "july", "august", "september",
        "october", "november", "december",
    ];
    let name = name.trim_end_matches('.').to_lowercase();
    if name.len() < 3 {
        return None;
    }
    MONTHS
        .iter()
        .position(|m| m.starts_with(name.as_str()))
        .map(|i| i as u32 + 1)
}

fn parse_year(s: &str) -> Option<i32> {
    let year: i32 = s.parse().ok()?;
    Some(match (s.len(), year) {
        // Two-digit year: 00-49 is 2000s, 50-99 is 1900s
        (2, y) if y < 50 => 2000 + y,
        (2, y) => 1900 + y,
        (_, y) => y,
    })
}

fn ymd(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
}
