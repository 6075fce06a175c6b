//! Amount and currency normalization.

use rust_decimal::Decimal;
use std::str::FromStr;

use super::patterns::{CURRENCY_EUR, CURRENCY_GBP, CURRENCY_INR, CURRENCY_USD, DEBIT_CREDIT_MARKER};
use crate::models::statement::{Amount, Currency};

/// Detect a currency marker (symbol, code or word) in text.
pub fn detect_currency(text: &str) -> Option<Currency> {
    [
        (&*CURRENCY_INR, Currency::Inr),
        (&*CURRENCY_USD, Currency::Usd),
        (&*CURRENCY_GBP, Currency::Gbp),
        (&*CURRENCY_EUR, Currency::Eur),
    ]
    .into_iter()
    .find(|(pattern, _)| pattern.is_match(text))
    .map(|(_, currency)| currency)
}

/// Parse a raw amount such as `Rs. 4,78,387.66`, `£1,234.56`, `1.234,56` or `(250.00) Cr`.
///
/// The currency comes from a marker in `raw` when present, otherwise `default_currency`.
pub fn parse_amount(raw: &str, default_currency: Currency) -> Option<Amount> {
    let currency = detect_currency(raw).unwrap_or(default_currency);

    let stripped = [&*CURRENCY_INR, &*CURRENCY_USD, &*CURRENCY_GBP, &*CURRENCY_EUR]
        .iter()
        .fold(raw.to_string(), |acc, pattern| pattern.replace_all(&acc, "").into_owned());
    let stripped = DEBIT_CREDIT_MARKER.replace_all(&stripped, "");

    let cleaned: String = stripped
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '(' && *c != ')')
        .collect();
    if cleaned.is_empty() || !cleaned.chars().all(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-')) {
        return None;
    }

    let value = parse_number(&cleaned)?;
    Some(Amount::new(value, currency))
}

/// Parse a bare number, deciding which of `,` / `.` is the decimal separator.
pub fn parse_number(s: &str) -> Option<Decimal> {
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    if !digits.chars().any(|c| c.is_ascii_digit()) || digits.contains('-') {
        return None;
    }

    let comma = digits.rfind(',');
    let dot = digits.rfind('.');
    let normalized = match (comma, dot) {
        // Both present: the later one is the decimal separator
        (Some(c), Some(d)) if c > d => digits.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => digits.replace(',', ""),
        // Single comma followed by exactly two digits reads as a decimal comma
        (Some(c), None) if digits.matches(',').count() == 1 && digits.len() - c - 1 == 2 => {
            digits.replace(',', ".")
        }
        (Some(_), None) => digits.replace(',', ""),
        (None, Some(_)) if digits.matches('.').count() > 1 => digits.replace('.', ""),
        _ => digits.to_string(),
    };

    let value = Decimal::from_str(&normalized).ok()?;
    Some(if negative { -value } else { value })
}

/// Format an amount with its currency symbol and thousands grouping (`₹45,240.00`).
pub fn format_amount(amount: &Amount) -> String {
    let s = format!("{:.2}", amount.value.abs());
    let (integer_part, decimal_part) = s.split_once('.').unwrap_or((s.as_str(), "00"));

    let chars: Vec<char> = integer_part.chars().collect();
    let mut grouped = String::new();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(*c);
    }

    let sign = if amount.value.is_sign_negative() && !amount.value.is_zero() { "-" } else { "" };
    format!("{}{}{}.{}", sign, amount.currency.symbol(), grouped, decimal_part)
}

/// Plausibility range for a statement amount: 0.01 to 10,000,000.
pub fn validate_amount(value: Decimal) -> bool {
    value >= Decimal::new(1, 2) && value <= Decimal::from(10_000_000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_amount_formats() {
        assert_eq!(parse_amount("45,240.00", Currency::Inr), Some(Amount::new(dec("45240.00"), Currency::Inr)));
        assert_eq!(parse_amount("Rs. 4,78,387.66", Currency::Usd), Some(Amount::new(dec("478387.66"), Currency::Inr)));
        assert_eq!(parse_amount("£1,234.56", Currency::Inr), Some(Amount::new(dec("1234.56"), Currency::Gbp)));
        assert_eq!(parse_amount("1.234,56 EUR", Currency::Inr), Some(Amount::new(dec("1234.56"), Currency::Eur)));
        assert_eq!(parse_amount("$ 99", Currency::Inr), Some(Amount::new(dec("99"), Currency::Usd)));
        assert_eq!(parse_amount("₹ 12,500", Currency::Gbp), Some(Amount::new(dec("12500"), Currency::Inr)));
    }

    #[test]
    fn test_parse_amount_strips_markers() {
        assert_eq!(parse_amount("2,262.00 Dr", Currency::Inr), Some(Amount::new(dec("2262.00"), Currency::Inr)));
        assert_eq!(parse_amount("(250.00) Cr", Currency::Inr), Some(Amount::new(dec("250.00"), Currency::Inr)));
    }

    #[test]
    fn test_parse_amount_rejects_garbage() {
        assert_eq!(parse_amount("", Currency::Inr), None);
        assert_eq!(parse_amount("Rs.", Currency::Inr), None);
        assert_eq!(parse_amount("28/06/2019", Currency::Inr), None);
        assert_eq!(parse_amount("abc", Currency::Inr), None);
    }

    #[test]
    fn test_parse_number_separators() {
        assert_eq!(parse_number("1234,56"), Some(dec("1234.56")));
        assert_eq!(parse_number("1,234"), Some(dec("1234")));
        assert_eq!(parse_number("1.234.567"), Some(dec("1234567")));
        assert_eq!(parse_number("-15.50"), Some(dec("-15.50")));
    }

    #[test]
    fn test_detect_currency() {
        assert_eq!(detect_currency("Total Amount Due Rs. 100"), Some(Currency::Inr));
        assert_eq!(detect_currency("New balance £ 20.00"), Some(Currency::Gbp));
        assert_eq!(detect_currency("500 dollars"), Some(Currency::Usd));
        assert_eq!(detect_currency("€10"), Some(Currency::Eur));
        assert_eq!(detect_currency("45,240.00"), None);
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(&Amount::new(dec("45240"), Currency::Inr)), "₹45,240.00");
        assert_eq!(format_amount(&Amount::new(dec("1234567.5"), Currency::Gbp)), "£1,234,567.50");
        assert_eq!(format_amount(&Amount::new(dec("-12.3"), Currency::Usd)), "-$12.30");
    }

    #[test]
    fn test_validate_amount() {
        assert!(validate_amount(dec("0.01")));
        assert!(validate_amount(dec("10000000")));
        assert!(!validate_amount(dec("0")));
        assert!(!validate_amount(dec("10000000.01")));
    }
}
