//! Common regex patterns for statement normalization and the optional-field heuristics.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Whole-string date shapes accepted by the normalizer
    pub static ref DATE_ISO: Regex = Regex::new(
        r"^(\d{4})-(\d{1,2})-(\d{1,2})$"
    ).unwrap();

    pub static ref DATE_NUMERIC_DMY: Regex = Regex::new(
        r"^(\d{1,2})[./\-](\d{1,2})[./\-](\d{4}|\d{2})$"
    ).unwrap();

    pub static ref DATE_COMPACT: Regex = Regex::new(
        r"^(\d{2})(\d{2})(\d{4})$"
    ).unwrap();

    pub static ref DATE_DAY_MONTH_NAME: Regex = Regex::new(
        r"^(\d{1,2})(?:st|nd|rd|th)?[\s\-/.]+([A-Za-z]{3,9})\.?,?[\s\-/.]+(\d{4}|\d{2})$"
    ).unwrap();

    pub static ref DATE_MONTH_NAME_DAY: Regex = Regex::new(
        r"^([A-Za-z]{3,9})\.?\s+(\d{1,2})(?:st|nd|rd|th)?,?\s+(\d{4}|\d{2})$"
    ).unwrap();

    // Date tokens inside free text
    pub static ref DATE_TOKEN: Regex = Regex::new(
        r"(?i)\b(?:\d{4}-\d{1,2}-\d{1,2}|\d{1,2}[./\-]\d{1,2}[./\-](?:\d{4}|\d{2})|\d{1,2}[\s\-/](?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]{0,6}\.?[\s\-/,]+(?:\d{4}|\d{2})|(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]{0,6}\.?\s+\d{1,2},?\s+\d{4})\b"
    ).unwrap();

    // "Jan 15" at line start, year taken from the statement period
    pub static ref SHORT_DATE_PREFIX: Regex = Regex::new(
        r"(?i)^((?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]{0,6}\.?\s+\d{1,2})\b"
    ).unwrap();

    // Currency markers
    pub static ref CURRENCY_INR: Regex = Regex::new(
        r"(?i)(?:\bRs\.?|₹|\bINR\b|\brupees?\b)"
    ).unwrap();

    pub static ref CURRENCY_USD: Regex = Regex::new(
        r"(?i)(?:\$|\bUSD\b|\bdollars?\b)"
    ).unwrap();

    pub static ref CURRENCY_GBP: Regex = Regex::new(
        r"(?i)(?:£|\bGBP\b|\bpounds?\b)"
    ).unwrap();

    pub static ref CURRENCY_EUR: Regex = Regex::new(
        r"(?i)(?:€|\bEUR\b|\beuros?\b)"
    ).unwrap();

    pub static ref DEBIT_CREDIT_MARKER: Regex = Regex::new(
        r"(?i)\b(?:cr|dr)\b\.?"
    ).unwrap();

    // Trailing two-decimal amount, optional currency and Cr/Dr markers
    pub static ref TRAILING_AMOUNT: Regex = Regex::new(
        r"(?i)((?:(?:\bRs\.?|\bINR|[₹$£€])\s*)?-?(?:\d{1,3}(?:,\d{2,3})+|\d+)\.\d{2})\s*(cr|dr)?\.?\s*$"
    ).unwrap();

    // Labeled optional fields; the value must sit on the label's line
    pub static ref MINIMUM_DUE: Regex = Regex::new(
        r"(?i)Minimum\s+(?:Amount\s+)?(?:Payment\s+)?Due[^\S\n]*(?:\(\s*Rs\.?\s*\))?[^\S\n]*[:\-]?[^\S\n]*((?:Rs\.?|INR|[₹$£€])?[^\S\n]*\d[\d,]*(?:\.\d{1,2})?)"
    ).unwrap();

    pub static ref PREVIOUS_BALANCE: Regex = Regex::new(
        r"(?i)(?:Previous|Opening|Last\s+Statement)\s+Balance[^\S\n]*(?:\(\s*Rs\.?\s*\))?[^\S\n]*[:\-]?[^\S\n]*((?:Rs\.?|INR|[₹$£€])?[^\S\n]*\d[\d,]*(?:\.\d{1,2})?)"
    ).unwrap();

    pub static ref AVAILABLE_CREDIT: Regex = Regex::new(
        r"(?i)Available\s+(?:Credit\s+Limit|Credit|Limit)[^\S\n]*(?:\(\s*Rs\.?\s*\))?[^\S\n]*[:\-]?[^\S\n]*((?:Rs\.?|INR|[₹$£€])?[^\S\n]*\d[\d,]*(?:\.\d{1,2})?)"
    ).unwrap();

    pub static ref REWARD_POINTS: Regex = Regex::new(
        r"(?i)Reward(?:s)?\s+Points?[^\S\n]*(?:Balance|Earned|Available|Summary)?[^\S\n]*[:\-]?[^\S\n]*(\d[\d,]*)"
    ).unwrap();
}

lazy_static! {
    // Summary rows that look like transactions but are not
    pub static ref SUMMARY_LABEL: Regex = Regex::new(
        r"(?i)\b(?:amount\s+due|total\s+dues?|minimum|balance|credit\s+limit|statement\s+(?:date|period)|payment\s+due|due\s+date|reward)"
    ).unwrap();
}
