//! Versioned pattern catalog: per-issuer detection patterns and field rules.
//!
//! The catalog ships embedded in the binary and can be replaced at start-up
//! by a JSON file of the same shape. Issuer order in the document is the
//! registration order, which is also the detector's tie-break priority.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ExtractionError, Result};
use crate::models::config::ExtractionConfig;
use crate::models::statement::{Currency, Issuer};

const EMBEDDED_CATALOG: &str = include_str!("../../data/catalog.json");

/// One pattern with its confidence ceiling, as stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDef {
    pub pattern: String,
    pub confidence: f32,
}

/// Field rule lists for one profile, as stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldRuleDefs {
    pub issuer_name: Vec<RuleDef>,
    pub card_number: Vec<RuleDef>,
    pub statement_period: Vec<RuleDef>,
    pub due_date: Vec<RuleDef>,
    pub total_amount: Vec<RuleDef>,
}

/// The generic profile used for unrecognized issuers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenericDef {
    pub default_currency: String,
    #[serde(flatten)]
    pub fields: FieldRuleDefs,
}

/// One issuer entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuerDef {
    pub issuer: String,
    pub default_currency: String,
    #[serde(default)]
    pub detection: Vec<String>,
    #[serde(flatten)]
    pub fields: FieldRuleDefs,
}

/// The catalog document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogDef {
    pub version: String,
    pub issuers: Vec<IssuerDef>,
    pub generic: GenericDef,
    #[serde(default)]
    pub period_fallback: Vec<RuleDef>,
}

/// A compiled pattern rule.
#[derive(Debug, Clone)]
pub struct Rule {
    pub regex: Regex,
    pub confidence: f32,
}

/// Compiled rule lists for the five mandatory fields.
#[derive(Debug, Clone, Default)]
pub struct FieldRules {
    pub issuer_name: Vec<Rule>,
    pub card_number: Vec<Rule>,
    pub statement_period: Vec<Rule>,
    pub due_date: Vec<Rule>,
    pub total_amount: Vec<Rule>,
}

/// Everything known about one issuer's statement layouts.
#[derive(Debug, Clone)]
pub struct IssuerProfile {
    pub issuer: Issuer,
    pub default_currency: Currency,
    pub detection: Vec<Regex>,
    pub rules: FieldRules,
}

/// The compiled, read-only catalog shared by the detector and extractors.
#[derive(Debug, Clone)]
pub struct PatternCatalog {
    pub version: String,
    pub issuers: Vec<IssuerProfile>,
    pub generic: IssuerProfile,
    pub period_fallback: Arc<[Rule]>,
}

impl PatternCatalog {
    /// The catalog bundled with the library.
    pub fn embedded() -> Result<Self> {
        Self::from_json(EMBEDDED_CATALOG)
    }

    /// Embedded catalog, or the file named by `catalog_path`.
    pub fn load(config: &ExtractionConfig) -> Result<Self> {
        match &config.catalog_path {
            Some(path) => Self::from_file(path),
            None => Self::embedded(),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let catalog = Self::from_json(&content)?;
        info!("Loaded pattern catalog {} from {}", catalog.version, path.display());
        Ok(catalog)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let def: CatalogDef = serde_json::from_str(json)
            .map_err(|e| ExtractionError::Catalog(e.to_string()))?;
        Self::compile(def)
    }

    /// Compile every pattern; a single bad pattern rejects the catalog.
    pub fn compile(def: CatalogDef) -> Result<Self> {
        let mut issuers: Vec<IssuerProfile> = Vec::with_capacity(def.issuers.len());

        for entry in &def.issuers {
            let issuer = Issuer::from_str(&entry.issuer)
                .map_err(ExtractionError::UnknownIssuer)?;
            if issuer == Issuer::Unknown {
                return Err(ExtractionError::Catalog(
                    "`unknown` is reserved for the generic profile".to_string(),
                ).into());
            }
            if issuers.iter().any(|p| p.issuer == issuer) {
                return Err(ExtractionError::Catalog(format!("duplicate issuer entry: {}", issuer)).into());
            }

            let detection = entry
                .detection
                .iter()
                .map(|p| compile_pattern(p, issuer.tag(), "detection"))
                .collect::<Result<Vec<_>>>()?;

            issuers.push(IssuerProfile {
                issuer,
                default_currency: parse_currency(&entry.default_currency)?,
                detection,
                rules: compile_fields(&entry.fields, issuer.tag())?,
            });
        }

        let generic = IssuerProfile {
            issuer: Issuer::Unknown,
            default_currency: parse_currency(&def.generic.default_currency)?,
            detection: Vec::new(),
            rules: compile_fields(&def.generic.fields, "generic")?,
        };

        let period_fallback = compile_rules(&def.period_fallback, "generic", "period_fallback")?;

        debug!(
            "Compiled catalog {}: {} issuers, {} fallback period rules",
            def.version,
            issuers.len(),
            period_fallback.len()
        );

        Ok(Self {
            version: def.version,
            issuers,
            generic,
            period_fallback: period_fallback.into(),
        })
    }

    /// Profile for an issuer, if the catalog has one.
    pub fn profile(&self, issuer: Issuer) -> Option<&IssuerProfile> {
        self.issuers.iter().find(|p| p.issuer == issuer)
    }
}

fn parse_currency(code: &str) -> Result<Currency> {
    Currency::from_str(code)
        .map_err(|c| ExtractionError::Catalog(format!("unsupported currency: {}", c)).into())
}

fn compile_fields(def: &FieldRuleDefs, owner: &str) -> Result<FieldRules> {
    Ok(FieldRules {
        issuer_name: compile_rules(&def.issuer_name, owner, "issuer_name")?,
        card_number: compile_rules(&def.card_number, owner, "card_number")?,
        statement_period: compile_rules(&def.statement_period, owner, "statement_period")?,
        due_date: compile_rules(&def.due_date, owner, "due_date")?,
        total_amount: compile_rules(&def.total_amount, owner, "total_amount")?,
    })
}

fn compile_rules(defs: &[RuleDef], owner: &str, field: &str) -> Result<Vec<Rule>> {
    defs
        .iter()
        .map(|def| {
            Ok(Rule {
                regex: compile_pattern(&def.pattern, owner, field)?,
                confidence: def.confidence.clamp(0.0, 1.0),
            })
        })
        .collect()
}

fn compile_pattern(pattern: &str, owner: &str, field: &str) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| {
            ExtractionError::InvalidPattern {
                issuer: owner.to_string(),
                field: field.to_string(),
                pattern: pattern.to_string(),
                reason: e.to_string(),
            }
            .into()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StatementError;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_embedded_catalog_compiles() {
        let catalog = PatternCatalog::embedded().unwrap();
        let order: Vec<Issuer> = catalog.issuers.iter().map(|p| p.issuer).collect();
        assert_eq!(
            order,
            vec![
                Issuer::Kotak,
                Issuer::Hdfc,
                Issuer::Icici,
                Issuer::Amex,
                Issuer::CapitalOne,
                Issuer::Idfc,
                Issuer::Axis,
            ]
        );
        assert_eq!(catalog.generic.issuer, Issuer::Unknown);
        assert!(!catalog.period_fallback.is_empty());
        assert_eq!(catalog.profile(Issuer::CapitalOne).unwrap().default_currency, Currency::Gbp);
    }

    #[test]
    fn test_every_issuer_has_detection_and_rules() {
        let catalog = PatternCatalog::embedded().unwrap();
        for profile in &catalog.issuers {
            assert!(!profile.detection.is_empty(), "{} has no detection patterns", profile.issuer);
            assert!(!profile.rules.total_amount.is_empty(), "{} has no amount rules", profile.issuer);
            assert!(!profile.rules.due_date.is_empty(), "{} has no due date rules", profile.issuer);
        }
    }

    #[test]
    fn test_patterns_are_case_insensitive() {
        let catalog = PatternCatalog::embedded().unwrap();
        let hdfc = catalog.profile(Issuer::Hdfc).unwrap();
        assert!(hdfc.detection[0].is_match("hdfc bank"));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let json = r#"{
            "version": "test",
            "issuers": [{"issuer": "hdfc", "default_currency": "INR", "detection": ["(unclosed"]}],
            "generic": {"default_currency": "INR"}
        }"#;
        let err = PatternCatalog::from_json(json).unwrap_err();
        assert!(matches!(
            err,
            StatementError::Extraction(ExtractionError::InvalidPattern { ref field, .. }) if field == "detection"
        ));
    }

    #[test]
    fn test_unknown_issuer_tag_is_rejected() {
        let json = r#"{
            "version": "test",
            "issuers": [{"issuer": "barclays", "default_currency": "GBP"}],
            "generic": {"default_currency": "INR"}
        }"#;
        let err = PatternCatalog::from_json(json).unwrap_err();
        assert!(matches!(err, StatementError::Extraction(ExtractionError::UnknownIssuer(_))));
    }

    #[test]
    fn test_duplicate_issuer_is_rejected() {
        let json = r#"{
            "version": "test",
            "issuers": [
                {"issuer": "hdfc", "default_currency": "INR"},
                {"issuer": "hdfc", "default_currency": "INR"}
            ],
            "generic": {"default_currency": "INR"}
        }"#;
        assert!(PatternCatalog::from_json(json).is_err());
    }
}
