//! Issuer to extractor mapping.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::StatementExtractor;
use super::catalog::PatternCatalog;
use super::extractor::CatalogExtractor;
use crate::models::statement::Issuer;

/// Maps each issuer to its extractor, falling back to a default extractor
/// for `Unknown` and for any issuer without an entry.
pub struct ExtractorRegistry {
    extractors: HashMap<Issuer, Arc<dyn StatementExtractor>>,
    default: Arc<dyn StatementExtractor>,
}

impl ExtractorRegistry {
    /// Registry with an empty map; everything goes to `default`.
    pub fn new(default: Arc<dyn StatementExtractor>) -> Self {
        Self {
            extractors: HashMap::new(),
            default,
        }
    }

    /// One catalog extractor per catalog issuer, generic rules as default.
    pub fn from_catalog(catalog: &PatternCatalog) -> Self {
        let mut registry = Self::new(Arc::new(CatalogExtractor::generic(catalog)));
        for profile in &catalog.issuers {
            registry.register(Arc::new(CatalogExtractor::new(
                profile.clone(),
                catalog.period_fallback.clone(),
            )));
        }
        debug!("Registered {} issuer extractors", registry.len());
        registry
    }

    /// Add or replace the extractor for `extractor.issuer()`.
    pub fn register(&mut self, extractor: Arc<dyn StatementExtractor>) {
        self.extractors.insert(extractor.issuer(), extractor);
    }

    pub fn get(&self, issuer: Issuer) -> Arc<dyn StatementExtractor> {
        self.extractors
            .get(&issuer)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }

    pub fn contains(&self, issuer: Issuer) -> bool {
        self.extractors.contains_key(&issuer)
    }

    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_every_catalog_issuer_registered() {
        let catalog = PatternCatalog::embedded().unwrap();
        let registry = ExtractorRegistry::from_catalog(&catalog);

        assert_eq!(registry.len(), catalog.issuers.len());
        for profile in &catalog.issuers {
            assert_eq!(registry.get(profile.issuer).issuer(), profile.issuer);
        }
    }

    #[test]
    fn test_unknown_falls_back_to_default() {
        let catalog = PatternCatalog::embedded().unwrap();
        let registry = ExtractorRegistry::from_catalog(&catalog);

        assert!(!registry.contains(Issuer::Unknown));
        assert_eq!(registry.get(Issuer::Unknown).issuer(), Issuer::Unknown);
    }

    #[test]
    fn test_missing_entry_falls_back_to_default() {
        let catalog = PatternCatalog::embedded().unwrap();
        let registry = ExtractorRegistry::new(Arc::new(CatalogExtractor::generic(&catalog)));

        assert!(registry.is_empty());
        assert_eq!(registry.get(Issuer::Hdfc).issuer(), Issuer::Unknown);
    }
}
