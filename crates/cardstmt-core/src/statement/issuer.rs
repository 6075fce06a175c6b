//! Issuer detection by weighted pattern scoring.

use regex::Regex;
use tracing::{debug, info, warn};

use super::catalog::PatternCatalog;
use crate::models::config::ExtractionConfig;
use crate::models::statement::Issuer;

/// Weight of a match inside the header window.
const HEADER_WEIGHT: usize = 2;
/// Weight of a match inside the body window.
const BODY_WEIGHT: usize = 1;

/// Aggregate score for one issuer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IssuerCandidate {
    pub issuer: Issuer,
    pub score: usize,
}

/// Result of a detection call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    /// Winning issuer, or `Unknown` when nothing scored.
    pub issuer: Issuer,
    /// Winning score (0 for `Unknown`).
    pub score: usize,
    /// Every issuer with a nonzero score, in registration order.
    pub candidates: Vec<IssuerCandidate>,
}

/// Scores known issuers against statement text.
///
/// Each pattern counts once per match in the header window (first
/// `header_window` chars, weight 2) and once per match in the body window
/// (first `body_window` chars, weight 1). The strictly greatest total wins;
/// equal totals go to the issuer registered first.
pub struct IssuerDetector {
    issuers: Vec<(Issuer, Vec<Regex>)>,
    header_window: usize,
    body_window: usize,
}

impl IssuerDetector {
    pub fn new(catalog: &PatternCatalog) -> Self {
        let defaults = ExtractionConfig::default();
        Self {
            issuers: catalog
                .issuers
                .iter()
                .map(|p| (p.issuer, p.detection.clone()))
                .collect(),
            header_window: defaults.header_window,
            body_window: defaults.body_window,
        }
    }

    pub fn from_config(catalog: &PatternCatalog, config: &ExtractionConfig) -> Self {
        Self::new(catalog).with_windows(config.header_window, config.body_window)
    }

    /// Set header and body window sizes in characters.
    pub fn with_windows(mut self, header: usize, body: usize) -> Self {
        self.header_window = header;
        self.body_window = body.max(header);
        self
    }

    pub fn detect(&self, text: &str) -> Detection {
        let header = char_prefix(text, self.header_window);
        let body = char_prefix(text, self.body_window);

        let candidates: Vec<IssuerCandidate> = self
            .issuers
            .iter()
            .map(|(issuer, patterns)| {
                let score = patterns
                    .iter()
                    .map(|p| {
                        p.find_iter(header).count() * HEADER_WEIGHT
                            + p.find_iter(body).count() * BODY_WEIGHT
                    })
                    .sum();
                IssuerCandidate {
                    issuer: *issuer,
                    score,
                }
            })
            .filter(|c| c.score > 0)
            .collect();

        for candidate in &candidates {
            debug!("Issuer detection - {}: score {}", candidate.issuer, candidate.score);
        }

        let best = candidates
            .iter()
            .fold(None::<IssuerCandidate>, |best, c| match best {
                Some(b) if b.score >= c.score => Some(b),
                _ => Some(*c),
            });

        match best {
            Some(best) => {
                info!("Detected issuer: {} (score: {})", best.issuer, best.score);
                Detection {
                    issuer: best.issuer,
                    score: best.score,
                    candidates,
                }
            }
            None => {
                warn!("No issuer detected");
                Detection {
                    issuer: Issuer::Unknown,
                    score: 0,
                    candidates,
                }
            }
        }
    }
}

/// The first `n` characters of `text`, respecting char boundaries.
fn char_prefix(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
