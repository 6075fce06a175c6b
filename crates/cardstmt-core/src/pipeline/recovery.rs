//! Zero-amount recovery pass.

use tracing::{debug, info};

use crate::error::Result;
use crate::models::statement::{BackendKind, ParseOutcome};

/// Reruns extraction on alternate backends when the total amount came back
/// missing or zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecoveryController;

impl RecoveryController {
    pub fn new() -> Self {
        Self
    }

    /// Alternates to try, in order, after `primary` produced a zero total.
    pub fn alternates(primary: BackendKind) -> &'static [BackendKind] {
        match primary {
            BackendKind::Ocr => &[BackendKind::Lopdf, BackendKind::PdfExtract],
            BackendKind::Lopdf => &[BackendKind::PdfExtract, BackendKind::Ocr],
            BackendKind::PdfExtract => &[BackendKind::Lopdf, BackendKind::Ocr],
        }
    }

    /// Replace `outcome` with the first alternate rerun that yields a
    /// nonzero total.
    ///
    /// `rerun` extracts with one backend and re-applies the field
    /// extractor for the already detected issuer. Failed reruns are
    /// skipped; if none recovers, the original outcome is returned.
    pub fn recover<F>(&self, outcome: ParseOutcome, mut rerun: F) -> ParseOutcome
    where
        F: FnMut(BackendKind) -> Result<ParseOutcome>,
    {
        if !outcome.needs_recovery() {
            return outcome;
        }

        let primary = outcome.metadata.backend;
        info!("Total amount missing from {} output, starting recovery", primary);

        for &alternate in Self::alternates(primary) {
            match rerun(alternate) {
                Ok(mut candidate) if !candidate.needs_recovery() => {
                    info!("Recovered total amount with {}", alternate);
                    candidate.metadata.recovered_from = Some(primary);
                    return candidate;
                }
                Ok(_) => debug!("{} also produced no total amount", alternate),
                Err(e) => debug!("Skipping {} during recovery: {}", alternate, e),
            }
        }

        debug!("Recovery exhausted, keeping {} outcome", primary);
        outcome
    }
}
