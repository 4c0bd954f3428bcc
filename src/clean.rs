//! Ingestion-time outlier cleaner.
//!
//! Every measured field is scored against the population mean and standard
//! deviation of the whole normalized batch. A record is dropped when any of
//! its fields scores beyond the threshold. Survivors keep their input order.

use tracing::debug;

use crate::models::{CleaningReport, Field, Observation};
use crate::stats::ZScorer;

// ---

pub const DEFAULT_ZSCORE_THRESHOLD: f64 = 3.0;

/// Human-readable method label stored in the report, e.g. `z-score with threshold 3.0`.
pub fn method_description(threshold: f64) -> String {
    format!("z-score with threshold {threshold:?}")
}

/// Remove records with any `|z| > threshold` and report the counts.
///
/// With fewer than two observations every field has zero spread, so nothing
/// is removed.
pub fn clean(observations: Vec<Observation>, threshold: f64) -> (Vec<Observation>, CleaningReport) {
    // ---
    let scorers: Vec<(Field, ZScorer)> = Field::ALL
        .iter()
        .map(|&field| {
            let values: Vec<f64> = observations.iter().map(|o| o.value(field)).collect();
            (field, ZScorer::fit(&values))
        })
        .collect();

    for (field, scorer) in &scorers {
        debug!(
            "Cleaner fit {}: mean={:.4} std={:.4}",
            field, scorer.mean, scorer.std
        );
    }

    let original_count = observations.len();
    let cleaned: Vec<Observation> = observations
        .into_iter()
        .filter(|obs| {
            !scorers
                .iter()
                .any(|(field, scorer)| scorer.score(obs.value(*field)).abs() > threshold)
        })
        .collect();

    let report = CleaningReport {
        original_count,
        removed_count: original_count - cleaned.len(),
        remaining_count: cleaned.len(),
        rejected_rows: 0,
        method_description: method_description(threshold),
    };
    (cleaned, report)
}
