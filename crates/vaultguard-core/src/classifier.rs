use serde::Serialize;
use tracing::{info, warn};

use crate::extractor::ExtractionOutcome;
use crate::thresholds::Thresholds;

/// Non-deleted source rows against the vault-side count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CountComparison {
    pub source_nondeleted: u64,
    pub vault: u64,
    pub difference: u64,
}

impl CountComparison {
    pub fn new(source_nondeleted: u64, vault: u64) -> Self {
        Self {
            source_nondeleted,
            vault,
            difference: source_nondeleted.abs_diff(vault),
        }
    }
}

/// Final split of the raw difference count of one mapping.
///
/// `true_missing_count + representation_difference_count` always equals the
/// raw count reported by the extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    pub true_missing_count: u64,
    pub representation_difference_count: u64,
    pub message: String,
}

pub struct DiscrepancyClassifier<'a> {
    thresholds: &'a Thresholds,
}

impl<'a> DiscrepancyClassifier<'a> {
    pub fn new(thresholds: &'a Thresholds) -> Self {
        Self { thresholds }
    }

    /// Split the extraction result, then cross-check it against the
    /// mapping-level count gap.
    pub fn classify(
        &self,
        extraction: &ExtractionOutcome,
        counts: &CountComparison,
    ) -> ValidationOutcome {
        let mut outcome = Self::initial_split(extraction);
        if outcome.true_missing_count == 0 {
            return outcome;
        }

        let expected = counts.difference;
        let reported = outcome.true_missing_count;
        // Unrounded, unlike the extractor and bizview thresholds.
        let tolerance = (self.thresholds.cross_check_small_gap as f64)
            .max(expected as f64 * self.thresholds.cross_check_ratio);
        if reported.abs_diff(expected) as f64 <= tolerance {
            return outcome;
        }

        warn!(
            reported,
            expected, "Reported differences do not match the count difference"
        );
        outcome.message.push_str(&format!(
            " Count comparison shows expected diff of {} vs. reported {}.",
            expected, reported
        ));

        if expected < self.thresholds.cross_check_small_gap
            && reported > self.thresholds.cross_check_large_report
        {
            info!(reported, "Small count gap: reclassifying differences as representation");
            outcome.representation_difference_count += reported;
            outcome.true_missing_count = 0;
            outcome.message.push_str(
                " Based on count comparison, there appears to be no actual data loss, only representation differences.",
            );
        }
        outcome
    }

    fn initial_split(extraction: &ExtractionOutcome) -> ValidationOutcome {
        let (true_missing_count, representation_difference_count) =
            if extraction.representation_only {
                let missing = extraction
                    .key_only_missing
                    .unwrap_or_default()
                    .min(extraction.raw_count);
                (missing, extraction.raw_count - missing)
            } else {
                (extraction.difference_count, 0)
            };
        ValidationOutcome {
            true_missing_count,
            representation_difference_count,
            message: extraction.message.clone(),
        }
    }
}
