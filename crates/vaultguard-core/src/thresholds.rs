//! Heuristic constants used to classify discrepancies.
//!
//! Every value here changes classification outcomes. They are kept as named
//! constants, gathered in [`Thresholds`] so a configuration file can override
//! them, and never derived at runtime.

use serde::Deserialize;

use crate::errors::ConfigError;

/// Minimum absolute threshold applied on top of every relative one.
pub const ABSOLUTE_FLOOR: u64 = 5;
/// Source/vault size gap tolerated before a difference is treated as real loss.
pub const COUNT_GAP_RATIO: f64 = 0.01;
/// Differences above `multiplier * count_gap` point to representation noise.
pub const REPRESENTATION_MULTIPLIER: u64 = 2;
/// Key-only misses below `difference_count / divisor` confirm representation noise.
pub const KEY_ONLY_DIVISOR: u64 = 10;
/// Allowed deviation between reported and expected differences in the cross-check.
pub const CROSS_CHECK_RATIO: f64 = 0.1;
pub const CROSS_CHECK_SMALL_GAP: u64 = 5;
pub const CROSS_CHECK_LARGE_REPORT: u64 = 10;
pub const DIMENSION_RATIO: f64 = 0.05;
pub const FACT_RATIO: f64 = 0.20;
pub const UNKNOWN_RATIO: f64 = 0.10;
/// A filtering view losing this share of its reference or more is still reported.
pub const FILTERING_MAX_RATIO: f64 = 0.95;
pub const DEFAULT_SAMPLE_LIMIT: usize = 10;
pub const LARGE_DIFFERENCE_CUTOFF: u64 = 100;
pub const LARGE_DIFFERENCE_SAMPLE_CAP: usize = 10;
pub const SUSPICIOUSLY_LOW_COUNT: u64 = 100;
pub const PROBE_LIMIT: u64 = 10_000;
pub const EXPANDED_PROBE_LIMIT: u64 = 1_000_000;

/// `max(floor, round(count * ratio))`
pub fn adaptive_threshold(count: u64, ratio: f64, floor: u64) -> u64 {
    let relative = (count as f64 * ratio).round() as u64;
    floor.max(relative)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub absolute_floor: u64,
    pub count_gap_ratio: f64,
    pub representation_multiplier: u64,
    pub key_only_divisor: u64,
    pub cross_check_ratio: f64,
    pub cross_check_small_gap: u64,
    pub cross_check_large_report: u64,
    pub dimension_ratio: f64,
    pub fact_ratio: f64,
    pub unknown_ratio: f64,
    pub filtering_max_ratio: f64,
    pub sample_limit: usize,
    pub large_difference_cutoff: u64,
    pub large_difference_sample_cap: usize,
    pub suspiciously_low_count: u64,
    pub probe_limit: u64,
    pub expanded_probe_limit: u64,
    /// Bizviews counted with a plain `COUNT(*)` straight away (upper case, unqualified).
    pub known_large_views: Vec<String>,
    /// Bizviews allowed to have fewer than `suspiciously_low_count` keys.
    pub small_lookup_views: Vec<String>,
    /// Name fragments marking a current satellite (one row per hash key).
    pub current_satellite_markers: Vec<String>,
    /// Regexes on the lower-cased view name for views that filter on purpose.
    pub filtering_patterns: Vec<String>,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            absolute_floor: ABSOLUTE_FLOOR,
            count_gap_ratio: COUNT_GAP_RATIO,
            representation_multiplier: REPRESENTATION_MULTIPLIER,
            key_only_divisor: KEY_ONLY_DIVISOR,
            cross_check_ratio: CROSS_CHECK_RATIO,
            cross_check_small_gap: CROSS_CHECK_SMALL_GAP,
            cross_check_large_report: CROSS_CHECK_LARGE_REPORT,
            dimension_ratio: DIMENSION_RATIO,
            fact_ratio: FACT_RATIO,
            unknown_ratio: UNKNOWN_RATIO,
            filtering_max_ratio: FILTERING_MAX_RATIO,
            sample_limit: DEFAULT_SAMPLE_LIMIT,
            large_difference_cutoff: LARGE_DIFFERENCE_CUTOFF,
            large_difference_sample_cap: LARGE_DIFFERENCE_SAMPLE_CAP,
            suspiciously_low_count: SUSPICIOUSLY_LOW_COUNT,
            probe_limit: PROBE_LIMIT,
            expanded_probe_limit: EXPANDED_PROBE_LIMIT,
            known_large_views: vec!["FACT_SALES".to_string(), "FACT_TRANSACTIONS".to_string()],
            small_lookup_views: vec!["DIM_SMALL_LOOKUP".to_string(), "DIM_CONFIG".to_string()],
            current_satellite_markers: vec!["_LROC_".to_string(), "_MROC_".to_string()],
            filtering_patterns: vec![
                "^fact_".to_string(),
                "_current$".to_string(),
                "_active$".to_string(),
            ],
        }
    }
}

impl Thresholds {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ratios = [
            ("count_gap_ratio", self.count_gap_ratio),
            ("cross_check_ratio", self.cross_check_ratio),
            ("dimension_ratio", self.dimension_ratio),
            ("fact_ratio", self.fact_ratio),
            ("unknown_ratio", self.unknown_ratio),
            ("filtering_max_ratio", self.filtering_max_ratio),
        ];
        for (name, value) in ratios {
            if !value.is_finite() || value < 0. {
                return Err(ConfigError::InvalidRatio {
                    name: name.to_string(),
                    value,
                });
            }
        }
        Ok(())
    }

    /// Sample size for a given difference count: large differences are capped.
    pub fn sample_size(&self, limit: usize, difference_count: u64) -> usize {
        if difference_count > self.large_difference_cutoff {
            limit.min(self.large_difference_sample_cap)
        } else {
            limit
        }
    }

    pub fn with_sample_limit(self, sample_limit: usize) -> Self {
        Self {
            sample_limit,
            ..self
        }
    }

    pub fn with_absolute_floor(self, absolute_floor: u64) -> Self {
        Self {
            absolute_floor,
            ..self
        }
    }

    pub fn with_filtering_patterns(self, filtering_patterns: Vec<String>) -> Self {
        Self {
            filtering_patterns,
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adaptive_threshold_floor() {
        assert_eq!(adaptive_threshold(100, 0.01, 5), 5);
        assert_eq!(adaptive_threshold(0, 0.2, 5), 5);
    }

    #[test]
    fn test_adaptive_threshold_relative() {
        assert_eq!(adaptive_threshold(1000, 0.01, 5), 10);
        assert_eq!(adaptive_threshold(1000, 0.2, 5), 200);
        // 0.05 * 1050 = 52.5 rounds up
        assert_eq!(adaptive_threshold(1050, 0.05, 5), 53);
    }

    #[test]
    fn test_sample_size_capped_for_large_differences() {
        let thresholds = Thresholds::default();
        assert_eq!(thresholds.sample_size(25, 50), 25);
        assert_eq!(thresholds.sample_size(25, 5000), 10);
        assert_eq!(thresholds.sample_size(10, 5000), 10);
        assert_eq!(thresholds.sample_size(3, 5000), 3);
    }

    #[test]
    fn test_validate_rejects_negative_ratio() {
        let mut thresholds = Thresholds::default();
        thresholds.fact_ratio = -0.2;
        let err = thresholds.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Threshold 'fact_ratio' must be a finite, non-negative ratio, got -0.2"
        );
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let thresholds: Thresholds = serde_json::from_str(r#"{"fact_ratio": 0.3}"#).unwrap();
        assert_eq!(thresholds.fact_ratio, 0.3);
        assert_eq!(thresholds.dimension_ratio, DIMENSION_RATIO);
        assert_eq!(thresholds.filtering_patterns.len(), 3);
    }
}
