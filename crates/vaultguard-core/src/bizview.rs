//! Business-view reconciliation.
//!
//! A bizview is compared against the vault or source count that matches its
//! kind: dimensions against the hub, facts against the non-deleted source,
//! anything else against the satellite (or the hub when there is none).
//! Thresholds depend on the kind, and views that filter on purpose are
//! tolerated as long as they keep a reasonable share of the reference.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::ConfigError;
use crate::mapping::{TableMapping, unqualified};
use crate::thresholds::{Thresholds, adaptive_threshold};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewType {
    Dimension,
    Fact,
    Unknown,
}

impl ViewType {
    /// Infer the view type from its unqualified, lower-cased name.
    pub fn infer(view_name: &str) -> Self {
        let name = unqualified(view_name).to_lowercase();
        if name.starts_with("dim_") || name.starts_with("dimension_") {
            ViewType::Dimension
        } else if name.starts_with("fact_")
            || name.starts_with("bridge_")
            || name.starts_with("link_")
        {
            ViewType::Fact
        } else {
            ViewType::Unknown
        }
    }

    /// Dimensions map one-to-one onto their hub.
    pub fn is_direct_mapping(&self) -> bool {
        matches!(self, ViewType::Dimension)
    }

    pub fn relative_threshold(&self, thresholds: &Thresholds) -> f64 {
        match self {
            ViewType::Dimension => thresholds.dimension_ratio,
            ViewType::Fact => thresholds.fact_ratio,
            ViewType::Unknown => thresholds.unknown_ratio,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceType {
    Hub,
    Satellite,
    SourceNondeleted,
}

impl fmt::Display for ReferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceType::Hub => write!(f, "hub"),
            ReferenceType::Satellite => write!(f, "satellite"),
            ReferenceType::SourceNondeleted => write!(f, "source (non-deleted)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ComparisonDirection {
    #[serde(rename = "bizview_smaller")]
    Smaller,
    #[serde(rename = "bizview_larger")]
    Larger,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BizviewComparison {
    pub view_type: ViewType,
    pub is_direct_mapping: bool,
    pub reference_type: ReferenceType,
    pub reference_count: u64,
    pub bizview_count: u64,
    pub comparison_direction: ComparisonDirection,
    pub raw_difference: u64,
    pub threshold: u64,
    pub threshold_percentage: String,
    /// `raw_difference / reference_count` as a percentage, `N/A` without reference.
    pub percentage_diff: String,
    pub missing_count: u64,
    /// The view is smaller than its reference but filters on purpose.
    pub filtering_suppressed: bool,
    pub explanation: String,
}

pub struct BizviewReconciler {
    thresholds: Thresholds,
    filtering_patterns: Vec<Regex>,
}

impl BizviewReconciler {
    pub fn new(thresholds: &Thresholds) -> Result<Self, ConfigError> {
        let filtering_patterns = thresholds
            .filtering_patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            thresholds: thresholds.clone(),
            filtering_patterns,
        })
    }

    /// Whether the view name marks a view that filters its rows on purpose.
    pub fn is_filtering_view(&self, view_name: &str) -> bool {
        let name = unqualified(view_name).to_lowercase();
        self.filtering_patterns.iter().any(|p| p.is_match(&name))
    }

    pub fn reconcile(
        &self,
        mapping: &TableMapping,
        hub_count: u64,
        satellite_count: u64,
        non_deleted_source_count: u64,
        bizview_count: u64,
    ) -> BizviewComparison {
        let view_name = mapping.bizview_table.as_deref().unwrap_or_default();
        let view_type = mapping
            .view_type
            .unwrap_or_else(|| ViewType::infer(view_name));
        let is_direct_mapping = view_type.is_direct_mapping();

        let (reference_type, reference_count) = if is_direct_mapping {
            (ReferenceType::Hub, hub_count)
        } else if view_type == ViewType::Fact && non_deleted_source_count > 0 {
            (ReferenceType::SourceNondeleted, non_deleted_source_count)
        } else if mapping.satellite_table.is_some() && satellite_count > 0 {
            (ReferenceType::Satellite, satellite_count)
        } else {
            (ReferenceType::Hub, hub_count)
        };
        info!(
            view = view_name,
            view_type = ?view_type,
            reference = %reference_type,
            reference_count,
            "Bizview reference selected"
        );

        let ratio = view_type.relative_threshold(&self.thresholds);
        let threshold = adaptive_threshold(reference_count, ratio, self.thresholds.absolute_floor);

        let (comparison_direction, raw_difference) = if bizview_count <= reference_count {
            (ComparisonDirection::Smaller, reference_count - bizview_count)
        } else {
            (ComparisonDirection::Larger, bizview_count - reference_count)
        };
        let share = if reference_count > 0 {
            Some(raw_difference as f64 / reference_count as f64)
        } else {
            None
        };

        let mut filtering_suppressed = false;
        let missing_count = if bizview_count == 0 && reference_count > 0 {
            warn!(
                view = view_name,
                reference = %reference_type,
                reference_count,
                "CRITICAL: bizview is empty"
            );
            reference_count
        } else if raw_difference > threshold {
            let filtering = comparison_direction == ComparisonDirection::Smaller
                && self.is_filtering_view(view_name)
                && share.is_some_and(|s| s < self.thresholds.filtering_max_ratio);
            if filtering {
                info!(view = view_name, raw_difference, "Bizview likely filters on purpose");
                filtering_suppressed = true;
                0
            } else {
                warn!(
                    view = view_name,
                    raw_difference,
                    reference_count,
                    bizview_count,
                    "Bizview records difference detected"
                );
                raw_difference
            }
        } else {
            info!(view = view_name, raw_difference, threshold, "Bizview within threshold");
            0
        };

        let explanation = if missing_count == 0 {
            "No significant difference detected between vault and bizview counts.".to_string()
        } else {
            match comparison_direction {
                ComparisonDirection::Smaller => format!(
                    "Bizview has {} fewer records than the {}. This may be due to business filtering or a data loss issue.",
                    raw_difference, reference_type
                ),
                ComparisonDirection::Larger => format!(
                    "Bizview has {} more records than the {}. This may be due to calculated fields, duplicates, or other business logic.",
                    raw_difference, reference_type
                ),
            }
        };

        BizviewComparison {
            view_type,
            is_direct_mapping,
            reference_type,
            reference_count,
            bizview_count,
            comparison_direction,
            raw_difference,
            threshold,
            threshold_percentage: format!("{:.1}%", ratio * 100.),
            percentage_diff: share
                .map(|s| format!("{:.1}%", s * 100.))
                .unwrap_or_else(|| "N/A".to_string()),
            missing_count,
            filtering_suppressed,
            explanation,
        }
    }
}
