//! Counting the rows of a business view.
//!
//! Bizviews are often virtualized views where a plain `COUNT(*)` is slow or
//! misleading. The count is obtained by walking an ordered list of
//! strategies; the first one that produces a plausible count wins.

use tracing::{debug, info, warn};

use crate::mapping::{TableMapping, unqualified};
use crate::oracle::{CountOracle, CountResult, CountTarget};
use crate::query::QueryEngine;
use crate::thresholds::Thresholds;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BizviewCountStrategy {
    /// Direct `COUNT(*)` for views listed as known to be large.
    KnownLarge,
    /// `COUNT(DISTINCT key)` over non-null keys.
    DistinctKey,
    /// `COUNT(*)` of non-deleted rows when the view carries the deleted flag.
    NonDeleted,
    /// Plain `COUNT(*)`, probing with row limits when a fact looks too small.
    Total,
}

/// Result of one strategy attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Attempt {
    /// Strategy does not apply to this mapping.
    Skipped,
    /// Strategy ran but its count is not trusted.
    Rejected(CountResult),
    Accepted(CountResult),
}

pub const DEFAULT_STRATEGIES: [BizviewCountStrategy; 4] = [
    BizviewCountStrategy::KnownLarge,
    BizviewCountStrategy::DistinctKey,
    BizviewCountStrategy::NonDeleted,
    BizviewCountStrategy::Total,
];

pub struct BizviewCounter<'a, E: QueryEngine + ?Sized> {
    oracle: CountOracle<'a, E>,
    thresholds: &'a Thresholds,
    strategies: Vec<BizviewCountStrategy>,
}

impl<'a, E: QueryEngine + ?Sized> BizviewCounter<'a, E> {
    pub fn new(engine: &'a E, thresholds: &'a Thresholds) -> Self {
        Self {
            oracle: CountOracle::new(engine),
            thresholds,
            strategies: DEFAULT_STRATEGIES.to_vec(),
        }
    }

    pub fn with_strategies(self, strategies: Vec<BizviewCountStrategy>) -> Self {
        Self { strategies, ..self }
    }

    /// Count the bizview of `mapping`.
    ///
    /// An unreachable view yields a zero count with a diagnostic. When every
    /// strategy is rejected, the last rejected count is used.
    pub fn count(&self, mapping: &TableMapping) -> CountResult {
        let Some(view) = mapping.bizview_table.as_deref() else {
            return CountResult::not_configured("bizview");
        };

        if let Err(e) = self.oracle.probe(view) {
            warn!(view, error = %e, "Bizview table is not accessible");
            return CountResult::failure(
                format!("SELECT 1 FROM {} LIMIT 1", view),
                format!("Bizview table access error: {}", e),
            );
        }
        info!(view, "Bizview table is accessible");

        let mut fallback = None;
        for strategy in &self.strategies {
            match self.attempt(*strategy, mapping, view) {
                Attempt::Accepted(result) => {
                    info!(view, strategy = ?strategy, count = result.count, "Bizview count");
                    return result;
                }
                Attempt::Rejected(result) => {
                    debug!(view, strategy = ?strategy, count = result.count, "Bizview count rejected");
                    fallback = Some(result);
                }
                Attempt::Skipped => {}
            }
        }
        fallback.unwrap_or_else(|| {
            CountResult::failure(String::new(), "No bizview count strategy applied".to_string())
        })
    }

    pub fn attempt(
        &self,
        strategy: BizviewCountStrategy,
        mapping: &TableMapping,
        view: &str,
    ) -> Attempt {
        let name = unqualified(view).to_uppercase();
        match strategy {
            BizviewCountStrategy::KnownLarge => {
                if !self.thresholds.known_large_views.contains(&name) {
                    return Attempt::Skipped;
                }
                let result = self.oracle.count(view, None, CountTarget::Rows);
                if result.succeeded {
                    Attempt::Accepted(result)
                } else {
                    Attempt::Rejected(result)
                }
            }
            BizviewCountStrategy::DistinctKey => {
                let Some(key) = mapping.bizview_key.as_deref() else {
                    return Attempt::Skipped;
                };
                let filter = format!("{} IS NOT NULL", key);
                let result = self
                    .oracle
                    .count(view, Some(&filter), CountTarget::Distinct(key));
                let small_lookup = self.thresholds.small_lookup_views.contains(&name);
                let plausible =
                    result.count >= self.thresholds.suspiciously_low_count || small_lookup;
                if result.succeeded && plausible {
                    Attempt::Accepted(result)
                } else {
                    if result.succeeded {
                        warn!(view, count = result.count, "Key-based bizview count seems low");
                    }
                    Attempt::Rejected(result)
                }
            }
            BizviewCountStrategy::NonDeleted => {
                let Some(deleted) = mapping.deleted_column.as_deref() else {
                    return Attempt::Skipped;
                };
                if !self.has_column(view, deleted) {
                    return Attempt::Skipped;
                }
                let filter = format!("{} = FALSE", deleted);
                let result = self.oracle.count(view, Some(&filter), CountTarget::Rows);
                if result.succeeded {
                    Attempt::Accepted(result)
                } else {
                    Attempt::Rejected(result)
                }
            }
            BizviewCountStrategy::Total => {
                let result = self.oracle.count(view, None, CountTarget::Rows);
                if result.succeeded
                    && result.count < self.thresholds.suspiciously_low_count
                    && name.contains("FACT_")
                {
                    warn!(view, count = result.count, "Fact bizview count seems suspiciously low");
                    if let Some(expanded) = self.expanded_count(view, result.count) {
                        return Attempt::Accepted(expanded);
                    }
                }
                Attempt::Accepted(result)
            }
        }
    }

    /// Look the column up in the information schema of a `db.schema.table` view.
    fn has_column(&self, view: &str, column: &str) -> bool {
        let parts: Vec<&str> = view.split('.').collect();
        let [db, schema, table] = parts.as_slice() else {
            return false;
        };
        let query = format!(
            "SELECT COLUMN_NAME FROM {}.INFORMATION_SCHEMA.COLUMNS WHERE TABLE_SCHEMA = '{}' AND TABLE_NAME = '{}' AND COLUMN_NAME = '{}'",
            db, schema, table, column
        );
        match self.oracle.engine().execute(&query) {
            Ok(batches) => batches.iter().any(|b| b.num_rows() > 0),
            Err(e) => {
                debug!(view, column, error = %e, "Could not check bizview column");
                false
            }
        }
    }

    /// Count through bounded sub-selects when the plain count looks too low.
    fn expanded_count(&self, view: &str, count: u64) -> Option<CountResult> {
        let probe = self.oracle.count_subquery(
            &format!("SELECT * FROM {} LIMIT {}", view, self.thresholds.probe_limit),
            "probe",
        );
        if !probe.succeeded || probe.count <= count {
            return None;
        }
        info!(view, count = probe.count, "Probe found more records than the plain count");
        let expanded = self.oracle.count_subquery(
            &format!(
                "SELECT * FROM {} LIMIT {}",
                view, self.thresholds.expanded_probe_limit
            ),
            "expanded_probe",
        );
        (expanded.succeeded && expanded.count > count).then_some(expanded)
    }
}
