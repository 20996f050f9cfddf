use tracing::{error, info, warn};

use crate::bizview::BizviewReconciler;
use crate::bizview_count::BizviewCounter;
use crate::classifier::{CountComparison, DiscrepancyClassifier};
use crate::errors::{AuditError, ConfigError};
use crate::extractor::DifferenceExtractor;
use crate::mapping::TableMapping;
use crate::oracle::{CountOracle, CountResult, CountTarget};
use crate::query::{QueryEngine, SessionSettings};
use crate::report::{
    BizviewDetails, BizviewMissing, ComparisonDetail, DataDifferences, DiscrepancyDetails,
    MissingRecords, ReportRecord, RunReport, SampleEntry, SkippedMapping, SourceToVault,
};
use crate::thresholds::Thresholds;

const DATA_DIFFERENCES_EXPLANATION: &str =
    "These records exist in both source and vault but with differences in data representation.";
const MISSING_EXPLANATION: &str =
    "These records exist in the source but could not be found in the vault.";
const DELETED_EXPLANATION: &str =
    "These records are marked as deleted in the source and are intentionally excluded.";

/// Raw counts gathered for one mapping.
#[derive(Debug, Clone, Default)]
struct Counts {
    source: u64,
    non_deleted: u64,
    deleted: u64,
    hub: u64,
    satellite: u64,
    bizview: u64,
    bizview_query: String,
    queries: Vec<CountResult>,
}

/// Runs every procedure over a list of mappings, one mapping at a time.
pub struct Auditor<'a, E: QueryEngine + ?Sized> {
    engine: &'a E,
    thresholds: Thresholds,
    reconciler: BizviewReconciler,
}

impl<'a, E: QueryEngine + ?Sized> Auditor<'a, E> {
    pub fn new(engine: &'a E, thresholds: Thresholds) -> Result<Self, ConfigError> {
        thresholds.validate()?;
        let reconciler = BizviewReconciler::new(&thresholds)?;
        Ok(Self {
            engine,
            thresholds,
            reconciler,
        })
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn apply_session(&self, settings: &SessionSettings) {
        self.engine.apply_session(settings);
    }

    /// Audit every mapping in order. A failing mapping is recorded as skipped.
    pub fn run(&self, mappings: &[TableMapping]) -> RunReport {
        self.run_with(mappings, |_, _, _| {})
    }

    /// Like [`Auditor::run`], calling `observe` with the 1-based position of
    /// each mapping once it is done.
    pub fn run_with<F>(&self, mappings: &[TableMapping], mut observe: F) -> RunReport
    where
        F: FnMut(usize, &TableMapping, Result<&ReportRecord, &SkippedMapping>),
    {
        let mut report = RunReport::default();
        for (index, mapping) in mappings.iter().enumerate() {
            info!(
                table = %mapping.source_table,
                "Processing mapping {}/{}",
                index + 1,
                mappings.len()
            );
            match self.audit_mapping(mapping) {
                Ok(record) => {
                    observe(index + 1, mapping, Ok(&record));
                    report.records.push(record);
                }
                Err(e) => {
                    error!(table = %mapping.source_table, error = %e, "Skipping mapping");
                    let skipped = SkippedMapping {
                        source_table: mapping.source_table.clone(),
                        reason: e.to_string(),
                    };
                    observe(index + 1, mapping, Err(&skipped));
                    report.skipped.push(skipped);
                }
            }
        }
        info!(
            processed = report.records.len(),
            skipped = report.skipped.len(),
            "Reconciliation complete"
        );
        report
    }

    pub fn audit_mapping(&self, mapping: &TableMapping) -> Result<ReportRecord, AuditError> {
        mapping.validate()?;
        let oracle = CountOracle::new(self.engine);
        oracle
            .probe(&mapping.source_table)
            .map_err(|source| AuditError::SourceUnavailable {
                table: mapping.source_table.clone(),
                source,
            })?;
        info!(table = %mapping.source_table, "Source table is accessible");

        let mut counts = self.gather_counts(&oracle, mapping);

        let extraction = DifferenceExtractor::new(self.engine, &self.thresholds)
            .extract(mapping, self.thresholds.sample_limit);
        counts.queries.extend(extraction.queries.iter().cloned());

        let vault = if mapping.satellite_table.is_some() && counts.satellite > 0 {
            counts.satellite
        } else {
            counts.hub
        };
        let comparison = CountComparison::new(counts.non_deleted, vault);
        let validation =
            DiscrepancyClassifier::new(&self.thresholds).classify(&extraction, &comparison);
        if validation.true_missing_count > 0 {
            warn!(
                table = %mapping.source_table,
                missing = validation.true_missing_count,
                "Records missing from the vault"
            );
        }

        let bizview = mapping.bizview_table.as_ref().map(|_| {
            self.reconciler.reconcile(
                mapping,
                counts.hub,
                counts.satellite,
                counts.non_deleted,
                counts.bizview,
            )
        });
        let bizview_missing_count = bizview.as_ref().map_or(0, |c| c.missing_count);

        let mut records: Vec<SampleEntry> = extraction
            .samples
            .iter()
            .cloned()
            .map(SampleEntry::Record)
            .collect();
        if let Some(summary) = &extraction.summary {
            records.push(SampleEntry::Summary(summary.clone()));
        }

        let details = DiscrepancyDetails {
            source_to_vault: SourceToVault {
                data_differences: DataDifferences {
                    records,
                    count: validation.representation_difference_count,
                    explanation: DATA_DIFFERENCES_EXPLANATION.to_string(),
                },
                missing_records: MissingRecords {
                    count: validation.true_missing_count,
                    explanation: MISSING_EXPLANATION.to_string(),
                },
                validation_message: validation.message.clone(),
                key_only_missing: extraction.key_only_missing,
                count_comparison: comparison,
            },
            bizview: bizview.map(|comparison| BizviewDetails {
                missing_records: BizviewMissing {
                    count: comparison.missing_count,
                    explanation: comparison.explanation.clone(),
                    comparison: ComparisonDetail {
                        comparison,
                        query_used: counts.bizview_query.clone(),
                    },
                },
            }),
            intentionally_deleted: MissingRecords {
                count: counts.deleted,
                explanation: DELETED_EXPLANATION.to_string(),
            },
            count_queries: counts.queries,
        };

        Ok(ReportRecord {
            table_name: mapping.table_name().to_string(),
            source_table: mapping.source_table.clone(),
            hub_table: mapping.hub_label(),
            satellite_table: mapping.satellite_table.clone(),
            bizview_table: mapping.bizview_table.clone(),
            source_count: counts.source,
            non_deleted_count: counts.non_deleted,
            deleted_count: counts.deleted,
            hub_count: counts.hub,
            satellite_count: counts.satellite,
            bizview_count: counts.bizview,
            true_missing_count: validation.true_missing_count,
            representation_difference_count: validation.representation_difference_count,
            bizview_missing_count,
            validation_message: validation.message,
            details,
        })
    }

    fn gather_counts(&self, oracle: &CountOracle<'a, E>, mapping: &TableMapping) -> Counts {
        let mut counts = Counts::default();
        let table = mapping.source_table.as_str();

        let source = oracle.count(table, None, CountTarget::Rows);
        counts.source = source.count;
        info!(table, count = source.count, "Source count");
        counts.queries.push(source);

        counts.non_deleted = counts.source;
        if let Some(deleted) = &mapping.deleted_column {
            let filter = format!("{} = FALSE", deleted);
            let non_deleted = oracle.count(table, Some(&filter), CountTarget::Rows);
            if non_deleted.succeeded {
                counts.non_deleted = non_deleted.count.min(counts.source);
            } else {
                warn!(table, "Non-deleted count unavailable, using the total count");
            }
            counts.queries.push(non_deleted);
        }
        counts.deleted = counts.source - counts.non_deleted;
        info!(
            table,
            non_deleted = counts.non_deleted,
            deleted = counts.deleted,
            "Deleted flag split"
        );

        for hub in &mapping.hub_tables {
            let result = oracle.count(hub, None, CountTarget::Rows);
            counts.hub += result.count;
            counts.queries.push(result);
        }
        info!(hub = %mapping.hub_label(), count = counts.hub, "Hub count");

        if let Some(satellite) = &mapping.satellite_table {
            let current = self
                .thresholds
                .current_satellite_markers
                .iter()
                .any(|marker| satellite.to_uppercase().contains(&marker.to_uppercase()));
            let target = match (&mapping.satellite_hash_key, current) {
                (Some(hash_key), true) => CountTarget::Distinct(hash_key),
                _ => CountTarget::Rows,
            };
            let result = oracle.count(satellite, None, target);
            counts.satellite = result.count;
            info!(satellite = %satellite, count = result.count, "Satellite count");
            counts.queries.push(result);
        }

        if mapping.bizview_table.is_some() {
            let result = BizviewCounter::new(self.engine, &self.thresholds).count(mapping);
            counts.bizview = result.count;
            counts.bizview_query = result.query_text.clone();
            counts.queries.push(result);
        }
        counts
    }
}
