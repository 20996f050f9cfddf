//! Source-to-vault difference extraction.
//!
//! The configured set-difference query is counted first. When source and
//! vault have nearly the same size but the query reports many more rows than
//! the size gap explains, a key-only difference decides whether the rows are
//! really missing or only represented differently. A bounded sample of the
//! differing rows is kept for the report.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::mapping::TableMapping;
use crate::oracle::{CountOracle, CountResult, CountTarget};
use crate::query::QueryEngine;
use crate::rows::batches_to_rows;
use crate::thresholds::{Thresholds, adaptive_threshold};
use crate::types::RowMap;

pub const NO_QUERY_MESSAGE: &str = "No difference query defined";
pub const NO_DIFFERENCES_MESSAGE: &str = "No record differences found";
pub const VERIFIED_MESSAGE: &str = "All records verified.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    DataDifference,
    ConversionError,
    SampleError,
}

/// Table identities attached to every sampled record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordMetadata {
    pub source_table: String,
    pub hub_table: String,
    pub satellite_table: Option<String>,
    pub bizview_table: Option<String>,
    pub record_type: RecordType,
}

impl RecordMetadata {
    fn for_mapping(mapping: &TableMapping, record_type: RecordType) -> Self {
        Self {
            source_table: mapping.source_table.clone(),
            hub_table: mapping.hub_label(),
            satellite_table: mapping.satellite_table.clone(),
            bizview_table: mapping.bizview_table.clone(),
            record_type,
        }
    }
}

/// One sampled row of the difference query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DifferenceRecord {
    #[serde(flatten)]
    pub values: RowMap,
    #[serde(rename = "__metadata")]
    pub metadata: RecordMetadata,
}

impl DifferenceRecord {
    fn error(mapping: &TableMapping, record_type: RecordType, error: String) -> Self {
        let mut values = RowMap::new();
        values.insert("error".to_string(), serde_json::Value::String(error));
        Self {
            values,
            metadata: RecordMetadata::for_mapping(mapping, record_type),
        }
    }
}

/// Trailing entry telling how many differing rows were left out of the sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleSummary {
    #[serde(rename = "NOTE")]
    pub note: String,
    pub validation: String,
    pub additional_records: u64,
    pub source_table: String,
    pub hub_table: String,
    pub satellite_table: Option<String>,
    pub bizview_table: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtractionOutcome {
    /// Row count of the difference query as reported by the engine.
    pub raw_count: u64,
    /// Zero when the differences were confirmed as representation noise.
    pub difference_count: u64,
    pub representation_only: bool,
    /// Result of the key-only check, when it ran.
    pub key_only_missing: Option<u64>,
    pub samples: Vec<DifferenceRecord>,
    pub summary: Option<SampleSummary>,
    pub message: String,
    /// Every count issued while extracting.
    pub queries: Vec<CountResult>,
}

impl ExtractionOutcome {
    fn empty(message: impl Into<String>, queries: Vec<CountResult>) -> Self {
        Self {
            message: message.into(),
            queries,
            ..Default::default()
        }
    }
}

pub struct DifferenceExtractor<'a, E: QueryEngine + ?Sized> {
    oracle: CountOracle<'a, E>,
    thresholds: &'a Thresholds,
}

impl<'a, E: QueryEngine + ?Sized> DifferenceExtractor<'a, E> {
    pub fn new(engine: &'a E, thresholds: &'a Thresholds) -> Self {
        Self {
            oracle: CountOracle::new(engine),
            thresholds,
        }
    }

    pub fn extract(&self, mapping: &TableMapping, sample_limit: usize) -> ExtractionOutcome {
        let Some(query) = mapping.difference_query() else {
            info!(table = %mapping.source_table, "No difference query");
            return ExtractionOutcome::empty(NO_QUERY_MESSAGE, Vec::new());
        };

        let counted = self.oracle.count_subquery(query, "differences");
        let mut queries = vec![counted.clone()];
        if !counted.succeeded {
            let error = counted.diagnostic.unwrap_or_default();
            return ExtractionOutcome::empty(
                format!("Error counting record differences: {}", error),
                queries,
            );
        }
        let raw_count = counted.count;
        info!(table = %mapping.source_table, count = raw_count, "Records with differences");
        if raw_count == 0 {
            return ExtractionOutcome::empty(NO_DIFFERENCES_MESSAGE, queries);
        }

        let source = self.non_deleted_source_count(mapping);
        let vault = self.vault_count(mapping);
        let (source_count, vault_count) = (source.count, vault.count);
        queries.push(source);
        queries.push(vault);

        let mut outcome = ExtractionOutcome {
            raw_count,
            difference_count: raw_count,
            message: VERIFIED_MESSAGE.to_string(),
            ..Default::default()
        };

        if source_count > 0 && vault_count > 0 {
            let count_diff = source_count.abs_diff(vault_count);
            let threshold = adaptive_threshold(
                source_count,
                self.thresholds.count_gap_ratio,
                self.thresholds.absolute_floor,
            );
            if count_diff < threshold
                && raw_count > self.thresholds.representation_multiplier * count_diff
            {
                warn!(
                    table = %mapping.source_table,
                    raw_count,
                    count_diff,
                    "Difference count far exceeds the source/vault size gap"
                );
                outcome.message = format!(
                    "Data representation differences detected: Source count ({}) is close to vault count ({}), but the difference query shows {} differences. This indicates schema/column mapping variations rather than missing data.",
                    source_count, vault_count, raw_count
                );
                self.check_keys(mapping, &mut outcome, &mut queries);
            }
        }

        if outcome.difference_count > 0 {
            self.sample(mapping, query, sample_limit, &mut outcome);
        }
        outcome.queries = queries;
        outcome
    }

    /// Confirm representation noise with a key-only difference.
    fn check_keys(
        &self,
        mapping: &TableMapping,
        outcome: &mut ExtractionOutcome,
        queries: &mut Vec<CountResult>,
    ) {
        let (Some(source_key), Some(hub_key), Some(hub)) = (
            mapping.source_key.as_deref(),
            mapping.hub_key.as_deref(),
            mapping.primary_hub(),
        ) else {
            debug!(table = %mapping.source_table, "No key columns for key-only check");
            return;
        };

        let mut keys = format!("SELECT {} FROM {}", source_key, mapping.source_table);
        if let Some(deleted) = &mapping.deleted_column {
            keys.push_str(&format!(" WHERE {} = FALSE", deleted));
        }
        keys.push_str(&format!(" EXCEPT SELECT {} FROM {}", hub_key, hub));

        let result = self.oracle.count_subquery(&keys, "missing_keys");
        let (succeeded, missing) = (result.succeeded, result.count);
        queries.push(result);
        if !succeeded {
            warn!(table = %mapping.source_table, "Key-only check failed");
            return;
        }
        info!(table = %mapping.source_table, missing, "Key-only check");
        outcome.key_only_missing = Some(missing);

        if missing == 0 || missing.saturating_mul(self.thresholds.key_only_divisor) < outcome.raw_count {
            outcome.message.push_str(&format!(
                " Key-only validation found only {} truly missing records, confirming this is primarily a schema/data representation difference rather than missing data.",
                missing
            ));
            if missing == 0 {
                info!(table = %mapping.source_table, "Key-only check confirms no actual data loss");
                outcome.message.push_str(" NO ACTUAL DATA LOSS.");
            }
            outcome.representation_only = true;
            outcome.difference_count = 0;
        } else {
            outcome.message.push_str(&format!(
                " Key-only validation found {} missing keys; the differences stand.",
                missing
            ));
        }
    }

    fn non_deleted_source_count(&self, mapping: &TableMapping) -> CountResult {
        let filter = mapping
            .deleted_column
            .as_ref()
            .map(|column| format!("{} = FALSE", column));
        self.oracle
            .count(&mapping.source_table, filter.as_deref(), CountTarget::Rows)
    }

    /// Distinct satellite hash keys, else satellite rows, else rows of the first hub.
    fn vault_count(&self, mapping: &TableMapping) -> CountResult {
        match (&mapping.satellite_table, &mapping.satellite_hash_key) {
            (Some(satellite), Some(hash_key)) => {
                self.oracle.count(satellite, None, CountTarget::Distinct(hash_key))
            }
            (Some(satellite), None) => self.oracle.count(satellite, None, CountTarget::Rows),
            (None, _) => match mapping.primary_hub() {
                Some(hub) => self.oracle.count(hub, None, CountTarget::Rows),
                None => CountResult::not_configured("hub"),
            },
        }
    }

    fn sample(
        &self,
        mapping: &TableMapping,
        query: &str,
        sample_limit: usize,
        outcome: &mut ExtractionOutcome,
    ) {
        let limit = self
            .thresholds
            .sample_size(sample_limit, outcome.difference_count);
        let sample_query = format!("SELECT * FROM ({}) AS differences LIMIT {}", query, limit);
        debug!(query = %sample_query, "Fetching difference sample");

        let batches = match self.oracle.engine().execute(&sample_query) {
            Ok(batches) => batches,
            Err(e) => {
                warn!(table = %mapping.source_table, error = %e, "Could not collect sample records");
                outcome.samples.push(DifferenceRecord::error(
                    mapping,
                    RecordType::SampleError,
                    format!("Error collecting sample records: {}", e),
                ));
                outcome.message.push_str(" Failed to collect samples.");
                return;
            }
        };

        for row in batches_to_rows(&batches).into_iter().take(limit) {
            let record = match row {
                Ok(values) => DifferenceRecord {
                    values,
                    metadata: RecordMetadata::for_mapping(mapping, RecordType::DataDifference),
                },
                Err(e) => {
                    warn!(table = %mapping.source_table, error = %e, "Could not convert sample row");
                    DifferenceRecord::error(
                        mapping,
                        RecordType::ConversionError,
                        format!("Error converting record: {}", e),
                    )
                }
            };
            outcome.samples.push(record);
        }

        let shown = outcome.samples.len() as u64;
        if outcome.difference_count > shown {
            outcome.summary = Some(SampleSummary {
                note: format!(
                    "Showing {} of {} total records with differences",
                    shown, outcome.difference_count
                ),
                validation: outcome.message.clone(),
                additional_records: outcome.difference_count - shown,
                source_table: mapping.source_table.clone(),
                hub_table: mapping.hub_label(),
                satellite_table: mapping.satellite_table.clone(),
                bizview_table: mapping.bizview_table.clone(),
            });
        }
    }
}
