//! Report records produced by a run.

use serde::Serialize;

use crate::bizview::BizviewComparison;
use crate::classifier::CountComparison;
use crate::extractor::{DifferenceRecord, SampleSummary};
use crate::oracle::CountResult;

/// One entry of the `records` list: a sampled row or the trailing summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SampleEntry {
    Record(DifferenceRecord),
    Summary(SampleSummary),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataDifferences {
    pub records: Vec<SampleEntry>,
    pub count: u64,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingRecords {
    pub count: u64,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceToVault {
    pub data_differences: DataDifferences,
    pub missing_records: MissingRecords,
    pub validation_message: String,
    pub key_only_missing: Option<u64>,
    pub count_comparison: CountComparison,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonDetail {
    #[serde(flatten)]
    pub comparison: BizviewComparison,
    pub query_used: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BizviewMissing {
    pub count: u64,
    pub comparison: ComparisonDetail,
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BizviewDetails {
    pub missing_records: BizviewMissing,
}

/// Everything behind the counts of a [`ReportRecord`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiscrepancyDetails {
    pub source_to_vault: SourceToVault,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bizview: Option<BizviewDetails>,
    pub intentionally_deleted: MissingRecords,
    pub count_queries: Vec<CountResult>,
}

/// Final output row for one mapping.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRecord {
    pub table_name: String,
    pub source_table: String,
    pub hub_table: String,
    pub satellite_table: Option<String>,
    pub bizview_table: Option<String>,
    pub source_count: u64,
    pub non_deleted_count: u64,
    pub deleted_count: u64,
    pub hub_count: u64,
    pub satellite_count: u64,
    pub bizview_count: u64,
    pub true_missing_count: u64,
    pub representation_difference_count: u64,
    pub bizview_missing_count: u64,
    pub validation_message: String,
    pub details: DiscrepancyDetails,
}

impl ReportRecord {
    /// True missing records or bizview missing records were reported.
    pub fn has_discrepancies(&self) -> bool {
        self.true_missing_count > 0 || self.bizview_missing_count > 0
    }
}

/// A mapping for which no record could be produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedMapping {
    pub source_table: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub records: Vec<ReportRecord>,
    pub skipped: Vec<SkippedMapping>,
}

impl RunReport {
    pub fn has_discrepancies(&self) -> bool {
        self.records.iter().any(ReportRecord::has_discrepancies)
    }

    pub fn total_true_missing(&self) -> u64 {
        self.records.iter().map(|r| r.true_missing_count).sum()
    }

    pub fn total_bizview_missing(&self) -> u64 {
        self.records.iter().map(|r| r.bizview_missing_count).sum()
    }
}
