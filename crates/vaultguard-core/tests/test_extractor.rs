mod common;

use std::sync::Arc;

use arrow::buffer::ScalarBuffer;
use arrow::datatypes::{DataType, Field, Schema};
use arrow_array::{Int64Array, ListViewArray, StringArray};
use common::{ScriptedEngine, company_rows};
use vaultguard_core::types::Batch;
use vaultguard_core::extractor::{NO_DIFFERENCES_MESSAGE, NO_QUERY_MESSAGE, RecordType};
use vaultguard_core::{DifferenceExtractor, TableMapping, Thresholds};

const EXCEPT: &str =
    "SELECT company_id, name FROM companies EXCEPT SELECT company_bk, name FROM s_company_lroc";
const COUNT_DIFFERENCES: &str = "SELECT COUNT(*) FROM (SELECT company_id, name FROM companies EXCEPT SELECT company_bk, name FROM s_company_lroc) AS differences";
const COUNT_NON_DELETED: &str = "SELECT COUNT(*) FROM companies WHERE is_deleted = FALSE";
const COUNT_VAULT: &str = "SELECT COUNT(DISTINCT hk) FROM s_company_lroc";
const COUNT_MISSING_KEYS: &str = "SELECT COUNT(*) FROM (SELECT company_id FROM companies WHERE is_deleted = FALSE EXCEPT SELECT company_bk FROM h_company) AS missing_keys";
const SAMPLE: &str = "SELECT * FROM (SELECT company_id, name FROM companies EXCEPT SELECT company_bk, name FROM s_company_lroc) AS differences LIMIT 10";

fn mapping() -> TableMapping {
    TableMapping::builder("companies")
        .with_hub("h_company")
        .with_satellite("s_company_lroc", Some("hk"))
        .with_keys("company_id", "company_bk")
        .with_deleted_column("is_deleted")
        .with_except_query(format!("{};", EXCEPT))
        .build()
}

#[test]
fn test_no_query_defined() {
    let engine = ScriptedEngine::new();
    let thresholds = Thresholds::default();
    let mapping = TableMapping::builder("companies").with_hub("h_company").build();

    let outcome = DifferenceExtractor::new(&engine, &thresholds).extract(&mapping, 10);
    assert_eq!(outcome.difference_count, 0);
    assert!(outcome.samples.is_empty());
    assert_eq!(outcome.message, NO_QUERY_MESSAGE);
    assert!(engine.executed().is_empty());
}

#[test]
fn test_zero_differences_short_circuits() {
    // Other counts would trigger sampling if they were ever issued.
    let engine = ScriptedEngine::new()
        .count(COUNT_DIFFERENCES, 0)
        .count(COUNT_NON_DELETED, 1000)
        .count(COUNT_VAULT, 10);
    let thresholds = Thresholds::default();

    let outcome = DifferenceExtractor::new(&engine, &thresholds).extract(&mapping(), 10);
    assert_eq!(outcome.difference_count, 0);
    assert_eq!(outcome.raw_count, 0);
    assert!(outcome.samples.is_empty());
    assert!(outcome.summary.is_none());
    assert_eq!(outcome.message, NO_DIFFERENCES_MESSAGE);
    assert_eq!(engine.executed(), vec![COUNT_DIFFERENCES.to_string()]);
}

#[test]
fn test_failed_difference_count_degrades_to_zero() {
    let engine = ScriptedEngine::new().fail(COUNT_DIFFERENCES, "SQL compilation error");
    let thresholds = Thresholds::default();

    let outcome = DifferenceExtractor::new(&engine, &thresholds).extract(&mapping(), 10);
    assert_eq!(outcome.difference_count, 0);
    assert!(outcome.samples.is_empty());
    assert!(outcome.message.starts_with("Error counting record differences:"));
    assert!(outcome.message.contains("SQL compilation error"));
}

#[test]
fn test_representation_differences_without_data_loss() {
    let engine = ScriptedEngine::new()
        .count(COUNT_DIFFERENCES, 50)
        .count(COUNT_NON_DELETED, 1000)
        .count(COUNT_VAULT, 998)
        .count(COUNT_MISSING_KEYS, 0);
    let thresholds = Thresholds::default();

    let outcome = DifferenceExtractor::new(&engine, &thresholds).extract(&mapping(), 10);
    assert_eq!(outcome.raw_count, 50);
    assert_eq!(outcome.difference_count, 0);
    assert!(outcome.representation_only);
    assert_eq!(outcome.key_only_missing, Some(0));
    assert!(outcome.samples.is_empty());
    assert!(outcome.message.contains("representation differences"));
    assert!(outcome.message.contains("NO ACTUAL DATA LOSS"));
    assert!(!engine.executed().contains(&SAMPLE.to_string()));
}

#[test]
fn test_few_missing_keys_still_confirm_representation() {
    let engine = ScriptedEngine::new()
        .count(COUNT_DIFFERENCES, 50)
        .count(COUNT_NON_DELETED, 1000)
        .count(COUNT_VAULT, 998)
        .count(COUNT_MISSING_KEYS, 2);
    let thresholds = Thresholds::default();

    let outcome = DifferenceExtractor::new(&engine, &thresholds).extract(&mapping(), 10);
    assert_eq!(outcome.difference_count, 0);
    assert_eq!(outcome.key_only_missing, Some(2));
    assert!(outcome.message.contains("found only 2 truly missing records"));
    assert!(!outcome.message.contains("NO ACTUAL DATA LOSS"));
}

#[test]
fn test_many_missing_keys_keep_the_count() {
    let engine = ScriptedEngine::new()
        .count(COUNT_DIFFERENCES, 50)
        .count(COUNT_NON_DELETED, 1000)
        .count(COUNT_VAULT, 998)
        .count(COUNT_MISSING_KEYS, 30)
        .rows(SAMPLE, vec![company_rows(10)]);
    let thresholds = Thresholds::default();

    let outcome = DifferenceExtractor::new(&engine, &thresholds).extract(&mapping(), 10);
    assert!(!outcome.representation_only);
    assert_eq!(outcome.difference_count, 50);
    assert_eq!(outcome.samples.len(), 10);
}

#[test]
fn test_large_difference_sample_is_capped() {
    let engine = ScriptedEngine::new()
        .count(COUNT_DIFFERENCES, 5000)
        .count(COUNT_NON_DELETED, 1000)
        .count(COUNT_VAULT, 500)
        .rows(SAMPLE, vec![company_rows(10)]);
    let thresholds = Thresholds::default();

    let outcome = DifferenceExtractor::new(&engine, &thresholds).extract(&mapping(), 10);
    assert_eq!(outcome.difference_count, 5000);
    assert_eq!(outcome.samples.len(), 10);
    assert_eq!(outcome.message, "All records verified.");

    let summary = outcome.summary.expect("summary entry");
    assert_eq!(summary.additional_records, 4990);
    assert_eq!(summary.note, "Showing 10 of 5000 total records with differences");

    let first = &outcome.samples[0];
    assert_eq!(first.values["company_id"], serde_json::json!(1));
    assert_eq!(first.metadata.record_type, RecordType::DataDifference);
    assert_eq!(first.metadata.hub_table, "h_company");
}

#[test]
fn test_caller_limit_applies_to_small_differences() {
    let sample = SAMPLE.replace("LIMIT 10", "LIMIT 25");
    let engine = ScriptedEngine::new()
        .count(COUNT_DIFFERENCES, 40)
        .count(COUNT_NON_DELETED, 1000)
        .count(COUNT_VAULT, 900)
        .rows(&sample, vec![company_rows(25)]);
    let thresholds = Thresholds::default();

    let outcome = DifferenceExtractor::new(&engine, &thresholds).extract(&mapping(), 25);
    assert_eq!(outcome.samples.len(), 25);
    assert_eq!(outcome.summary.unwrap().additional_records, 15);
}

#[test]
fn test_sample_failure_keeps_count() {
    let engine = ScriptedEngine::new()
        .count(COUNT_DIFFERENCES, 7)
        .count(COUNT_NON_DELETED, 1000)
        .count(COUNT_VAULT, 993)
        .fail(SAMPLE, "warehouse suspended");
    let thresholds = Thresholds::default();

    let outcome = DifferenceExtractor::new(&engine, &thresholds).extract(&mapping(), 10);
    assert_eq!(outcome.difference_count, 7);
    assert_eq!(outcome.samples.len(), 1);
    assert_eq!(outcome.samples[0].metadata.record_type, RecordType::SampleError);
    assert!(outcome.message.contains("Failed to collect samples"));
}

#[test]
fn test_vault_falls_back_to_primary_hub() {
    let mapping = TableMapping::builder("companies")
        .with_hub("h_company")
        .with_hub("h_company_legacy")
        .with_except_query(EXCEPT)
        .build();
    let engine = ScriptedEngine::new()
        .count(COUNT_DIFFERENCES, 3)
        .count("SELECT COUNT(*) FROM companies", 100)
        .count("SELECT COUNT(*) FROM h_company", 97)
        .rows(SAMPLE, vec![company_rows(3)]);
    let thresholds = Thresholds::default();

    let outcome = DifferenceExtractor::new(&engine, &thresholds).extract(&mapping, 10);
    assert_eq!(outcome.difference_count, 3);
    assert!(engine
        .executed()
        .contains(&"SELECT COUNT(*) FROM h_company".to_string()));
    assert!(outcome.summary.is_none());
}

/// One row whose `aliases` column has no JSON or display conversion.
fn unconvertible_rows() -> Batch {
    let item = Arc::new(Field::new("item", DataType::Utf8, true));
    let aliases = ListViewArray::new(
        item.clone(),
        ScalarBuffer::from(vec![0i32]),
        ScalarBuffer::from(vec![2i32]),
        Arc::new(StringArray::from(vec!["ACME", "Acme Corp"])),
        None,
    );
    let schema = Schema::new(vec![
        Field::new("company_id", DataType::Int64, false),
        Field::new("aliases", DataType::ListView(item), true),
    ]);
    Batch::try_new(
        Arc::new(schema),
        vec![Arc::new(Int64Array::from(vec![42])), Arc::new(aliases)],
    )
    .unwrap()
}

#[test]
fn test_unconvertible_row_becomes_error_marker() {
    let engine = ScriptedEngine::new()
        .count(COUNT_DIFFERENCES, 2)
        .count(COUNT_NON_DELETED, 1000)
        .count(COUNT_VAULT, 998)
        .rows(SAMPLE, vec![company_rows(1), unconvertible_rows()]);
    let thresholds = Thresholds::default();

    let outcome = DifferenceExtractor::new(&engine, &thresholds).extract(&mapping(), 10);
    assert_eq!(outcome.difference_count, 2);
    assert_eq!(outcome.samples.len(), 2);
    assert_eq!(outcome.samples[0].metadata.record_type, RecordType::DataDifference);

    let marker = &outcome.samples[1];
    assert_eq!(marker.metadata.record_type, RecordType::ConversionError);
    assert_eq!(marker.metadata.source_table, "companies");
    let error = marker.values["error"].as_str().unwrap();
    assert!(error.starts_with("Error converting record:"));
    assert!(outcome.summary.is_none());
}
