mod common;

use common::{ScriptedEngine, count_batch};
use vaultguard_core::bizview_count::{Attempt, BizviewCountStrategy};
use vaultguard_core::{BizviewCounter, TableMapping, Thresholds};

fn mapping(view: &str, key: Option<&str>) -> TableMapping {
    TableMapping::builder("companies")
        .with_hub("h_company")
        .with_bizview(view, key)
        .with_deleted_column("is_deleted")
        .build()
}

#[test]
fn test_unreachable_view_counts_zero() {
    let engine = ScriptedEngine::new().fail("SELECT 1 FROM dim_company LIMIT 1", "does not exist");
    let thresholds = Thresholds::default();

    let result = BizviewCounter::new(&engine, &thresholds).count(&mapping("dim_company", None));
    assert_eq!(result.count, 0);
    assert!(!result.succeeded);
    assert!(result.diagnostic.unwrap().starts_with("Bizview table access error"));
}

#[test]
fn test_known_large_view_uses_plain_count() {
    let engine = ScriptedEngine::new()
        .rows("SELECT 1 FROM fact_sales LIMIT 1", vec![count_batch(1)])
        .count("SELECT COUNT(*) FROM fact_sales", 2_500_000);
    let thresholds = Thresholds::default();

    let result =
        BizviewCounter::new(&engine, &thresholds).count(&mapping("fact_sales", Some("sale_id")));
    assert_eq!(result.count, 2_500_000);
    assert_eq!(result.query_text, "SELECT COUNT(*) FROM fact_sales");
    assert!(!engine
        .executed()
        .iter()
        .any(|q| q.contains("COUNT(DISTINCT")));
}

#[test]
fn test_distinct_key_count_is_preferred() {
    let engine = ScriptedEngine::new()
        .rows("SELECT 1 FROM dim_company LIMIT 1", vec![count_batch(1)])
        .count(
            "SELECT COUNT(DISTINCT company_id) FROM dim_company WHERE company_id IS NOT NULL",
            480,
        )
        .count("SELECT COUNT(*) FROM dim_company", 500);
    let thresholds = Thresholds::default();

    let result =
        BizviewCounter::new(&engine, &thresholds).count(&mapping("dim_company", Some("company_id")));
    assert_eq!(result.count, 480);
}

#[test]
fn test_low_key_count_falls_through_to_total() {
    let engine = ScriptedEngine::new()
        .rows("SELECT 1 FROM dim_company LIMIT 1", vec![count_batch(1)])
        .count(
            "SELECT COUNT(DISTINCT company_id) FROM dim_company WHERE company_id IS NOT NULL",
            12,
        )
        .count("SELECT COUNT(*) FROM dim_company", 40);
    let thresholds = Thresholds::default();

    let result =
        BizviewCounter::new(&engine, &thresholds).count(&mapping("dim_company", Some("company_id")));
    assert_eq!(result.count, 40);
}

#[test]
fn test_small_lookup_accepts_low_key_count() {
    let engine = ScriptedEngine::new()
        .rows("SELECT 1 FROM DIM_CONFIG LIMIT 1", vec![count_batch(1)])
        .count(
            "SELECT COUNT(DISTINCT config_id) FROM DIM_CONFIG WHERE config_id IS NOT NULL",
            8,
        );
    let thresholds = Thresholds::default();

    let result =
        BizviewCounter::new(&engine, &thresholds).count(&mapping("DIM_CONFIG", Some("config_id")));
    assert_eq!(result.count, 8);
    assert!(result.succeeded);
}

#[test]
fn test_non_deleted_count_when_view_has_flag() {
    let engine = ScriptedEngine::new()
        .rows("SELECT 1 FROM biz.views.dim_company LIMIT 1", vec![count_batch(1)])
        .rows(
            "SELECT COLUMN_NAME FROM biz.INFORMATION_SCHEMA.COLUMNS WHERE TABLE_SCHEMA = 'views' AND TABLE_NAME = 'dim_company' AND COLUMN_NAME = 'is_deleted'",
            vec![count_batch(1)],
        )
        .count("SELECT COUNT(*) FROM biz.views.dim_company WHERE is_deleted = FALSE", 310);
    let thresholds = Thresholds::default();

    let result = BizviewCounter::new(&engine, &thresholds)
        .count(&mapping("biz.views.dim_company", None));
    assert_eq!(result.count, 310);
}

#[test]
fn test_low_fact_count_is_expanded() {
    let engine = ScriptedEngine::new()
        .rows("SELECT 1 FROM fact_orders LIMIT 1", vec![count_batch(1)])
        .count("SELECT COUNT(*) FROM fact_orders", 20)
        .count(
            "SELECT COUNT(*) FROM (SELECT * FROM fact_orders LIMIT 10000) AS probe",
            10_000,
        )
        .count(
            "SELECT COUNT(*) FROM (SELECT * FROM fact_orders LIMIT 1000000) AS expanded_probe",
            64_000,
        );
    let thresholds = Thresholds::default();

    let result = BizviewCounter::new(&engine, &thresholds).count(&mapping("fact_orders", None));
    assert_eq!(result.count, 64_000);
}

#[test]
fn test_custom_strategy_order() {
    let engine = ScriptedEngine::new()
        .rows("SELECT 1 FROM dim_company LIMIT 1", vec![count_batch(1)])
        .count("SELECT COUNT(*) FROM dim_company", 500);
    let thresholds = Thresholds::default();
    let counter = BizviewCounter::new(&engine, &thresholds)
        .with_strategies(vec![BizviewCountStrategy::Total]);

    let result = counter.count(&mapping("dim_company", Some("company_id")));
    assert_eq!(result.count, 500);
    assert!(!engine
        .executed()
        .iter()
        .any(|q| q.contains("COUNT(DISTINCT")));
}

#[test]
fn test_strategy_skipped_without_key() {
    let engine = ScriptedEngine::new();
    let thresholds = Thresholds::default();
    let counter = BizviewCounter::new(&engine, &thresholds);

    let attempt = counter.attempt(
        BizviewCountStrategy::DistinctKey,
        &mapping("dim_company", None),
        "dim_company",
    );
    assert_eq!(attempt, Attempt::Skipped);
}
