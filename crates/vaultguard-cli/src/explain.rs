use vaultguard_core::Thresholds;

/// Print how discrepancies are classified, with the thresholds in effect.
pub fn print_explanation(thresholds: &Thresholds) {
    println!("{}", explanation(thresholds));
}

fn explanation(thresholds: &Thresholds) -> String {
    format!(
        r#"
╔══════════════════════════════════════════════════════════════════════════════╗
║                     VAULTGUARD RECONCILIATION HEURISTICS                     ║
╚══════════════════════════════════════════════════════════════════════════════╝
{}
{}
{}
"#,
        source_to_vault_section(thresholds),
        cross_check_section(thresholds),
        bizview_section(thresholds),
    )
}

fn percent(ratio: f64) -> String {
    format!("{:.0}%", ratio * 100.)
}

fn source_to_vault_section(t: &Thresholds) -> String {
    format!(
        r#"
━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
 SOURCE TO VAULT
━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
  • The difference query is counted first. Zero means nothing else runs.
  • Size gap threshold: max({floor}, {gap} of non-deleted source rows)
    → gap below threshold AND differences > {mult}x gap
      → representation differences suspected
  • Key-only check (source key EXCEPT hub key):
    → 0 missing keys, or fewer than differences / {divisor}
      → representation differences confirmed, no records reported missing
  • Sample: {limit} rows, at most {cap} when more than {cutoff} differences
"#,
        floor = t.absolute_floor,
        gap = percent(t.count_gap_ratio),
        mult = t.representation_multiplier,
        divisor = t.key_only_divisor,
        limit = t.sample_limit,
        cap = t.large_difference_sample_cap,
        cutoff = t.large_difference_cutoff,
    )
}

fn cross_check_section(t: &Thresholds) -> String {
    format!(
        r#"
━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
 COUNT CROSS-CHECK
━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
  • expected = |non-deleted source - (satellite or hub)|
  • Reported missing off by more than max({gap}, {ratio} of expected)
    → note added to the validation message
  • expected < {gap} AND reported missing > {large}
    → every reported record becomes a representation difference
"#,
        gap = t.cross_check_small_gap,
        ratio = percent(t.cross_check_ratio),
        large = t.cross_check_large_report,
    )
}

fn bizview_section(t: &Thresholds) -> String {
    format!(
        r#"
━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
 BIZVIEW
━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
VIEW TYPE (name prefix, unless `view_type` is set):
  • dim_, dimension_        → dimension, compared with the hub, {dim}
  • fact_, bridge_, link_   → fact, compared with the non-deleted source, {fact}
  • anything else           → unknown, compared with the satellite, {unknown}
THRESHOLD:
  • max({floor}, ratio of the reference count)
  • Empty bizview with a non-empty reference → the whole reference is missing
  • Smaller view matching {patterns:?}
    losing less than {filtering} of the reference → intentional filtering
"#,
        dim = percent(t.dimension_ratio),
        fact = percent(t.fact_ratio),
        unknown = percent(t.unknown_ratio),
        floor = t.absolute_floor,
        patterns = t.filtering_patterns,
        filtering = percent(t.filtering_max_ratio),
    )
}
