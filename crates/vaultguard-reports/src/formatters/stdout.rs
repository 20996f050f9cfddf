use prettytable::{Cell, Row, Table};
use vaultguard_core::ReportRecord;
use vaultguard_core::report::{RunReport, SkippedMapping};

use crate::{
    Reporter,
    utils::numbers::{format_numbers, format_share},
};

pub struct StdOutFormatter {
    intro: String,
    intro_len: usize,
}

impl StdOutFormatter {
    pub fn new(version: String) -> Self {
        let s = format!("VaultGuard v{} - Reconciliation Report", version);
        let n = s.len();
        Self {
            intro: s,
            intro_len: n,
        }
    }

    pub fn print_mapping_progress(&self, current: usize, total: usize, name: &str) {
        println!("\n[{}/{}] {}", current, total, name);
    }

    pub fn print_mapping_result(&self, record: &ReportRecord) {
        println!("Table: {}", record.table_name);
        println!("  Source Table: {}", record.source_table);
        println!("  Hub Table: {}", record.hub_table);
        println!(
            "  Satellite Table: {}",
            record.satellite_table.as_deref().unwrap_or("N/A")
        );
        println!(
            "  Bizview Table: {}",
            record.bizview_table.as_deref().unwrap_or("N/A")
        );
        println!("  Source Count (Total): {}", format_numbers(record.source_count));
        println!(
            "  Source Count (Non-Deleted): {}",
            format_numbers(record.non_deleted_count)
        );
        println!("  Hub Count: {}", format_numbers(record.hub_count));
        if record.satellite_table.is_some() {
            println!("  Satellite Count: {}", format_numbers(record.satellite_count));
        }
        if record.bizview_table.is_some() {
            println!("  Bizview Count: {}", format_numbers(record.bizview_count));
        }

        println!("\n  Data Flow:");
        for line in data_flow(record) {
            println!("  {}", line);
        }
        if record.deleted_count > 0 {
            println!(
                "  Intentionally Deleted Records: {}",
                format_numbers(record.deleted_count)
            );
        }
        println!("  ---");
    }

    pub fn print_skipped(&self, skipped: &SkippedMapping) {
        println!("  Skipped {}: {}", skipped.source_table, skipped.reason);
    }

    pub fn print_summary(&self, report: &RunReport) {
        println!("\n{}", "=".repeat(self.intro_len));
        println!("{}", summary_table(&report.records));
        println!(
            "Result: {} mappings reconciled, {} skipped, {} true missing, {} bizview missing",
            report.records.len(),
            report.skipped.len(),
            format_numbers(report.total_true_missing()),
            format_numbers(report.total_bizview_missing())
        );
    }
}

/// Source → vault → bizview lines for one mapping.
pub fn data_flow(record: &ReportRecord) -> Vec<String> {
    let bizview = if record.bizview_table.is_some() {
        format_numbers(record.bizview_count)
    } else {
        "N/A".to_string()
    };
    let mut lines = vec![format!(
        "Source ({}) -> Vault -> Bizview ({})",
        format_numbers(record.non_deleted_count),
        bizview
    )];

    if record.true_missing_count > 0 {
        lines.push(format!(
            "  [WARN] True Missing Records: {}",
            record.true_missing_count
        ));
        if record.representation_difference_count > 0 {
            lines.push(format!(
                "    Records with Data Differences: {}",
                record.representation_difference_count
            ));
            lines.push(format!("    {}", record.validation_message));
        }
    } else if record.representation_difference_count > 0 {
        lines.push(format!(
            "  Records with Data Representation Differences: {}",
            record.representation_difference_count
        ));
        lines.push("  [OK] No actual missing records".to_string());
    } else {
        lines.push("  [OK] No Data Discrepancies".to_string());
    }

    if record.bizview_missing_count > 0 {
        lines.push(format!(
            "  [WARN] Bizview Missing Records: {}",
            record.bizview_missing_count
        ));
    } else if record.bizview_table.is_some() {
        lines.push("  [OK] No Bizview Discrepancies".to_string());
    }
    lines
}

pub fn summary_table(records: &[ReportRecord]) -> String {
    let mut table = Table::new();
    table.add_row(Row::new(vec![
        Cell::new("Table"),
        Cell::new("Source"),
        Cell::new("Non-Deleted"),
        Cell::new("Hub"),
        Cell::new("Satellite"),
        Cell::new("Bizview"),
        Cell::new("Missing"),
        Cell::new("% Missing"),
        Cell::new("Repr. Diff"),
        Cell::new("Bizview Missing"),
        Cell::new("Deleted"),
    ]));

    for record in records {
        table.add_row(Row::new(vec![
            Cell::new(&record.table_name),
            Cell::new(&record.source_count.to_string()),
            Cell::new(&record.non_deleted_count.to_string()),
            Cell::new(&record.hub_count.to_string()),
            Cell::new(&record.satellite_count.to_string()),
            Cell::new(&record.bizview_count.to_string()),
            Cell::new(&record.true_missing_count.to_string()),
            Cell::new(&format_share(
                record.true_missing_count,
                record.non_deleted_count,
            )),
            Cell::new(&record.representation_difference_count.to_string()),
            Cell::new(&record.bizview_missing_count.to_string()),
            Cell::new(&record.deleted_count.to_string()),
        ]));
    }

    table.to_string()
}

impl Reporter for StdOutFormatter {
    fn on_start(&self) {
        let i = "=".repeat(self.intro_len);

        println!("{}", self.intro);
        println!("{}", i);
    }

    fn on_mapping_start(&self, current: usize, total: usize, name: &str) {
        self.print_mapping_progress(current, total, name);
    }

    fn on_mapping_result(&mut self, record: &ReportRecord) {
        self.print_mapping_result(record);
    }

    fn on_mapping_skipped(&mut self, skipped: &SkippedMapping) {
        self.print_skipped(skipped);
    }

    fn on_complete(&self, report: &RunReport) {
        self.print_summary(report);
    }
}
