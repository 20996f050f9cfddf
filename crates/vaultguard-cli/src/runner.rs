use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use tracing::info;
use vaultguard_core::report::RunReport;
use vaultguard_core::{Auditor, QueryEngine, TableMapping};
use vaultguard_reports::{JsonFormatter, Reporter, StdOutFormatter};

use crate::{
    Args, OutputFormat, constructor::construct_engine, explain::print_explanation,
    parser::parse_config, writer,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Clean,
    Discrepancies,
}

pub fn run(args: &Args) -> Result<RunStatus> {
    let Some(config_path) = args.config.as_deref() else {
        print_explanation(&Default::default());
        return Ok(RunStatus::Clean);
    };
    let config = parse_config(Path::new(config_path))?;
    if args.explain {
        print_explanation(&config.thresholds);
        return Ok(RunStatus::Clean);
    }

    let engine = construct_engine(&config.source)?;
    let auditor = Auditor::new(&engine, config.thresholds)
        .context("Invalid reconciliation thresholds")?;
    auditor.apply_session(&config.session);

    let version = env!("CARGO_PKG_VERSION").to_string();
    let report = match args.output {
        OutputFormat::Stdout => {
            let mut formatter = StdOutFormatter::new(version);
            reconcile(&auditor, &config.mapping, &mut formatter)
        }
        OutputFormat::Json => {
            let mut formatter = JsonFormatter::new(version);
            let report = reconcile(&auditor, &config.mapping, &mut formatter);
            let timestamp = Local::now().format("%Y%m%d-%H%M%S").to_string();
            let path = writer::resolve_file_path(&args.output_path, &timestamp)?;
            writer::write_report(&path, &formatter.to_json_or_empty())?;
            println!("Report written to {}", path.display());
            report
        }
    };

    if report.has_discrepancies() {
        Ok(RunStatus::Discrepancies)
    } else {
        Ok(RunStatus::Clean)
    }
}

fn reconcile<E, R>(
    auditor: &Auditor<'_, E>,
    mappings: &[TableMapping],
    reporter: &mut R,
) -> RunReport
where
    E: QueryEngine + ?Sized,
    R: Reporter,
{
    reporter.on_start();
    let total = mappings.len();
    let report = auditor.run_with(mappings, |current, mapping, outcome| {
        reporter.on_mapping_start(current, total, mapping.table_name());
        match outcome {
            Ok(record) => reporter.on_mapping_result(record),
            Err(skipped) => reporter.on_mapping_skipped(skipped),
        }
    });
    reporter.on_complete(&report);
    info!(
        true_missing = report.total_true_missing(),
        bizview_missing = report.total_bizview_missing(),
        "Run finished"
    );
    report
}
