pub mod formatters;
pub mod utils;

use vaultguard_core::ReportRecord;
use vaultguard_core::report::{RunReport, SkippedMapping};

pub use formatters::{json::JsonFormatter, stdout::StdOutFormatter};

pub trait Reporter {
    fn on_start(&self);
    fn on_mapping_start(&self, current: usize, total: usize, name: &str);
    fn on_mapping_result(&mut self, record: &ReportRecord);
    fn on_mapping_skipped(&mut self, skipped: &SkippedMapping);
    fn on_complete(&self, report: &RunReport);
}
