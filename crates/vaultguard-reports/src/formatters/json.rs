use chrono::Local;
use serde::Serialize;
use serde_json::{Error, json};
use vaultguard_core::ReportRecord;
use vaultguard_core::report::{RunReport, SkippedMapping};

use crate::Reporter;

#[derive(Serialize)]
pub struct JsonFormatter {
    version: String,
    timestamp: String,
    mappings: Vec<ReportRecord>,
    skipped: Vec<SkippedMapping>,
}

impl JsonFormatter {
    pub fn new(version: String) -> Self {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        Self {
            version,
            timestamp,
            mappings: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(self)
    }

    /// The report, or an empty document of the same shape when it cannot be
    /// serialized.
    pub fn to_json_or_empty(&self) -> String {
        self.to_json().unwrap_or_else(|_| self.empty_document())
    }

    fn empty_document(&self) -> String {
        json!({
            "version": self.version,
            "timestamp": self.timestamp,
            "mappings": [],
            "skipped": [],
        })
        .to_string()
    }
}

impl Reporter for JsonFormatter {
    fn on_start(&self) {}

    fn on_mapping_start(&self, _current: usize, _total: usize, _name: &str) {}

    fn on_mapping_result(&mut self, record: &ReportRecord) {
        self.mappings.push(record.clone());
    }

    fn on_mapping_skipped(&mut self, skipped: &SkippedMapping) {
        self.skipped.push(skipped.clone());
    }

    fn on_complete(&self, _report: &RunReport) {}
}
