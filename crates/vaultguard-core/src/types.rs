use std::collections::BTreeMap;

use serde_json::Value;

pub type Batch = arrow::record_batch::RecordBatch;
pub type Batches = Vec<Batch>;
/// One result row as column name → JSON-safe value.
pub type RowMap = BTreeMap<String, Value>;
