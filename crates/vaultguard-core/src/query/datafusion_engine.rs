use std::sync::Mutex;

use datafusion::error::DataFusionError;
use datafusion::prelude::{CsvReadOptions, ParquetReadOptions, SessionConfig, SessionContext};
use serde::Deserialize;
use tokio::runtime::Runtime;
use tracing::{debug, info};

use super::{QueryEngine, SessionSettings};
use crate::errors::QueryError;
use crate::types::Batches;

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Csv,
    Parquet,
}

/// Synchronous engine over Apache DataFusion.
///
/// CSV and Parquet files are registered as named tables, then queried with
/// plain SQL. Every call blocks on a private single-threaded runtime.
pub struct DataFusionEngine {
    context: SessionContext,
    runtime: Runtime,
    query_tag: Mutex<Option<String>>,
}

impl DataFusionEngine {
    pub fn new() -> Result<Self, QueryError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| QueryError::Runtime(e.to_string()))?;
        let config = SessionConfig::new().with_information_schema(true);
        Ok(Self {
            context: SessionContext::new_with_config(config),
            runtime,
            query_tag: Mutex::new(None),
        })
    }

    /// Register a file under `name` so queries can reference it.
    pub fn register(&self, name: &str, path: &str, format: SourceFormat) -> Result<(), QueryError> {
        let registered = match format {
            SourceFormat::Csv => self.runtime.block_on(self.context.register_csv(
                name,
                path,
                CsvReadOptions::new(),
            )),
            SourceFormat::Parquet => self.runtime.block_on(self.context.register_parquet(
                name,
                path,
                ParquetReadOptions::default(),
            )),
        };
        registered.map_err(|e| QueryError::Registration {
            name: name.to_string(),
            message: e.to_string(),
        })?;
        info!(table = name, path = path, format = ?format, "Registered table");
        Ok(())
    }

    pub fn query_tag(&self) -> Option<String> {
        self.query_tag.lock().ok().and_then(|tag| tag.clone())
    }
}

impl QueryEngine for DataFusionEngine {
    fn execute(&self, sql: &str) -> Result<Batches, QueryError> {
        debug!(query = sql, tag = ?self.query_tag(), "Executing query");
        let result: Result<Batches, DataFusionError> = self.runtime.block_on(async {
            let frame = self.context.sql(sql).await?;
            frame.collect().await
        });
        result.map_err(|e| QueryError::execution(sql, e))
    }

    /// DataFusion has no `ALTER SESSION`; the tag is kept for query logs and
    /// the timeout is not enforced.
    fn apply_session(&self, settings: &SessionSettings) {
        if let Ok(mut tag) = self.query_tag.lock() {
            tag.clone_from(&settings.query_tag);
        }
        info!(
            tag = ?settings.query_tag,
            timeout = ?settings.statement_timeout_secs,
            "Session settings recorded"
        );
    }
}
