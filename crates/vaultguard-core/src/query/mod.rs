//! The seam between the reconciliation logic and the warehouse.
//!
//! Everything the auditor learns about the data goes through
//! [`QueryEngine::execute`]: SQL text in, Arrow batches out.

mod datafusion_engine;

pub use datafusion_engine::{DataFusionEngine, SourceFormat};

use arrow::compute;
use arrow::datatypes::DataType;
use arrow_array::{Array, Int64Array};
use serde::Deserialize;
use tracing::{info, warn};

use crate::errors::QueryError;
use crate::types::Batches;

/// Session parameters applied once before the first mapping.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub query_tag: Option<String>,
    pub statement_timeout_secs: Option<u64>,
}

impl SessionSettings {
    pub fn statements(&self) -> Vec<String> {
        let mut statements = Vec::new();
        if let Some(tag) = &self.query_tag {
            statements.push(format!(
                "ALTER SESSION SET QUERY_TAG = '{}'",
                tag.replace('\'', "''")
            ));
        }
        if let Some(timeout) = self.statement_timeout_secs {
            statements.push(format!(
                "ALTER SESSION SET STATEMENT_TIMEOUT_IN_SECONDS = {}",
                timeout
            ));
        }
        statements
    }
}

pub trait QueryEngine {
    fn execute(&self, sql: &str) -> Result<Batches, QueryError>;

    /// Apply session parameters. Failures are reported, never fatal.
    fn apply_session(&self, settings: &SessionSettings) {
        for statement in settings.statements() {
            match self.execute(&statement) {
                Ok(_) => info!(statement = %statement, "Session parameter set"),
                Err(e) => warn!(statement = %statement, error = %e, "Could not set session parameter"),
            }
        }
    }
}

impl<E: QueryEngine + ?Sized> QueryEngine for &E {
    fn execute(&self, sql: &str) -> Result<Batches, QueryError> {
        (**self).execute(sql)
    }

    fn apply_session(&self, settings: &SessionSettings) {
        (**self).apply_session(settings)
    }
}

/// First column of the first row as a non-negative count.
///
/// No rows, a null scalar or a value that does not cast to an integer all
/// read as zero.
pub fn first_scalar_count(batches: &Batches) -> u64 {
    let Some(batch) = batches.iter().find(|b| b.num_rows() > 0 && b.num_columns() > 0) else {
        return 0;
    };
    let Ok(casted) = compute::cast(batch.column(0), &DataType::Int64) else {
        return 0;
    };
    match casted.as_any().downcast_ref::<Int64Array>() {
        Some(values) if !values.is_null(0) => values.value(0).max(0) as u64,
        _ => 0,
    }
}
