use arrow::datatypes::DataType;
use thiserror::Error;

/// The query engine rejected or failed to execute a statement.
#[derive(Error, Debug, Clone)]
pub enum QueryError {
    /// The engine returned an error for this statement
    #[error("Query failed: {message} (query: {sql})")]
    Execution { sql: String, message: String },

    /// The engine itself could not be started
    #[error("Query engine runtime error: {0}")]
    Runtime(String),

    /// A table could not be registered in the engine
    #[error("Failed to register table '{name}': {message}")]
    Registration { name: String, message: String },
}

impl QueryError {
    pub fn execution(sql: &str, message: impl ToString) -> Self {
        QueryError::Execution {
            sql: sql.to_string(),
            message: message.to_string(),
        }
    }
}

/// A sampled row could not be turned into a JSON-safe mapping.
#[derive(Error, Debug)]
pub enum RowConversionError {
    #[error("Column '{column}' has unsupported type {data_type}")]
    UnsupportedValue { column: String, data_type: DataType },

    #[error("Arrow computation error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid identifier '{value}' for '{field}'")]
    InvalidIdentifier { field: String, value: String },

    #[error("Mapping for '{source_table}' has no hub table")]
    MissingHub { source_table: String },

    #[error("Invalid filtering pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Threshold '{name}' must be a finite, non-negative ratio, got {value}")]
    InvalidRatio { name: String, value: f64 },
}

/// Failure of a whole mapping. The mapping is skipped, the run goes on.
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Source table '{table}' is not accessible")]
    SourceUnavailable {
        table: String,
        #[source]
        source: QueryError,
    },

    #[error("Invalid mapping: {0}")]
    InvalidMapping(#[from] ConfigError),
}
