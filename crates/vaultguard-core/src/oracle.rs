use serde::Serialize;
use tracing::{debug, warn};

use crate::errors::QueryError;
use crate::query::{QueryEngine, first_scalar_count};

/// Outcome of a single count query.
///
/// A failed query yields a zero count with the error text in `diagnostic`:
/// callers must read zero as "unknown" when `succeeded` is false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountResult {
    pub count: u64,
    pub query_text: String,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

impl CountResult {
    pub fn success(count: u64, query_text: String) -> Self {
        Self {
            count,
            query_text,
            succeeded: true,
            diagnostic: None,
        }
    }

    pub fn failure(query_text: String, diagnostic: String) -> Self {
        Self {
            count: 0,
            query_text,
            succeeded: false,
            diagnostic: Some(diagnostic),
        }
    }

    /// Placeholder for a table that is not configured.
    pub fn not_configured(what: &str) -> Self {
        Self {
            count: 0,
            query_text: format!("No {} table", what),
            succeeded: false,
            diagnostic: None,
        }
    }
}

/// Which values a count query counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountTarget<'a> {
    Rows,
    Column(&'a str),
    Distinct(&'a str),
}

pub struct CountOracle<'a, E: QueryEngine + ?Sized> {
    engine: &'a E,
}

impl<'a, E: QueryEngine + ?Sized> CountOracle<'a, E> {
    pub fn new(engine: &'a E) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &'a E {
        self.engine
    }

    pub fn count_query(table: &str, filter: Option<&str>, target: CountTarget<'_>) -> String {
        let mut query = match target {
            CountTarget::Rows => format!("SELECT COUNT(*) FROM {}", table),
            CountTarget::Column(column) => format!("SELECT COUNT({}) FROM {}", column, table),
            CountTarget::Distinct(column) => {
                format!("SELECT COUNT(DISTINCT {}) FROM {}", column, table)
            }
        };
        if let Some(filter) = filter {
            query.push_str(" WHERE ");
            query.push_str(filter);
        }
        query
    }

    /// Count rows (or values) of `table`, optionally filtered.
    pub fn count(&self, table: &str, filter: Option<&str>, target: CountTarget<'_>) -> CountResult {
        if table.trim().is_empty() {
            return CountResult::failure(String::new(), "No table specified".to_string());
        }
        let query = Self::count_query(table, filter, target);
        self.run(query)
    }

    /// `SELECT COUNT(*) FROM (<query>) AS <alias>`
    pub fn count_subquery(&self, query: &str, alias: &str) -> CountResult {
        self.run(format!("SELECT COUNT(*) FROM ({}) AS {}", query, alias))
    }

    /// Execute any query whose first scalar is a count.
    pub fn run(&self, query: String) -> CountResult {
        debug!(query = %query, "Executing count query");
        match self.engine.execute(&query) {
            Ok(batches) => {
                let count = first_scalar_count(&batches);
                debug!(count, "Count query returned");
                CountResult::success(count, query)
            }
            Err(e) => {
                warn!(query = %query, error = %e, "Count query failed");
                CountResult::failure(query, e.to_string())
            }
        }
    }

    /// Cheap accessibility check: `SELECT 1 FROM <table> LIMIT 1`.
    pub fn probe(&self, table: &str) -> Result<(), QueryError> {
        self.engine
            .execute(&format!("SELECT 1 FROM {} LIMIT 1", table))
            .map(|_| ())
    }
}
