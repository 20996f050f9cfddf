#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use arrow::datatypes::{DataType, Field, Schema};
use arrow_array::{Int64Array, StringArray};
use vaultguard_core::QueryError;
use vaultguard_core::query::QueryEngine;
use vaultguard_core::types::{Batch, Batches};

/// In-memory engine answering from a script of SQL statements.
///
/// Exact statements are looked up first, then fragments in insertion order.
/// Anything else fails like a missing table would.
#[derive(Default)]
pub struct ScriptedEngine {
    exact: HashMap<String, Result<Batches, String>>,
    fragments: Vec<(String, Result<Batches, String>)>,
    executed: RefCell<Vec<String>>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(mut self, sql: &str, count: i64) -> Self {
        self.exact.insert(sql.to_string(), Ok(vec![count_batch(count)]));
        self
    }

    pub fn rows(mut self, sql: &str, batches: Batches) -> Self {
        self.exact.insert(sql.to_string(), Ok(batches));
        self
    }

    pub fn fail(mut self, sql: &str, message: &str) -> Self {
        self.exact.insert(sql.to_string(), Err(message.to_string()));
        self
    }

    /// Fail every statement containing `fragment`.
    pub fn fail_containing(mut self, fragment: &str, message: &str) -> Self {
        self.fragments
            .push((fragment.to_string(), Err(message.to_string())));
        self
    }

    /// Answer every statement containing `fragment` with `count`.
    pub fn count_containing(mut self, fragment: &str, count: i64) -> Self {
        self.fragments
            .push((fragment.to_string(), Ok(vec![count_batch(count)])));
        self
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.borrow().clone()
    }
}

impl QueryEngine for ScriptedEngine {
    fn execute(&self, sql: &str) -> Result<Batches, QueryError> {
        self.executed.borrow_mut().push(sql.to_string());
        let response = self.exact.get(sql).or_else(|| {
            self.fragments
                .iter()
                .find(|(fragment, _)| sql.contains(fragment.as_str()))
                .map(|(_, response)| response)
        });
        match response {
            Some(Ok(batches)) => Ok(batches.clone()),
            Some(Err(message)) => Err(QueryError::execution(sql, message)),
            None => Err(QueryError::execution(sql, "Object does not exist")),
        }
    }
}

pub fn count_batch(count: i64) -> Batch {
    let schema = Schema::new(vec![Field::new("COUNT(*)", DataType::Int64, false)]);
    Batch::try_new(Arc::new(schema), vec![Arc::new(Int64Array::from(vec![count]))]).unwrap()
}

/// `n` rows of `(company_id, name)`.
pub fn company_rows(n: usize) -> Batch {
    let schema = Schema::new(vec![
        Field::new("company_id", DataType::Int64, false),
        Field::new("name", DataType::Utf8, true),
    ]);
    let ids: Vec<i64> = (1..=n as i64).collect();
    let names: Vec<String> = ids.iter().map(|id| format!("company {}", id)).collect();
    Batch::try_new(
        Arc::new(schema),
        vec![
            Arc::new(Int64Array::from(ids)),
            Arc::new(StringArray::from(names)),
        ],
    )
    .unwrap()
}
