//! Declarative description of one reconciliation unit.
//!
//! A [`TableMapping`] pairs a source table with its hub(s), an optional current
//! satellite and an optional business view. It is supplied wholesale by the
//! caller and never mutated during a run.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer};

use crate::bizview::ViewType;
use crate::errors::ConfigError;

/// Plain or dotted (`db.schema.table`) SQL identifier.
static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_$]*(\.[A-Za-z_][A-Za-z0-9_$]*){0,2}$")
        .expect("identifier pattern is valid")
});

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TableMapping {
    pub source_table: String,
    #[serde(alias = "hub_table", deserialize_with = "one_or_many")]
    pub hub_tables: Vec<String>,
    #[serde(default)]
    pub satellite_table: Option<String>,
    #[serde(default)]
    pub satellite_hash_key: Option<String>,
    #[serde(default)]
    pub bizview_table: Option<String>,
    #[serde(default)]
    pub bizview_key: Option<String>,
    #[serde(default)]
    pub source_key: Option<String>,
    #[serde(default)]
    pub hub_key: Option<String>,
    #[serde(default)]
    pub deleted_column: Option<String>,
    /// Set-difference query returning source rows absent from the vault.
    #[serde(default)]
    pub except_query: Option<String>,
    #[serde(default)]
    pub columns_to_compare: Vec<String>,
    /// Overrides the name-prefix inference of the bizview type.
    #[serde(default)]
    pub view_type: Option<ViewType>,
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(table) => vec![table],
        OneOrMany::Many(tables) => tables,
    })
}

/// Last segment of a dotted table name.
pub fn unqualified(table: &str) -> &str {
    table.rsplit('.').next().unwrap_or(table)
}

impl TableMapping {
    pub fn builder(source_table: impl Into<String>) -> MappingBuilder {
        MappingBuilder::new(source_table)
    }

    /// Short name used to label the mapping in reports.
    pub fn table_name(&self) -> &str {
        unqualified(&self.source_table)
    }

    pub fn hub_label(&self) -> String {
        self.hub_tables.join(", ")
    }

    pub fn primary_hub(&self) -> Option<&str> {
        self.hub_tables.first().map(String::as_str)
    }

    /// The difference query with any trailing `;` removed, so it can be nested.
    pub fn difference_query(&self) -> Option<&str> {
        self.except_query
            .as_deref()
            .map(|q| q.trim().trim_end_matches(';').trim_end())
            .filter(|q| !q.is_empty())
    }

    /// Check every identifier that ends up interpolated into generated SQL.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hub_tables.iter().all(|h| h.trim().is_empty()) {
            return Err(ConfigError::MissingHub {
                source_table: self.source_table.clone(),
            });
        }

        check_identifier("source_table", &self.source_table)?;
        for hub in &self.hub_tables {
            check_identifier("hub_tables", hub)?;
        }
        let optional = [
            ("satellite_table", &self.satellite_table),
            ("satellite_hash_key", &self.satellite_hash_key),
            ("bizview_table", &self.bizview_table),
            ("bizview_key", &self.bizview_key),
            ("source_key", &self.source_key),
            ("hub_key", &self.hub_key),
            ("deleted_column", &self.deleted_column),
        ];
        for (field, value) in optional {
            if let Some(value) = value {
                check_identifier(field, value)?;
            }
        }
        for column in &self.columns_to_compare {
            check_identifier("columns_to_compare", column)?;
        }
        Ok(())
    }
}

fn check_identifier(field: &str, value: &str) -> Result<(), ConfigError> {
    if IDENTIFIER.is_match(value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidIdentifier {
            field: field.to_string(),
            value: value.to_string(),
        })
    }
}

pub struct MappingBuilder {
    mapping: TableMapping,
}

impl MappingBuilder {
    /// Create a new [`MappingBuilder`]
    pub fn new(source_table: impl Into<String>) -> Self {
        Self {
            mapping: TableMapping {
                source_table: source_table.into(),
                hub_tables: Vec::new(),
                satellite_table: None,
                satellite_hash_key: None,
                bizview_table: None,
                bizview_key: None,
                source_key: None,
                hub_key: None,
                deleted_column: None,
                except_query: None,
                columns_to_compare: Vec::new(),
                view_type: None,
            },
        }
    }

    /// Build the [`TableMapping`]
    pub fn build(self) -> TableMapping {
        self.mapping
    }

    pub fn with_hub(mut self, hub_table: impl Into<String>) -> Self {
        self.mapping.hub_tables.push(hub_table.into());
        self
    }

    pub fn with_satellite(
        mut self,
        satellite_table: impl Into<String>,
        hash_key: Option<&str>,
    ) -> Self {
        self.mapping.satellite_table = Some(satellite_table.into());
        self.mapping.satellite_hash_key = hash_key.map(str::to_string);
        self
    }

    pub fn with_bizview(mut self, bizview_table: impl Into<String>, key: Option<&str>) -> Self {
        self.mapping.bizview_table = Some(bizview_table.into());
        self.mapping.bizview_key = key.map(str::to_string);
        self
    }

    pub fn with_keys(mut self, source_key: impl Into<String>, hub_key: impl Into<String>) -> Self {
        self.mapping.source_key = Some(source_key.into());
        self.mapping.hub_key = Some(hub_key.into());
        self
    }

    pub fn with_deleted_column(mut self, column: impl Into<String>) -> Self {
        self.mapping.deleted_column = Some(column.into());
        self
    }

    pub fn with_except_query(mut self, query: impl Into<String>) -> Self {
        self.mapping.except_query = Some(query.into());
        self
    }

    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.mapping.columns_to_compare = columns;
        self
    }

    pub fn with_view_type(mut self, view_type: ViewType) -> Self {
        self.mapping.view_type = Some(view_type);
        self
    }
}
