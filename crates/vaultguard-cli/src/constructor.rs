use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use vaultguard_core::DataFusionEngine;

use crate::errors::ConfigError;
use crate::parser::Source;

/// Engine with every configured source registered under its name.
pub fn construct_engine(sources: &[Source]) -> Result<DataFusionEngine> {
    let engine = DataFusionEngine::new().context("Failed to start the query engine")?;
    let mut seen = HashSet::new();
    for source in sources {
        if !seen.insert(source.name.as_str()) {
            return Err(ConfigError::DuplicateSource {
                name: source.name.clone(),
            }
            .into());
        }
        if !Path::new(&source.path).exists() {
            return Err(ConfigError::FileNotFound {
                path: source.path.clone(),
            }
            .into());
        }
        engine
            .register(&source.name, &source.path, source.format)
            .with_context(|| format!("Failed to register source: '{}'", source.name))?;
    }
    Ok(engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use vaultguard_core::query::first_scalar_count;
    use vaultguard_core::{QueryEngine, SourceFormat};

    fn source(name: &str, path: &Path) -> Source {
        Source {
            name: name.to_string(),
            path: path.to_str().unwrap().to_string(),
            format: SourceFormat::Csv,
        }
    }

    #[test]
    fn test_sources_are_queryable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("h_company.csv");
        fs::write(&path, "company_bk\n1\n2\n").unwrap();

        let engine = construct_engine(&[source("h_company", &path)]).unwrap();
        let batches = engine.execute("SELECT COUNT(*) FROM h_company").unwrap();
        assert_eq!(first_scalar_count(&batches), 2);
    }

    #[test]
    fn test_missing_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let err = construct_engine(&[source("h_company", &dir.path().join("nope.csv"))])
            .err()
            .unwrap();
        assert!(err.to_string().contains("source file not found"));
    }

    #[test]
    fn test_duplicate_source_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("h_company.csv");
        fs::write(&path, "company_bk\n1\n").unwrap();

        let err = construct_engine(&[source("h_company", &path), source("h_company", &path)])
            .err()
            .unwrap();
        assert!(err.to_string().contains("declared more than once"));
    }
}
