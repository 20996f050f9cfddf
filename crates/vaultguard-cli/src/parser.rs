use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use vaultguard_core::{SessionSettings, SourceFormat, TableMapping, Thresholds};

use crate::errors::ConfigError;

#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub source: Vec<Source>,
    #[serde(default)]
    pub mapping: Vec<TableMapping>,
}

/// A file registered as a table in the bundled engine.
#[derive(Debug, Deserialize)]
pub struct Source {
    pub name: String,
    pub path: String,
    #[serde(default = "default_format")]
    pub format: SourceFormat,
}

fn default_format() -> SourceFormat {
    SourceFormat::Csv
}

pub fn parse_config(path: &Path) -> Result<Config> {
    let config_str = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: Config = toml::from_str(config_str.as_str())
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    if config.mapping.is_empty() {
        return Err(ConfigError::NoMapping.into());
    }
    config
        .thresholds
        .validate()
        .context("Invalid [thresholds] section")?;
    Ok(config)
}
