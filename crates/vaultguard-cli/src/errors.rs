use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Error: source file not found: '{path}'")]
    FileNotFound { path: String },
    #[error("Source '{name}' is declared more than once")]
    DuplicateSource { name: String },
    #[error("Configuration file contains no mapping")]
    NoMapping,
}
