use std::path::PathBuf;

use thiserror::Error;

/// Rule configuration could not be loaded or compiled.
///
/// Only produced while building a [`RuleSet`](crate::RuleSet) at startup;
/// assessment paths never return it.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read rules file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("rules JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid pattern for '{term}': {source}")]
    Pattern {
        term: String,
        source: regex::Error,
    },

    #[error("invalid rules configuration: {0}")]
    Invalid(String),
}

/// An Arrow batch did not have the expected shape.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("missing '{0}' column")]
    MissingColumn(&'static str),

    #[error("column '{column}' is not {expected}")]
    WrongType {
        column: &'static str,
        expected: &'static str,
    },

    #[error("null value in '{column}' at row {row}")]
    NullValue { column: &'static str, row: usize },

    #[error("unrecognised value '{value}' in '{column}'")]
    BadValue { column: &'static str, value: String },

    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}
