use std::path::PathBuf;

use polars::prelude::PolarsError;
use thiserror::Error;

/// Structural contract violations found when checking a frame against a [`crate::TableSchema`].
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("missing required columns in {table}: {columns:?}")]
    MissingColumns {
        table: &'static str,
        columns: Vec<&'static str>,
    },

    #[error("{table}.{column} has type {found}, expected {expected}")]
    TypeMismatch {
        table: &'static str,
        column: &'static str,
        expected: String,
        found: String,
    },

    #[error("unknown schema: {name}")]
    UnknownSchema { name: String },
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{table} CSV error: {source}")]
    Csv {
        table: &'static str,
        #[source]
        source: csv::Error,
    },

    #[error("{table} has no header row")]
    EmptyHeader { table: &'static str },

    #[error("{table}.{column} line {line}: cannot parse {value:?} as a number")]
    InvalidValue {
        table: &'static str,
        column: &'static str,
        line: u64,
        value: String,
    },

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Polars(#[from] PolarsError),
}
