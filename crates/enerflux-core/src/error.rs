// crates/enerflux-core/src/error.rs

use enerflux_sources::SchemaError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Schema contract violated: {0}")]
    Schema(#[from] SchemaError),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("{table}.{column} is null at row {row}")]
    NullIdentifier {
        table: &'static str,
        column: &'static str,
        row: usize,
    },

    #[error("{table} reference key {key} is not unique")]
    DuplicateReferenceKey { table: &'static str, key: String },
}

pub type Result<T> = std::result::Result<T, TransformError>;
