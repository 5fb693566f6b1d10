use std::collections::HashSet;

use enerflux_sources::SchemaError;
use polars::prelude::*;

use crate::error::{Result, TransformError};

/// Fails with [`SchemaError::MissingColumns`] unless every listed column is present.
pub(crate) fn require_columns(
    df: &DataFrame,
    table: &'static str,
    columns: &[&'static str],
) -> Result<()> {
    let missing: Vec<&'static str> = columns
        .iter()
        .copied()
        .filter(|name| df.column(name).is_err())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(SchemaError::MissingColumns {
            table,
            columns: missing,
        }
        .into())
    }
}

pub(crate) fn text_column(df: &DataFrame, name: &str) -> Result<StringChunked> {
    let column = df.column(name)?.cast(&DataType::String)?;
    Ok(column.str()?.clone())
}

/// Fails with [`TransformError::DuplicateReferenceKey`] on the first repeated composite key.
/// Null cells take part in the key as empty strings.
pub(crate) fn ensure_unique_keys(
    df: &DataFrame,
    table: &'static str,
    key_columns: &[&'static str],
) -> Result<()> {
    let columns = key_columns
        .iter()
        .map(|name| text_column(df, name))
        .collect::<Result<Vec<_>>>()?;

    let mut seen: HashSet<Vec<&str>> = HashSet::with_capacity(df.height());
    for idx in 0..df.height() {
        let key: Vec<&str> = columns
            .iter()
            .map(|column| column.get(idx).unwrap_or_default())
            .collect();
        if !seen.insert(key.clone()) {
            return Err(TransformError::DuplicateReferenceKey {
                table,
                key: key.join(" / "),
            });
        }
    }
    Ok(())
}
