use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;
use polars::prelude::*;
use tracing::debug;

use crate::errors::{SchemaError, SourceError};
use crate::schema::{ColumnType, TableSchema};

enum ColumnValues {
    Text(Vec<Option<String>>),
    Float(Vec<Option<f64>>),
}

struct ColumnBuilder {
    name: &'static str,
    index: Option<usize>,
    values: ColumnValues,
}

impl ColumnBuilder {
    fn into_column(self) -> Column {
        match self.values {
            ColumnValues::Text(values) => Series::new(self.name.into(), values).into(),
            ColumnValues::Float(values) => Series::new(self.name.into(), values).into(),
        }
    }
}

/// Reads a comma-separated file with a header row into a frame shaped by `schema`.
pub fn read_table(path: &Path, schema: &'static TableSchema) -> Result<DataFrame, SourceError> {
    let file = File::open(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let df = read_table_from_reader(file, schema)?;
    debug!(table = schema.name, path = %path.display(), rows = df.height(), "loaded source table");
    Ok(df)
}

pub fn read_table_from_reader<R: Read>(
    reader: R,
    schema: &'static TableSchema,
) -> Result<DataFrame, SourceError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|source| SourceError::Csv {
            table: schema.name,
            source,
        })?
        .iter()
        .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(SourceError::EmptyHeader { table: schema.name });
    }

    let missing: Vec<&'static str> = schema
        .required_columns()
        .filter(|spec| !headers.iter().any(|h| h == spec.name))
        .map(|spec| spec.name)
        .collect();
    if !missing.is_empty() {
        return Err(SchemaError::MissingColumns {
            table: schema.name,
            columns: missing,
        }
        .into());
    }

    let mut builders: Vec<ColumnBuilder> = schema
        .columns
        .iter()
        .map(|spec| ColumnBuilder {
            name: spec.name,
            index: headers.iter().position(|h| h == spec.name),
            values: match spec.kind {
                ColumnType::Text => ColumnValues::Text(Vec::new()),
                ColumnType::Float => ColumnValues::Float(Vec::new()),
            },
        })
        .collect();

    for result in rdr.records() {
        let record = result.map_err(|source| SourceError::Csv {
            table: schema.name,
            source,
        })?;
        let line = record.position().map(|pos| pos.line()).unwrap_or_default();

        for builder in builders.iter_mut() {
            let cell = builder
                .index
                .and_then(|idx| record.get(idx))
                .filter(|value| !value.trim().is_empty());

            match &mut builder.values {
                ColumnValues::Text(values) => values.push(cell.map(str::to_string)),
                ColumnValues::Float(values) => {
                    let parsed = match cell {
                        Some(raw) => Some(raw.trim().parse::<f64>().map_err(|_| {
                            SourceError::InvalidValue {
                                table: schema.name,
                                column: builder.name,
                                line,
                                value: raw.to_string(),
                            }
                        })?),
                        None => None,
                    };
                    values.push(parsed);
                }
            }
        }
    }

    let columns: Vec<Column> = builders
        .into_iter()
        .map(ColumnBuilder::into_column)
        .collect();
    let df = DataFrame::new(columns)?;
    schema.validate(&df)?;
    Ok(df)
}
