use std::collections::HashSet;
use std::fmt;

use enerflux_sources::schema::{
    CONSOMMATION, CONSOMMATION_UNION, ID_SOURCE, POPULATION, POPULATION_UNION, SOURCE,
};
use enerflux_sources::TableSchema;
use polars::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{Result, TransformError};
use crate::frame::{require_columns, text_column};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum City {
    Paris,
    Evry,
}

impl City {
    pub fn tag(&self) -> &'static str {
        match self {
            City::Paris => "Paris",
            City::Evry => "Evry",
        }
    }
}

impl fmt::Display for City {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Unions both population tables; the result is checked against `Population_Union`.
pub fn union_population_sources(paris: &DataFrame, evry: &DataFrame) -> Result<DataFrame> {
    let unified = unify_sources(paris, evry, &POPULATION)?;
    POPULATION_UNION.validate(&unified)?;
    Ok(unified)
}

/// Unions both consumption tables; the result is checked against `Consommation_Union`.
pub fn union_consommation_sources(paris: &DataFrame, evry: &DataFrame) -> Result<DataFrame> {
    let unified = unify_sources(paris, evry, &CONSOMMATION)?;
    CONSOMMATION_UNION.validate(&unified)?;
    Ok(unified)
}

/// Concatenates the Paris and Evry frames of one table, Paris rows first.
///
/// The per-city identifier (the schema's primary key) is replaced by
/// `ID_Source = "<city>_<id>"` and a `Source` column carries the city tag. No row is
/// dropped or deduplicated.
pub fn unify_sources(
    paris: &DataFrame,
    evry: &DataFrame,
    schema: &'static TableSchema,
) -> Result<DataFrame> {
    let id_column = schema.primary_key[0];
    require_columns(paris, schema.name, &[id_column])?;
    require_columns(evry, schema.name, &[id_column])?;

    let mut unified = tag_city(paris, City::Paris, schema)?;
    let evry_tagged = tag_city(evry, City::Evry, schema)?;
    unified.vstack_mut(&evry_tagged)?;

    let ids = text_column(&unified, ID_SOURCE)?;
    let distinct: HashSet<&str> = ids.into_iter().flatten().collect();
    if distinct.len() != unified.height() {
        warn!(
            table = schema.name,
            duplicates = unified.height() - distinct.len(),
            "source identifiers are not unique within a city"
        );
    }

    info!(
        table = schema.name,
        paris_rows = paris.height(),
        evry_rows = evry.height(),
        rows = unified.height(),
        "union complete"
    );
    Ok(unified)
}

fn tag_city(df: &DataFrame, city: City, schema: &'static TableSchema) -> Result<DataFrame> {
    let rows = df.height();
    let id_column = schema.primary_key[0];

    let mut id_source = Vec::with_capacity(rows);
    for (row, id) in text_column(df, id_column)?.into_iter().enumerate() {
        let id = id.ok_or(TransformError::NullIdentifier {
            table: schema.name,
            column: id_column,
            row,
        })?;
        id_source.push(format!("{}_{}", city.tag(), id));
    }

    let mut columns: Vec<Column> = Vec::with_capacity(schema.columns.len() + 1);
    for spec in schema.columns.iter().filter(|spec| spec.name != id_column) {
        let dtype = spec.kind.dtype();
        let column = match df.column(spec.name) {
            Ok(existing) => existing.cast(&dtype)?,
            Err(_) => Series::full_null(spec.name.into(), rows, &dtype).into(),
        };
        columns.push(column);
    }
    columns.push(Series::new(SOURCE.into(), vec![city.tag(); rows]).into());
    columns.push(Series::new(ID_SOURCE.into(), id_source).into());

    Ok(DataFrame::new(columns)?)
}
