//! `Consommation_CSP`: average annual consumption per socio-professional category.

use std::collections::HashSet;

use enerflux_sources::schema::{
    ADRESSE, CONSO_MOYENNE_ANNUELLE, CSP, ID_CSP, NB_KW_JOUR, SALAIRE_MOYEN,
};
use polars::prelude::*;
use tracing::{info, warn};

use crate::error::Result;
use crate::frame::{ensure_unique_keys, require_columns, text_column};
use crate::report::{CspReport, JoinReport};
use crate::DAYS_PER_YEAR;

/// Inner join of population on `CSP == ID_CSP`, carrying `Salaire_Moyen` onto each row.
pub fn join_population_with_csp(
    population: &DataFrame,
    csp: &DataFrame,
) -> Result<(DataFrame, JoinReport)> {
    require_columns(population, "Population_Union", &[CSP])?;
    require_columns(csp, "CSP", &[ID_CSP, SALAIRE_MOYEN])?;
    ensure_unique_keys(csp, "CSP", &[ID_CSP])?;

    let reference_ids = text_column(csp, ID_CSP)?;
    let known: HashSet<&str> = reference_ids.into_iter().flatten().collect();
    let unmatched_rows = text_column(population, CSP)?
        .into_iter()
        .filter(|code| !code.is_some_and(|code| known.contains(code)))
        .count();

    let reference = csp.clone().lazy().select([
        col(ID_CSP).cast(DataType::String),
        col(SALAIRE_MOYEN).cast(DataType::Float64),
    ]);
    let joined = population
        .clone()
        .lazy()
        .with_column(col(CSP).cast(DataType::String))
        .filter(col(CSP).is_not_null())
        .join(
            reference,
            [col(CSP)],
            [col(ID_CSP)],
            JoinArgs::new(JoinType::Inner),
        )
        .collect()?;

    let report = JoinReport {
        input_rows: population.height(),
        output_rows: joined.height(),
        unmatched_rows,
    };
    if unmatched_rows > 0 {
        warn!(dropped = unmatched_rows, "dropped population rows with unknown CSP codes");
    }
    info!(rows = joined.height(), "enriched population with salary data");
    Ok((joined, report))
}

/// Inner join on the normalized `Adresse`. One address may match several consumption rows.
pub fn join_population_with_consumption(
    population: &DataFrame,
    consommation: &DataFrame,
) -> Result<(DataFrame, JoinReport)> {
    require_columns(population, "Population_Union", &[ADRESSE])?;
    require_columns(consommation, "Consommation_Union", &[ADRESSE, NB_KW_JOUR])?;

    let consumption_addresses = text_column(consommation, ADRESSE)?;
    let known: HashSet<&str> = consumption_addresses.into_iter().flatten().collect();
    let unmatched_rows = text_column(population, ADRESSE)?
        .into_iter()
        .filter(|address| !address.is_some_and(|address| known.contains(address)))
        .count();

    let right = consommation
        .clone()
        .lazy()
        .select([col(ADRESSE), col(NB_KW_JOUR).cast(DataType::Float64)])
        .filter(col(ADRESSE).is_not_null());
    let joined = population
        .clone()
        .lazy()
        .filter(col(ADRESSE).is_not_null())
        .join(
            right,
            [col(ADRESSE)],
            [col(ADRESSE)],
            JoinArgs::new(JoinType::Inner),
        )
        .collect()?;

    let report = JoinReport {
        input_rows: population.height(),
        output_rows: joined.height(),
        unmatched_rows,
    };
    if unmatched_rows > 0 {
        warn!(dropped = unmatched_rows, "dropped population rows without matching address");
    }
    info!(rows = joined.height(), "matched population with consumption");
    Ok((joined, report))
}

/// One row per CSP code: mean of the annualized consumptions, and the (shared) reference salary.
pub fn aggregate_consumption_by_csp(merged: &DataFrame) -> Result<DataFrame> {
    require_columns(merged, "Population_Consommation", &[CSP, NB_KW_JOUR, SALAIRE_MOYEN])?;

    let target = merged
        .clone()
        .lazy()
        .group_by([col(CSP)])
        .agg([
            (col(NB_KW_JOUR) * lit(DAYS_PER_YEAR))
                .mean()
                .alias(CONSO_MOYENNE_ANNUELLE),
            col(SALAIRE_MOYEN).max().alias(SALAIRE_MOYEN),
        ])
        .select([
            col(CSP).alias(ID_CSP),
            col(CONSO_MOYENNE_ANNUELLE),
            col(SALAIRE_MOYEN),
        ])
        .sort([ID_CSP], SortMultipleOptions::default())
        .collect()?;

    info!(categories = target.height(), "aggregated consumption by CSP");
    Ok(target)
}

/// Enrich with salary → join on address → aggregate by category.
pub fn build_consommation_csp(
    population: &DataFrame,
    consommation: &DataFrame,
    csp: &DataFrame,
) -> Result<(DataFrame, CspReport)> {
    let (enriched, csp_join) = join_population_with_csp(population, csp)?;
    let (merged, address_join) = join_population_with_consumption(&enriched, consommation)?;
    let target = aggregate_consumption_by_csp(&merged)?;

    let report = CspReport {
        csp_join,
        address_join,
        categories: target.height(),
    };
    info!(rows = target.height(), "Consommation_CSP complete");
    Ok((target, report))
}
