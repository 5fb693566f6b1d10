//! `Consommation_IRIS`: total annual consumption per IRIS zone, split by city.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use enerflux_sources::schema::{
    CODE_POSTAL, CONSO_MOYENNE_ANNUELLE, ID_IRIS, ID_RUE, ID_VILLE, NB_KW_JOUR, NOM_RUE, SOURCE,
};
use polars::prelude::*;
use tracing::{info, warn};

use crate::error::Result;
use crate::frame::{ensure_unique_keys, require_columns, text_column};
use crate::report::{IrisReport, JoinReport};
use crate::unify::City;
use crate::DAYS_PER_YEAR;

#[derive(Debug, Clone)]
pub struct IrisTargets {
    pub paris: DataFrame,
    pub evry: DataFrame,
}

impl IrisTargets {
    pub fn get(&self, city: City) -> &DataFrame {
        match city {
            City::Paris => &self.paris,
            City::Evry => &self.evry,
        }
    }
}

/// Inner join on `(Nom_Rue, Code_Postal) == (ID_Rue, ID_Ville)`, both sides normalized.
///
/// Rows with an empty street or postal code never match, and neither do reference rows without
/// a zone. Returns the joined rows, the join accounting and the number of incomplete rows.
pub fn join_consommation_with_iris(
    consommation: &DataFrame,
    iris: &DataFrame,
) -> Result<(DataFrame, JoinReport, usize)> {
    require_columns(
        consommation,
        "Consommation_Union",
        &[NOM_RUE, CODE_POSTAL, NB_KW_JOUR, SOURCE],
    )?;
    require_columns(iris, "IRIS", &[ID_RUE, ID_VILLE, ID_IRIS])?;
    ensure_unique_keys(iris, "IRIS", &[ID_RUE, ID_VILLE])?;

    let reference_streets = text_column(iris, ID_RUE)?;
    let reference_cities = text_column(iris, ID_VILLE)?;
    let reference_zones = text_column(iris, ID_IRIS)?;
    let known: HashSet<(&str, &str)> = reference_streets
        .into_iter()
        .zip(reference_cities.into_iter())
        .zip(reference_zones.into_iter())
        .filter_map(|((street, city), zone)| match (street, city, zone) {
            (Some(street), Some(city), Some(_)) => Some((street, city)),
            _ => None,
        })
        .collect();

    let streets = text_column(consommation, NOM_RUE)?;
    let postals = text_column(consommation, CODE_POSTAL)?;
    let mut incomplete_rows = 0;
    let mut unmatched_rows = 0;
    for (street, postal) in streets.into_iter().zip(postals.into_iter()) {
        match (street, postal) {
            (Some(street), Some(postal)) if !street.is_empty() && !postal.is_empty() => {
                if !known.contains(&(street, postal)) {
                    unmatched_rows += 1;
                }
            }
            _ => {
                incomplete_rows += 1;
                unmatched_rows += 1;
            }
        }
    }

    let reference = iris
        .clone()
        .lazy()
        .select([
            col(ID_RUE).cast(DataType::String),
            col(ID_VILLE).cast(DataType::String),
            col(ID_IRIS).cast(DataType::String),
        ])
        .filter(col(ID_IRIS).is_not_null());
    let joined = consommation
        .clone()
        .lazy()
        .select([
            col(NOM_RUE),
            col(CODE_POSTAL),
            col(NB_KW_JOUR).cast(DataType::Float64),
            col(SOURCE),
        ])
        .filter(
            col(NOM_RUE)
                .is_not_null()
                .and(col(NOM_RUE).neq(lit("")))
                .and(col(CODE_POSTAL).is_not_null())
                .and(col(CODE_POSTAL).neq(lit(""))),
        )
        .join(
            reference,
            [col(NOM_RUE), col(CODE_POSTAL)],
            [col(ID_RUE), col(ID_VILLE)],
            JoinArgs::new(JoinType::Inner),
        )
        .collect()?;

    let report = JoinReport {
        input_rows: consommation.height(),
        output_rows: joined.height(),
        unmatched_rows,
    };
    if incomplete_rows > 0 {
        warn!(
            dropped = incomplete_rows,
            "dropped consumption rows with an empty street or postal code"
        );
    }
    if unmatched_rows > incomplete_rows {
        warn!(
            dropped = unmatched_rows - incomplete_rows,
            "dropped consumption rows without a zone in the IRIS reference"
        );
    }
    info!(rows = joined.height(), "joined consumption with IRIS reference");
    Ok((joined, report, incomplete_rows))
}

/// One row per zone: **sum** of annualized consumptions, plus the zone's `Source`.
/// Rows without a zone are left out.
pub fn aggregate_consumption_by_iris(merged: &DataFrame) -> Result<DataFrame> {
    require_columns(merged, "Consommation_IRIS_Join", &[ID_IRIS, NB_KW_JOUR, SOURCE])?;

    let aggregated = merged
        .clone()
        .lazy()
        .filter(col(ID_IRIS).is_not_null())
        .group_by([col(ID_IRIS)])
        .agg([
            (col(NB_KW_JOUR) * lit(DAYS_PER_YEAR))
                .sum()
                .alias(CONSO_MOYENNE_ANNUELLE),
            col(SOURCE).first().alias(SOURCE),
        ])
        .sort([ID_IRIS], SortMultipleOptions::default())
        .collect()?;
    Ok(aggregated)
}

/// Zones whose joined rows come from more than one city, sorted.
pub fn find_conflicting_zones(merged: &DataFrame) -> Result<Vec<String>> {
    require_columns(merged, "Consommation_IRIS_Join", &[ID_IRIS, SOURCE])?;

    let zones = text_column(merged, ID_IRIS)?;
    let sources = text_column(merged, SOURCE)?;
    let mut cities_by_zone: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for (zone, source) in zones.into_iter().zip(sources.into_iter()) {
        if let (Some(zone), Some(source)) = (zone, source) {
            cities_by_zone.entry(zone).or_default().insert(source);
        }
    }

    Ok(cities_by_zone
        .into_iter()
        .filter(|(_, cities)| cities.len() > 1)
        .map(|(zone, _)| zone.to_string())
        .collect())
}

/// Splits the aggregate by `Source`, leaving out any zone listed in `conflicting`.
pub fn partition_by_city(aggregated: &DataFrame, conflicting: &[String]) -> Result<IrisTargets> {
    let zones = text_column(aggregated, ID_IRIS)?;
    let sources = text_column(aggregated, SOURCE)?;
    let excluded: HashSet<&str> = conflicting.iter().map(String::as_str).collect();

    let city_frame = |city: City| -> Result<DataFrame> {
        let flags: Vec<bool> = zones
            .into_iter()
            .zip(sources.into_iter())
            .map(|(zone, source)| {
                source == Some(city.tag()) && !zone.is_some_and(|zone| excluded.contains(zone))
            })
            .collect();
        let mask = Series::new("mask".into(), flags);
        let filtered = aggregated.filter(mask.bool()?)?;
        Ok(filtered.select([ID_IRIS, CONSO_MOYENNE_ANNUELLE])?)
    };

    Ok(IrisTargets {
        paris: city_frame(City::Paris)?,
        evry: city_frame(City::Evry)?,
    })
}

/// Join with the reference → aggregate per zone → partition by city.
///
/// A zone claimed by both cities is a reference-data defect: it is reported in
/// [`IrisReport::conflicting_zones`] and kept out of both partitions.
pub fn build_consommation_iris(
    consommation: &DataFrame,
    iris: &DataFrame,
) -> Result<(IrisTargets, IrisReport)> {
    let (merged, reference_join, incomplete_rows) =
        join_consommation_with_iris(consommation, iris)?;
    let aggregated = aggregate_consumption_by_iris(&merged)?;

    let conflicting_zones = find_conflicting_zones(&merged)?;
    if !conflicting_zones.is_empty() {
        warn!(
            zones = ?conflicting_zones,
            "IRIS zones claimed by both cities; excluded from both partitions"
        );
    }

    let targets = partition_by_city(&aggregated, &conflicting_zones)?;

    let report = IrisReport {
        incomplete_rows,
        reference_join,
        zones: aggregated.height(),
        paris_zones: targets.paris.height(),
        evry_zones: targets.evry.height(),
        conflicting_zones,
    };
    info!(
        paris_rows = report.paris_zones,
        evry_rows = report.evry_zones,
        "built consommation by IRIS"
    );
    Ok((targets, report))
}
