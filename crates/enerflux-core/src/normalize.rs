//! Canonical matching keys for free-text address fields.
//!
//! The same functions are applied on both sides of every join (population vs. consumption
//! addresses, consumption street/postal vs. the IRIS reference), and all of them are
//! idempotent.

use enerflux_sources::schema::{ADRESSE, CODE_POSTAL, ID_RUE, ID_VILLE, N, NOM_RUE};
use polars::prelude::*;
use tracing::{debug, warn};

use crate::error::Result;
use crate::frame::{require_columns, text_column};

/// Trims, lowercases and collapses internal whitespace runs to a single space.
///
/// A null input yields an empty string rather than `None`.
pub fn normalize_string(text: Option<&str>) -> String {
    match text {
        Some(value) => value
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase(),
        None => String::new(),
    }
}

/// Builds `"<n> <street>, <postal>"` from consumption components, or `None` when any is missing.
pub fn build_full_address(
    n: Option<&str>,
    nom_rue: Option<&str>,
    code_postal: Option<&str>,
) -> Option<String> {
    let (n, nom_rue, code_postal) = (n?, nom_rue?, code_postal?);
    Some(format!(
        "{} {}, {}",
        n.trim(),
        normalize_string(Some(nom_rue)),
        code_postal.trim()
    ))
}

/// Normalizes a pre-formatted `"<street>, <postal>"` population address.
///
/// Anything other than exactly one comma is malformed and yields `None`.
pub fn normalize_population_address(address: Option<&str>) -> Option<String> {
    let mut parts = address?.split(',');
    let (Some(street), Some(postal), None) = (parts.next(), parts.next(), parts.next()) else {
        return None;
    };
    Some(format!(
        "{}, {}",
        normalize_string(Some(street)),
        postal.trim()
    ))
}

pub fn normalize_population_addresses(population: &DataFrame) -> Result<DataFrame> {
    require_columns(population, "Population", &[ADRESSE])?;

    let raw = text_column(population, ADRESSE)?;
    let normalized: Vec<Option<String>> = raw
        .into_iter()
        .map(normalize_population_address)
        .collect();

    let absent = normalized.iter().filter(|value| value.is_none()).count();
    if absent > raw.null_count() {
        warn!(
            malformed = absent - raw.null_count(),
            "population addresses could not be parsed"
        );
    }

    let mut out = population.clone();
    out.with_column(Series::new(ADRESSE.into(), normalized))?;
    debug!(rows = out.height(), "normalized population addresses");
    Ok(out)
}

/// Replaces `Nom_Rue`/`Code_Postal` with their normalized forms and adds the `Adresse` key.
pub fn normalize_consommation_addresses(consommation: &DataFrame) -> Result<DataFrame> {
    require_columns(consommation, "Consommation", &[N, NOM_RUE, CODE_POSTAL])?;

    let numbers = text_column(consommation, N)?;
    let streets = text_column(consommation, NOM_RUE)?;
    let postals = text_column(consommation, CODE_POSTAL)?;

    let mut norm_streets = Vec::with_capacity(consommation.height());
    let mut norm_postals = Vec::with_capacity(consommation.height());
    let mut addresses = Vec::with_capacity(consommation.height());

    for ((n, street), postal) in numbers
        .into_iter()
        .zip(streets.into_iter())
        .zip(postals.into_iter())
    {
        let norm_street = normalize_string(street);
        let norm_postal = normalize_string(postal);
        // Presence is judged on the raw cells; the normalized forms are never null.
        let address = match (street, postal) {
            (Some(_), Some(_)) => build_full_address(
                n,
                Some(norm_street.as_str()),
                Some(norm_postal.as_str()),
            ),
            _ => None,
        };
        norm_streets.push(norm_street);
        norm_postals.push(norm_postal);
        addresses.push(address);
    }

    let absent = addresses.iter().filter(|value| value.is_none()).count();
    if absent > 0 {
        warn!(absent, "consumption rows are missing an address component");
    }

    let mut out = consommation.clone();
    out.with_column(Series::new(NOM_RUE.into(), norm_streets))?;
    out.with_column(Series::new(CODE_POSTAL.into(), norm_postals))?;
    out.with_column(Series::new(ADRESSE.into(), addresses))?;
    debug!(rows = out.height(), "normalized consumption addresses");
    Ok(out)
}

/// Applies [`normalize_string`] to both IRIS key columns.
pub fn normalize_reference_keys(iris: &DataFrame) -> Result<DataFrame> {
    require_columns(iris, "IRIS", &[ID_RUE, ID_VILLE])?;

    let mut out = iris.clone();
    for name in [ID_RUE, ID_VILLE] {
        let normalized: Vec<String> = text_column(iris, name)?
            .into_iter()
            .map(normalize_string)
            .collect();
        out.with_column(Series::new(name.into(), normalized))?;
    }
    Ok(out)
}
