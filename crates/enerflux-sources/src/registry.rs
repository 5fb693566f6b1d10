use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::errors::SchemaError;
use crate::schema::{
    TableSchema, CONSOMMATION, CONSOMMATION_CSP, CONSOMMATION_IRIS, CONSOMMATION_UNION,
    CSP_REFERENCE, IRIS_REFERENCE, POPULATION, POPULATION_UNION,
};

static SCHEMAS: Lazy<HashMap<&'static str, &'static TableSchema>> = Lazy::new(|| {
    HashMap::from([
        ("population", &POPULATION),
        ("consommation", &CONSOMMATION),
        ("csp", &CSP_REFERENCE),
        ("iris", &IRIS_REFERENCE),
        ("population_union", &POPULATION_UNION),
        ("consommation_union", &CONSOMMATION_UNION),
        ("consommation_csp", &CONSOMMATION_CSP),
        ("consommation_iris", &CONSOMMATION_IRIS),
    ])
});

pub fn schema_by_name(name: &str) -> Result<&'static TableSchema, SchemaError> {
    SCHEMAS
        .get(name.to_ascii_lowercase().as_str())
        .copied()
        .ok_or_else(|| SchemaError::UnknownSchema {
            name: name.to_string(),
        })
}

pub fn all_schema_names() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = SCHEMAS.keys().copied().collect();
    names.sort_unstable();
    names
}
