use std::path::{Path, PathBuf};

use anyhow::Result;
use enerflux_core::normalize::{normalize_consommation_addresses, normalize_population_addresses};
use enerflux_core::pipeline::{run_csp_branch, run_iris_branch, stage_sources};
use enerflux_core::{run_pipeline, SourceTables, TransformError};
use enerflux_sources::schema::{
    CONSOMMATION, CONSOMMATION_CSP, CONSOMMATION_IRIS, CSP_REFERENCE, IRIS_REFERENCE, POPULATION,
};
use enerflux_sources::{read_table, TableSchema};
use polars::prelude::*;

fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/data")
        .join(name)
}

fn load(name: &str, schema: &'static TableSchema) -> DataFrame {
    read_table(&fixture_path(name), schema).expect("read fixture")
}

fn sources() -> SourceTables {
    SourceTables {
        population_paris: load("population_paris.csv", &POPULATION),
        population_evry: load("population_evry.csv", &POPULATION),
        consommation_paris: load("consommation_paris.csv", &CONSOMMATION),
        consommation_evry: load("consommation_evry.csv", &CONSOMMATION),
        csp: load("csp_reference.csv", &CSP_REFERENCE),
        iris: load("iris_reference.csv", &IRIS_REFERENCE),
    }
}

fn float_by_key(df: &DataFrame, key_column: &str, value_column: &str) -> Vec<(String, f64)> {
    let keys = df.column(key_column).unwrap().str().unwrap();
    let values = df.column(value_column).unwrap().f64().unwrap();
    keys.into_iter()
        .zip(values.into_iter())
        .map(|(key, value)| (key.unwrap().to_string(), value.unwrap()))
        .collect()
}

#[test]
fn end_to_end_produces_all_three_targets() -> Result<()> {
    let output = run_pipeline(&sources())?;

    CONSOMMATION_CSP.validate(&output.consommation_csp)?;
    CONSOMMATION_IRIS.validate(&output.iris.paris)?;
    CONSOMMATION_IRIS.validate(&output.iris.evry)?;

    let csp = float_by_key(&output.consommation_csp, "ID_CSP", "Conso_moyenne_annuelle");
    assert_eq!(csp.len(), 2);
    assert_eq!(csp[0].0, "3");
    assert!((csp[0].1 - 38.0 / 3.0 * 365.0).abs() < 1e-6);
    assert_eq!(csp[1].0, "5");
    assert!((csp[1].1 - 1460.0).abs() < 1e-9);

    let salaries = float_by_key(&output.consommation_csp, "ID_CSP", "Salaire_Moyen");
    assert_eq!(salaries, vec![("3".to_string(), 55000.0), ("5".to_string(), 28000.0)]);

    let paris = float_by_key(&output.iris.paris, "ID_Iris", "Conso_moyenne_annuelle");
    assert_eq!(
        paris,
        vec![("IRIS_001".to_string(), 10950.0), ("IRIS_002".to_string(), 1460.0)]
    );
    let evry = float_by_key(&output.iris.evry, "ID_Iris", "Conso_moyenne_annuelle");
    assert_eq!(evry, vec![("IRIS_101".to_string(), 2920.0)]);
    Ok(())
}

#[test]
fn run_report_accounts_for_dropped_rows() -> Result<()> {
    let report = run_pipeline(&sources())?.report;

    assert_eq!(report.staging.population_rows, 6);
    assert_eq!(report.staging.consommation_rows, 5);
    assert_eq!(report.staging.iris_rows, 3);

    assert_eq!(report.csp.csp_join.input_rows, 6);
    assert_eq!(report.csp.csp_join.unmatched_rows, 1);
    assert_eq!(report.csp.address_join.input_rows, 5);
    assert_eq!(report.csp.address_join.unmatched_rows, 2);
    assert_eq!(report.csp.address_join.output_rows, 4);
    assert_eq!(report.csp.categories, 2);

    assert_eq!(report.iris.incomplete_rows, 1);
    assert_eq!(report.iris.reference_join.unmatched_rows, 1);
    assert_eq!(report.iris.paris_zones, 2);
    assert_eq!(report.iris.evry_zones, 1);
    assert!(report.iris.conflicting_zones.is_empty());
    Ok(())
}

#[test]
fn reruns_are_identical() -> Result<()> {
    let first = run_pipeline(&sources())?;
    let second = run_pipeline(&sources())?;

    assert!(first.consommation_csp.equals(&second.consommation_csp));
    assert!(first.iris.paris.equals(&second.iris.paris));
    assert!(first.iris.evry.equals(&second.iris.evry));
    Ok(())
}

#[test]
fn staged_branches_match_sequential_run() -> Result<()> {
    let sources = sources();
    let (staged, _) = stage_sources(&sources)?;
    let (csp, _) = run_csp_branch(&staged)?;
    let (iris, _) = run_iris_branch(&staged)?;

    let sequential = run_pipeline(&sources)?;
    assert!(csp.equals(&sequential.consommation_csp));
    assert!(iris.paris.equals(&sequential.iris.paris));
    assert!(iris.evry.equals(&sequential.iris.evry));
    Ok(())
}

#[test]
fn staged_keys_are_already_normalized() -> Result<()> {
    let (staged, _) = stage_sources(&sources())?;

    let population = normalize_population_addresses(&staged.population)?;
    let consommation = normalize_consommation_addresses(&staged.consommation)?;
    assert!(population.equals_missing(&staged.population));
    for name in ["Nom_Rue", "Code_Postal"] {
        let renormalized = consommation.column(name)?.as_materialized_series();
        let staged_column = staged.consommation.column(name)?.as_materialized_series();
        assert!(renormalized.equals_missing(staged_column), "column {name}");
    }

    let addresses = staged.population.column("Adresse")?.str()?;
    assert_eq!(addresses.get(1), Some("3 rue de rivoli, 75001"));
    Ok(())
}

#[test]
fn inputs_are_left_untouched() -> Result<()> {
    let sources = sources();
    let before = sources.clone();
    let _ = run_pipeline(&sources)?;

    assert!(sources.population_paris.equals_missing(&before.population_paris));
    assert!(sources.consommation_evry.equals_missing(&before.consommation_evry));
    assert!(sources.iris.equals_missing(&before.iris));
    assert!(sources.population_paris.column("Source").is_err());
    Ok(())
}

#[test]
fn missing_required_column_fails_before_any_transform() {
    let mut sources = sources();
    sources.population_evry = sources.population_evry.drop("CSP").unwrap();

    let err = run_pipeline(&sources).unwrap_err();
    assert!(matches!(err, TransformError::Schema(_)));
}

#[test]
fn empty_sources_produce_empty_targets() -> Result<()> {
    let mut sources = sources();
    sources.population_paris = sources.population_paris.head(Some(0));
    sources.population_evry = sources.population_evry.head(Some(0));
    sources.consommation_paris = sources.consommation_paris.head(Some(0));
    sources.consommation_evry = sources.consommation_evry.head(Some(0));

    let output = run_pipeline(&sources)?;
    assert_eq!(output.consommation_csp.height(), 0);
    assert_eq!(output.iris.paris.height(), 0);
    assert_eq!(output.iris.evry.height(), 0);
    Ok(())
}
