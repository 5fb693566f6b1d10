use anyhow::Result;
use enerflux_core::csp::{
    aggregate_consumption_by_csp, build_consommation_csp, join_population_with_consumption,
    join_population_with_csp,
};
use enerflux_core::normalize::{normalize_consommation_addresses, normalize_population_addresses};
use polars::prelude::*;

fn csp_reference() -> DataFrame {
    df!(
        "ID_CSP" => ["3", "5"],
        "Desc" => ["Cadres", "Employés"],
        "Salaire_Moyen" => [55000.0, 28000.0],
        "Salaire_Min" => [40000.0, 20000.0],
        "Salaire_Max" => [100000.0, 38000.0],
    )
    .unwrap()
}

fn unified_population(rows: &[(&str, Option<&str>, Option<&str>)]) -> DataFrame {
    let ids: Vec<&str> = rows.iter().map(|(id, _, _)| *id).collect();
    let addresses: Vec<Option<&str>> = rows.iter().map(|(_, address, _)| *address).collect();
    let csp: Vec<Option<&str>> = rows.iter().map(|(_, _, csp)| *csp).collect();
    let raw = df!(
        "ID_Source" => ids,
        "Adresse" => addresses,
        "CSP" => csp,
        "Source" => vec!["Paris"; rows.len()],
    )
    .unwrap();
    normalize_population_addresses(&raw).unwrap()
}

fn unified_consommation(rows: &[(&str, &str, &str, f64)]) -> DataFrame {
    let raw = df!(
        "ID_Source" => (0..rows.len()).map(|i| format!("Paris_A{i}")).collect::<Vec<_>>(),
        "N" => rows.iter().map(|r| r.0).collect::<Vec<_>>(),
        "Nom_Rue" => rows.iter().map(|r| r.1).collect::<Vec<_>>(),
        "Code_Postal" => rows.iter().map(|r| r.2).collect::<Vec<_>>(),
        "NB_KW_Jour" => rows.iter().map(|r| r.3).collect::<Vec<_>>(),
        "Source" => vec!["Paris"; rows.len()],
    )
    .unwrap();
    normalize_consommation_addresses(&raw).unwrap()
}

fn row_for(df: &DataFrame, id_csp: &str) -> Option<(f64, f64)> {
    let ids = df.column("ID_CSP").unwrap().str().unwrap();
    let conso = df.column("Conso_moyenne_annuelle").unwrap().f64().unwrap();
    let salary = df.column("Salaire_Moyen").unwrap().f64().unwrap();
    (0..df.height())
        .find(|&idx| ids.get(idx) == Some(id_csp))
        .map(|idx| (conso.get(idx).unwrap(), salary.get(idx).unwrap()))
}

#[test]
fn averages_annualized_consumption_per_category() -> Result<()> {
    let population =
        unified_population(&[("Paris_1", Some("12 Rue Victor Hugo, 75001"), Some("3"))]);
    let consommation = unified_consommation(&[
        ("12", "Rue Victor Hugo", "75001", 10.0),
        ("12", "rue victor  hugo", "75001", 20.0),
    ]);

    let (target, report) = build_consommation_csp(&population, &consommation, &csp_reference())?;

    assert_eq!(target.get_column_names(), ["ID_CSP", "Conso_moyenne_annuelle", "Salaire_Moyen"]);
    assert_eq!(target.height(), 1);
    let (conso, salary) = row_for(&target, "3").expect("category 3 present");
    assert!((conso - 5475.0).abs() < 1e-9);
    assert_eq!(salary, 55000.0);

    assert_eq!(report.csp_join.unmatched_rows, 0);
    assert_eq!(report.address_join.output_rows, 2);
    assert_eq!(report.categories, 1);
    Ok(())
}

#[test]
fn unknown_csp_codes_are_dropped_and_counted() -> Result<()> {
    let population = unified_population(&[
        ("Paris_1", Some("12 Rue Victor Hugo, 75001"), Some("3")),
        ("Paris_2", Some("12 Rue Victor Hugo, 75001"), Some("99")),
        ("Paris_3", Some("12 Rue Victor Hugo, 75001"), None),
    ]);

    let (enriched, report) = join_population_with_csp(&population, &csp_reference())?;

    assert_eq!(enriched.height(), 1);
    assert_eq!(report.input_rows, 3);
    assert_eq!(report.unmatched_rows, 2);
    assert_eq!(report.matched_rows(), 1);
    assert!(enriched.column("Salaire_Moyen").is_ok());

    let consommation = unified_consommation(&[("12", "Rue Victor Hugo", "75001", 10.0)]);
    let (target, _) = build_consommation_csp(&population, &consommation, &csp_reference())?;
    assert!(row_for(&target, "99").is_none());
    Ok(())
}

#[test]
fn malformed_and_unmatched_addresses_contribute_nothing() -> Result<()> {
    let population = unified_population(&[
        ("Paris_1", Some("only-one-part"), Some("5")),
        ("Paris_2", Some("1 Rue Inconnue, 75009"), Some("5")),
        ("Paris_3", None, Some("5")),
    ]);
    let consommation = unified_consommation(&[("12", "Rue Victor Hugo", "75001", 10.0)]);

    let (enriched, _) = join_population_with_csp(&population, &csp_reference())?;
    let (merged, report) = join_population_with_consumption(&enriched, &consommation)?;

    assert_eq!(merged.height(), 0);
    assert_eq!(report.unmatched_rows, 3);

    let target = aggregate_consumption_by_csp(&merged)?;
    assert_eq!(target.height(), 0);
    Ok(())
}

#[test]
fn output_never_exceeds_distinct_population_codes() -> Result<()> {
    let population = unified_population(&[
        ("Paris_1", Some("12 Rue Victor Hugo, 75001"), Some("3")),
        ("Paris_2", Some("3 Rue de Rivoli, 75001"), Some("5")),
        ("Paris_3", Some("3 Rue de Rivoli, 75001"), Some("5")),
    ]);
    let consommation = unified_consommation(&[
        ("12", "Rue Victor Hugo", "75001", 10.0),
        ("3", "Rue de Rivoli", "75001", 4.0),
    ]);

    let (target, _) = build_consommation_csp(&population, &consommation, &csp_reference())?;

    assert!(target.height() <= 2);
    let (conso, salary) = row_for(&target, "5").expect("category 5 present");
    assert!((conso - 4.0 * 365.0).abs() < 1e-9);
    assert_eq!(salary, 28000.0);
    // Sorted by category code.
    let ids = target.column("ID_CSP")?.str()?;
    assert_eq!(ids.into_iter().flatten().collect::<Vec<_>>(), vec!["3", "5"]);
    Ok(())
}

#[test]
fn duplicate_reference_codes_abort_the_branch() {
    let population =
        unified_population(&[("Paris_1", Some("12 Rue Victor Hugo, 75001"), Some("3"))]);
    let csp = df!(
        "ID_CSP" => ["3", "3"],
        "Salaire_Moyen" => [55000.0, 56000.0],
    )
    .unwrap();

    let err = join_population_with_csp(&population, &csp).unwrap_err();
    assert!(matches!(
        err,
        enerflux_core::TransformError::DuplicateReferenceKey { table: "CSP", .. }
    ));
}

#[test]
fn missing_join_column_is_a_schema_error() {
    let population = df!("ID_Source" => ["Paris_1"], "Adresse" => ["a, 1"]).unwrap();

    let err = join_population_with_csp(&population, &csp_reference()).unwrap_err();
    assert!(matches!(err, enerflux_core::TransformError::Schema(_)));
}
