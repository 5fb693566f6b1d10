use std::path::Path;

use anyhow::Result;
use enerflux_core::quality::{
    default_format_rules, run_quality_checks, FormatRule, IssueKind, QualityChecker, Severity,
};
use enerflux_sources::read_table;
use enerflux_sources::schema::{CONSOMMATION, POPULATION};
use polars::prelude::*;

fn fixture(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data").join(name)
}

#[test]
fn population_fixture_reports_sparse_first_names() -> Result<()> {
    let df = read_table(&fixture("population_paris.csv"), &POPULATION)?;
    let report = run_quality_checks(&df, "Population", Some("Paris"), "ID")?;

    assert_eq!(report.rows, 4);
    let prenom = report
        .completeness
        .iter()
        .find(|metric| metric.column == "Prenom")
        .expect("Prenom metric");
    assert!((prenom.percentage - 75.0).abs() < 1e-9);

    let completeness_issues: Vec<_> = report
        .issues
        .iter()
        .filter(|issue| issue.kind == IssueKind::LowCompleteness)
        .collect();
    assert_eq!(completeness_issues.len(), 1);
    assert_eq!(completeness_issues[0].severity, Severity::High);
    assert_eq!(completeness_issues[0].source.as_deref(), Some("Paris"));

    assert!(report.conformity.iter().all(|metric| metric.percentage == 100.0));
    let duplicates = report.duplicates.expect("ID column present");
    assert_eq!(duplicates.count, 0);
    Ok(())
}

#[test]
fn consumption_tables_skip_population_format_rules() -> Result<()> {
    let df = read_table(&fixture("consommation_evry.csv"), &CONSOMMATION)?;
    let report = run_quality_checks(&df, "Consommation", Some("Evry"), "ID_Adr")?;

    assert!(report.conformity.is_empty());
    let nom_rue = report
        .completeness
        .iter()
        .find(|metric| metric.column == "Nom_Rue")
        .expect("Nom_Rue metric");
    assert!((nom_rue.percentage - 50.0).abs() < 1e-9);
    Ok(())
}

#[test]
fn completeness_between_eighty_and_ninety_is_medium() {
    let values: Vec<Option<&str>> = (0..20).map(|i| (i >= 3).then_some("x")).collect();
    let df = df!("Nom" => values).unwrap();

    let mut checker = QualityChecker::new("Population", None);
    let metrics = checker.check_completeness(&df);

    assert!((metrics[0].percentage - 85.0).abs() < 1e-9);
    assert_eq!(checker.issues().len(), 1);
    assert_eq!(checker.issues()[0].severity, Severity::Medium);
}

#[test]
fn format_violations_are_reported_with_row_ids() -> Result<()> {
    let df = df!(
        "ID" => ["P0001", "P0002", "X-3", "P04"],
        "CSP" => [Some("3"), Some("123"), None, Some("5")],
    )?;

    let mut checker = QualityChecker::new("Population", Some("Evry"));
    let metrics = checker.check_format_conformity(&df, &default_format_rules()?, "ID")?;

    let id_metric = metrics.iter().find(|m| m.column == "ID").expect("ID metric");
    assert!((id_metric.percentage - 50.0).abs() < 1e-9);
    let csp_metric = metrics.iter().find(|m| m.column == "CSP").expect("CSP metric");
    assert!((csp_metric.percentage - 200.0 / 3.0).abs() < 1e-9);

    let flagged: Vec<&str> = checker
        .issues()
        .iter()
        .filter_map(|issue| issue.row_id.as_deref())
        .collect();
    assert_eq!(flagged, vec!["X-3", "P04", "P0002"]);
    assert!(checker
        .issues()
        .iter()
        .all(|issue| issue.kind == IssueKind::FormatViolation && issue.severity == Severity::Low));
    Ok(())
}

#[test]
fn rules_on_absent_columns_are_skipped() -> Result<()> {
    let df = df!("ID" => ["P0001"])?;
    let rules = vec![FormatRule::new("Missing", r"^\d+$")?];

    let mut checker = QualityChecker::new("Population", None);
    let metrics = checker.check_format_conformity(&df, &rules, "ID")?;
    assert!(metrics.is_empty());
    assert!(checker.issues().is_empty());
    Ok(())
}

#[test]
fn duplicate_identifiers_are_counted_once_per_extra_occurrence() -> Result<()> {
    let df = df!("ID" => ["P0001", "P0002", "P0001", "P0001", "P0003"])?;

    let mut checker = QualityChecker::new("Population", None);
    let summary = checker.check_duplicates(&df, "ID")?.expect("summary");

    assert_eq!(summary.count, 2);
    assert!((summary.percentage - 40.0).abs() < 1e-9);
    assert_eq!(checker.issues().len(), 1);
    assert_eq!(checker.issues()[0].row_id.as_deref(), Some("P0001"));
    assert_eq!(checker.issues()[0].kind, IssueKind::Duplicate);

    assert!(checker.check_duplicates(&df, "ID_Adr")?.is_none());
    Ok(())
}
