//! Data-quality metrics for source tables: completeness, format conformity and duplicate
//! identifiers. Metrics and issues are returned to the caller; nothing is persisted here.

use std::collections::HashMap;

use polars::prelude::*;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Result;
use crate::frame::text_column;

const COMPLETENESS_THRESHOLD: f64 = 90.0;
const COMPLETENESS_HIGH_SEVERITY_BELOW: f64 = 80.0;
const CONFORMITY_THRESHOLD: f64 = 95.0;
const MAX_REPORTED_VALUES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    LowCompleteness,
    FormatViolation,
    Duplicate,
}

#[derive(Debug, Clone, Serialize)]
pub struct QualityIssue {
    pub table: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_id: Option<String>,
    pub kind: IssueKind,
    pub description: String,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnMetric {
    pub column: String,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DuplicateSummary {
    pub id_column: String,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct QualityReport {
    pub table: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub rows: usize,
    pub completeness: Vec<ColumnMetric>,
    pub conformity: Vec<ColumnMetric>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicates: Option<DuplicateSummary>,
    pub issues: Vec<QualityIssue>,
}

#[derive(Debug, Clone)]
pub struct FormatRule {
    pub column: String,
    pub pattern: Regex,
}

impl FormatRule {
    pub fn new(column: &str, pattern: &str) -> std::result::Result<Self, regex::Error> {
        Ok(Self {
            column: column.to_string(),
            pattern: Regex::new(pattern)?,
        })
    }
}

/// `ID` is `P` followed by four digits; `CSP` is one or two digits.
pub fn default_format_rules() -> std::result::Result<Vec<FormatRule>, regex::Error> {
    Ok(vec![
        FormatRule::new("ID", r"^P\d{4}$")?,
        FormatRule::new("CSP", r"^\d{1,2}$")?,
    ])
}

/// Accumulates issues for one table while the individual checks run.
pub struct QualityChecker {
    table: String,
    source: Option<String>,
    issues: Vec<QualityIssue>,
}

impl QualityChecker {
    pub fn new(table: &str, source: Option<&str>) -> Self {
        Self {
            table: table.to_string(),
            source: source.map(str::to_string),
            issues: Vec::new(),
        }
    }

    pub fn issues(&self) -> &[QualityIssue] {
        &self.issues
    }

    pub fn into_issues(self) -> Vec<QualityIssue> {
        self.issues
    }

    fn push_issue(
        &mut self,
        row_id: Option<String>,
        kind: IssueKind,
        description: String,
        severity: Severity,
    ) {
        self.issues.push(QualityIssue {
            table: self.table.clone(),
            row_id,
            kind,
            description,
            severity,
            source: self.source.clone(),
        });
    }

    /// Percentage of non-null cells per column. An empty table scores 0 everywhere.
    pub fn check_completeness(&mut self, df: &DataFrame) -> Vec<ColumnMetric> {
        let total = df.height();
        let mut metrics = Vec::with_capacity(df.width());

        for column in df.get_columns() {
            let percentage = if total > 0 {
                (total - column.null_count()) as f64 / total as f64 * 100.0
            } else {
                0.0
            };
            debug!(table = %self.table, column = %column.name(), percentage, "completeness");

            if percentage < COMPLETENESS_THRESHOLD {
                let severity = if percentage >= COMPLETENESS_HIGH_SEVERITY_BELOW {
                    Severity::Medium
                } else {
                    Severity::High
                };
                self.push_issue(
                    None,
                    IssueKind::LowCompleteness,
                    format!(
                        "Column {} is only {:.2}% complete",
                        column.name(),
                        percentage
                    ),
                    severity,
                );
            }

            metrics.push(ColumnMetric {
                column: column.name().to_string(),
                percentage,
            });
        }

        metrics
    }

    /// Share of non-null values matching each rule. Rules on absent columns are skipped.
    pub fn check_format_conformity(
        &mut self,
        df: &DataFrame,
        rules: &[FormatRule],
        id_column: &str,
    ) -> Result<Vec<ColumnMetric>> {
        let row_ids = df
            .column(id_column)
            .ok()
            .map(|_| text_column(df, id_column))
            .transpose()?;
        let mut metrics = Vec::with_capacity(rules.len());

        for rule in rules {
            if df.column(&rule.column).is_err() {
                continue;
            }
            let values = text_column(df, &rule.column)?;

            let mut checked = 0usize;
            let mut violations: Vec<(usize, &str)> = Vec::new();
            for (idx, value) in values.into_iter().enumerate() {
                let Some(value) = value else { continue };
                checked += 1;
                if !rule.pattern.is_match(value) {
                    violations.push((idx, value));
                }
            }

            let percentage = if checked == 0 {
                0.0
            } else {
                (checked - violations.len()) as f64 / checked as f64 * 100.0
            };

            if checked > 0 && percentage < CONFORMITY_THRESHOLD {
                for &(idx, value) in violations.iter().take(MAX_REPORTED_VALUES) {
                    let row_id = row_ids
                        .as_ref()
                        .and_then(|ids| ids.get(idx))
                        .map(str::to_string)
                        .unwrap_or_else(|| idx.to_string());
                    self.push_issue(
                        Some(row_id),
                        IssueKind::FormatViolation,
                        format!("Column {} has invalid format: '{}'", rule.column, value),
                        Severity::Low,
                    );
                }
            }

            metrics.push(ColumnMetric {
                column: rule.column.clone(),
                percentage,
            });
        }

        Ok(metrics)
    }

    /// Counts repeated identifiers (every occurrence after the first). Returns `None` when
    /// the identifier column is absent.
    pub fn check_duplicates(
        &mut self,
        df: &DataFrame,
        id_column: &str,
    ) -> Result<Option<DuplicateSummary>> {
        if df.column(id_column).is_err() {
            warn!(table = %self.table, id_column, "identifier column not found");
            return Ok(None);
        }

        let ids = text_column(df, id_column)?;
        let mut occurrences: HashMap<&str, usize> = HashMap::new();
        let mut first_seen: Vec<&str> = Vec::new();
        for id in ids.into_iter().flatten() {
            let count = occurrences.entry(id).or_insert(0);
            if *count == 0 {
                first_seen.push(id);
            }
            *count += 1;
        }

        let count: usize = occurrences.values().map(|n| n - 1).sum();
        let total = df.height();
        let percentage = if total > 0 {
            count as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        let duplicated: Vec<&str> = first_seen
            .into_iter()
            .filter(|id| occurrences.get(id).copied().unwrap_or_default() > 1)
            .take(MAX_REPORTED_VALUES)
            .collect();
        for id in duplicated {
            self.push_issue(
                Some(id.to_string()),
                IssueKind::Duplicate,
                format!("Duplicate ID found: {id}"),
                Severity::High,
            );
        }

        Ok(Some(DuplicateSummary {
            id_column: id_column.to_string(),
            count,
            percentage,
        }))
    }
}

/// Completeness, the default format rules and duplicate identifiers for one source table.
pub fn run_quality_checks(
    df: &DataFrame,
    table: &str,
    source: Option<&str>,
    id_column: &str,
) -> anyhow::Result<QualityReport> {
    let rules = default_format_rules()?;
    let mut checker = QualityChecker::new(table, source);

    let completeness = checker.check_completeness(df);
    let conformity = checker.check_format_conformity(df, &rules, id_column)?;
    let duplicates = checker.check_duplicates(df, id_column)?;

    if !checker.issues().is_empty() {
        warn!(table, issues = checker.issues().len(), "quality issues found");
    }

    Ok(QualityReport {
        table: table.to_string(),
        source: source.map(str::to_string),
        rows: df.height(),
        completeness,
        conformity,
        duplicates,
        issues: checker.into_issues(),
    })
}
