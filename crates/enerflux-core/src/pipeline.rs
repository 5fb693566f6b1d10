use enerflux_sources::schema::{CONSOMMATION, CSP_REFERENCE, IRIS_REFERENCE, POPULATION};
use polars::prelude::DataFrame;
use serde::Serialize;
use tracing::info;

use crate::csp::build_consommation_csp;
use crate::error::Result;
use crate::iris::{build_consommation_iris, IrisTargets};
use crate::normalize::{
    normalize_consommation_addresses, normalize_population_addresses, normalize_reference_keys,
};
use crate::report::{CspReport, IrisReport};
use crate::unify::{union_consommation_sources, union_population_sources};

/// The six extracted input tables.
#[derive(Debug, Clone)]
pub struct SourceTables {
    pub population_paris: DataFrame,
    pub population_evry: DataFrame,
    pub consommation_paris: DataFrame,
    pub consommation_evry: DataFrame,
    pub csp: DataFrame,
    pub iris: DataFrame,
}

impl SourceTables {
    /// Refuses tables missing a column the transforms join or group on.
    pub fn validate(&self) -> Result<()> {
        POPULATION.validate(&self.population_paris)?;
        POPULATION.validate(&self.population_evry)?;
        CONSOMMATION.validate(&self.consommation_paris)?;
        CONSOMMATION.validate(&self.consommation_evry)?;
        CSP_REFERENCE.validate(&self.csp)?;
        IRIS_REFERENCE.validate(&self.iris)?;
        Ok(())
    }
}

/// Unified and normalized tables, ready for both aggregation branches.
#[derive(Debug, Clone)]
pub struct StagedTables {
    pub population: DataFrame,
    pub consommation: DataFrame,
    pub csp: DataFrame,
    pub iris: DataFrame,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StagingReport {
    pub population_rows: usize,
    pub consommation_rows: usize,
    pub iris_rows: usize,
}

pub fn stage_sources(sources: &SourceTables) -> Result<(StagedTables, StagingReport)> {
    sources.validate()?;

    let population = union_population_sources(&sources.population_paris, &sources.population_evry)?;
    let consommation =
        union_consommation_sources(&sources.consommation_paris, &sources.consommation_evry)?;

    let population = normalize_population_addresses(&population)?;
    let consommation = normalize_consommation_addresses(&consommation)?;
    let iris = normalize_reference_keys(&sources.iris)?;

    let report = StagingReport {
        population_rows: population.height(),
        consommation_rows: consommation.height(),
        iris_rows: iris.height(),
    };
    info!(
        population_rows = report.population_rows,
        consommation_rows = report.consommation_rows,
        iris_rows = report.iris_rows,
        "staging complete"
    );

    Ok((
        StagedTables {
            population,
            consommation,
            csp: sources.csp.clone(),
            iris,
        },
        report,
    ))
}

pub fn run_csp_branch(staged: &StagedTables) -> Result<(DataFrame, CspReport)> {
    build_consommation_csp(&staged.population, &staged.consommation, &staged.csp)
}

pub fn run_iris_branch(staged: &StagedTables) -> Result<(IrisTargets, IrisReport)> {
    build_consommation_iris(&staged.consommation, &staged.iris)
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub staging: StagingReport,
    pub csp: CspReport,
    pub iris: IrisReport,
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub consommation_csp: DataFrame,
    pub iris: IrisTargets,
    pub report: RunReport,
}

impl PipelineOutput {
    pub fn new(
        staging: StagingReport,
        csp: (DataFrame, CspReport),
        iris: (IrisTargets, IrisReport),
    ) -> Self {
        Self {
            consommation_csp: csp.0,
            iris: iris.0,
            report: RunReport {
                staging,
                csp: csp.1,
                iris: iris.1,
            },
        }
    }
}

/// Union → normalize → {CSP, IRIS}, sequentially.
pub fn run_pipeline(sources: &SourceTables) -> Result<PipelineOutput> {
    let (staged, staging) = stage_sources(sources)?;
    let csp = run_csp_branch(&staged)?;
    let iris = run_iris_branch(&staged)?;
    Ok(PipelineOutput::new(staging, csp, iris))
}
