// crates/enerflux/src/main.rs

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use comfy_table::{presets::UTF8_FULL, Table};
use enerflux_core::outputs::{write_targets, OutputFormat, WrittenTargets};
use enerflux_core::pipeline::{run_csp_branch, run_iris_branch, stage_sources};
use enerflux_core::quality::{run_quality_checks, QualityReport};
use enerflux_core::{City, JoinReport, PipelineOutput, SourceTables};
use enerflux_sources::schema::{CONSOMMATION, CSP_REFERENCE, ID, ID_ADR, IRIS_REFERENCE, POPULATION};
use enerflux_sources::{read_table, TableSchema};
use polars::prelude::DataFrame;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{Settings, SourceArgs};

#[derive(Parser, Debug)]
#[command(author, version, about = "Energy consumption ETL for Paris and Evry", long_about = None)]
struct Cli {
    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract the sources, build Consommation_CSP and Consommation_IRIS, write them out
    Run(RunArgs),
    /// Print data-quality metrics for the population and consumption sources
    Check(CheckArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    sources: SourceArgs,
    /// Output file format (csv or parquet)
    #[arg(long)]
    format: Option<OutputFormat>,
}

#[derive(Args, Debug)]
struct CheckArgs {
    #[command(flatten)]
    sources: SourceArgs,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum LogFormat {
    Json,
    Pretty,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match cli.command {
        Command::Run(args) => {
            let mut settings = Settings::load(&args.sources)?;
            if let Some(format) = args.format {
                settings.output_format = format;
            }
            init_tracing(&settings.log_level, cli.log_format);
            run(settings).await
        }
        Command::Check(args) => {
            let settings = Settings::load(&args.sources)?;
            init_tracing(&settings.log_level, cli.log_format);
            check(&settings).await
        }
    }
}

fn init_tracing(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

async fn run(settings: Settings) -> Result<()> {
    let sources = extract_sources(&settings).await?;

    let (staged, staging) = tokio::task::spawn_blocking(move || stage_sources(&sources))
        .await
        .context("staging task panicked")??;

    let staged = Arc::new(staged);
    let csp_task = {
        let staged = Arc::clone(&staged);
        tokio::task::spawn_blocking(move || run_csp_branch(&staged))
    };
    let iris_task = {
        let staged = Arc::clone(&staged);
        tokio::task::spawn_blocking(move || run_iris_branch(&staged))
    };
    let (csp, iris) = tokio::try_join!(csp_task, iris_task).context("transform task panicked")?;
    let output = PipelineOutput::new(staging, csp?, iris?);

    let output_dir = settings.output_dir();
    let written = write_targets(&output_dir, &output, settings.output_format)?;
    info!(run_id = %written.run_id, output_dir = %output_dir.display(), "run complete");

    print_summary(&output, &written);
    Ok(())
}

async fn check(settings: &Settings) -> Result<()> {
    let sources = extract_sources(settings).await?;

    let tables: [(&str, City, &DataFrame, &str); 4] = [
        (POPULATION.name, City::Paris, &sources.population_paris, ID),
        (POPULATION.name, City::Evry, &sources.population_evry, ID),
        (CONSOMMATION.name, City::Paris, &sources.consommation_paris, ID_ADR),
        (CONSOMMATION.name, City::Evry, &sources.consommation_evry, ID_ADR),
    ];

    let mut reports: Vec<QualityReport> = Vec::with_capacity(tables.len());
    for (table, city, df, id_column) in tables {
        reports.push(run_quality_checks(df, table, Some(city.tag()), id_column)?);
    }
    println!("{}", serde_json::to_string_pretty(&reports)?);
    Ok(())
}

async fn extract_sources(settings: &Settings) -> Result<SourceTables> {
    let dir = settings.source_dir();
    let files = &settings.sources;
    info!(source_dir = %dir.display(), mock = settings.use_mock_data, "extracting sources");

    let (population_paris, population_evry, consommation_paris, consommation_evry, csp, iris) =
        tokio::try_join!(
            load_table(dir.join(&files.population_paris), &POPULATION),
            load_table(dir.join(&files.population_evry), &POPULATION),
            load_table(dir.join(&files.consommation_paris), &CONSOMMATION),
            load_table(dir.join(&files.consommation_evry), &CONSOMMATION),
            load_table(dir.join(&files.csp_reference), &CSP_REFERENCE),
            load_table(dir.join(&files.iris_reference), &IRIS_REFERENCE),
        )?;

    Ok(SourceTables {
        population_paris,
        population_evry,
        consommation_paris,
        consommation_evry,
        csp,
        iris,
    })
}

async fn load_table(path: PathBuf, schema: &'static TableSchema) -> Result<DataFrame> {
    let shown = path.display().to_string();
    let df = tokio::task::spawn_blocking(move || read_table(&path, schema))
        .await
        .context("extraction task panicked")?
        .with_context(|| format!("Failed to extract {} from '{}'", schema.name, shown))?;
    info!(table = schema.name, path = %shown, rows = df.height(), "extracted");
    Ok(df)
}

fn print_summary(output: &PipelineOutput, written: &WrittenTargets) {
    let row_counts = [
        output.consommation_csp.height(),
        output.iris.paris.height(),
        output.iris.evry.height(),
    ];
    let mut targets = Table::new();
    targets
        .load_preset(UTF8_FULL)
        .set_header(vec!["Target", "Rows", "Path"]);
    for ((name, path), rows) in written.tables.iter().zip(row_counts) {
        targets.add_row(vec![
            name.to_string(),
            rows.to_string(),
            path.display().to_string(),
        ]);
    }

    let report = &output.report;
    let joins: [(&str, &JoinReport); 3] = [
        ("population ⋈ CSP", &report.csp.csp_join),
        ("population ⋈ consumption", &report.csp.address_join),
        ("consumption ⋈ IRIS", &report.iris.reference_join),
    ];
    let mut accounting = Table::new();
    accounting
        .load_preset(UTF8_FULL)
        .set_header(vec!["Join", "Input", "Matched", "Unmatched", "Output"]);
    for (name, join) in joins {
        accounting.add_row(vec![
            name.to_string(),
            join.input_rows.to_string(),
            join.matched_rows().to_string(),
            join.unmatched_rows.to_string(),
            join.output_rows.to_string(),
        ]);
    }

    println!("{targets}");
    println!("{accounting}");
    if !report.iris.conflicting_zones.is_empty() {
        println!(
            "IRIS zones excluded (claimed by both cities): {}",
            report.iris.conflicting_zones.join(", ")
        );
    }
    println!("run id: {}  report: {}", written.run_id, written.report_path.display());
}
