use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use chrono::{SecondsFormat, Utc};
use polars::io::parquet::write::{ParquetCompression, ParquetWriter, StatisticsOptions};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::pipeline::PipelineOutput;
use crate::unify::City;

pub const TARGET_CSP: &str = "Consommation_CSP";
pub const TARGET_IRIS_PARIS: &str = "Consommation_IRIS_Paris";
pub const TARGET_IRIS_EVRY: &str = "Consommation_IRIS_Evry";
pub const RUN_REPORT_FILE: &str = "run_report.json";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Parquet,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Parquet => "parquet",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "parquet" => Ok(OutputFormat::Parquet),
            other => Err(anyhow!("unknown output format {other}")),
        }
    }
}

pub fn iris_target_name(city: City) -> &'static str {
    match city {
        City::Paris => TARGET_IRIS_PARIS,
        City::Evry => TARGET_IRIS_EVRY,
    }
}

/// Files produced by one run.
#[derive(Debug, Clone)]
pub struct WrittenTargets {
    pub run_id: Uuid,
    pub tables: Vec<(&'static str, PathBuf)>,
    pub report_path: PathBuf,
}

/// Write the three target tables and a JSON run report into `output_dir`.
pub fn write_targets(
    output_dir: &Path,
    output: &PipelineOutput,
    format: OutputFormat,
) -> Result<WrittenTargets> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;

    let targets: [(&'static str, &DataFrame); 3] = [
        (TARGET_CSP, &output.consommation_csp),
        (iris_target_name(City::Paris), output.iris.get(City::Paris)),
        (iris_target_name(City::Evry), output.iris.get(City::Evry)),
    ];

    let mut tables = Vec::with_capacity(targets.len());
    for (name, df) in targets {
        let path = output_dir.join(format!("{name}.{}", format.extension()));
        write_frame(&path, df, format)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(table = name, rows = df.height(), path = %path.display(), "saved target table");
        tables.push((name, path));
    }

    let run_id = Uuid::new_v4();
    let report_path = output_dir.join(RUN_REPORT_FILE);
    let report = json!({
        "run_id": run_id,
        "generated_at": Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        "format": format,
        "targets": tables
            .iter()
            .map(|(name, path)| json!({ "table": name, "path": path.display().to_string() }))
            .collect::<Vec<_>>(),
        "report": &output.report,
    });
    let mut file = File::create(&report_path)
        .with_context(|| format!("failed to create {}", report_path.display()))?;
    file.write_all(&serde_json::to_vec_pretty(&report)?)?;

    Ok(WrittenTargets {
        run_id,
        tables,
        report_path,
    })
}

fn write_frame(path: &Path, df: &DataFrame, format: OutputFormat) -> Result<()> {
    let mut file = File::create(path)?;
    let mut clone = df.clone();
    match format {
        OutputFormat::Csv => {
            CsvWriter::new(&mut file)
                .include_header(true)
                .finish(&mut clone)
                .context("failed to write csv")?;
        }
        OutputFormat::Parquet => {
            ParquetWriter::new(&mut file)
                .with_compression(ParquetCompression::Zstd(None))
                .with_statistics(StatisticsOptions::default())
                .finish(&mut clone)
                .context("failed to write parquet")?;
        }
    }
    Ok(())
}
