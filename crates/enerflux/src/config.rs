// crates/enerflux/src/config.rs

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use enerflux_core::outputs::OutputFormat;
use serde::Deserialize;

pub const ENV_DATA_DIR: &str = "ENERFLUX_DATA_DIR";
pub const ENV_USE_MOCK_DATA: &str = "ENERFLUX_USE_MOCK_DATA";
pub const ENV_OUTPUT_DIR: &str = "ENERFLUX_OUTPUT_DIR";
pub const ENV_OUTPUT_FORMAT: &str = "ENERFLUX_OUTPUT_FORMAT";
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";

/// Flags shared by every subcommand that reads the sources.
#[derive(Args, Debug, Default, Clone)]
pub struct SourceArgs {
    /// TOML settings file
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Root data directory (holds `mock/`, `raw/` and `output/`)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
    /// Directory the target tables are written to
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
    /// Read `<data-dir>/raw` instead of the mock data set
    #[arg(long)]
    pub raw: bool,
}

/// File names of the six source tables inside the source directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceFiles {
    pub population_paris: String,
    pub population_evry: String,
    pub consommation_paris: String,
    pub consommation_evry: String,
    pub csp_reference: String,
    pub iris_reference: String,
}

impl Default for SourceFiles {
    fn default() -> Self {
        Self {
            population_paris: "population_paris.csv".into(),
            population_evry: "population_evry.csv".into(),
            consommation_paris: "consommation_paris.csv".into(),
            consommation_evry: "consommation_evry.csv".into(),
            csp_reference: "csp_reference.csv".into(),
            iris_reference: "iris_reference.csv".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub use_mock_data: bool,
    /// Defaults to `<data_dir>/output` when unset.
    pub output_dir: Option<PathBuf>,
    pub log_level: String,
    pub output_format: OutputFormat,
    pub sources: SourceFiles,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            use_mock_data: true,
            output_dir: None,
            log_level: "info".into(),
            output_format: OutputFormat::Csv,
            sources: SourceFiles::default(),
        }
    }
}

impl Settings {
    /// Defaults, then the optional TOML file, then the process environment, then CLI flags.
    pub fn load(args: &SourceArgs) -> Result<Self> {
        let mut settings = match &args.config {
            Some(path) => Self::from_toml_file(path)?,
            None => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok())?;
        settings.apply_args(args);
        Ok(settings)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file at '{}'", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse settings TOML from '{}'", path.display()))
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(flag) = lookup(ENV_USE_MOCK_DATA) {
            self.use_mock_data =
                parse_flag(&flag).with_context(|| format!("invalid {ENV_USE_MOCK_DATA}"))?;
        }
        if let Some(dir) = lookup(ENV_OUTPUT_DIR) {
            self.output_dir = Some(PathBuf::from(dir));
        }
        if let Some(format) = lookup(ENV_OUTPUT_FORMAT) {
            self.output_format = format
                .parse()
                .with_context(|| format!("invalid {ENV_OUTPUT_FORMAT}"))?;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        Ok(())
    }

    pub fn apply_args(&mut self, args: &SourceArgs) {
        if let Some(dir) = &args.data_dir {
            self.data_dir = dir.clone();
        }
        if let Some(dir) = &args.output_dir {
            self.output_dir = Some(dir.clone());
        }
        if args.raw {
            self.use_mock_data = false;
        }
    }

    pub fn source_dir(&self) -> PathBuf {
        let subdir = if self.use_mock_data { "mock" } else { "raw" };
        self.data_dir.join(subdir)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("output"))
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("expected a boolean, got '{other}'"),
    }
}
