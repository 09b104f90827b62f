use anyhow::{Context, Result};
use clap::Args;
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use crate::capture::{CaptureLimits, DEFAULT_MAX_CAPTURE_CELLS};
use crate::retention::clamp_retention_limit;

const STORE_SUFFIX: &str = ".recovery.json";

#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryConfig {
    pub max_capture_cells: u64,
    /// Raw setting as supplied; read it through [`RecoveryConfig::retention_limit`].
    pub retention_setting: Value,
    /// Fixed store file. When unset each workbook gets `<workbook>.recovery.json`.
    pub store_path: Option<PathBuf>,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_capture_cells: DEFAULT_MAX_CAPTURE_CELLS,
            retention_setting: Value::Null,
            store_path: None,
        }
    }
}

impl RecoveryConfig {
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let CliArgs {
            config,
            store: cli_store,
            max_capture_cells: cli_max_capture_cells,
            retention_limit: cli_retention_limit,
        } = args;

        let file_config = if let Some(path) = config.as_ref() {
            load_config_file(path)?
        } else {
            PartialConfig::default()
        };

        let PartialConfig {
            store_path: file_store_path,
            max_capture_cells: file_max_capture_cells,
            retention_limit: file_retention_limit,
        } = file_config;

        let max_capture_cells = cli_max_capture_cells
            .or(file_max_capture_cells)
            .unwrap_or(DEFAULT_MAX_CAPTURE_CELLS);
        anyhow::ensure!(
            max_capture_cells > 0,
            "max_capture_cells must be at least 1"
        );

        let retention_setting = cli_retention_limit
            .map(|raw| parse_retention_arg(&raw))
            .or(file_retention_limit)
            .unwrap_or(Value::Null);

        let store_path = cli_store.or(file_store_path);

        Ok(Self {
            max_capture_cells,
            retention_setting,
            store_path,
        })
    }

    pub fn capture_limits(&self) -> CaptureLimits {
        CaptureLimits::new(self.max_capture_cells)
    }

    pub fn retention_limit(&self) -> usize {
        clamp_retention_limit(&self.retention_setting)
    }

    pub fn store_path_for(&self, workbook: &Path) -> PathBuf {
        self.store_path
            .clone()
            .unwrap_or_else(|| default_store_path(workbook))
    }
}

/// `book.xlsx` -> `book.xlsx.recovery.json`, next to the workbook.
pub fn default_store_path(workbook: &Path) -> PathBuf {
    let mut name = workbook
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| "workbook".into());
    name.push(STORE_SUFFIX);
    workbook.with_file_name(name)
}

/// Numbers stay numbers; anything else is kept as a string and clamps to the maximum.
fn parse_retention_arg(raw: &str) -> Value {
    serde_json::from_str::<Value>(raw.trim())
        .ok()
        .filter(Value::is_number)
        .unwrap_or_else(|| Value::String(raw.to_string()))
}

#[derive(Args, Debug, Default, Clone)]
pub struct CliArgs {
    #[arg(
        long,
        value_name = "FILE",
        help = "Path to a configuration file (YAML or JSON)",
        global = true
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        env = "SPREADSHEET_RECOVERY_STORE",
        value_name = "FILE",
        help = "Checkpoint store file (default: <workbook>.recovery.json)",
        global = true
    )]
    pub store: Option<PathBuf>,

    #[arg(
        long,
        env = "SPREADSHEET_RECOVERY_MAX_CAPTURE_CELLS",
        value_name = "N",
        help = "Max cells a single checkpoint may capture (default: 20000)",
        value_parser = clap::value_parser!(u64),
        global = true
    )]
    pub max_capture_cells: Option<u64>,

    #[arg(
        long,
        env = "SPREADSHEET_RECOVERY_RETENTION_LIMIT",
        value_name = "N",
        help = "Checkpoints kept per workbook, clamped to 5..=120",
        allow_hyphen_values = true,
        global = true
    )]
    pub retention_limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PartialConfig {
    store_path: Option<PathBuf>,
    max_capture_cells: Option<u64>,
    retention_limit: Option<Value>,
}

fn load_config_file(path: &Path) -> Result<PartialConfig> {
    if !path.exists() {
        anyhow::bail!("config file {:?} does not exist", path);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {:?}", path))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML config {:?}", path))?,
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON config {:?}", path))?,
        other => anyhow::bail!("unsupported config extension: {other}"),
    };
    Ok(parsed)
}
