//! Runtime configuration. Settings come from an optional TOML file in the
//! application data directory and can be overridden from the command line.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use directories::BaseDirs;
use serde::Deserialize;

/// Folder name used beneath the user's home directory for application data.
const DATA_DIR_NAME: &str = ".cellar-explorer";
/// Configuration file name stored inside the application data directory.
const CONFIG_FILE_NAME: &str = "config.toml";
/// Log file written during interactive sessions.
const LOG_FILE_NAME: &str = "cellar-explorer.log";

/// What to do with a row the loader cannot interpret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowErrorPolicy {
    /// Leave the row out and record a diagnostic.
    #[default]
    Skip,
    /// Fail the load on the first malformed row.
    Abort,
}

/// How change-log rows without their own `Active_Storage_Record` value count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnflaggedLogPolicy {
    #[default]
    Active,
    Drop,
}

/// Treatment of the `Terroir` attribute when the source has no such column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TerroirPolicy {
    /// Fill every row with the `Unknown` placeholder.
    #[default]
    Placeholder,
    /// Leave the attribute absent; the filter offers no concrete values.
    Omit,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// HTTP export URL of the workbook (e.g. a shared spreadsheet's xlsx export).
    pub url: Option<String>,
    /// Local `.xlsx` file.
    pub path: Option<PathBuf>,
    /// Local SQLite database holding one table per sheet.
    pub sqlite: Option<PathBuf>,
    pub library_sheet: String,
    pub change_log_sheet: String,
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: None,
            path: None,
            sqlite: None,
            library_sheet: "library".to_string(),
            change_log_sheet: "change log".to_string(),
            timeout_secs: 30,
        }
    }
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    /// Substring that marks a location as refrigerated storage.
    pub fridge_marker: String,
    pub row_errors: RowErrorPolicy,
    pub unflagged_log_rows: UnflaggedLogPolicy,
    pub terroir: TerroirPolicy,
    pub export_dir: Option<PathBuf>,
    pub open_exports: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            fridge_marker: "Fridge".to_string(),
            row_errors: RowErrorPolicy::default(),
            unflagged_log_rows: UnflaggedLogPolicy::default(),
            terroir: TerroirPolicy::default(),
            export_dir: None,
            open_exports: false,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        if config.fridge_marker.trim().is_empty() {
            return Err(anyhow!("fridge_marker must not be empty"));
        }
        Ok(config)
    }

    /// Load the explicit file when given, otherwise the file in the data
    /// directory if it exists, otherwise the defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match data_dir() {
            Ok(dir) => {
                let path = dir.join(CONFIG_FILE_NAME);
                if path.exists() {
                    Self::load(&path)
                } else {
                    Ok(Self::default())
                }
            }
            Err(_) => Ok(Self::default()),
        }
    }

    /// Directory exports land in.
    pub fn export_dir(&self) -> PathBuf {
        self.export_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Resolve the absolute path to the application data directory.
pub fn data_dir() -> Result<PathBuf> {
    let base_dirs = BaseDirs::new().ok_or_else(|| anyhow!("could not locate home directory"))?;
    Ok(base_dirs.home_dir().join(DATA_DIR_NAME))
}

/// Path of the interactive-session log file, creating the directory if needed.
pub fn log_path() -> Result<PathBuf> {
    let dir = data_dir()?;
    fs::create_dir_all(&dir).context("failed to create data directory")?;
    Ok(dir.join(LOG_FILE_NAME))
}
