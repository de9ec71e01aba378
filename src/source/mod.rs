//! Record loader split across logical submodules: raw tabular sources, row
//! parsing, and the diagnostics gathered while loading.

mod parse;
mod report;
mod sqlite;
mod workbook;

use chrono::NaiveDateTime;
use tracing::info;

use crate::config::Config;
use crate::error::CellarError;
use crate::models::{BottleRecord, ChangeLogEntry};

pub use parse::{parse_change_log, parse_library, ParseOptions};
pub use report::{ColumnIssue, LoadReport, RowIssue};
pub use sqlite::SqliteSource;
pub use workbook::WorkbookSource;

/// One raw cell as delivered by a source, before any column interpretation.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl Cell {
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }
}

/// Named-column table fetched from a source. The first source row becomes the
/// header list; every following row is kept positionally.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl RawTable {
    /// Position of a column, matched case-insensitively after trimming.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|header| header.trim().eq_ignore_ascii_case(name))
    }

    pub(crate) fn cell(&self, row: &[Cell], column: Option<usize>) -> Cell {
        column
            .and_then(|idx| row.get(idx))
            .cloned()
            .unwrap_or(Cell::Empty)
    }
}

/// Anything that can hand over a sheet by name.
pub trait TableSource {
    /// Human-readable origin, used in logs and the TUI header.
    fn describe(&self) -> String;

    fn load_table(&mut self, sheet: &str) -> Result<RawTable, CellarError>;
}

/// Both tables parsed into domain records, plus what the loader had to skip.
#[derive(Debug, Clone)]
pub struct LoadedTables {
    pub library: Vec<BottleRecord>,
    pub change_log: Vec<ChangeLogEntry>,
    pub report: LoadReport,
}

/// Pick the source named by the configuration. A SQLite database wins over a
/// local workbook, which wins over a remote export URL.
pub fn open_source(config: &Config) -> Result<Box<dyn TableSource>, CellarError> {
    let source = &config.source;
    if let Some(path) = &source.sqlite {
        return Ok(Box::new(SqliteSource::open(path)?));
    }
    if let Some(path) = &source.path {
        return Ok(Box::new(WorkbookSource::from_path(path)?));
    }
    if let Some(url) = &source.url {
        return Ok(Box::new(WorkbookSource::fetch(url, source.timeout())?));
    }
    Err(CellarError::Config(
        "no source configured; set source.url, source.path or source.sqlite".to_string(),
    ))
}

/// Fetch and parse the library and change-log sheets.
pub fn load_tables(
    source: &mut dyn TableSource,
    config: &Config,
) -> Result<LoadedTables, CellarError> {
    let options = ParseOptions {
        row_errors: config.row_errors,
        terroir: config.terroir,
    };
    let mut report = LoadReport::default();

    let library_table = source.load_table(&config.source.library_sheet)?;
    let library = parse_library(&library_table, &options, &mut report)?;

    let change_table = source.load_table(&config.source.change_log_sheet)?;
    let change_log = parse_change_log(&change_table, &options, &mut report)?;

    info!(
        source = %source.describe(),
        library = library.len(),
        change_log = change_log.len(),
        skipped = report.row_issues.len(),
        "loaded cellar tables"
    );

    Ok(LoadedTables {
        library,
        change_log,
        report,
    })
}
