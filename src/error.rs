//! Typed failures raised by the loader, the reconciler, and the exporter.
//! Application glue wraps these in `anyhow` with extra context.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CellarError {
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("sheet not found: {0}")]
    SheetNotFound(String),

    #[error("table '{table}' is missing required column '{column}'")]
    MissingColumn { table: String, column: String },

    #[error("{table} row {row}: {reason}")]
    MalformedRow {
        table: String,
        row: usize,
        reason: String,
    },

    #[error("workbook read error: {0}")]
    Workbook(#[from] calamine::XlsxError),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("XLSX write error: {0}")]
    XlsxWrite(#[from] rust_xlsxwriter::XlsxError),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<reqwest::Error> for CellarError {
    fn from(err: reqwest::Error) -> Self {
        CellarError::SourceUnavailable(err.to_string())
    }
}
