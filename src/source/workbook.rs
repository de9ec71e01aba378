use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::time::Duration;

use calamine::{Data, Reader, Xlsx};
use reqwest::blocking::Client;
use tracing::{debug, info};

use super::{Cell, RawTable, TableSource};
use crate::error::CellarError;

const USER_AGENT: &str = concat!("cellar-explorer/", env!("CARGO_PKG_VERSION"));

/// An `.xlsx` workbook held in memory, read either from disk or from an HTTP
/// export URL. The bytes are fetched once; every sheet is parsed from them.
pub struct WorkbookSource {
    label: String,
    bytes: Vec<u8>,
}

impl WorkbookSource {
    pub fn from_bytes(label: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            label: label.into(),
            bytes,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, CellarError> {
        let bytes = fs::read(path).map_err(|err| {
            CellarError::SourceUnavailable(format!("{}: {err}", path.display()))
        })?;
        Ok(Self::from_bytes(path.display().to_string(), bytes))
    }

    /// Download the workbook. Any transport failure or non-success status is
    /// reported as `SourceUnavailable`.
    pub fn fetch(url: &str, timeout: Duration) -> Result<Self, CellarError> {
        info!(url, "fetching workbook export");
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        let response = client.get(url).send()?.error_for_status()?;
        let bytes = response.bytes()?.to_vec();
        debug!(bytes = bytes.len(), "workbook downloaded");
        Ok(Self::from_bytes(url, bytes))
    }
}

impl TableSource for WorkbookSource {
    fn describe(&self) -> String {
        self.label.clone()
    }

    fn load_table(&mut self, sheet: &str) -> Result<RawTable, CellarError> {
        let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(self.bytes.as_slice()))?;
        let sheet_name = workbook
            .sheet_names()
            .into_iter()
            .find(|name| name.trim().eq_ignore_ascii_case(sheet.trim()))
            .ok_or_else(|| CellarError::SheetNotFound(sheet.to_string()))?;

        let range = workbook.worksheet_range(&sheet_name)?;
        let mut rows = range.rows();

        let headers = match rows.next() {
            Some(header_row) => header_row.iter().map(header_text).collect(),
            None => Vec::new(),
        };
        let rows = rows
            .map(|row| row.iter().map(convert_cell).collect())
            .collect();

        Ok(RawTable {
            name: sheet.to_string(),
            headers,
            rows,
        })
    }
}

fn header_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string().trim().to_string(),
    }
}

fn convert_cell(cell: &Data) -> Cell {
    match cell {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(value) => Cell::DateTime(value),
            None => Cell::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) => Cell::Text(s.clone()),
        Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(e) => Cell::Text(format!("#{e:?}")),
    }
}
