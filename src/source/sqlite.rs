use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};

use super::{Cell, RawTable, TableSource};
use crate::error::CellarError;

/// Local SQLite database with one table per sheet. Sheet names map to table
/// names by replacing spaces with underscores (`change log` → `change_log`).
pub struct SqliteSource {
    label: String,
    conn: Connection,
}

impl SqliteSource {
    /// Open an existing database read-only. A missing file is a source error,
    /// not an invitation to create an empty database.
    pub fn open(path: &Path) -> Result<Self, CellarError> {
        if !path.exists() {
            return Err(CellarError::SourceUnavailable(format!(
                "{}: no such database",
                path.display()
            )));
        }
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        Ok(Self {
            label: path.display().to_string(),
            conn,
        })
    }

    /// Wrap an already open connection (used by tests with in-memory stores).
    pub fn from_connection(label: impl Into<String>, conn: Connection) -> Self {
        Self {
            label: label.into(),
            conn,
        }
    }
}

/// Table name used for a sheet.
pub(crate) fn table_name(sheet: &str) -> String {
    sheet.trim().replace(' ', "_")
}

impl TableSource for SqliteSource {
    fn describe(&self) -> String {
        self.label.clone()
    }

    fn load_table(&mut self, sheet: &str) -> Result<RawTable, CellarError> {
        let name = table_name(sheet);
        let exists: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
            [&name],
            |row| row.get(0),
        )?;
        if exists == 0 {
            return Err(CellarError::SheetNotFound(sheet.to_string()));
        }

        let sql = format!("SELECT * FROM \"{}\"", name.replace('"', "\"\""));
        let mut stmt = self.conn.prepare(&sql)?;
        let headers: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let width = headers.len();

        let rows = stmt
            .query_map([], |row| {
                let mut cells = Vec::with_capacity(width);
                for idx in 0..width {
                    cells.push(convert_value(row.get_ref(idx)?));
                }
                Ok(cells)
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RawTable {
            name: sheet.to_string(),
            headers,
            rows,
        })
    }
}

fn convert_value(value: ValueRef<'_>) -> Cell {
    match value {
        ValueRef::Null => Cell::Empty,
        ValueRef::Integer(i) => Cell::Number(i as f64),
        ValueRef::Real(f) => Cell::Number(f),
        ValueRef::Text(bytes) => Cell::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(_) => Cell::Empty,
    }
}
