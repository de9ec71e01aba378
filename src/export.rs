//! Spreadsheet and CSV payloads for the current view.

use std::fs;
use std::path::Path;

use rust_xlsxwriter::{Format, Workbook};
use tracing::info;

use crate::error::CellarError;
use crate::models::{Column, Holding, Value};
use crate::summary::{GroupKey, Summary};

/// Default file name of the results workbook.
pub const RESULTS_FILE_NAME: &str = "wine_cellar_results.xlsx";
/// Default file name of the shelf detail workbook.
pub const SHELF_FILE_NAME: &str = "shelf_details.xlsx";

pub const RESULTS_SHEET: &str = "Filtered Results";
pub const SHELF_SHEET: &str = "Shelf Details";

/// A named grid of typed cells, one sheet of an export.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    /// Lay out holdings under `columns`. With `include_extras`, attributes the
    /// engine does not interpret follow as extra columns in first-seen order.
    pub fn from_holdings(
        name: &str,
        holdings: &[Holding],
        columns: &[Column],
        include_extras: bool,
    ) -> Self {
        let mut extra_headers: Vec<String> = Vec::new();
        if include_extras {
            for holding in holdings {
                for (header, _) in &holding.record.extra {
                    if !extra_headers.contains(header) {
                        extra_headers.push(header.clone());
                    }
                }
            }
        }

        let headers = columns
            .iter()
            .map(|column| column.header().to_string())
            .chain(extra_headers.iter().cloned())
            .collect();

        let rows = holdings
            .iter()
            .map(|holding| {
                let mut row: Vec<Value> =
                    columns.iter().map(|column| column.value(holding)).collect();
                row.extend(extra_headers.iter().map(|header| {
                    holding
                        .record
                        .extra
                        .iter()
                        .find(|(name, _)| name == header)
                        .map_or(Value::Empty, |(_, value)| Value::Text(value.clone()))
                }));
                row
            })
            .collect();

        Self {
            name: name.to_string(),
            headers,
            rows,
        }
    }

    pub fn from_summary(summary: &Summary) -> Self {
        let headers = summary
            .group_by
            .key_headers()
            .iter()
            .map(|header| header.to_string())
            .chain(std::iter::once("Bottles".to_string()))
            .collect();

        let rows = summary
            .rows
            .iter()
            .map(|row| {
                let mut cells = key_values(&row.key);
                cells.push(Value::Int(row.bottles as i64));
                cells
            })
            .collect();

        Self {
            name: summary.group_by.title().to_string(),
            headers,
            rows,
        }
    }
}

fn key_values(key: &GroupKey) -> Vec<Value> {
    match key {
        GroupKey::Text(text) => vec![Value::Text(text.clone())],
        GroupKey::Year(year) => vec![Value::Int(i64::from(*year))],
        GroupKey::Decade(decade) => vec![Value::Text(decade.label())],
        GroupKey::Shelf(location, shelf) => {
            vec![Value::Text(location.clone()), Value::Int(i64::from(*shelf))]
        }
    }
}

/// Output format, picked from the target file's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Xlsx,
    Csv,
}

impl ExportFormat {
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => ExportFormat::Csv,
            _ => ExportFormat::Xlsx,
        }
    }
}

/// Write every table to its own sheet, header row in bold.
pub fn export_workbook(tables: &[Table]) -> Result<Vec<u8>, CellarError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    for table in tables {
        let sheet = workbook.add_worksheet();
        sheet.set_name(&table.name)?;

        for (col, header) in table.headers.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, header, &bold)?;
        }
        for (idx, row) in table.rows.iter().enumerate() {
            let sheet_row = idx as u32 + 1;
            for (col, value) in row.iter().enumerate() {
                match value {
                    Value::Empty => {}
                    Value::Text(text) => {
                        sheet.write_string(sheet_row, col as u16, text)?;
                    }
                    Value::Int(number) => {
                        sheet.write_number(sheet_row, col as u16, *number as f64)?;
                    }
                }
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// Flat delimited-text rendition of a single table.
pub fn export_csv(table: &Table) -> Result<Vec<u8>, CellarError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(|value| value.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|err| CellarError::Io(err.into_error()))
}

/// Workbook with the filtered rows followed by one sheet per summary.
pub fn results_workbook(rows: &[Holding], summaries: &[Summary]) -> Result<Vec<u8>, CellarError> {
    let mut tables = vec![Table::from_holdings(RESULTS_SHEET, rows, &Column::ALL, true)];
    tables.extend(summaries.iter().map(Table::from_summary));
    export_workbook(&tables)
}

/// Workbook with the shelf detail view only.
pub fn shelf_workbook(rows: &[Holding]) -> Result<Vec<u8>, CellarError> {
    export_workbook(&[Table::from_holdings(
        SHELF_SHEET,
        rows,
        &Column::SHELF_DETAIL,
        false,
    )])
}

/// Results payload for `path`: CSV of the rows, or the full workbook.
pub fn results_payload(
    path: &Path,
    rows: &[Holding],
    summaries: &[Summary],
) -> Result<Vec<u8>, CellarError> {
    match ExportFormat::for_path(path) {
        ExportFormat::Csv => export_csv(&Table::from_holdings(
            RESULTS_SHEET,
            rows,
            &Column::ALL,
            true,
        )),
        ExportFormat::Xlsx => results_workbook(rows, summaries),
    }
}

pub fn write_export(path: &Path, bytes: &[u8]) -> Result<(), CellarError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, bytes)?;
    info!(path = %path.display(), bytes = bytes.len(), "export written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive::decade_for;
    use crate::models::{BottleRecord, Origin, RecordId};
    use crate::summary::{summarize, GroupBy};

    fn holding(id: &str, location: &str, shelf: u32, bottles: u32, extra: &[(&str, &str)]) -> Holding {
        let record = BottleRecord {
            producer: Some("Raveneau".to_string()),
            vintage: Some(2014),
            location: Some(location.to_string()),
            box_shelf_number: Some(shelf),
            varietal: Some("Chardonnay".to_string()),
            notes: Some("Magnum".to_string()),
            bottles: Some(bottles),
            extra: extra
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..BottleRecord::new(RecordId::new(id).unwrap())
        };
        Holding {
            decade: decade_for(record.vintage),
            record,
            active_storage_record: true,
            origin: Origin::Library,
        }
    }

    #[test]
    fn holdings_table_follows_column_order_then_extras() {
        let rows = vec![
            holding("1", "Fridge", 1, 2, &[("Price", "90")]),
            holding("2", "Fridge", 2, 1, &[("Region", "Chablis"), ("Price", "70")]),
        ];
        let table = Table::from_holdings(RESULTS_SHEET, &rows, &Column::ALL, true);

        assert_eq!(table.headers.len(), Column::ALL.len() + 2);
        assert_eq!(table.headers[0], "Entry_Record_ID");
        assert_eq!(&table.headers[11..], &["Price".to_string(), "Region".to_string()]);
        assert_eq!(table.rows[0][11], Value::Text("90".into()));
        assert_eq!(table.rows[0][12], Value::Empty);
        assert_eq!(table.rows[1][12], Value::Text("Chablis".into()));
    }

    #[test]
    fn summary_table_has_key_columns_and_bottles() {
        let rows = vec![holding("1", "Fridge", 3, 2, &[]), holding("2", "Fridge", 3, 4, &[])];
        let table = Table::from_summary(&summarize(&rows, GroupBy::LocationShelf));

        assert_eq!(table.headers, vec!["Location", "Box_Shelf_Number", "Bottles"]);
        assert_eq!(
            table.rows,
            vec![vec![Value::Text("Fridge".into()), Value::Int(3), Value::Int(6)]]
        );
    }

    #[test]
    fn csv_payload_renders_headers_and_blank_cells() {
        let table = Table {
            name: "t".into(),
            headers: vec!["Producer".into(), "Bottles".into()],
            rows: vec![
                vec![Value::Text("Dauvissat, Vincent".into()), Value::Int(3)],
                vec![Value::Text("Fevre".into()), Value::Empty],
            ],
        };
        let text = String::from_utf8(export_csv(&table).unwrap()).unwrap();
        assert_eq!(text, "Producer,Bottles\n\"Dauvissat, Vincent\",3\nFevre,\n");
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(ExportFormat::for_path(Path::new("out.CSV")), ExportFormat::Csv);
        assert_eq!(ExportFormat::for_path(Path::new("out.xlsx")), ExportFormat::Xlsx);
        assert_eq!(ExportFormat::for_path(Path::new("out")), ExportFormat::Xlsx);
    }

    #[test]
    fn results_workbook_writes_one_sheet_per_table() {
        use calamine::{Reader, Xlsx};
        use std::io::Cursor;

        let rows = vec![holding("1", "Fridge", 1, 2, &[])];
        let summaries: Vec<Summary> = GroupBy::TABS.iter().map(|g| summarize(&rows, *g)).collect();
        let bytes = results_workbook(&rows, &summaries).unwrap();

        let workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes)).unwrap();
        assert_eq!(
            workbook.sheet_names(),
            vec!["Filtered Results", "By Location", "By Producer", "By Decade", "By Vintage"]
        );
    }
}
