//! Column interpretation for the library and change-log sheets. Each row is
//! either turned into a domain record or reported as malformed; nothing is
//! coerced into a default value it did not carry.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use tracing::warn;

use super::report::{ColumnIssue, LoadReport, RowIssue};
use super::{Cell, RawTable};
use crate::config::{RowErrorPolicy, TerroirPolicy};
use crate::error::CellarError;
use crate::models::{
    BottleRecord, ChangeLogEntry, RecordId, MAX_EXACT_INTEGER, UNKNOWN_TERROIR,
};

const ENTRY_RECORD_ID: &str = "Entry_Record_ID";
const PRODUCER: &str = "Producer";
const VINTAGE: &str = "Vintage";
const LOCATION: &str = "Location";
const BOX_SHELF_NUMBER: &str = "Box_Shelf_Number";
const VARIETAL: &str = "Varietal";
const TERROIR: &str = "Terroir";
const NOTES: &str = "Notes";
const BOTTLES: &str = "Bottles";
const CHANGE_DATE: &str = "Change_Date";
const CHANGE: &str = "Change";
const CONSUMPTION_NOTES: &str = "Consumption_Notes";
const ACTIVE_STORAGE_RECORD: &str = "Active_Storage_Record";
const DECADE: &str = "Decade";

/// Columns the library sheet must carry.
const LIBRARY_REQUIRED: [&str; 8] = [
    ENTRY_RECORD_ID,
    PRODUCER,
    VINTAGE,
    LOCATION,
    BOX_SHELF_NUMBER,
    VARIETAL,
    NOTES,
    BOTTLES,
];

/// Columns the change-log sheet must carry.
const CHANGE_LOG_REQUIRED: [&str; 2] = [ENTRY_RECORD_ID, CHANGE_DATE];

/// Every header with a fixed meaning; anything else is kept as an extra.
const KNOWN_COLUMNS: [&str; 14] = [
    ENTRY_RECORD_ID,
    PRODUCER,
    VINTAGE,
    LOCATION,
    BOX_SHELF_NUMBER,
    VARIETAL,
    TERROIR,
    NOTES,
    BOTTLES,
    CHANGE_DATE,
    CHANGE,
    CONSUMPTION_NOTES,
    ACTIVE_STORAGE_RECORD,
    DECADE,
];

/// Day zero of the spreadsheet serial date system.
const SERIAL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

const DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%m/%d/%Y %H:%M",
];
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    pub row_errors: RowErrorPolicy,
    pub terroir: TerroirPolicy,
}

/// Resolved column positions for the descriptive block both sheets share.
struct RecordColumns {
    id: Option<usize>,
    producer: Option<usize>,
    vintage: Option<usize>,
    location: Option<usize>,
    shelf: Option<usize>,
    varietal: Option<usize>,
    terroir: Option<usize>,
    notes: Option<usize>,
    bottles: Option<usize>,
    extras: Vec<(usize, String)>,
}

impl RecordColumns {
    fn resolve(table: &RawTable) -> Self {
        let extras = table
            .headers
            .iter()
            .enumerate()
            .filter(|(_, header)| {
                let header = header.trim();
                !header.is_empty()
                    && !KNOWN_COLUMNS
                        .iter()
                        .any(|known| known.eq_ignore_ascii_case(header))
            })
            .map(|(idx, header)| (idx, header.trim().to_string()))
            .collect();

        Self {
            id: table.column(ENTRY_RECORD_ID),
            producer: table.column(PRODUCER),
            vintage: table.column(VINTAGE),
            location: table.column(LOCATION),
            shelf: table.column(BOX_SHELF_NUMBER),
            varietal: table.column(VARIETAL),
            terroir: table.column(TERROIR),
            notes: table.column(NOTES),
            bottles: table.column(BOTTLES),
            extras,
        }
    }

    fn read(
        &self,
        table: &RawTable,
        row: &[Cell],
        terroir: TerroirPolicy,
    ) -> Result<BottleRecord, String> {
        let id = text_value(&table.cell(row, self.id))
            .and_then(RecordId::new)
            .ok_or_else(|| format!("missing {ENTRY_RECORD_ID}"))?;

        let terroir = match (self.terroir, terroir) {
            (Some(_), _) => text_value(&table.cell(row, self.terroir)),
            (None, TerroirPolicy::Placeholder) => Some(UNKNOWN_TERROIR.to_string()),
            (None, TerroirPolicy::Omit) => None,
        };

        let vintage = integer_value(&table.cell(row, self.vintage), VINTAGE)?
            .map(|year| {
                i32::try_from(year).map_err(|_| format!("{VINTAGE} {year} is out of range"))
            })
            .transpose()?;

        let extra = self
            .extras
            .iter()
            .filter_map(|(idx, header)| {
                text_value(&table.cell(row, Some(*idx))).map(|value| (header.clone(), value))
            })
            .collect();

        Ok(BottleRecord {
            id,
            producer: text_value(&table.cell(row, self.producer)),
            vintage,
            location: text_value(&table.cell(row, self.location)),
            box_shelf_number: count_value(&table.cell(row, self.shelf), BOX_SHELF_NUMBER)?,
            varietal: text_value(&table.cell(row, self.varietal)),
            terroir,
            notes: text_value(&table.cell(row, self.notes)),
            bottles: count_value(&table.cell(row, self.bottles), BOTTLES)?,
            extra,
        })
    }
}

/// Parse the library sheet into bottle records.
pub fn parse_library(
    table: &RawTable,
    options: &ParseOptions,
    report: &mut LoadReport,
) -> Result<Vec<BottleRecord>, CellarError> {
    require_columns(table, &LIBRARY_REQUIRED)?;
    note_missing_terroir(table, report);

    let columns = RecordColumns::resolve(table);
    let mut records = Vec::with_capacity(table.rows.len());
    for (idx, row) in table.rows.iter().enumerate() {
        if row.iter().all(Cell::is_blank) {
            continue;
        }
        match columns.read(table, row, options.terroir) {
            Ok(record) => records.push(record),
            Err(reason) => reject_row(table, idx, reason, options, report)?,
        }
    }
    Ok(records)
}

/// Parse the change-log sheet. The descriptive columns are optional here: a
/// log row only carries replacement attributes when the sheet has them.
pub fn parse_change_log(
    table: &RawTable,
    options: &ParseOptions,
    report: &mut LoadReport,
) -> Result<Vec<ChangeLogEntry>, CellarError> {
    require_columns(table, &CHANGE_LOG_REQUIRED)?;
    note_missing_terroir(table, report);

    let columns = RecordColumns::resolve(table);
    let date_col = table.column(CHANGE_DATE);
    let change_col = table.column(CHANGE);
    let consumption_col = table.column(CONSUMPTION_NOTES);
    let active_col = table.column(ACTIVE_STORAGE_RECORD);

    let mut entries = Vec::with_capacity(table.rows.len());
    for (idx, row) in table.rows.iter().enumerate() {
        if row.iter().all(Cell::is_blank) {
            continue;
        }
        let parsed = columns
            .read(table, row, options.terroir)
            .and_then(|record| {
                let change_date = date_value(&table.cell(row, date_col))?;
                let active = flag_value(&table.cell(row, active_col))?;
                Ok(ChangeLogEntry {
                    record,
                    change_date,
                    change: text_value(&table.cell(row, change_col)),
                    consumption_notes: text_value(&table.cell(row, consumption_col)),
                    active,
                })
            });
        match parsed {
            Ok(entry) => entries.push(entry),
            Err(reason) => {
                reject_row(table, idx, reason, options, report)?;
                let id = text_value(&table.cell(row, columns.id)).and_then(RecordId::new);
                report.rejected_log_ids.extend(id);
            }
        }
    }
    Ok(entries)
}

fn require_columns(table: &RawTable, required: &[&str]) -> Result<(), CellarError> {
    match required.iter().find(|column| table.column(column).is_none()) {
        Some(column) => Err(CellarError::MissingColumn {
            table: table.name.clone(),
            column: (*column).to_string(),
        }),
        None => Ok(()),
    }
}

fn note_missing_terroir(table: &RawTable, report: &mut LoadReport) {
    if table.column(TERROIR).is_none() {
        warn!(table = %table.name, "no {TERROIR} column; terroir filter is limited");
        report.unknown_columns.push(ColumnIssue {
            table: table.name.clone(),
            column: TERROIR.to_string(),
        });
    }
}

fn reject_row(
    table: &RawTable,
    idx: usize,
    reason: String,
    options: &ParseOptions,
    report: &mut LoadReport,
) -> Result<(), CellarError> {
    // Data rows start below the header row, which is row 1.
    let row = idx + 2;
    match options.row_errors {
        RowErrorPolicy::Abort => Err(CellarError::MalformedRow {
            table: table.name.clone(),
            row,
            reason,
        }),
        RowErrorPolicy::Skip => {
            warn!(table = %table.name, row, %reason, "skipping malformed row");
            report.row_issues.push(RowIssue {
                table: table.name.clone(),
                row,
                reason,
            });
            Ok(())
        }
    }
}

fn text_value(cell: &Cell) -> Option<String> {
    match cell {
        Cell::Empty => None,
        Cell::Text(text) => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Cell::Number(number) if number.fract() == 0.0 && number.abs() < MAX_EXACT_INTEGER => {
            Some(format!("{}", *number as i64))
        }
        Cell::Number(number) => Some(number.to_string()),
        Cell::Bool(flag) => Some(flag.to_string()),
        Cell::DateTime(value) => Some(value.to_string()),
    }
}

fn integer_value(cell: &Cell, column: &str) -> Result<Option<i64>, String> {
    let number = match cell {
        Cell::Empty => return Ok(None),
        Cell::Number(number) => *number,
        Cell::Text(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            trimmed
                .parse::<f64>()
                .map_err(|_| format!("{column} '{trimmed}' is not a number"))?
        }
        other => return Err(format!("{column} {other:?} is not a number")),
    };
    if !number.is_finite() || number.fract() != 0.0 {
        return Err(format!("{column} {number} is not a whole number"));
    }
    Ok(Some(number as i64))
}

/// Non-negative integer column (shelf numbers, bottle counts).
fn count_value(cell: &Cell, column: &str) -> Result<Option<u32>, String> {
    integer_value(cell, column)?
        .map(|value| u32::try_from(value).map_err(|_| format!("{column} {value} is negative or too large")))
        .transpose()
}

fn date_value(cell: &Cell) -> Result<NaiveDateTime, String> {
    match cell {
        Cell::DateTime(value) => Ok(*value),
        Cell::Number(serial) => serial_date(*serial)
            .ok_or_else(|| format!("{CHANGE_DATE} {serial} is not a valid date")),
        Cell::Text(text) if !text.trim().is_empty() => parse_date_text(text.trim())
            .ok_or_else(|| format!("{CHANGE_DATE} '{}' is not a valid date", text.trim())),
        _ => Err(format!("missing {CHANGE_DATE}")),
    }
}

fn parse_date_text(text: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

fn serial_date(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let (year, month, day) = SERIAL_EPOCH;
    let epoch = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    epoch.checked_add_signed(Duration::milliseconds(millis))
}

fn flag_value(cell: &Cell) -> Result<Option<bool>, String> {
    match cell {
        Cell::Empty => Ok(None),
        Cell::Bool(flag) => Ok(Some(*flag)),
        Cell::Number(number) if *number == 1.0 => Ok(Some(true)),
        Cell::Number(number) if *number == 0.0 => Ok(Some(false)),
        Cell::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
            "" => Ok(None),
            "yes" | "y" | "true" => Ok(Some(true)),
            "no" | "n" | "false" => Ok(Some(false)),
            other => Err(format!("{ACTIVE_STORAGE_RECORD} '{other}' is not Yes/No")),
        },
        other => Err(format!("{ACTIVE_STORAGE_RECORD} {other:?} is not Yes/No")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> Cell {
        Cell::Text(value.to_string())
    }

    fn library_table(rows: Vec<Vec<Cell>>) -> RawTable {
        RawTable {
            name: "library".into(),
            headers: [
                "Entry_Record_ID",
                "Producer",
                "Vintage",
                "Location",
                "Box_Shelf_Number",
                "Varietal",
                "Notes",
                "Bottles",
                "Region",
            ]
            .iter()
            .map(|h| h.to_string())
            .collect(),
            rows,
        }
    }

    fn library_row(id: Cell, vintage: Cell, bottles: Cell) -> Vec<Cell> {
        vec![
            id,
            text("Chave"),
            vintage,
            text("Basement Fridge Left"),
            Cell::Number(3.0),
            text("Syrah"),
            text("Magnum"),
            bottles,
            text("Rhône"),
        ]
    }

    #[test]
    fn library_rows_become_records_with_extras_and_placeholder_terroir() {
        let table = library_table(vec![library_row(
            Cell::Number(7.0),
            Cell::Number(2015.0),
            Cell::Number(2.0),
        )]);
        let mut report = LoadReport::default();
        let records = parse_library(&table, &ParseOptions::default(), &mut report).unwrap();

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.id.as_str(), "7");
        assert_eq!(record.vintage, Some(2015));
        assert_eq!(record.box_shelf_number, Some(3));
        assert_eq!(record.bottles, Some(2));
        assert_eq!(record.terroir.as_deref(), Some(UNKNOWN_TERROIR));
        assert_eq!(record.extra, vec![("Region".to_string(), "Rhône".to_string())]);
        assert!(report.missing_column("Terroir"));
        assert!(report.row_issues.is_empty());
    }

    #[test]
    fn omitted_terroir_stays_absent() {
        let table = library_table(vec![library_row(
            Cell::Number(1.0),
            Cell::Empty,
            Cell::Empty,
        )]);
        let options = ParseOptions {
            terroir: TerroirPolicy::Omit,
            ..ParseOptions::default()
        };
        let records = parse_library(&table, &options, &mut LoadReport::default()).unwrap();
        assert_eq!(records[0].terroir, None);
        assert_eq!(records[0].vintage, None);
        assert_eq!(records[0].bottles, None);
    }

    #[test]
    fn malformed_rows_are_skipped_with_diagnostics() {
        let table = library_table(vec![
            library_row(Cell::Empty, Cell::Number(2015.0), Cell::Number(1.0)),
            library_row(Cell::Number(2.0), text("old"), Cell::Number(1.0)),
            library_row(Cell::Number(3.0), Cell::Number(2001.0), Cell::Number(-1.0)),
            vec![Cell::Empty; 9],
            library_row(Cell::Number(4.0), text("1999"), text("6")),
        ]);
        let mut report = LoadReport::default();
        let records = parse_library(&table, &ParseOptions::default(), &mut report).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id.as_str(), "4");
        assert_eq!(records[0].vintage, Some(1999));
        assert_eq!(records[0].bottles, Some(6));

        let rows: Vec<usize> = report.row_issues.iter().map(|issue| issue.row).collect();
        assert_eq!(rows, vec![2, 3, 4]);
        assert!(report.row_issues[0].reason.contains("Entry_Record_ID"));
    }

    #[test]
    fn abort_policy_fails_on_first_malformed_row() {
        let table = library_table(vec![library_row(
            Cell::Number(1.0),
            Cell::Number(1999.5),
            Cell::Number(1.0),
        )]);
        let options = ParseOptions {
            row_errors: RowErrorPolicy::Abort,
            ..ParseOptions::default()
        };
        let err = parse_library(&table, &options, &mut LoadReport::default()).unwrap_err();
        assert!(matches!(err, CellarError::MalformedRow { row: 2, .. }));
    }

    #[test]
    fn missing_required_library_column_is_fatal() {
        let mut table = library_table(Vec::new());
        table.headers.retain(|header| header != "Bottles");
        let err = parse_library(&table, &ParseOptions::default(), &mut LoadReport::default())
            .unwrap_err();
        assert!(matches!(err, CellarError::MissingColumn { column, .. } if column == "Bottles"));
    }

    fn change_table(rows: Vec<Vec<Cell>>) -> RawTable {
        RawTable {
            name: "change log".into(),
            headers: [
                "Entry_Record_ID",
                "Change_Date",
                "Change",
                "Consumption_Notes",
                "Active_Storage_Record",
                "Producer",
                "Terroir",
            ]
            .iter()
            .map(|h| h.to_string())
            .collect(),
            rows,
        }
    }

    #[test]
    fn change_log_parses_dates_flags_and_log_only_fields() {
        let table = change_table(vec![
            vec![
                Cell::Number(1.0),
                text("2024-05-01"),
                text("Drank"),
                text("Lovely"),
                text("no"),
                text("Chave"),
                text("Hermitage"),
            ],
            vec![
                text("2"),
                Cell::Number(45_000.5),
                Cell::Empty,
                Cell::Empty,
                Cell::Empty,
                Cell::Empty,
                Cell::Empty,
            ],
            vec![
                text("3"),
                text("03/15/2023"),
                Cell::Empty,
                Cell::Empty,
                Cell::Bool(true),
                Cell::Empty,
                Cell::Empty,
            ],
        ]);
        let mut report = LoadReport::default();
        let entries = parse_change_log(&table, &ParseOptions::default(), &mut report).unwrap();

        assert_eq!(entries.len(), 3);
        assert_eq!(
            entries[0].change_date,
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
        );
        assert_eq!(entries[0].active, Some(false));
        assert_eq!(entries[0].change.as_deref(), Some("Drank"));
        assert_eq!(entries[0].consumption_notes.as_deref(), Some("Lovely"));
        assert_eq!(entries[0].record.terroir.as_deref(), Some("Hermitage"));

        assert_eq!(
            entries[1].change_date,
            NaiveDate::from_ymd_opt(2023, 3, 15).unwrap().and_hms_opt(12, 0, 0).unwrap()
        );
        assert_eq!(entries[1].active, None);
        assert_eq!(entries[1].record.terroir, None);

        assert_eq!(entries[2].active, Some(true));
        assert!(report.is_clean());
    }

    #[test]
    fn unparseable_change_dates_are_rejected() {
        let table = change_table(vec![
            vec![
                Cell::Number(1.0),
                text("sometime in May"),
                Cell::Empty,
                Cell::Empty,
                Cell::Empty,
                Cell::Empty,
                Cell::Empty,
            ],
            vec![
                Cell::Number(2.0),
                Cell::Empty,
                Cell::Empty,
                Cell::Empty,
                text("Yes"),
                Cell::Empty,
                Cell::Empty,
            ],
        ]);
        let mut report = LoadReport::default();
        let entries = parse_change_log(&table, &ParseOptions::default(), &mut report).unwrap();

        assert!(entries.is_empty());
        assert_eq!(report.skipped_rows(), 2);
        assert!(report.row_issues[1].reason.contains("missing Change_Date"));
    }

    #[test]
    fn unknown_active_flag_is_rejected() {
        let table = change_table(vec![vec![
            Cell::Number(1.0),
            text("2024-01-01"),
            Cell::Empty,
            Cell::Empty,
            text("maybe"),
            Cell::Empty,
            Cell::Empty,
        ]]);
        let mut report = LoadReport::default();
        let entries = parse_change_log(&table, &ParseOptions::default(), &mut report).unwrap();
        assert!(entries.is_empty());
        assert_eq!(report.skipped_rows(), 1);
    }

    #[test]
    fn rejected_change_rows_keep_their_ids() {
        let table = change_table(vec![
            vec![
                Cell::Number(1.0),
                text("31/31/2024"),
                Cell::Empty,
                Cell::Empty,
                text("No"),
                Cell::Empty,
                Cell::Empty,
            ],
            vec![
                Cell::Empty,
                text("sometime in May"),
                Cell::Empty,
                Cell::Empty,
                text("No"),
                text("Huet"),
                Cell::Empty,
            ],
        ]);
        let mut report = LoadReport::default();
        let entries = parse_change_log(&table, &ParseOptions::default(), &mut report).unwrap();

        assert!(entries.is_empty());
        assert_eq!(report.skipped_rows(), 2);
        assert_eq!(report.rejected_log_ids, vec![RecordId::new("1").unwrap()]);
    }

    #[test]
    fn default_options_skip_rows_and_fill_terroir() {
        let options = ParseOptions::default();
        assert_eq!(options.row_errors, RowErrorPolicy::Skip);
        assert_eq!(options.terroir, TerroirPolicy::Placeholder);
    }

    #[test]
    fn huge_numeric_ids_keep_their_digits() {
        let first = text_value(&Cell::Number(12345678901234567890.0)).unwrap();
        assert_ne!(first, i64::MAX.to_string());
        assert_eq!(text_value(&Cell::Number(17.0)).as_deref(), Some("17"));
    }
}
