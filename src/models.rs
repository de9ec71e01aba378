//! Domain models for the cellar snapshot. These types stay light-weight data
//! holders: the loader builds them, the reconciler merges them, and everything
//! downstream (filters, summaries, exports, the TUI) only ever reads them.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Value stored in a note cell to flag a large-format bottle.
pub const MAGNUM_NOTE: &str = "Magnum";

/// Placeholder used when the source carries no `Terroir` column at all.
pub const UNKNOWN_TERROIR: &str = "Unknown";

/// Beyond 2^53 an `f64` no longer holds every integer, so larger ids keep
/// their source text.
pub(crate) const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Identifier shared by a library entry and every change-log event against it.
///
/// Spreadsheet exports happily turn `17` into `17.0`, so ids are normalized to
/// text on the way in and compared as text afterwards.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(String);

impl RecordId {
    /// Build an id from raw text, returning `None` for blank input.
    pub fn new(raw: impl AsRef<str>) -> Option<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Ok(number) = trimmed.parse::<f64>() {
            if number.fract() == 0.0 && number.abs() < MAX_EXACT_INTEGER {
                return Some(Self(format!("{}", number as i64)));
            }
        }
        Some(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Categorical vintage bucket, e.g. the `1990s`. Only the attribute deriver
/// constructs these, so every instance is a valid decade start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Decade {
    start: i32,
}

impl Decade {
    pub(crate) fn starting(start: i32) -> Self {
        Self { start }
    }

    /// First year covered by the bucket.
    pub fn start(&self) -> i32 {
        self.start
    }

    pub fn label(&self) -> String {
        format!("{}s", self.start)
    }
}

impl fmt::Display for Decade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.start)
    }
}

/// One physical storage entry as it appears in the library sheet. The change
/// log reuses the same descriptive block when it carries replacement data.
#[derive(Debug, Clone, PartialEq)]
pub struct BottleRecord {
    pub id: RecordId,
    pub producer: Option<String>,
    pub vintage: Option<i32>,
    pub location: Option<String>,
    pub box_shelf_number: Option<u32>,
    pub varietal: Option<String>,
    pub terroir: Option<String>,
    pub notes: Option<String>,
    pub bottles: Option<u32>,
    /// Columns the engine does not interpret, kept in source order so exports
    /// round-trip whatever else the spreadsheet tracks.
    pub extra: Vec<(String, String)>,
}

impl BottleRecord {
    /// Entry with every descriptive attribute absent.
    pub fn new(id: RecordId) -> Self {
        Self {
            id,
            producer: None,
            vintage: None,
            location: None,
            box_shelf_number: None,
            varietal: None,
            terroir: None,
            notes: None,
            bottles: None,
            extra: Vec::new(),
        }
    }

    pub fn is_magnum(&self) -> bool {
        self.notes.as_deref() == Some(MAGNUM_NOTE)
    }

    /// Bottle count with absent values contributing nothing.
    pub fn bottle_count(&self) -> u64 {
        u64::from(self.bottles.unwrap_or(0))
    }
}

/// One event recorded against a library entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeLogEntry {
    pub record: BottleRecord,
    pub change_date: NaiveDateTime,
    pub change: Option<String>,
    pub consumption_notes: Option<String>,
    /// The row's own `Active_Storage_Record` flag; `None` when the cell (or the
    /// whole column) is blank.
    pub active: Option<bool>,
}

/// Library entry annotated with the status the reconciler gave it.
#[derive(Debug, Clone, PartialEq)]
pub struct FlaggedRecord {
    pub record: BottleRecord,
    pub active_storage_record: bool,
}

/// Which table a holding row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Library,
    ChangeLog,
}

/// Row of the reconciled "current holdings" table.
#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub record: BottleRecord,
    pub active_storage_record: bool,
    pub decade: Option<Decade>,
    pub origin: Origin,
}

impl Holding {
    pub fn id(&self) -> &RecordId {
        &self.record.id
    }
}

/// Typed cell used when a holding is rendered or exported.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Empty,
    Text(String),
    Int(i64),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Empty => Ok(()),
            Value::Text(text) => f.write_str(text),
            Value::Int(number) => write!(f, "{number}"),
        }
    }
}

impl From<Option<&str>> for Value {
    fn from(value: Option<&str>) -> Self {
        value.map_or(Value::Empty, |text| Value::Text(text.to_string()))
    }
}

impl From<Option<i64>> for Value {
    fn from(value: Option<i64>) -> Self {
        value.map_or(Value::Empty, Value::Int)
    }
}

/// Attributes of a holding, in the order tables and exports present them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    EntryRecordId,
    Producer,
    Vintage,
    Location,
    BoxShelfNumber,
    Varietal,
    Terroir,
    Notes,
    Bottles,
    ActiveStorageRecord,
    Decade,
}

impl Column {
    pub const ALL: [Column; 11] = [
        Column::EntryRecordId,
        Column::Producer,
        Column::Vintage,
        Column::Location,
        Column::BoxShelfNumber,
        Column::Varietal,
        Column::Terroir,
        Column::Notes,
        Column::Bottles,
        Column::ActiveStorageRecord,
        Column::Decade,
    ];

    /// Column layout of the shelf detail view.
    pub const SHELF_DETAIL: [Column; 6] = [
        Column::Producer,
        Column::Varietal,
        Column::Vintage,
        Column::Bottles,
        Column::Notes,
        Column::EntryRecordId,
    ];

    pub fn header(&self) -> &'static str {
        match self {
            Column::EntryRecordId => "Entry_Record_ID",
            Column::Producer => "Producer",
            Column::Vintage => "Vintage",
            Column::Location => "Location",
            Column::BoxShelfNumber => "Box_Shelf_Number",
            Column::Varietal => "Varietal",
            Column::Terroir => "Terroir",
            Column::Notes => "Notes",
            Column::Bottles => "Bottles",
            Column::ActiveStorageRecord => "Active_Storage_Record",
            Column::Decade => "Decade",
        }
    }

    pub fn value(&self, holding: &Holding) -> Value {
        let record = &holding.record;
        match self {
            Column::EntryRecordId => Value::Text(record.id.to_string()),
            Column::Producer => Value::from(record.producer.as_deref()),
            Column::Vintage => Value::from(record.vintage.map(i64::from)),
            Column::Location => Value::from(record.location.as_deref()),
            Column::BoxShelfNumber => Value::from(record.box_shelf_number.map(i64::from)),
            Column::Varietal => Value::from(record.varietal.as_deref()),
            Column::Terroir => Value::from(record.terroir.as_deref()),
            Column::Notes => Value::from(record.notes.as_deref()),
            Column::Bottles => Value::from(record.bottles.map(i64::from)),
            Column::ActiveStorageRecord => Value::Text(yes_no(holding.active_storage_record)),
            Column::Decade => holding
                .decade
                .map_or(Value::Empty, |decade| Value::Text(decade.label())),
        }
    }
}

/// Render a status flag the way the spreadsheet spells it.
pub fn yes_no(flag: bool) -> String {
    let label = if flag { "Yes" } else { "No" };
    label.to_string()
}
