use std::fmt;

use crate::models::RecordId;

/// A row the loader or reconciler left out, with where and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowIssue {
    pub table: String,
    /// Spreadsheet row number (the header is row 1).
    pub row: usize,
    pub reason: String,
}

impl fmt::Display for RowIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} row {}: {}", self.table, self.row, self.reason)
    }
}

/// An expected optional column the source does not carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnIssue {
    pub table: String,
    pub column: String,
}

/// Everything recovered locally while loading.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub row_issues: Vec<RowIssue>,
    pub unknown_columns: Vec<ColumnIssue>,
    /// Ids of skipped change-log rows. Their library entries are still
    /// treated as superseded.
    pub rejected_log_ids: Vec<RecordId>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.row_issues.is_empty() && self.unknown_columns.is_empty()
    }

    pub fn skipped_rows(&self) -> usize {
        self.row_issues.len()
    }

    /// Whether `column` was missing from any table.
    pub fn missing_column(&self, column: &str) -> bool {
        self.unknown_columns
            .iter()
            .any(|issue| issue.column.eq_ignore_ascii_case(column))
    }
}
