//! Merges the library and the change log into the current-holdings table.
//!
//! A library entry stays active only while nothing in the change log refers to
//! it. Once an id appears in the log, the most recent log row for that id
//! speaks for the bottle instead: it can keep it in the cellar under corrected
//! attributes (flagged `Yes`) or take it out (flagged `No`).

use std::cmp::Reverse;
use std::collections::HashSet;

use tracing::{info, warn};

use crate::config::UnflaggedLogPolicy;
use crate::derive::decade_for;
use crate::models::{BottleRecord, ChangeLogEntry, FlaggedRecord, Holding, Origin, RecordId};

/// Output of one reconciliation pass.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    /// Library entries with the status the change log implies.
    pub library: Vec<FlaggedRecord>,
    /// Most recent change-log row per id, newest first.
    pub latest_changes: Vec<ChangeLogEntry>,
    pub holdings: Vec<Holding>,
    /// Library ids seen more than once; only the first occurrence was kept.
    pub duplicate_ids: Vec<RecordId>,
}

/// Flag every library entry: `Yes` unless its id appears anywhere in the log.
/// `rejected_log_ids` are ids of log rows the loader skipped; they count as
/// log references all the same.
pub fn flag_library(
    library: &[BottleRecord],
    change_log: &[ChangeLogEntry],
    rejected_log_ids: &[RecordId],
) -> Vec<FlaggedRecord> {
    let logged: HashSet<&RecordId> = change_log
        .iter()
        .map(|entry| &entry.record.id)
        .chain(rejected_log_ids)
        .collect();
    library
        .iter()
        .map(|record| FlaggedRecord {
            active_storage_record: !logged.contains(&record.id),
            record: record.clone(),
        })
        .collect()
}

/// Reduce the log to its newest row per id. Rows sharing a date keep their
/// source order, so the reduction is deterministic and idempotent.
pub fn latest_per_record(change_log: &[ChangeLogEntry]) -> Vec<ChangeLogEntry> {
    let mut ordered: Vec<&ChangeLogEntry> = change_log.iter().collect();
    ordered.sort_by_key(|entry| Reverse(entry.change_date));

    let mut seen = HashSet::new();
    ordered
        .into_iter()
        .filter(|entry| seen.insert(entry.record.id.clone()))
        .cloned()
        .collect()
}

/// Whether a deduplicated log row still describes a bottle in the cellar.
pub fn log_row_is_active(entry: &ChangeLogEntry, policy: UnflaggedLogPolicy) -> bool {
    match entry.active {
        Some(flag) => flag,
        None => policy == UnflaggedLogPolicy::Active,
    }
}

pub fn reconcile(
    library: &[BottleRecord],
    change_log: &[ChangeLogEntry],
    rejected_log_ids: &[RecordId],
    policy: UnflaggedLogPolicy,
) -> Reconciliation {
    let mut seen = HashSet::new();
    let mut duplicate_ids = Vec::new();
    let unique: Vec<BottleRecord> = library
        .iter()
        .filter(|record| {
            if seen.insert(record.id.clone()) {
                true
            } else {
                warn!(id = %record.id, "duplicate library id; keeping first occurrence");
                duplicate_ids.push(record.id.clone());
                false
            }
        })
        .cloned()
        .collect();

    let flagged = flag_library(&unique, change_log, rejected_log_ids);
    let latest_changes = latest_per_record(change_log);

    let from_library = flagged
        .iter()
        .filter(|entry| entry.active_storage_record)
        .map(|entry| holding(entry.record.clone(), Origin::Library));
    let from_log = latest_changes
        .iter()
        .filter(|entry| log_row_is_active(entry, policy))
        .map(|entry| holding(entry.record.clone(), Origin::ChangeLog));
    let holdings: Vec<Holding> = from_library.chain(from_log).collect();

    info!(
        library = flagged.len(),
        logged_ids = latest_changes.len(),
        holdings = holdings.len(),
        "reconciled holdings"
    );

    Reconciliation {
        library: flagged,
        latest_changes,
        holdings,
        duplicate_ids,
    }
}

fn holding(record: BottleRecord, origin: Origin) -> Holding {
    Holding {
        decade: decade_for(record.vintage),
        active_storage_record: true,
        origin,
        record,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn id(raw: &str) -> RecordId {
        RecordId::new(raw).unwrap()
    }

    fn bottle(raw_id: &str, producer: &str, vintage: i32, bottles: u32) -> BottleRecord {
        BottleRecord {
            producer: Some(producer.to_string()),
            vintage: Some(vintage),
            bottles: Some(bottles),
            ..BottleRecord::new(id(raw_id))
        }
    }

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn change(raw_id: &str, date: NaiveDateTime, active: Option<bool>, note: &str) -> ChangeLogEntry {
        ChangeLogEntry {
            record: bottle(raw_id, "X", 1995, 1),
            change_date: date,
            change: Some(note.to_string()),
            consumption_notes: None,
            active,
        }
    }

    #[test]
    fn library_flags_follow_change_log_membership() {
        let library = vec![bottle("1", "X", 1995, 2), bottle("2", "Y", 2005, 1)];
        let log = vec![change("1", day(3), Some(false), "drank")];
        let flagged = flag_library(&library, &log, &[]);

        assert!(!flagged[0].active_storage_record);
        assert!(flagged[1].active_storage_record);
    }

    #[test]
    fn ids_of_rejected_log_rows_still_deactivate_the_library_entry() {
        let library = vec![bottle("1", "X", 1995, 2), bottle("2", "Y", 2005, 1)];
        let result = reconcile(&library, &[], &[id("1")], UnflaggedLogPolicy::Active);

        assert!(!result.library[0].active_storage_record);
        assert!(result.library[1].active_storage_record);
        let ids: Vec<&str> = result.holdings.iter().map(|h| h.id().as_str()).collect();
        assert_eq!(ids, vec!["2"]);
    }

    #[test]
    fn dedup_keeps_newest_row_per_id() {
        let log = vec![
            change("1", day(1), Some(true), "moved"),
            change("1", day(5), Some(false), "drank"),
            change("2", day(2), Some(true), "fixed"),
            change("1", day(3), Some(true), "moved again"),
        ];
        let latest = latest_per_record(&log);

        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].change.as_deref(), Some("drank"));
        assert_eq!(latest[1].record.id, id("2"));
    }

    #[test]
    fn dedup_ties_keep_source_order() {
        let log = vec![
            change("1", day(4), Some(true), "first"),
            change("1", day(4), Some(false), "second"),
        ];
        let latest = latest_per_record(&log);
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].change.as_deref(), Some("first"));
    }

    #[test]
    fn dedup_is_idempotent() {
        let log = vec![
            change("3", day(1), Some(true), "a"),
            change("1", day(2), None, "b"),
            change("3", day(9), Some(false), "c"),
            change("2", day(2), Some(true), "d"),
        ];
        let once = latest_per_record(&log);
        let twice = latest_per_record(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn holdings_merge_unlogged_library_rows_with_active_log_rows() {
        let library = vec![
            bottle("1", "X", 1995, 2),
            bottle("2", "Y", 2005, 1),
            bottle("3", "Z", 1985, 4),
        ];
        let log = vec![
            change("1", day(1), Some(false), "drank"),
            change("1", day(2), Some(true), "found it"),
            change("3", day(2), Some(false), "gifted"),
        ];
        let result = reconcile(&library, &log, &[], UnflaggedLogPolicy::Active);

        let ids: Vec<(&str, Origin)> = result
            .holdings
            .iter()
            .map(|h| (h.id().as_str(), h.origin))
            .collect();
        assert_eq!(ids, vec![("2", Origin::Library), ("1", Origin::ChangeLog)]);
        assert!(result.holdings.iter().all(|h| h.active_storage_record));
        assert_eq!(result.holdings[0].decade.map(|d| d.label()).as_deref(), Some("2000s"));
    }

    #[test]
    fn at_most_one_holding_per_id() {
        let library = vec![bottle("1", "X", 1995, 2)];
        let log = vec![
            change("1", day(1), Some(true), "a"),
            change("1", day(2), Some(true), "b"),
        ];
        let result = reconcile(&library, &log, &[], UnflaggedLogPolicy::Active);
        assert_eq!(result.holdings.len(), 1);
        assert_eq!(result.holdings[0].origin, Origin::ChangeLog);
    }

    #[test]
    fn unflagged_log_rows_follow_policy() {
        let library = vec![bottle("1", "X", 1995, 2)];
        let log = vec![change("1", day(1), None, "recount")];

        let kept = reconcile(&library, &log, &[], UnflaggedLogPolicy::Active);
        assert_eq!(kept.holdings.len(), 1);

        let dropped = reconcile(&library, &log, &[], UnflaggedLogPolicy::Drop);
        assert!(dropped.holdings.is_empty());
    }

    #[test]
    fn duplicate_library_ids_keep_first_occurrence() {
        let library = vec![bottle("1", "X", 1995, 2), bottle("1", "Dup", 2001, 9)];
        let result = reconcile(&library, &[], &[], UnflaggedLogPolicy::Active);

        assert_eq!(result.holdings.len(), 1);
        assert_eq!(result.holdings[0].record.producer.as_deref(), Some("X"));
        assert_eq!(result.duplicate_ids, vec![id("1")]);
    }
}
