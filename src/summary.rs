//! Bottle-count aggregates. Every summary table is the same operation, a
//! group-by-and-sum keyed by one dimension of the holding.

use std::collections::BTreeMap;
use std::fmt;

use crate::models::{Decade, Holding};

/// Dimension a summary groups by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    Location,
    Producer,
    Decade,
    Vintage,
    /// Storage unit and the shelf within it.
    LocationShelf,
}

impl GroupBy {
    /// Dimensions shown as summary tabs and exported alongside the results.
    pub const TABS: [GroupBy; 4] = [
        GroupBy::Location,
        GroupBy::Producer,
        GroupBy::Decade,
        GroupBy::Vintage,
    ];

    /// Sheet and tab title.
    pub fn title(&self) -> &'static str {
        match self {
            GroupBy::Location => "By Location",
            GroupBy::Producer => "By Producer",
            GroupBy::Decade => "By Decade",
            GroupBy::Vintage => "By Vintage",
            GroupBy::LocationShelf => "By Shelf",
        }
    }

    /// Header names of the key columns.
    pub fn key_headers(&self) -> &'static [&'static str] {
        match self {
            GroupBy::Location => &["Location"],
            GroupBy::Producer => &["Producer"],
            GroupBy::Decade => &["Decade"],
            GroupBy::Vintage => &["Vintage"],
            GroupBy::LocationShelf => &["Location", "Box_Shelf_Number"],
        }
    }

    /// Key of a row under this dimension; `None` when the attribute (or, for
    /// the compound key, either attribute) is absent.
    pub fn key(&self, holding: &Holding) -> Option<GroupKey> {
        let record = &holding.record;
        match self {
            GroupBy::Location => record.location.clone().map(GroupKey::Text),
            GroupBy::Producer => record.producer.clone().map(GroupKey::Text),
            GroupBy::Decade => holding.decade.map(GroupKey::Decade),
            GroupBy::Vintage => record.vintage.map(GroupKey::Year),
            GroupBy::LocationShelf => match (&record.location, record.box_shelf_number) {
                (Some(location), Some(shelf)) => Some(GroupKey::Shelf(location.clone(), shelf)),
                _ => None,
            },
        }
    }
}

/// Value of a grouping key. Within one summary every key uses the same variant,
/// so the derived ordering sorts by the natural order of the attribute.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroupKey {
    Text(String),
    Year(i32),
    Decade(Decade),
    Shelf(String, u32),
}

impl GroupKey {
    /// Key split into one display cell per key column.
    pub fn parts(&self) -> Vec<String> {
        match self {
            GroupKey::Text(text) => vec![text.clone()],
            GroupKey::Year(year) => vec![year.to_string()],
            GroupKey::Decade(decade) => vec![decade.label()],
            GroupKey::Shelf(location, shelf) => vec![location.clone(), shelf.to_string()],
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Text(text) => f.write_str(text),
            GroupKey::Year(year) => write!(f, "{year}"),
            GroupKey::Decade(decade) => write!(f, "{decade}"),
            GroupKey::Shelf(location, shelf) => write!(f, "{location} / {shelf}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRow {
    pub key: GroupKey,
    pub bottles: u64,
}

/// One summary table, sorted ascending by key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub group_by: GroupBy,
    pub rows: Vec<SummaryRow>,
}

impl Summary {
    pub fn total(&self) -> u64 {
        self.rows.iter().map(|row| row.bottles).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Group `rows` by `key` and sum their bottle counts. Rows without a key are
/// left out; rows without a bottle count add nothing but still create their
/// group. Only keys that occur in `rows` appear in the output.
pub fn group_sum<K, F>(rows: &[Holding], key: F) -> Vec<(K, u64)>
where
    K: Ord,
    F: Fn(&Holding) -> Option<K>,
{
    let mut groups: BTreeMap<K, u64> = BTreeMap::new();
    for holding in rows {
        if let Some(group) = key(holding) {
            *groups.entry(group).or_default() += holding.record.bottle_count();
        }
    }
    groups.into_iter().collect()
}

pub fn summarize(rows: &[Holding], group_by: GroupBy) -> Summary {
    let rows = group_sum(rows, |holding| group_by.key(holding))
        .into_iter()
        .map(|(key, bottles)| SummaryRow { key, bottles })
        .collect();
    Summary { group_by, rows }
}

/// Sum of bottle counts over `rows`.
pub fn bottle_total(rows: &[Holding]) -> u64 {
    rows.iter().map(|holding| holding.record.bottle_count()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive::decade_for;
    use crate::models::{BottleRecord, Origin, RecordId};

    fn holding(location: &str, shelf: Option<u32>, vintage: Option<i32>, bottles: Option<u32>) -> Holding {
        let record = BottleRecord {
            location: Some(location.to_string()),
            box_shelf_number: shelf,
            vintage,
            bottles,
            producer: Some("Roulot".to_string()),
            ..BottleRecord::new(RecordId::new("1").unwrap())
        };
        Holding {
            decade: decade_for(record.vintage),
            record,
            active_storage_record: true,
            origin: Origin::Library,
        }
    }

    fn pairs(summary: &Summary) -> Vec<(String, u64)> {
        summary
            .rows
            .iter()
            .map(|row| (row.key.to_string(), row.bottles))
            .collect()
    }

    #[test]
    fn sums_bottles_per_location_sorted_by_key() {
        let rows = vec![
            holding("Fridge1", None, None, Some(3)),
            holding("Fridge1", None, None, Some(5)),
            holding("Closet", None, None, Some(2)),
        ];
        let summary = summarize(&rows, GroupBy::Location);
        assert_eq!(
            pairs(&summary),
            vec![("Closet".to_string(), 2), ("Fridge1".to_string(), 8)]
        );
        assert_eq!(summary.total(), 10);
    }

    #[test]
    fn missing_counts_contribute_zero_but_keep_the_group() {
        let rows = vec![
            holding("Closet", None, None, None),
            holding("Cellar", None, None, Some(4)),
        ];
        let summary = summarize(&rows, GroupBy::Location);
        assert_eq!(
            pairs(&summary),
            vec![("Cellar".to_string(), 4), ("Closet".to_string(), 0)]
        );
    }

    #[test]
    fn rows_without_a_key_are_left_out() {
        let rows = vec![
            holding("Closet", None, Some(1965), Some(1)),
            holding("Closet", None, Some(2001), Some(2)),
            holding("Closet", None, None, Some(7)),
        ];
        assert_eq!(
            pairs(&summarize(&rows, GroupBy::Decade)),
            vec![("2000s".to_string(), 2)]
        );
        assert_eq!(
            pairs(&summarize(&rows, GroupBy::Vintage)),
            vec![("1965".to_string(), 1), ("2001".to_string(), 2)]
        );
    }

    #[test]
    fn vintages_sort_numerically() {
        let rows = vec![
            holding("Closet", None, Some(2010), Some(1)),
            holding("Closet", None, Some(999), Some(1)),
        ];
        let keys: Vec<GroupKey> = summarize(&rows, GroupBy::Vintage)
            .rows
            .into_iter()
            .map(|row| row.key)
            .collect();
        assert_eq!(keys, vec![GroupKey::Year(999), GroupKey::Year(2010)]);
    }

    #[test]
    fn compound_key_sorts_by_location_then_shelf() {
        let rows = vec![
            holding("Fridge B", Some(10), None, Some(1)),
            holding("Fridge A", Some(2), None, Some(1)),
            holding("Fridge B", Some(2), None, Some(3)),
            holding("Fridge B", Some(2), None, Some(1)),
            holding("Fridge A", None, None, Some(9)),
        ];
        let summary = summarize(&rows, GroupBy::LocationShelf);
        let keys: Vec<Vec<String>> = summary.rows.iter().map(|row| row.key.parts()).collect();
        assert_eq!(
            keys,
            vec![
                vec!["Fridge A".to_string(), "2".to_string()],
                vec!["Fridge B".to_string(), "2".to_string()],
                vec!["Fridge B".to_string(), "10".to_string()],
            ]
        );
        assert_eq!(summary.rows[1].bottles, 4);
    }

    #[test]
    fn empty_input_has_no_groups() {
        let summary = summarize(&[], GroupBy::Producer);
        assert!(summary.is_empty());
        assert_eq!(bottle_total(&[]), 0);
    }

    #[test]
    fn totals_never_shrink_when_rows_are_added() {
        let mut rows = vec![holding("Closet", None, None, Some(2))];
        let before = bottle_total(&rows);
        rows.push(holding("Closet", None, None, None));
        rows.push(holding("Closet", None, None, Some(1)));
        assert!(bottle_total(&rows) >= before);
        assert_eq!(bottle_total(&rows), 3);
    }
}
