//! Filter engine over the current holdings.
//!
//! A [`FilterConfig`] is a plain value owned by whoever drives the session; it
//! can be serialized, compared, and reset. Applying it narrows the holdings in
//! three stages (quick filters, field filters, fridge drill-down), each stage
//! only ever removing rows from what the previous one kept.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::{Decade, Holding};

/// One filter slot: either no constraint, or an exact value to match.
///
/// Keeping "no constraint" as its own variant means a producer that happens
/// to be called `All` or `None` is still an ordinary value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selection<T> {
    Any,
    Only(T),
}

impl<T> Default for Selection<T> {
    fn default() -> Self {
        Selection::Any
    }
}

impl<T: PartialEq> Selection<T> {
    /// Whether a row whose attribute is `value` passes. Absent attributes only
    /// pass the unconstrained selection.
    pub fn admits(&self, value: Option<&T>) -> bool {
        match self {
            Selection::Any => true,
            Selection::Only(wanted) => value == Some(wanted),
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Selection::Any)
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Selection::Any => None,
            Selection::Only(value) => Some(value),
        }
    }
}

/// Every filter the explorer offers, with field names matching the keys the
/// front-end uses.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub quick_magnums: bool,
    pub favorite_producer: Selection<String>,
    pub producer: Selection<String>,
    pub vintage: Selection<i32>,
    pub location: Selection<String>,
    pub varietal: Selection<String>,
    pub terroir: Selection<String>,
    pub decade: Selection<Decade>,
    pub selected_fridge: Selection<String>,
    pub selected_shelf: Selection<u32>,
}

impl FilterConfig {
    /// The configuration with every predicate unset.
    pub fn reset() -> Self {
        Self::default()
    }

    /// Choose a fridge; any shelf picked for the previous fridge is cleared.
    pub fn with_fridge(mut self, fridge: Selection<String>) -> Self {
        if self.selected_fridge != fridge {
            self.selected_shelf = Selection::Any;
        }
        self.selected_fridge = fridge;
        self
    }

    /// Number of predicates currently constraining the result.
    pub fn active_predicates(&self) -> usize {
        [
            self.quick_magnums,
            !self.favorite_producer.is_any(),
            !self.producer.is_any(),
            !self.vintage.is_any(),
            !self.location.is_any(),
            !self.varietal.is_any(),
            !self.terroir.is_any(),
            !self.decade.is_any(),
            !self.selected_fridge.is_any(),
            !self.selected_shelf.is_any(),
        ]
        .into_iter()
        .filter(|active| *active)
        .count()
    }

    pub fn is_unconstrained(&self) -> bool {
        self.active_predicates() == 0
    }

    fn admits_quick(&self, holding: &Holding) -> bool {
        let record = &holding.record;
        (!self.quick_magnums || record.is_magnum())
            && self.favorite_producer.admits(record.producer.as_ref())
    }

    fn admits_fields(&self, holding: &Holding) -> bool {
        let record = &holding.record;
        self.producer.admits(record.producer.as_ref())
            && self.vintage.admits(record.vintage.as_ref())
            && self.location.admits(record.location.as_ref())
            && self.varietal.admits(record.varietal.as_ref())
            && self.terroir.admits(record.terroir.as_ref())
            && self.decade.admits(holding.decade.as_ref())
    }

    /// Once a fridge or a shelf is chosen, only refrigerated locations pass.
    /// A fridge name that does not carry the marker therefore matches nothing.
    fn admits_drill_down(&self, holding: &Holding, fridge_marker: &str) -> bool {
        if self.selected_fridge.is_any() && self.selected_shelf.is_any() {
            return true;
        }
        let record = &holding.record;
        let in_fridge = record
            .location
            .as_deref()
            .is_some_and(|location| is_fridge(location, fridge_marker));
        in_fridge
            && self.selected_fridge.admits(record.location.as_ref())
            && self.selected_shelf.admits(record.box_shelf_number.as_ref())
    }

    /// Whether a single row passes every predicate.
    pub fn admits(&self, holding: &Holding, fridge_marker: &str) -> bool {
        self.admits_quick(holding)
            && self.admits_fields(holding)
            && self.admits_drill_down(holding, fridge_marker)
    }
}

/// Rows of `holdings` that satisfy `config`, in their original order.
/// `fridge_marker` decides which locations the fridge drill-down can reach.
pub fn apply_filters(
    holdings: &[Holding],
    config: &FilterConfig,
    fridge_marker: &str,
) -> Vec<Holding> {
    let mut rows: Vec<&Holding> = holdings.iter().collect();
    rows.retain(|holding| config.admits_quick(holding));
    rows.retain(|holding| config.admits_fields(holding));
    rows.retain(|holding| config.admits_drill_down(holding, fridge_marker));
    rows.into_iter().cloned().collect()
}

/// Whether a location counts as refrigerated storage.
pub fn is_fridge(location: &str, marker: &str) -> bool {
    location.contains(marker)
}

/// Choices offered for each filter, drawn from the unfiltered holdings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterOptions {
    pub producers: Vec<String>,
    pub vintages: Vec<i32>,
    pub locations: Vec<String>,
    pub varietals: Vec<String>,
    pub terroirs: Vec<String>,
    pub decades: Vec<Decade>,
    pub fridges: Vec<String>,
    /// Set when the source had no terroir column, so the terroir filter can
    /// only offer the placeholder (or nothing).
    pub terroir_limited: bool,
}

impl FilterOptions {
    pub fn from_holdings(holdings: &[Holding], fridge_marker: &str, terroir_limited: bool) -> Self {
        let locations = distinct(holdings.iter().filter_map(|h| h.record.location.clone()));
        let fridges = locations
            .iter()
            .filter(|location| is_fridge(location, fridge_marker))
            .cloned()
            .collect();

        Self {
            producers: distinct(holdings.iter().filter_map(|h| h.record.producer.clone())),
            vintages: distinct(holdings.iter().filter_map(|h| h.record.vintage)),
            varietals: distinct(holdings.iter().filter_map(|h| h.record.varietal.clone())),
            terroirs: distinct(holdings.iter().filter_map(|h| h.record.terroir.clone())),
            decades: distinct(holdings.iter().filter_map(|h| h.decade)),
            locations,
            fridges,
            terroir_limited,
        }
    }

    /// Shelves present in the chosen fridge, or across every fridge when none
    /// is chosen.
    pub fn shelves_for(&self, holdings: &[Holding], fridge: &Selection<String>) -> Vec<u32> {
        distinct(
            holdings
                .iter()
                .filter(|h| match (fridge, h.record.location.as_ref()) {
                    (Selection::Only(name), Some(location)) => location == name,
                    (Selection::Any, Some(location)) => self.fridges.contains(location),
                    (_, None) => false,
                })
                .filter_map(|h| h.record.box_shelf_number),
        )
    }
}

fn distinct<T: Ord>(values: impl Iterator<Item = T>) -> Vec<T> {
    values.collect::<BTreeSet<_>>().into_iter().collect()
}
