//! One browsing session: the immutable snapshot built at startup and the
//! synchronous query pass each interaction runs against it.

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::CellarError;
use crate::filter::{apply_filters, is_fridge, FilterConfig, FilterOptions, Selection};
use crate::models::{FlaggedRecord, Holding, RecordId};
use crate::reconcile::reconcile;
use crate::source::{load_tables, open_source, LoadReport, LoadedTables, TableSource};
use crate::summary::{bottle_total, summarize, GroupBy, Summary};

/// Everything derived from the source once per session. Nothing in here is
/// mutated after construction; queries only produce new views.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub source: String,
    pub library: Vec<FlaggedRecord>,
    pub holdings: Vec<Holding>,
    pub options: FilterOptions,
    pub report: LoadReport,
    pub duplicate_ids: Vec<RecordId>,
    pub fridge_marker: String,
}

impl Snapshot {
    /// Open the configured source and build the snapshot from it.
    pub fn load(config: &Config) -> Result<Self> {
        let mut source = open_source(config).context("failed to open cellar source")?;
        Self::from_source(source.as_mut(), config).context("failed to load cellar tables")
    }

    pub fn from_source(
        source: &mut dyn TableSource,
        config: &Config,
    ) -> Result<Self, CellarError> {
        let tables = load_tables(source, config)?;
        Ok(Self::from_tables(source.describe(), tables, config))
    }

    pub fn from_tables(source: String, tables: LoadedTables, config: &Config) -> Self {
        let LoadedTables {
            library,
            change_log,
            report,
        } = tables;
        let reconciliation = reconcile(
            &library,
            &change_log,
            &report.rejected_log_ids,
            config.unflagged_log_rows,
        );
        let terroir_limited = report.missing_column("Terroir");
        let options = FilterOptions::from_holdings(
            &reconciliation.holdings,
            &config.fridge_marker,
            terroir_limited,
        );

        info!(
            source = %source,
            holdings = reconciliation.holdings.len(),
            diagnostics = report.skipped_rows() + reconciliation.duplicate_ids.len(),
            "session snapshot ready"
        );

        Self {
            source,
            library: reconciliation.library,
            holdings: reconciliation.holdings,
            options,
            report,
            duplicate_ids: reconciliation.duplicate_ids,
            fridge_marker: config.fridge_marker.clone(),
        }
    }

    /// Rows left out while loading or reconciling.
    pub fn excluded_rows(&self) -> usize {
        self.report.skipped_rows() + self.duplicate_ids.len()
    }

    /// Filter the holdings and summarize the result along every tab dimension.
    pub fn query(&self, filters: &FilterConfig) -> QueryResult {
        let rows = apply_filters(&self.holdings, filters, &self.fridge_marker);
        let summaries = GroupBy::TABS
            .iter()
            .map(|group_by| summarize(&rows, *group_by))
            .collect();
        let bottles = bottle_total(&rows);
        debug!(
            predicates = filters.active_predicates(),
            rows = rows.len(),
            bottles,
            "query evaluated"
        );
        QueryResult {
            rows,
            bottles,
            summaries,
        }
    }

    /// Fridge view for the current filters: per-shelf totals for the chosen
    /// fridge (or every fridge), and the detail rows of the chosen shelf.
    pub fn fridge_panel(&self, filters: &FilterConfig) -> FridgePanel {
        let unshelved = FilterConfig {
            selected_shelf: Selection::Any,
            ..filters.clone()
        };
        let in_fridges: Vec<Holding> =
            apply_filters(&self.holdings, &unshelved, &self.fridge_marker)
                .into_iter()
                .filter(|holding| {
                    holding
                        .record
                        .location
                        .as_deref()
                        .is_some_and(|location| is_fridge(location, &self.fridge_marker))
                })
                .collect();

        let summary = summarize(&in_fridges, GroupBy::LocationShelf);
        let shelves = self.options.shelves_for(&in_fridges, &filters.selected_fridge);
        let fridge_bottles = bottle_total(&in_fridges);

        let mut details: Vec<Holding> = in_fridges
            .into_iter()
            .filter(|holding| {
                filters
                    .selected_shelf
                    .admits(holding.record.box_shelf_number.as_ref())
            })
            .collect();
        details.sort_by(|a, b| detail_order(a).cmp(&detail_order(b)));
        let shown_bottles = bottle_total(&details);

        FridgePanel {
            fridges: self.options.fridges.clone(),
            summary,
            shelves,
            details,
            fridge_bottles,
            shown_bottles,
        }
    }
}

/// Producer, vintage, varietal; absent values sort after present ones.
fn detail_order(holding: &Holding) -> impl Ord + '_ {
    let record = &holding.record;
    (
        record.producer.is_none(),
        record.producer.as_deref(),
        record.vintage.is_none(),
        record.vintage,
        record.varietal.is_none(),
        record.varietal.as_deref(),
    )
}

/// Result of one query pass.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub rows: Vec<Holding>,
    pub bottles: u64,
    pub summaries: Vec<Summary>,
}

impl QueryResult {
    pub fn record_count(&self) -> usize {
        self.rows.len()
    }

    pub fn summary(&self, group_by: GroupBy) -> Option<&Summary> {
        self.summaries
            .iter()
            .find(|summary| summary.group_by == group_by)
    }
}

/// Fridge-by-shelf drill-down view.
#[derive(Debug, Clone, PartialEq)]
pub struct FridgePanel {
    pub fridges: Vec<String>,
    pub summary: Summary,
    /// Shelves available under the current fridge choice.
    pub shelves: Vec<u32>,
    /// Rows on the chosen shelf (all shelves when none is chosen).
    pub details: Vec<Holding>,
    pub fridge_bottles: u64,
    pub shown_bottles: u64,
}
