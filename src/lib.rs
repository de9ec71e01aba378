//! Core library surface for the Cellar Explorer TUI application.
//!
//! The engine modules (reconcile, derive, filter, summary) are pure functions
//! over immutable snapshots; `source` and `export` handle the tabular I/O on
//! either side of them, and `ui` is the terminal front-end.
pub mod config;
pub mod derive;
pub mod error;
pub mod export;
pub mod filter;
pub mod models;
pub mod reconcile;
pub mod session;
pub mod source;
pub mod summary;
pub mod ui;

pub use config::Config;
pub use error::CellarError;
pub use filter::{apply_filters, FilterConfig, FilterOptions, Selection};
pub use models::{BottleRecord, ChangeLogEntry, Decade, Holding, RecordId};
pub use reconcile::{reconcile, Reconciliation};
pub use session::{FridgePanel, QueryResult, Snapshot};
pub use summary::{summarize, GroupBy, Summary};

/// The interactive application entry point and state container.
pub use ui::{run_app, App};
