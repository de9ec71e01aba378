//! Ratatui front-end for Cellar Explorer. The UI owns nothing but the current
//! filter selection and view state; every keypress that touches a filter runs
//! one synchronous query pass against the session snapshot.

mod app;
mod fields;
mod helpers;
mod picker;
mod terminal;

pub use app::App;
pub use terminal::run_app;
