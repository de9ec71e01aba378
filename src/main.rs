//! Binary entry point: resolve configuration, load the cellar snapshot, then
//! either drive the Ratatui event loop or run a one-shot headless command.
use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use cellar_explorer::config::{log_path, Config};
use cellar_explorer::export::{results_payload, write_export};
use cellar_explorer::{run_app, App, FilterConfig, Snapshot};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cellar-explorer", about = "Browse a wine cellar spreadsheet")]
struct Args {
    /// Configuration file (defaults to ~/.cellar-explorer/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Workbook to load: an http(s) export URL or a local .xlsx path
    #[arg(long)]
    source: Option<String>,

    /// SQLite database holding `library` and `change_log` tables
    #[arg(long, conflicts_with = "source")]
    sqlite: Option<PathBuf>,

    /// Write the unfiltered results to this .xlsx or .csv file and exit
    #[arg(long)]
    export: Option<PathBuf>,

    /// Print the summary tables to stdout and exit
    #[arg(long, default_value_t = false)]
    summary: bool,
}

impl Args {
    fn headless(&self) -> bool {
        self.export.is_some() || self.summary
    }

    fn apply_overrides(&self, config: &mut Config) {
        if let Some(source) = &self.source {
            config.source.sqlite = None;
            if source.starts_with("http://") || source.starts_with("https://") {
                config.source.url = Some(source.clone());
                config.source.path = None;
            } else {
                config.source.path = Some(PathBuf::from(source));
                config.source.url = None;
            }
        }
        if let Some(sqlite) = &self.sqlite {
            config.source.sqlite = Some(sqlite.clone());
        }
    }
}

fn init_logging(headless: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if headless {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        // The TUI owns the terminal, so interactive sessions log to a file.
        let file = File::create(log_path()?).context("failed to create log file")?;
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.headless())?;

    let mut config = Config::resolve(args.config.as_deref())?;
    args.apply_overrides(&mut config);

    let snapshot = Snapshot::load(&config)?;

    if args.headless() {
        let result = snapshot.query(&FilterConfig::reset());
        if let Some(path) = &args.export {
            let bytes = results_payload(path, &result.rows, &result.summaries)?;
            write_export(path, &bytes)?;
            info!(path = %path.display(), "exported results");
        }
        if args.summary {
            println!(
                "Results ({} records, {} bottles)",
                result.record_count(),
                result.bottles
            );
            for summary in &result.summaries {
                println!();
                println!("{}", summary.group_by.title());
                for row in &summary.rows {
                    println!("  {:<40} {:>6}", row.key.to_string(), row.bottles);
                }
            }
            if snapshot.excluded_rows() > 0 {
                eprintln!("{} row(s) excluded while loading", snapshot.excluded_rows());
            }
        }
        return Ok(());
    }

    let mut app = App::new(snapshot, config);
    run_app(&mut app)
}
