#![deny(
    missing_debug_implementations,
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
//! `BoxFind` - Streaming nearby-point search over large delimited coordinate files.

use std::path::{Path, PathBuf};

use boxfind::alloc::PeakAllocator;
use boxfind::controller::{SearchOutcome, Session};
use boxfind::error::{Error, Result};
use boxfind::history::History;
use boxfind::query::parse_lag;
use boxfind::types::{DEFAULT_LAG, Point, QueryWindow, SearchResult};
use clap::{Parser, Subcommand};
use clap_cargo::style::CLAP_STYLING;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, warn};

#[global_allocator]
static ALLOCATOR: PeakAllocator = PeakAllocator::new();

/// CLI arguments for `BoxFind`
#[derive(Parser, Debug)]
#[command(author, version, about, styles = CLAP_STYLING)]
struct Cli {
    /// Search history file
    #[arg(long, env = "BOXFIND_HISTORY", global = true)]
    history_file: Option<PathBuf>,
    #[command(subcommand)]
    command:      Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Command {
    /// Validate a file and show its coordinate columns and first rows
    Open {
        /// CSV file with a header row
        file: PathBuf,
    },
    /// Find rows within a cube around a point
    Search {
        /// CSV file with a header row
        file:  PathBuf,
        /// Center point as three numbers: "x y z"
        #[arg(allow_hyphen_values = true)]
        query: String,
        /// Tolerance applied to each axis [default: 100]
        #[arg(short, long)]
        lag:   Option<String>,
    },
    /// List recent successful queries
    History,
}

/// Default location of the history file
fn default_history_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("boxfind").join("history.toml"))
}

fn print_row(row: &[String]) {
    println!("{}", row.join(" | "));
}

fn print_result(result: &SearchResult) {
    if !result.found() {
        println!("\nNo rows found near the query point.");
        println!("Tips:");
        println!("  - Try a larger --lag");
        println!("  - Check that the query uses the same units as the file");
        return;
    }

    println!("\nFound {} matches:", result.rows.len());
    for row in result.iter_rows() {
        print_row(row);
    }
}

/// Validate a file and print its summary
fn open_file(path: &Path) -> Result<()> {
    let mut session = Session::new();
    let opened = session.open(path)?;

    println!("File: {}", opened.path.display());
    println!("- Columns: {}", opened.header.join(", "));
    println!("- Coordinates: {}", opened.encoding);
    println!("- Lines: {}", opened.total_lines);
    println!("\nFirst {} rows:", opened.preview.len());
    print_row(&opened.header);
    for row in &opened.preview {
        print_row(row);
    }
    Ok(())
}

/// Remember a query that found matches
fn record_history(history_file: Option<&Path>, query: &str, file: &Path) -> Result<()> {
    let Some(path) = history_file.map(Path::to_path_buf).or_else(default_history_path) else {
        debug!("No history location available; query not recorded");
        return Ok(());
    };

    let mut history = History::load(&path)?;
    history.record_search(query);
    history.remember_file(file);
    history.save(&path)
}

/// Search a file for rows near a point
fn search_file(
    path: &Path,
    query: &str,
    lag: Option<&str>,
    history_file: Option<&Path>,
) -> Result<()> {
    let center: Point = query.parse()?;
    let lag = lag.map_or(Ok(DEFAULT_LAG), parse_lag)?;

    let mut session = Session::new();
    let total_lines = session.open(path)?.total_lines;
    println!("Searching {} ({total_lines} lines) near {query} with lag {lag}", path.display());

    ALLOCATOR.reset_peak();
    let token = session.start_search(QueryWindow::new(center, lag))?.token();
    if let Err(e) = ctrlc::set_handler(move || token.set()) {
        warn!("Ctrl-C will not cancel the search: {e}");
    }

    let bar = ProgressBar::new(100);
    bar.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>3}%")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    let outcome = session
        .finish_search(|percent| bar.set_position(u64::from(percent)))
        .unwrap_or(SearchOutcome::Cancelled);
    bar.finish_and_clear();

    match outcome {
        SearchOutcome::Completed(result) => {
            print_result(&result);
            if result.found() {
                if let Err(e) = record_history(history_file, query, path) {
                    warn!("{e}");
                }
            }
        },
        SearchOutcome::Failed(e) => return Err(e),
        SearchOutcome::Cancelled => println!("\nSearch cancelled."),
    }

    println!("- Peak memory usage: {} bytes", ALLOCATOR.peak());
    Ok(())
}

/// Print stored queries, most recent first
fn show_history(history_file: Option<&Path>) -> Result<()> {
    let path = history_file
        .map(Path::to_path_buf)
        .or_else(default_history_path)
        .ok_or_else(|| Error::history("no configuration directory; pass --history-file"))?;

    let history = History::load(&path)?;
    if let Some(dir) = &history.last_directory {
        println!("Last directory: {}", dir.display());
    }
    if history.searches.is_empty() {
        println!("No searches recorded.");
    }
    for query in &history.searches {
        println!("{query}");
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let history_file = cli.history_file.as_deref();

    let result = match &cli.command {
        Command::Open { file } => open_file(file),
        Command::Search { file, query, lag } => {
            search_file(file, query, lag.as_deref(), history_file)
        },
        Command::History => show_history(history_file),
    };

    if let Err(e) = result {
        eprintln!("{}", e.user_message());
        std::process::exit(1);
    }
}
