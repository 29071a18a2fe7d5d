//! ReviewLens CLI: terminal front end for the review sentiment dashboard.
//!
//! Uploads datasets to the classification service, renders the summary
//! charts, browses and corrects the review table, exports CSV and scores the
//! predictions against a golden dataset.

mod commands;
mod render;

use clap::Parser;
use reviewlens_core::{ReviewId, Sentiment};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// ReviewLens: sentiment dashboard for customer reviews
#[derive(Parser, Debug)]
#[command(name = "reviewlens", version, about, long_about = None)]
struct Cli {
    /// Workspace directory (looked up for `.reviewlens/config.toml`)
    #[arg(short, long, default_value = ".", global = true)]
    workspace: PathBuf,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL, overrides configuration
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Upload a dataset (.csv, .xls, .xlsx) and show the analysis
    Analyze {
        /// Dataset file
        file: PathBuf,
        /// Save the analysis as JSON for later commands
        #[arg(short, long)]
        save: Option<PathBuf>,
        /// Also write the CSV export
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Print the raw analysis JSON instead of the summary
        #[arg(long)]
        json: bool,
    },
    /// Search and filter the reviews of a saved analysis
    Table {
        /// Saved analysis JSON
        result: PathBuf,
        /// Case-insensitive text search
        #[arg(short = 'Q', long)]
        query: Option<String>,
        /// Sentiment facet (repeatable)
        #[arg(short, long = "sentiment")]
        sentiments: Vec<Sentiment>,
        /// Source facet (repeatable)
        #[arg(long = "source")]
        sources: Vec<String>,
        /// Number of pages to reveal
        #[arg(short, long, default_value_t = 1)]
        pages: usize,
    },
    /// Correct the sentiment of one review in a saved analysis
    Edit {
        /// Saved analysis JSON (rewritten in place)
        result: PathBuf,
        /// Review id
        #[arg(long)]
        id: ReviewId,
        /// New sentiment
        #[arg(long)]
        sentiment: Sentiment,
    },
    /// Export a saved analysis as CSV
    Export {
        /// Saved analysis JSON
        result: PathBuf,
        /// Output file
        #[arg(short, long, default_value = "result.csv")]
        output: PathBuf,
    },
    /// Score a saved analysis against a golden dataset (macro-F1)
    Validate {
        /// Saved analysis JSON
        result: PathBuf,
        /// Human-labelled dataset with a `sentiment`/`target` column
        golden: PathBuf,
        /// Print the raw metrics JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Write a default `.reviewlens/config.toml` in the workspace
    Init,
    /// Show the merged configuration
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    let log_dir = reviewlens_core::config::log_dir();
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "reviewlens.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    commands::handle_command(cli, &workspace).await
}
