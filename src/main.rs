//! # subtopic CLI
//!
//! ## Usage
//!
//! ```bash
//! subtopic --config ./config/subtopic.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `subtopic fetch <subreddit>` | Fetch and normalize posts and comments |
//! | `subtopic analyze <subreddit>` | Fetch, cluster, and label topics with an LLM |
//! | `subtopic check` | Verify Reddit credentials |
//!
//! ## Examples
//!
//! ```bash
//! # Top posts of the month, 150 of them
//! subtopic analyze television --sort month --limit 150
//!
//! # Use the smaller model and keep the results
//! subtopic analyze politics --model deepseek-r1:1.5b --output runs/politics.json
//!
//! # Just the dataset, as JSON
//! subtopic fetch rust --sort new --limit 20 --json
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use subtopic::config;
use subtopic::logging;
use subtopic::pipeline;
use subtopic::progress::ProgressMode;

/// subtopic: discover the main topics being discussed in a subreddit.
///
/// Credentials are read from the `CLIENT_ID` and `API_KEY` environment
/// variables (or a `.env` file).
#[derive(Parser)]
#[command(
    name = "subtopic",
    about = "Discover the main topics being discussed in any subreddit",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Built-in defaults are used when
    /// the file does not exist.
    #[arg(long, global = true, default_value = "./config/subtopic.toml")]
    config: PathBuf,

    /// Enable debug logging.
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    /// Progress output on stderr. Defaults to `human` on a terminal.
    #[arg(long, global = true, value_enum)]
    progress: Option<ProgressMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch posts and their top comments without analysis.
    Fetch {
        /// Subreddit name (with or without `r/`).
        subreddit: String,

        /// Sort mode: `hot`, `new`, `week`, `month`, or `year`.
        #[arg(long)]
        sort: Option<String>,

        /// Number of posts to fetch.
        #[arg(long)]
        limit: Option<usize>,

        /// Print the dataset as JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Fetch posts, cluster them into topics, and label each topic.
    Analyze {
        /// Subreddit name (with or without `r/`).
        subreddit: String,

        /// Sort mode: `hot`, `new`, `week`, `month`, or `year`.
        #[arg(long)]
        sort: Option<String>,

        /// Number of posts to analyze.
        #[arg(long)]
        limit: Option<usize>,

        /// Chat model used for topic labels (overrides `[llm].model`).
        #[arg(long)]
        model: Option<String>,

        /// Write the enriched dataset and summaries to this JSON file.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Verify credentials by acquiring an API token.
    Check,
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_json);

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cfg = config::load_or_default(&cli.config)?;
    let progress = cli
        .progress
        .unwrap_or_else(ProgressMode::default_for_tty)
        .reporter();

    match cli.command {
        Commands::Fetch {
            subreddit,
            sort,
            limit,
            json,
        } => pipeline::run_fetch(
            &cfg,
            &subreddit,
            sort.as_deref(),
            limit,
            json,
            progress.as_ref(),
        ),
        Commands::Analyze {
            subreddit,
            sort,
            limit,
            model,
            output,
        } => pipeline::run_analyze(
            &cfg,
            &subreddit,
            sort.as_deref(),
            limit,
            model.as_deref(),
            output.as_deref(),
            progress.as_ref(),
        ),
        Commands::Check => pipeline::run_check(&cfg),
    }
}
