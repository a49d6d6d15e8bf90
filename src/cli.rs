//! Command-line interface definitions.
//!
//! The pipeline runs as one binary with a subcommand per stage. Stages are
//! deliberately separate one-shot runs sharing nothing but the flat JSON
//! files on disk, so a cron schedule can drive them independently:
//!
//! ```sh
//! npr_morning_brief scrape --news-count 10
//! npr_morning_brief clean
//! npr_morning_brief translate
//! npr_morning_brief publish
//! ```

use clap::{Parser, Subcommand};

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the environment configuration file (default: ./config.env)
    #[arg(short, long)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// One pipeline stage per subcommand.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scrape the Morning Edition archive into monthly JSON files
    Scrape {
        /// Number of segments to fetch (overrides NEWS_COUNT_DEFAULT)
        #[arg(short, long)]
        news_count: Option<usize>,
    },
    /// Deduplicate, filter, and validate the latest month of scraped records
    Clean,
    /// Translate cleaned records, falling back between providers
    Translate,
    /// Push translated records to the WordPress index page
    Publish {
        /// Skip the site content backup before updating
        #[arg(long)]
        skip_backup: bool,
    },
}
