//! # NPR Morning Brief
//!
//! A batch pipeline that scrapes daily news-brief segments from NPR's
//! Morning Edition archive, cleans and deduplicates the records, translates
//! them through DeepL or Azure with provider fallback, and publishes new
//! entries onto a WordPress index page.
//!
//! ## Usage
//!
//! ```sh
//! npr_morning_brief scrape --news-count 10
//! npr_morning_brief clean
//! npr_morning_brief translate
//! npr_morning_brief publish
//! ```
//!
//! ## Architecture
//!
//! Four loosely coupled stages sharing a JSON record model, each a one-shot
//! batch run over flat files:
//! 1. **Scrape**: archive page -> monthly `YYYYMM.json` files + MP3s
//! 2. **Clean**: latest monthly file -> cleaned/incomplete/duplicate
//!    partitions + word-frequency image
//! 3. **Translate**: cleaned file -> translated file, with speaker-label
//!    masking and provider fallback
//! 4. **Publish**: translated file -> idempotent WordPress page update

use clap::Parser;
use std::error::Error;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cleaner;
mod cli;
mod config;
mod models;
mod publish;
mod scraper;
mod translate;
mod utils;
mod wordcloud;

use cleaner::DataCleaner;
use cli::{Cli, Command};
use config::AppConfig;
use translate::NewsTranslator;

#[tokio::main]
async fn main() {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    let args = Cli::parse();

    let config = match AppConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    // No error escapes past this point: each stage is caught here, logged,
    // and turned into a non-zero exit.
    if let Err(e) = run_command(args.command, &config).await {
        error!(error = %e, "Stage failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    let elapsed = start_time.elapsed();
    info!(
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
}

async fn run_command(command: Command, config: &AppConfig) -> Result<(), Box<dyn Error>> {
    match command {
        Command::Scrape { news_count } => {
            info!("Starting scrape stage");
            scraper::run(&config.scraper(), news_count).await
        }
        Command::Clean => {
            info!("Starting clean stage");
            DataCleaner::new(config.cleaner()).run().await
        }
        Command::Translate => {
            info!("Starting translate stage");
            NewsTranslator::from_config(config.translator()?).run().await
        }
        Command::Publish { skip_backup } => {
            info!("Starting publish stage");
            publish::run(&config.publisher()?, skip_backup).await
        }
    }
}
