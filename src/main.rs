//! # Threadpress
//!
//! A content pipeline that scrapes a tech news article or a product
//! leaderboard, hands the extracted text to an LLM to draft social-media
//! post threads, caches every intermediate result as a timestamped file,
//! and drives a simulated posting flow.
//!
//! ## Usage
//!
//! ```sh
//! threadpress run
//! threadpress run --stage transform
//! threadpress producthunt --date 2025-08-07
//! ```
//!
//! ## Architecture
//!
//! Three stages wired strictly in sequence through a file cache:
//! 1. **Ingest**: acquire content from the target and cache the normalized
//!    result (`ingest_cache`, raw response in `raw_cache`)
//! 2. **Transform**: generate and defensively parse a post thread from the
//!    latest ingest entry (`transform_cache`)
//! 3. **Post**: walk the compose navigation script for the latest thread
//!
//! The `producthunt` command runs the product-listing variant: leaderboard
//! scrape, product extraction, per-product detail scrapes, and the leads
//! and threads workbooks.

use chrono::Local;
use clap::Parser;
use std::error::Error;
use tracing::{debug, info};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod backends;
mod cache;
mod cli;
mod error;
mod models;
mod pipeline;
mod producthunt;
mod stages;
mod utils;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
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
    info!("threadpress starting up");

    let args = Cli::parse();
    debug!(?args.cache_root, "Parsed CLI arguments");

    match args.command {
        Commands::Run { stage } => {
            pipeline::run(&args.cache_root, stage).await?;
        }
        Commands::Producthunt { date } => {
            let date = date.unwrap_or_else(|| Local::now().date_naive());
            info!(%date, "Starting product leaderboard flow");
            producthunt::run(&args.cache_root, date).await?;
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
