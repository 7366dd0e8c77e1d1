//! Command-line interface definitions.
//!
//! A small command group: `run` executes the post pipeline (optionally a
//! single stage), `producthunt` runs the product-listing flow for a date.
//! Service endpoints and credentials come from the environment, not flags.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::pipeline::Stage;

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # Full pipeline: ingest -> transform -> post
/// threadpress run
///
/// # Re-run a single stage against the existing caches
/// threadpress run --stage transform
///
/// # Product leaderboard flow for a specific date
/// threadpress producthunt --date 2025-08-07
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Root directory holding the per-stage cache directories
    #[arg(long, default_value = ".")]
    pub cache_root: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the post pipeline, or a single stage of it
    Run {
        /// Run only this stage
        #[arg(long, value_enum)]
        stage: Option<Stage>,
    },

    /// Scrape the product leaderboard and export maker leads and threads
    Producthunt {
        /// Leaderboard date, YYYY-MM-DD (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_without_stage() {
        let cli = Cli::try_parse_from(["threadpress", "run"]).unwrap();
        match cli.command {
            Commands::Run { stage } => assert!(stage.is_none()),
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_run_with_stage() {
        let cli = Cli::try_parse_from(["threadpress", "run", "--stage", "transform"]).unwrap();
        match cli.command {
            Commands::Run { stage } => assert_eq!(stage, Some(Stage::Transform)),
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_run_rejects_unknown_stage() {
        assert!(Cli::try_parse_from(["threadpress", "run", "--stage", "deploy"]).is_err());
    }

    #[test]
    fn test_producthunt_with_date() {
        let cli =
            Cli::try_parse_from(["threadpress", "producthunt", "--date", "2025-08-07"]).unwrap();
        match cli.command {
            Commands::Producthunt { date } => {
                assert_eq!(date, NaiveDate::from_ymd_opt(2025, 8, 7));
            }
            _ => panic!("expected producthunt command"),
        }
    }

    #[test]
    fn test_cache_root_default() {
        let cli = Cli::try_parse_from(["threadpress", "run"]).unwrap();
        assert_eq!(cli.cache_root, ".");
    }
}
