//! Pipeline orchestrator: ingest → transform → post.
//!
//! Runs the full sequence or any single named stage. Stage failures are
//! wrapped in [`Error::Pipeline`](crate::error::Error::Pipeline) naming the
//! failing stage and re-raised.
//! There is no rollback: each stage's cache writes are already durable, so
//! recovering from a failure means re-running from the failed stage and
//! letting the latest-entry lookups pick up the last successful output.
//!
//! The browser session is constructed at the start of a run and released
//! after it; backends a selected stage set doesn't need are never built, so
//! `run --stage ingest` works without a generation API key.

use clap::ValueEnum;
use tracing::{info, instrument, warn};

use crate::backends::browser::{BrowserOptions, BrowserSession};
use crate::backends::gemini::GeminiClient;
use crate::backends::IngestTarget;
use crate::cache::CacheStore;
use crate::error::Result;
use crate::stages;
use crate::utils::ensure_writable_dir;

/// A named pipeline stage, as selected by `run --stage`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Stage {
    Ingest,
    Transform,
    Post,
}

impl Stage {
    /// Stage name as used in logs and pipeline errors.
    pub fn name(self) -> &'static str {
        match self {
            Stage::Ingest => "ingest",
            Stage::Transform => "transform",
            Stage::Post => "post",
        }
    }

    /// Whether this stage runs under the given selection (no selection
    /// means every stage runs).
    fn selected(self, selection: Option<Stage>) -> bool {
        selection.is_none() || selection == Some(self)
    }
}

/// Run the pipeline, or a single stage of it, against the cache root.
#[instrument(level = "info", skip_all, fields(?stage))]
pub async fn run(cache_root: &str, stage: Option<Stage>) -> Result<()> {
    ensure_writable_dir(cache_root).await?;
    let cache = CacheStore::new(cache_root);

    let session = BrowserSession::open(BrowserOptions::from_env())?;
    let result = run_stages(&cache, &session, stage).await;
    session.close();
    result
}

async fn run_stages(
    cache: &CacheStore,
    session: &BrowserSession,
    stage: Option<Stage>,
) -> Result<()> {
    if Stage::Ingest.selected(stage) {
        info!("Starting ingest stage");
        stages::ingest(session, cache, &IngestTarget::default())
            .await
            .map_err(|e| e.in_stage(Stage::Ingest.name()))?;
    } else {
        info!("Skipping ingest stage");
    }

    if Stage::Transform.selected(stage) {
        info!("Starting transform stage");
        let generator = GeminiClient::from_env()
            .map_err(|e| e.in_stage(Stage::Transform.name()))?;
        stages::transform(&generator, cache)
            .await
            .map_err(|e| e.in_stage(Stage::Transform.name()))?;
    } else {
        info!("Skipping transform stage");
    }

    if Stage::Post.selected(stage) {
        info!("Starting post stage");
        let outcome = stages::post(session, cache)
            .await
            .map_err(|e| e.in_stage(Stage::Post.name()))?;
        if outcome.is_success() {
            info!(message = %outcome.message, "Post stage finished");
        } else {
            warn!(message = %outcome.message, "Post stage reported an error outcome");
        }
    } else {
        info!("Skipping post stage");
    }

    match stage {
        None => info!("All pipeline stages completed"),
        Some(stage) => info!(stage = stage.name(), "Stage completed"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_selection() {
        assert!(Stage::Ingest.selected(None));
        assert!(Stage::Ingest.selected(Some(Stage::Ingest)));
        assert!(!Stage::Ingest.selected(Some(Stage::Post)));
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::Ingest.name(), "ingest");
        assert_eq!(Stage::Transform.name(), "transform");
        assert_eq!(Stage::Post.name(), "post");
    }
}
