//! Ingest stage: acquire content from the configured target and cache the
//! normalized result.
//!
//! The acquisition backend returns loosely structured JSON whose shape has
//! drifted across agent revisions. Rather than ad hoc conditionals, the
//! known shapes form a closed set of variants tried in a fixed priority
//! order — the declaration order of [`ResponseShape`] IS that order:
//!
//! | Priority | Shape                                    |
//! |----------|------------------------------------------|
//! | 1        | `{raw_content, topics, link}`            |
//! | 2        | `{title, description, topics or main_topics}` |
//! | 3        | `{most_upvoted_posts: [...]}`            |
//!
//! A backend failure or an unrecognized shape degrades to the empty
//! [`IngestResult`] sentinel with a logged warning; the original error type
//! never crosses the stage boundary. The raw response is persisted verbatim
//! to `raw_cache` before normalization so a bad mapping can be diagnosed
//! after the fact.

use itertools::Itertools;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::backends::{Acquire, IngestTarget};
use crate::cache::{CacheFormat, CacheStore};
use crate::error::Result;
use crate::models::IngestResult;
use crate::utils::truncate_for_log;

/// Cache directory for normalized ingest results.
pub const INGEST_CACHE_DIR: &str = "ingest_cache";
/// Cache directory for raw, un-normalized backend responses.
pub const RAW_CACHE_DIR: &str = "raw_cache";

/// The closed set of response shapes the acquisition backend may produce,
/// in matching priority order.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ResponseShape {
    Article {
        raw_content: String,
        #[serde(default)]
        topics: Vec<String>,
        #[serde(default)]
        link: Option<String>,
    },
    Summary {
        title: String,
        description: String,
        #[serde(default, alias = "main_topics")]
        topics: Vec<String>,
    },
    Upvoted {
        most_upvoted_posts: Vec<UpvotedPost>,
    },
}

#[derive(Debug, Deserialize)]
struct UpvotedPost {
    title: String,
    #[serde(default)]
    link: Option<String>,
}

/// Deduplicate topics case-insensitively, preserving first-seen order and
/// dropping blanks.
fn dedup_topics(topics: Vec<String>) -> Vec<String> {
    topics
        .into_iter()
        .filter(|t| !t.trim().is_empty())
        .unique_by(|t| t.to_lowercase())
        .collect()
}

/// Normalize a raw backend response into an [`IngestResult`], or `None` if
/// no known shape matches.
fn normalize(raw: &str) -> Option<IngestResult> {
    let shape: ResponseShape = serde_json::from_str(raw).ok()?;
    let result = match shape {
        ResponseShape::Article {
            raw_content,
            topics,
            link,
        } => IngestResult {
            full_content: raw_content,
            topics: dedup_topics(topics),
            links: link.into_iter().collect(),
        },
        ResponseShape::Summary {
            title,
            description,
            topics,
        } => {
            let full_content = [title, description]
                .iter()
                .filter(|part| !part.trim().is_empty())
                .join("\n\n");
            IngestResult {
                full_content,
                topics: dedup_topics(topics),
                links: Vec::new(),
            }
        }
        ResponseShape::Upvoted { most_upvoted_posts } => {
            let mut titles = Vec::new();
            let mut links = Vec::new();
            for post in most_upvoted_posts {
                titles.push(post.title);
                links.extend(post.link);
            }
            IngestResult {
                full_content: titles.join("\n"),
                topics: Vec::new(),
                links,
            }
        }
    };
    Some(result)
}

/// Step 1: acquire content from the target and cache the normalized result.
///
/// Never fails on a backend error; the empty sentinel is cached and
/// returned instead so downstream stages fail fast against a blank payload.
#[instrument(level = "info", skip_all)]
pub async fn ingest<A: Acquire>(
    backend: &A,
    cache: &CacheStore,
    target: &IngestTarget,
) -> Result<IngestResult> {
    info!(index = %target.index_url, "Fetching content");

    let raw = match backend.fetch(target).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(error = %e, "Acquisition backend failed; degrading to empty result");
            let sentinel = IngestResult::sentinel();
            persist(cache, &sentinel).await;
            return Ok(sentinel);
        }
    };

    // Raw response goes to disk before any interpretation of it.
    if let Err(e) = cache.write_text(RAW_CACHE_DIR, &raw, CacheFormat::Json).await {
        warn!(error = %e, "Failed to persist raw acquisition response");
    }

    let result = match normalize(&raw) {
        Some(result) => result,
        None => {
            warn!(
                preview = %truncate_for_log(&raw, 300),
                "Acquisition response matched no known shape; degrading to empty result"
            );
            IngestResult::sentinel()
        }
    };

    persist(cache, &result).await;
    info!(
        content_bytes = result.full_content.len(),
        topics = result.topics.len(),
        "Ingest complete"
    );
    Ok(result)
}

async fn persist(cache: &CacheStore, result: &IngestResult) {
    match cache.write_json(INGEST_CACHE_DIR, result).await {
        Ok(path) => info!(path = %path.display(), "Cached ingest result"),
        Err(e) => warn!(error = %e, "Failed to save ingest cache"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    struct StubAcquire(String);

    impl Acquire for StubAcquire {
        async fn fetch(&self, _target: &IngestTarget) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    struct FailingAcquire;

    impl Acquire for FailingAcquire {
        async fn fetch(&self, _target: &IngestTarget) -> Result<String> {
            Err(Error::Backend("agent crashed".to_string()))
        }
    }

    fn store() -> (tempfile::TempDir, CacheStore) {
        let tmp = tempfile::tempdir().unwrap();
        let store = CacheStore::new(tmp.path());
        (tmp, store)
    }

    #[test]
    fn test_normalize_article_shape() {
        let result = normalize(
            r#"{"raw_content": "Big news", "topics": ["ai", "AI", "rust"], "link": "https://example.com"}"#,
        )
        .unwrap();
        assert_eq!(result.full_content, "Big news");
        assert_eq!(result.topics, vec!["ai", "rust"]);
        assert_eq!(result.links, vec!["https://example.com"]);
    }

    #[test]
    fn test_normalize_summary_shape_with_alias() {
        let result = normalize(
            r#"{"title": "Launch", "description": "Details here", "main_topics": ["devtools"]}"#,
        )
        .unwrap();
        assert_eq!(result.full_content, "Launch\n\nDetails here");
        assert_eq!(result.topics, vec!["devtools"]);
        assert!(result.links.is_empty());
    }

    #[test]
    fn test_normalize_prefers_article_over_summary() {
        // Carries the fields of both shapes; priority order picks Article.
        let result = normalize(
            r#"{"raw_content": "body", "title": "Launch", "description": "Details"}"#,
        )
        .unwrap();
        assert_eq!(result.full_content, "body");
    }

    #[test]
    fn test_normalize_upvoted_shape() {
        let result = normalize(
            r#"{"most_upvoted_posts": [
                {"title": "First post", "link": "https://a"},
                {"title": "Second post"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(result.full_content, "First post\nSecond post");
        assert_eq!(result.links, vec!["https://a"]);
        assert!(result.topics.is_empty());
    }

    #[test]
    fn test_normalize_unknown_shape_is_none() {
        assert!(normalize(r#"{"something": "else"}"#).is_none());
        assert!(normalize("not json at all").is_none());
    }

    #[tokio::test]
    async fn test_ingest_caches_raw_and_normalized() {
        let (_tmp, store) = store();
        let backend = StubAcquire(
            r#"{"raw_content": "Big news", "topics": ["ai"], "link": "https://example.com"}"#
                .to_string(),
        );

        let result = ingest(&backend, &store, &IngestTarget::default())
            .await
            .unwrap();
        assert_eq!(result.full_content, "Big news");

        let raw = store.latest(RAW_CACHE_DIR, CacheFormat::Json).await.unwrap();
        let raw_body = std::fs::read_to_string(raw).unwrap();
        assert!(raw_body.contains("Big news"));

        let cached = store
            .latest(INGEST_CACHE_DIR, CacheFormat::Json)
            .await
            .unwrap();
        let cached: IngestResult =
            serde_json::from_str(&std::fs::read_to_string(cached).unwrap()).unwrap();
        assert_eq!(cached, result);
    }

    #[tokio::test]
    async fn test_ingest_backend_failure_degrades_to_sentinel() {
        let (_tmp, store) = store();

        let result = ingest(&FailingAcquire, &store, &IngestTarget::default())
            .await
            .unwrap();
        assert!(result.is_empty());

        // The sentinel is still cached so transform sees a fresh entry.
        let cached = store
            .latest(INGEST_CACHE_DIR, CacheFormat::Json)
            .await
            .unwrap();
        let cached: IngestResult =
            serde_json::from_str(&std::fs::read_to_string(cached).unwrap()).unwrap();
        assert!(cached.is_empty());

        // No raw response existed, so none was written.
        assert!(store.latest(RAW_CACHE_DIR, CacheFormat::Json).await.is_err());
    }

    #[tokio::test]
    async fn test_ingest_unknown_shape_degrades_but_keeps_raw() {
        let (_tmp, store) = store();
        let backend = StubAcquire(r#"{"something": "else"}"#.to_string());

        let result = ingest(&backend, &store, &IngestTarget::default())
            .await
            .unwrap();
        assert!(result.is_empty());
        assert!(store.latest(RAW_CACHE_DIR, CacheFormat::Json).await.is_ok());
    }
}
