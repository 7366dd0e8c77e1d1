//! Transform stage: turn the latest ingest result into a validated post
//! thread via the text-generation backend.
//!
//! The generation model is asked for a bare JSON array but does not always
//! comply, so the response goes through a defensive parse: strip markdown
//! fences, tolerate double-encoded JSON, coerce a lone object into a
//! one-element sequence, and drop elements without a `content` key. A
//! response that still fails to decode is a [`Error::Parse`] that
//! propagates — a malformed generation is unrecoverable without a retry,
//! and no retry exists.

use std::collections::HashSet;

use tracing::{debug, info, instrument, warn};

use crate::backends::Generate;
use crate::cache::{CacheFormat, CacheStore};
use crate::error::{Error, Result};
use crate::models::{IngestResult, Post, PostThread};
use crate::stages::ingest::INGEST_CACHE_DIR;
use crate::utils::truncate_for_log;

/// Cache directory for generated post threads (flattened item lists).
pub const TRANSFORM_CACHE_DIR: &str = "transform_cache";

/// Build the generation prompt embedding the content and topic list.
pub fn build_prompt(content: &str, topics: &[String]) -> String {
    let topics_str = if topics.is_empty() {
        "general tech news".to_string()
    } else {
        topics.join(", ")
    };
    let hashtag_pool = if topics.is_empty() {
        "#tech #news".to_string()
    } else {
        topics.join(", ")
    };

    format!(
        r#"You are an expert social media manager creating engaging Twitter threads about {topics_str}.

Here's the content to create tweets from:
---
{content}
---

Create a Twitter thread (1-3 tweets) that is engaging and informative. The first tweet should indicate that this is a thread and be attractive enough to make the reader want to read the rest of the thread. Follow these rules:
1. Each tweet must be under 280 characters
2. Include relevant hashtags from: {hashtag_pool}
3. Make it engaging and conversational
4. If multiple tweets, make them flow naturally in a thread
5. Don't include tweet numbers (1/2, 2/2, etc.)
6. Return ONLY a JSON array of tweet objects, like this:

[
    {{
        "content": "Your first tweet here...",
        "char_count": 123
    }},
    {{
        "content": "Your second tweet here...",
        "char_count": 123
    }}
]

IMPORTANT:
- Only return the raw JSON array, without any markdown code blocks or additional text
- Do not wrap the response in ```json or any other markdown
- The response should start with [ and end with ]
- No additional text before or after the JSON array"#
    )
}

/// Strip a leading markdown code fence (```json or ```) and its closing
/// fence if present.
pub(crate) fn clean_response(response: &str) -> String {
    let cleaned = if let Some(pos) = response.find("```json") {
        let start = pos + "```json".len();
        let end = response
            .rfind("```")
            .filter(|&end| end >= start)
            .unwrap_or(response.len());
        &response[start..end]
    } else if let Some(pos) = response.find("```") {
        let start = pos + "```".len();
        let end = response
            .rfind("```")
            .filter(|&end| end >= start)
            .unwrap_or(response.len());
        &response[start..end]
    } else {
        response
    };
    cleaned.trim().to_string()
}

/// Append each topic not already present as a hashtag, in input order.
///
/// Existing hashtags are detected by scanning whitespace-separated tokens
/// case-insensitively, so augmenting an already-augmented post is a no-op.
fn augment_hashtags(content: &str, topics: &[String]) -> String {
    let existing: HashSet<String> = content
        .split_whitespace()
        .filter(|word| word.starts_with('#'))
        .map(|word| word.to_lowercase())
        .collect();

    let mut augmented = content.to_string();
    for topic in topics {
        let topic = topic.trim_start_matches('#');
        if topic.is_empty() {
            continue;
        }
        if !existing.contains(&format!("#{}", topic.to_lowercase())) {
            augmented.push_str(&format!(" #{topic}"));
        }
    }
    augmented.trim().to_string()
}

/// Parse a generation response into a [`PostThread`].
///
/// Fence stripping, double-encoding tolerance, and single-object coercion
/// are applied in that order; JSON decode failure at any step propagates as
/// [`Error::Parse`].
pub fn parse_thread(response: &str, topics: &[String]) -> Result<PostThread> {
    let cleaned = clean_response(response);

    let mut value: serde_json::Value =
        serde_json::from_str(&cleaned).map_err(|e| Error::Parse(e.to_string()))?;

    // Some model revisions return a JSON string containing JSON.
    if let serde_json::Value::String(inner) = value {
        value = serde_json::from_str(&inner).map_err(|e| Error::Parse(e.to_string()))?;
    }

    let elements = match value {
        serde_json::Value::Array(items) => items,
        other => vec![other],
    };

    let mut posts = Vec::new();
    for element in elements {
        let Some(object) = element.as_object() else {
            continue;
        };
        let Some(content) = object.get("content").and_then(|c| c.as_str()) else {
            continue;
        };

        let content = augment_hashtags(content, topics);
        // A count supplied by the model is trusted; only compute one when
        // it is absent.
        let char_count = match object.get("char_count").and_then(|c| c.as_u64()) {
            Some(count) => count as usize,
            None => content.chars().count(),
        };
        posts.push(Post {
            content,
            char_count,
        });
    }

    Ok(PostThread::new(posts))
}

/// Step 2: transform the latest ingest cache entry into a post thread.
///
/// Fails with [`Error::EmptyContent`] before touching the generation
/// backend if the ingest entry carries no text.
#[instrument(level = "info", skip_all)]
pub async fn transform<G: Generate>(generator: &G, cache: &CacheStore) -> Result<PostThread> {
    info!("Starting data transformation");

    let cache_file = cache.latest(INGEST_CACHE_DIR, CacheFormat::Json).await?;
    info!(path = %cache_file.display(), "Using ingest cache file");

    let body = tokio::fs::read_to_string(&cache_file).await?;
    let ingested: IngestResult = serde_json::from_str(&body)
        .map_err(|e| Error::Format(format!("ingest cache entry is not a mapping: {e}")))?;

    if ingested.is_empty() {
        return Err(Error::EmptyContent);
    }

    let topics: Vec<String> = ingested
        .topics
        .iter()
        .filter(|t| !t.trim().is_empty())
        .cloned()
        .collect();

    let prompt = build_prompt(ingested.full_content.trim(), &topics);
    let response = generator.generate(&prompt).await?;
    debug!(
        preview = %truncate_for_log(&response, 300),
        "Generation backend responded"
    );

    let thread = parse_thread(&response, &topics)?;
    info!(
        count = thread.items.len(),
        is_thread = thread.is_thread,
        "Transformed content into posts"
    );
    if let Some(first) = thread.first() {
        debug!(preview = %truncate_for_log(&first.content, 120), "Opening post");
    }
    if !thread.is_valid() {
        warn!("Generated thread violates the platform length limit");
    }

    // The in-memory thread is the stage result; losing the cache copy only
    // costs the post stage its input, which the caller may not even run.
    match cache.write_json(TRANSFORM_CACHE_DIR, &thread.items).await {
        Ok(path) => info!(path = %path.display(), "Saved transform results"),
        Err(e) => warn!(error = %e, "Failed to save transform cache"),
    }

    Ok(thread)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubGenerator(String);

    impl Generate for StubGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    struct UnreachableGenerator;

    impl Generate for UnreachableGenerator {
        async fn generate(&self, _prompt: &str) -> Result<String> {
            panic!("generation backend must not be invoked");
        }
    }

    fn topics(list: &[&str]) -> Vec<String> {
        list.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_clean_response_strips_json_fence() {
        let fenced = "```json\n[{\"content\": \"hi\"}]\n```";
        assert_eq!(clean_response(fenced), "[{\"content\": \"hi\"}]");
    }

    #[test]
    fn test_clean_response_strips_bare_fence() {
        let fenced = "```\n[1, 2]\n```";
        assert_eq!(clean_response(fenced), "[1, 2]");
    }

    #[test]
    fn test_clean_response_without_fence_is_trimmed_identity() {
        assert_eq!(clean_response("  [1]  "), "[1]");
    }

    #[test]
    fn test_clean_response_unclosed_fence_takes_rest() {
        assert_eq!(clean_response("```json\n[1]"), "[1]");
    }

    #[test]
    fn test_parse_fenced_equals_unfenced() {
        let inner = r#"[{"content": "A post", "char_count": 6}]"#;
        let fenced = format!("```json\n{inner}\n```");

        let from_fenced = parse_thread(&fenced, &[]).unwrap();
        let from_inner = parse_thread(inner, &[]).unwrap();
        assert_eq!(from_fenced, from_inner);
    }

    #[test]
    fn test_parse_double_encoded_response() {
        let inner = r#"[{"content": "A post"}]"#;
        let double = serde_json::to_string(inner).unwrap();

        let thread = parse_thread(&double, &[]).unwrap();
        assert_eq!(thread.items.len(), 1);
        assert_eq!(thread.items[0].content, "A post");
    }

    #[test]
    fn test_parse_single_object_coerced_to_thread_of_one() {
        let thread = parse_thread(r#"{"content": "Solo"}"#, &[]).unwrap();
        assert_eq!(thread.items.len(), 1);
        assert!(!thread.is_thread);
    }

    #[test]
    fn test_parse_skips_elements_without_content() {
        let thread = parse_thread(
            r#"[{"content": "kept"}, {"char_count": 3}, "loose string", 42]"#,
            &[],
        )
        .unwrap();
        assert_eq!(thread.items.len(), 1);
        assert_eq!(thread.items[0].content, "kept");
    }

    #[test]
    fn test_parse_invalid_json_is_parse_error() {
        let err = parse_thread("absolutely not json", &[]).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_hashtag_augmentation_appends_missing_topics() {
        let augmented = augment_hashtags("Big release today", &topics(&["ai", "rust"]));
        assert_eq!(augmented, "Big release today #ai #rust");
    }

    #[test]
    fn test_hashtag_augmentation_is_idempotent() {
        let list = topics(&["ai", "rust"]);
        let once = augment_hashtags("Big release today", &list);
        let twice = augment_hashtags(&once, &list);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_hashtag_augmentation_case_insensitive_detection() {
        let augmented = augment_hashtags("Already tagged #AI here", &topics(&["ai"]));
        assert_eq!(augmented, "Already tagged #AI here");
    }

    #[test]
    fn test_hashtag_augmentation_strips_leading_hash_from_topics() {
        let augmented = augment_hashtags("Plain text", &topics(&["#ai"]));
        assert_eq!(augmented, "Plain text #ai");
    }

    #[test]
    fn test_supplied_char_count_is_trusted() {
        let thread = parse_thread(r#"[{"content": "hello", "char_count": 123}]"#, &[]).unwrap();
        assert_eq!(thread.items[0].char_count, 123);
    }

    #[test]
    fn test_missing_char_count_is_computed_after_augmentation() {
        let thread = parse_thread(r#"[{"content": "hello"}]"#, &topics(&["ai"])).unwrap();
        let expected = "hello #ai";
        assert_eq!(thread.items[0].content, expected);
        assert_eq!(thread.items[0].char_count, expected.chars().count());
    }

    #[tokio::test]
    async fn test_transform_end_to_end_with_stub_generator() {
        let tmp = tempfile::tempdir().unwrap();
        let store = CacheStore::new(tmp.path());
        store
            .write_json(
                INGEST_CACHE_DIR,
                &serde_json::json!({"full_content": "X launches new API", "topics": ["ai"]}),
            )
            .await
            .unwrap();

        let generator = StubGenerator(r#"[{"content": "X launches new API"}]"#.to_string());
        let thread = transform(&generator, &store).await.unwrap();

        assert_eq!(thread.items.len(), 1);
        assert!(!thread.is_thread);
        let expected = "X launches new API #ai";
        assert_eq!(thread.items[0].content, expected);
        assert_eq!(thread.items[0].char_count, expected.chars().count());

        // The flattened item list lands in the transform cache.
        let cached = store
            .latest(TRANSFORM_CACHE_DIR, CacheFormat::Json)
            .await
            .unwrap();
        let items: Vec<Post> =
            serde_json::from_str(&std::fs::read_to_string(cached).unwrap()).unwrap();
        assert_eq!(items, thread.items);
    }

    #[tokio::test]
    async fn test_transform_empty_content_fails_before_generation() {
        let tmp = tempfile::tempdir().unwrap();
        let store = CacheStore::new(tmp.path());
        store
            .write_json(INGEST_CACHE_DIR, &serde_json::json!({"full_content": ""}))
            .await
            .unwrap();

        let err = transform(&UnreachableGenerator, &store).await.unwrap_err();
        assert!(matches!(err, Error::EmptyContent));
    }

    #[tokio::test]
    async fn test_transform_missing_cache_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let store = CacheStore::new(tmp.path());

        let err = transform(&UnreachableGenerator, &store).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_transform_non_mapping_cache_is_format_error() {
        let tmp = tempfile::tempdir().unwrap();
        let store = CacheStore::new(tmp.path());
        store
            .write_json(INGEST_CACHE_DIR, &serde_json::json!(["not", "a", "mapping"]))
            .await
            .unwrap();

        let err = transform(&UnreachableGenerator, &store).await.unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[tokio::test]
    async fn test_transform_propagates_parse_error() {
        let tmp = tempfile::tempdir().unwrap();
        let store = CacheStore::new(tmp.path());
        store
            .write_json(
                INGEST_CACHE_DIR,
                &serde_json::json!({"full_content": "Something happened"}),
            )
            .await
            .unwrap();

        let generator = StubGenerator("the model rambled instead of returning JSON".to_string());
        let err = transform(&generator, &store).await.unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_build_prompt_embeds_content_and_topics() {
        let prompt = build_prompt("Big story", &topics(&["ai", "rust"]));
        assert!(prompt.contains("Big story"));
        assert!(prompt.contains("ai, rust"));
    }

    #[test]
    fn test_build_prompt_defaults_without_topics() {
        let prompt = build_prompt("Big story", &[]);
        assert!(prompt.contains("general tech news"));
        assert!(prompt.contains("#tech #news"));
    }
}
