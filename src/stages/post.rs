//! Post stage: drive the posting backend through the compose flow for the
//! latest generated thread.
//!
//! The stage validates everything it can before any navigation happens:
//! the transform cache entry must be a sequence of post mappings and both
//! credential values must be present in the environment. Those failures
//! are typed errors. A failure from the publisher itself is expected
//! (login walls, layout drift) and is reported as an error-status
//! [`PostOutcome`] instead of propagating.

use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::backends::{NavigationScript, Publish};
use crate::cache::{CacheFormat, CacheStore};
use crate::error::{Error, Result};
use crate::models::PostOutcome;
use crate::stages::transform::TRANSFORM_CACHE_DIR;

/// Login credentials for the posting platform.
#[derive(Debug, Clone)]
pub struct PostCredentials {
    pub email: String,
    pub password: String,
}

impl PostCredentials {
    /// Read `TWITTER_EMAIL` / `TWITTER_PASSWORD`, failing with a config
    /// error naming the first missing variable.
    pub fn from_env() -> Result<Self> {
        let email = std::env::var("TWITTER_EMAIL")
            .ok()
            .filter(|v| !v.is_empty())
            .ok_or(Error::Config("TWITTER_EMAIL"))?;
        let password = std::env::var("TWITTER_PASSWORD")
            .ok()
            .filter(|v| !v.is_empty())
            .ok_or(Error::Config("TWITTER_PASSWORD"))?;
        Ok(Self { email, password })
    }
}

/// Decode a transform cache entry into the post contents, in order.
///
/// Fails with [`Error::Format`] unless the entry is a sequence of mappings
/// that each carry a `content` string.
fn parse_cached_items(body: &str) -> Result<Vec<String>> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| Error::Format(format!("transform cache entry is not JSON: {e}")))?;

    let Value::Array(elements) = value else {
        return Err(Error::Format(
            "expected a list of post mappings".to_string(),
        ));
    };

    let mut contents = Vec::with_capacity(elements.len());
    for element in &elements {
        let content = element
            .as_object()
            .and_then(|obj| obj.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| Error::Format("expected a list of post mappings".to_string()))?;
        contents.push(content.to_string());
    }
    Ok(contents)
}

/// Numbered compose instructions, one type-step per thread item.
fn compose_instructions(contents: &[String]) -> Vec<String> {
    let Some(first) = contents.first() else {
        return Vec::new();
    };

    let mut instructions = vec![format!("11. Find the tweet input field and type: {first}")];
    for (i, content) in contents.iter().enumerate().skip(1) {
        let i = i + 1; // instruction numbering is 1-based from the second item
        instructions.push(format!(
            "{}. Click the 'Add' button to add another tweet",
            10 + i * 2 - 1
        ));
        instructions.push(format!("{}. Type in the next tweet: {content}", 10 + i * 2));
    }
    instructions
}

/// Build the full navigation script: login phase, compose navigation, one
/// type-step per item, and the standing cautions. The final submit is
/// deliberately absent.
fn build_script(credentials: &PostCredentials, contents: &[String]) -> NavigationScript {
    let mut steps = vec![
        "1. Go to https://x.com/i/flow/login?redirect_after_login=%2Fhome".to_string(),
        "2. Wait for the login page to load completely".to_string(),
        format!(
            "3. Find the email input field and enter the email: {}",
            credentials.email
        ),
        "4. Click the 'Next' button".to_string(),
        "5. Wait for the password input field to appear".to_string(),
        format!(
            "6. Find the password input field and enter the password: {}",
            credentials.password
        ),
        "7. Click the 'Log in' button".to_string(),
        "8. Wait for the home timeline to load".to_string(),
        "9. Go to https://x.com/compose/post".to_string(),
        "10. Wait for the compose dialog to appear".to_string(),
    ];
    steps.extend(compose_instructions(contents));
    steps.push("If already logged in, just verify you're on the home timeline".to_string());
    steps.push("If any security checks appear, wait for them to complete".to_string());
    steps.push("Do NOT click the 'Post' button".to_string());
    NavigationScript::new(steps)
}

/// Step 3: publish the latest generated thread.
///
/// Resolves credentials from the environment, then delegates to
/// [`post_with_credentials`].
#[instrument(level = "info", skip_all)]
pub async fn post<P: Publish>(publisher: &P, cache: &CacheStore) -> Result<PostOutcome> {
    let credentials = PostCredentials::from_env()?;
    post_with_credentials(publisher, cache, &credentials).await
}

/// Publish the latest generated thread with explicit credentials.
#[instrument(level = "info", skip_all)]
pub async fn post_with_credentials<P: Publish>(
    publisher: &P,
    cache: &CacheStore,
    credentials: &PostCredentials,
) -> Result<PostOutcome> {
    info!("Starting post stage");

    let cache_file = cache.latest(TRANSFORM_CACHE_DIR, CacheFormat::Json).await?;
    info!(path = %cache_file.display(), "Using transform cache file");

    let body = tokio::fs::read_to_string(&cache_file).await?;
    let contents = parse_cached_items(&body)?;
    info!(count = contents.len(), "Found posts to publish");

    let script = build_script(credentials, &contents);
    match publisher.publish(&script).await {
        Ok(()) => Ok(PostOutcome::success(format!(
            "navigated compose flow for {} post(s)",
            contents.len()
        ))),
        Err(e) => {
            warn!(error = %e, "Publisher failed");
            Ok(PostOutcome::error(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn creds() -> PostCredentials {
        PostCredentials {
            email: "user@example.com".to_string(),
            password: "hunter2".to_string(),
        }
    }

    #[derive(Default)]
    struct RecordingPublisher {
        script: Mutex<Option<NavigationScript>>,
    }

    impl Publish for RecordingPublisher {
        async fn publish(&self, script: &NavigationScript) -> Result<()> {
            *self.script.lock().unwrap() = Some(script.clone());
            Ok(())
        }
    }

    struct FailingPublisher;

    impl Publish for FailingPublisher {
        async fn publish(&self, _script: &NavigationScript) -> Result<()> {
            Err(Error::Backend("compose dialog never appeared".to_string()))
        }
    }

    struct UnreachablePublisher;

    impl Publish for UnreachablePublisher {
        async fn publish(&self, _script: &NavigationScript) -> Result<()> {
            panic!("publisher must not be invoked");
        }
    }

    fn strings(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_compose_instructions_single_post() {
        let steps = compose_instructions(&strings(&["only post"]));
        assert_eq!(
            steps,
            vec!["11. Find the tweet input field and type: only post"]
        );
    }

    #[test]
    fn test_compose_instructions_thread_numbering() {
        let steps = compose_instructions(&strings(&["one", "two", "three"]));
        assert_eq!(
            steps,
            vec![
                "11. Find the tweet input field and type: one",
                "13. Click the 'Add' button to add another tweet",
                "14. Type in the next tweet: two",
                "15. Click the 'Add' button to add another tweet",
                "16. Type in the next tweet: three",
            ]
        );
    }

    #[test]
    fn test_compose_instructions_empty_thread() {
        assert!(compose_instructions(&[]).is_empty());
    }

    #[test]
    fn test_build_script_embeds_credentials_and_never_submits() {
        let script = build_script(&creds(), &strings(&["hello"]));
        let rendered = script.render();
        assert!(rendered.contains("user@example.com"));
        assert!(rendered.contains("hunter2"));
        assert!(rendered.contains("Do NOT click the 'Post' button"));
    }

    #[test]
    fn test_parse_cached_items_rejects_object() {
        let err = parse_cached_items(r#"{"content": "not a list"}"#).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn test_parse_cached_items_rejects_non_mapping_elements() {
        let err = parse_cached_items(r#"["just a string"]"#).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[tokio::test]
    async fn test_post_drives_publisher_with_thread_script() {
        let tmp = tempfile::tempdir().unwrap();
        let store = CacheStore::new(tmp.path());
        store
            .write_json(
                TRANSFORM_CACHE_DIR,
                &serde_json::json!([
                    {"content": "first post #ai", "char_count": 14},
                    {"content": "second post", "char_count": 11}
                ]),
            )
            .await
            .unwrap();

        let publisher = RecordingPublisher::default();
        let outcome = post_with_credentials(&publisher, &store, &creds())
            .await
            .unwrap();

        assert!(outcome.is_success());
        let script = publisher.script.lock().unwrap().clone().unwrap();
        let rendered = script.render();
        assert!(rendered.contains("11. Find the tweet input field and type: first post #ai"));
        assert!(rendered.contains("13. Click the 'Add' button to add another tweet"));
        assert!(rendered.contains("14. Type in the next tweet: second post"));
    }

    #[tokio::test]
    async fn test_post_object_cache_is_format_error_without_navigation() {
        let tmp = tempfile::tempdir().unwrap();
        let store = CacheStore::new(tmp.path());
        store
            .write_json(
                TRANSFORM_CACHE_DIR,
                &serde_json::json!({"items": [], "is_thread": false}),
            )
            .await
            .unwrap();

        let err = post_with_credentials(&UnreachablePublisher, &store, &creds())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[tokio::test]
    async fn test_post_missing_cache_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let store = CacheStore::new(tmp.path());

        let err = post_with_credentials(&UnreachablePublisher, &store, &creds())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_post_publisher_failure_is_error_outcome_not_error() {
        let tmp = tempfile::tempdir().unwrap();
        let store = CacheStore::new(tmp.path());
        store
            .write_json(
                TRANSFORM_CACHE_DIR,
                &serde_json::json!([{"content": "solo"}]),
            )
            .await
            .unwrap();

        let outcome = post_with_credentials(&FailingPublisher, &store, &creds())
            .await
            .unwrap();
        assert!(!outcome.is_success());
        assert!(outcome.message.contains("compose dialog"));
    }
}
