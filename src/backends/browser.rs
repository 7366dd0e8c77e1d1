//! Simulated browser session used for article acquisition and the stubbed
//! posting flow.
//!
//! A real deployment would hand these tasks to a browser-automation agent;
//! this session reproduces the agent's observable behavior with plain HTTP
//! fetches and HTML extraction, and walks posting scripts without ever
//! pressing the final submit. The session is constructed per pipeline run
//! and released afterwards — it is deliberately not a process-lifetime
//! singleton.

use std::time::Duration;

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde_json::json;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::{Acquire, IngestTarget, NavigationScript, Publish};
use crate::error::{Error, Result};
use crate::utils::env_flag;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("h1").unwrap());
static ARTICLE_PARAGRAPHS: Lazy<Selector> = Lazy::new(|| Selector::parse("article p").unwrap());
static ALL_PARAGRAPHS: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());
static KEYWORDS_META: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[name="keywords"]"#).unwrap());

/// Session construction options.
#[derive(Debug, Clone)]
pub struct BrowserOptions {
    /// Run without a visible window. Read from `HEADLESS`, default true.
    pub headless: bool,
}

impl BrowserOptions {
    /// Load options from the environment.
    pub fn from_env() -> Self {
        Self {
            headless: env_flag("HEADLESS", true),
        }
    }
}

/// A scoped browser session: acquired at the start of a pipeline run,
/// released after it.
#[derive(Debug)]
pub struct BrowserSession {
    http: reqwest::Client,
    headless: bool,
}

impl BrowserSession {
    /// Open a new session.
    pub fn open(options: BrowserOptions) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()?;
        info!(headless = options.headless, "Browser session opened");
        Ok(Self {
            http,
            headless: options.headless,
        })
    }

    /// Release the session.
    pub fn close(self) {
        info!("Browser session released");
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        let body = self.http.get(url).send().await?.text().await?;
        debug!(%url, bytes = body.len(), "Fetched page");
        Ok(body)
    }
}

impl Acquire for BrowserSession {
    /// Visit the index page, follow the first article link, and extract the
    /// article into the structured shape the ingest stage normalizes.
    #[instrument(level = "info", skip_all, fields(index = %target.index_url))]
    async fn fetch(&self, target: &IngestTarget) -> Result<String> {
        let index_html = self.get_text(&target.index_url).await?;
        let article_url = first_link(&index_html, &target.index_url, &target.article_selector)?;
        info!(%article_url, "Following first article link");

        let article_html = self.get_text(&article_url).await?;
        let article = extract_article(&article_html);
        if article.description.is_empty() {
            warn!(%article_url, "Article extraction produced no body text");
        }

        let raw = json!({
            "title": article.title,
            "description": article.description,
            "topics": article.topics,
        });
        Ok(raw.to_string())
    }
}

impl Publish for BrowserSession {
    /// Walk the navigation script, logging each step. The script never
    /// includes the final submit, so nothing is actually published.
    #[instrument(level = "info", skip_all, fields(steps = script.steps.len(), headless = self.headless))]
    async fn publish(&self, script: &NavigationScript) -> Result<()> {
        debug!(task = %script.render(), "Running navigation task");
        for step in &script.steps {
            info!(%step, "Navigation step");
        }
        info!("Navigation complete; stopped short of submission");
        Ok(())
    }
}

struct ExtractedArticle {
    title: String,
    description: String,
    topics: Vec<String>,
}

/// Resolve the first link matching `selector` on the page, relative to
/// `base_url`.
fn first_link(html: &str, base_url: &str, selector: &str) -> Result<String> {
    let link_selector = Selector::parse(selector)
        .map_err(|e| Error::Backend(format!("invalid article selector '{selector}': {e}")))?;
    let base = Url::parse(base_url).map_err(Error::backend)?;

    let document = Html::parse_document(html);
    for element in document.select(&link_selector) {
        if let Some(href) = element.value().attr("href") {
            if let Ok(resolved) = base.join(href) {
                return Ok(resolved.to_string());
            }
        }
    }
    Err(Error::Backend(format!(
        "no article link matched '{selector}' on {base_url}"
    )))
}

/// Pull title, body text, and keyword topics out of an article page.
fn extract_article(html: &str) -> ExtractedArticle {
    let document = Html::parse_document(html);

    let title = document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|e| e.text().collect::<Vec<_>>().join(" ").trim().to_string())
        .unwrap_or_default();

    let mut paragraphs: Vec<String> = document
        .select(&ARTICLE_PARAGRAPHS)
        .map(|e| e.text().collect::<Vec<_>>().join(" ").trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    if paragraphs.is_empty() {
        paragraphs = document
            .select(&ALL_PARAGRAPHS)
            .map(|e| e.text().collect::<Vec<_>>().join(" ").trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
    }

    let topics = document
        .select(&KEYWORDS_META)
        .next()
        .and_then(|e| e.value().attr("content"))
        .map(|content| {
            content
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect()
        })
        .unwrap_or_default();

    ExtractedArticle {
        title,
        description: paragraphs.join("\n"),
        topics,
    }
}
