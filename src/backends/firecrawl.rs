//! Firecrawl scraping API client.
//!
//! Wraps the hosted scrape endpoint that turns a URL into markdown. The
//! endpoint is configured from the environment: `FIRECRAWL_API_URL` points
//! at a self-hosted instance; when it is unset the client falls back to the
//! hosted service and authenticates with `FIRECRAWL_API_KEY`.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::Scrape;
use crate::error::{Error, Result};

/// Hosted endpoint used when no self-hosted URL is configured.
const DEFAULT_API_URL: &str = "https://api.firecrawl.dev";

/// Default request timeout. Scrapes render pages server-side and can be slow.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Firecrawl client configuration.
#[derive(Debug, Clone)]
pub struct FirecrawlConfig {
    /// Base URL of the API.
    pub api_url: String,
    /// API key, required only for the hosted service.
    pub api_key: Option<String>,
    /// Request timeout.
    pub timeout: Duration,
}

impl FirecrawlConfig {
    /// Load configuration from `FIRECRAWL_API_URL` / `FIRECRAWL_API_KEY`.
    ///
    /// Never fails: a missing URL falls back to the hosted endpoint with a
    /// warning, matching the behavior callers rely on.
    pub fn from_env() -> Self {
        match std::env::var("FIRECRAWL_API_URL") {
            Ok(api_url) if !api_url.is_empty() => Self {
                api_url,
                api_key: None,
                timeout: DEFAULT_TIMEOUT,
            },
            _ => {
                warn!("FIRECRAWL_API_URL is not set; falling back to the hosted endpoint");
                Self {
                    api_url: DEFAULT_API_URL.to_string(),
                    api_key: std::env::var("FIRECRAWL_API_KEY").ok(),
                    timeout: DEFAULT_TIMEOUT,
                }
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ScrapeRequest<'a> {
    url: &'a str,
    formats: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct ScrapeResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    data: Option<ScrapeData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ScrapeData {
    #[serde(default)]
    markdown: Option<String>,
}

/// Client for the Firecrawl scrape API.
#[derive(Debug, Clone)]
pub struct FirecrawlClient {
    http: reqwest::Client,
    config: FirecrawlConfig,
}

impl FirecrawlClient {
    /// Create a client with the given configuration.
    pub fn new(config: FirecrawlConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { http, config })
    }

    /// Create a client from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(FirecrawlConfig::from_env())
    }

    /// Scrape a URL and return its markdown rendering.
    #[instrument(level = "info", skip(self), fields(%url))]
    pub async fn scrape_url(&self, url: &str) -> Result<String> {
        let endpoint = format!("{}/v1/scrape", self.config.api_url.trim_end_matches('/'));
        let request = ScrapeRequest {
            url,
            formats: &["markdown", "html"],
        };

        let mut builder = self.http.post(&endpoint).json(&request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status();
        debug!(%status, "Scrape API responded");

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(Error::Backend(format!(
                "scrape API rejected credentials ({status})"
            )));
        }
        if !status.is_success() {
            return Err(Error::Backend(format!("scrape API returned {status}")));
        }

        let body: ScrapeResponse = response
            .json()
            .await
            .map_err(|e| Error::Backend(format!("scrape API returned invalid JSON: {e}")))?;

        if !body.success {
            let reason = body.error.unwrap_or_else(|| "unknown error".to_string());
            return Err(Error::Backend(format!("scrape failed: {reason}")));
        }

        body.data
            .and_then(|d| d.markdown)
            .ok_or_else(|| Error::Backend("scrape response carried no markdown".to_string()))
    }
}

impl Scrape for FirecrawlClient {
    async fn scrape(&self, url: &str) -> Result<String> {
        self.scrape_url(url).await
    }
}
