//! External capability backends and the traits the pipeline consumes them
//! through.
//!
//! The pipeline core never talks to an external service directly; each
//! stage is written against one of these seams so tests can substitute
//! stubs:
//!
//! | Trait       | Capability                                   | Default impl |
//! |-------------|----------------------------------------------|--------------|
//! | [`Acquire`] | fetch a target and return raw content        | [`browser::BrowserSession`] |
//! | [`Scrape`]  | fetch a URL as markdown via the scraping API | [`firecrawl::FirecrawlClient`] |
//! | [`Generate`]| produce text from a prompt                   | [`gemini::GeminiClient`] |
//! | [`Publish`] | drive a posting navigation script            | [`browser::BrowserSession`] |

pub mod browser;
pub mod firecrawl;
pub mod gemini;

use crate::error::Result;

/// Target descriptor for the ingest acquisition backend: an index page and
/// the selector locating the first article link on it.
#[derive(Debug, Clone)]
pub struct IngestTarget {
    /// Page listing recent articles.
    pub index_url: String,
    /// CSS selector for article links on the index page.
    pub article_selector: String,
}

impl Default for IngestTarget {
    fn default() -> Self {
        Self {
            index_url: "https://www.developer-tech.com/categories/developer-ai/".to_string(),
            article_selector: "article a[href]".to_string(),
        }
    }
}

/// An ordered list of plain-language navigation instructions for the
/// posting session. The steps mirror what a browser-automation agent would
/// be told to do; the bundled session implementation walks them without
/// pressing the final submit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavigationScript {
    pub steps: Vec<String>,
}

impl NavigationScript {
    pub fn new(steps: Vec<String>) -> Self {
        Self { steps }
    }

    /// Render the script as a numbered task description.
    pub fn render(&self) -> String {
        self.steps.join("\n")
    }
}

/// Content acquisition capability used by the ingest stage.
pub trait Acquire {
    /// Fetch the target and return the raw structured response as text.
    async fn fetch(&self, target: &IngestTarget) -> Result<String>;
}

/// URL-to-markdown scraping capability used by the product-listing variant.
pub trait Scrape {
    /// Scrape `url` and return its content as markdown.
    async fn scrape(&self, url: &str) -> Result<String>;
}

/// Text-generation capability.
pub trait Generate {
    /// Send `prompt` to the model and return its raw text response.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Posting capability driven by the post stage.
pub trait Publish {
    /// Walk the navigation script against the posting platform.
    async fn publish(&self, script: &NavigationScript) -> Result<()>;
}
