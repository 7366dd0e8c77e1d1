//! Data models for ingested content, generated post threads, and the
//! product-listing extraction records.
//!
//! This module defines the core data structures used throughout the
//! application:
//! - [`IngestResult`]: normalized content produced by the ingest stage
//! - [`Post`] / [`PostThread`]: short-form posts generated by the LLM
//! - [`PostOutcome`]: status record returned by the post stage
//! - [`Product`], [`Maker`] and friends: records extracted from scraped
//!   product-listing markdown
//!
//! Every extraction model tolerates missing fields; the LLM output is never
//! trusted to be complete.

use serde::{Deserialize, Serialize};

/// Platform length limit for a single post.
pub const POST_MAX_CHARS: usize = 280;

/// Normalized content handed from the ingest stage to the transform stage.
///
/// All fields default to empty: the empty-content value doubles as the
/// recovery sentinel written when the acquisition backend fails, letting
/// downstream stages fail fast on a blank payload instead of seeing the
/// backend's error type.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct IngestResult {
    /// The main body of extracted text.
    #[serde(default)]
    pub full_content: String,
    /// Topic tags associated with the content.
    #[serde(default)]
    pub topics: Vec<String>,
    /// Source links associated with the content.
    #[serde(default)]
    pub links: Vec<String>,
}

impl IngestResult {
    /// The empty sentinel returned when acquisition fails.
    pub fn sentinel() -> Self {
        Self::default()
    }

    /// True if there is no usable content.
    pub fn is_empty(&self) -> bool {
        self.full_content.trim().is_empty()
    }
}

/// A single short-form post with its rendered character count.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Post {
    /// The post text, including appended hashtags.
    pub content: String,
    /// Character count of `content`, or whatever count the generation
    /// backend supplied.
    pub char_count: usize,
}

impl Post {
    /// True if the post fits the platform length limit.
    pub fn is_valid(&self) -> bool {
        self.char_count <= POST_MAX_CHARS
    }
}

/// An ordered sequence of posts meant to be published together.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct PostThread {
    /// The posts in publication order.
    #[serde(default)]
    pub items: Vec<Post>,
    /// Whether this is a thread (more than one post).
    #[serde(default)]
    pub is_thread: bool,
}

impl PostThread {
    /// Build a thread from its items, deriving `is_thread`.
    pub fn new(items: Vec<Post>) -> Self {
        let is_thread = items.len() > 1;
        Self { items, is_thread }
    }

    /// The opening post, if any.
    pub fn first(&self) -> Option<&Post> {
        self.items.first()
    }

    /// Thread validity is the conjunction of all member validities.
    pub fn is_valid(&self) -> bool {
        !self.items.is_empty() && self.items.iter().all(Post::is_valid)
    }

    /// Flatten to a plain JSON mapping.
    pub fn to_mapping(&self) -> serde_json::Value {
        serde_json::json!({
            "items": self.items,
            "is_thread": self.is_thread,
        })
    }

    /// Reconstruct a thread from [`PostThread::to_mapping`] output. Missing
    /// keys default to an empty, non-thread value.
    pub fn from_mapping(value: serde_json::Value) -> crate::error::Result<Self> {
        serde_json::from_value(value).map_err(|e| crate::error::Error::Format(e.to_string()))
    }
}

/// Status record returned by the post stage instead of raising on expected
/// failures.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PostOutcome {
    /// `"success"` or `"error"`.
    pub status: String,
    /// Human-readable detail.
    pub message: String,
}

impl PostOutcome {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// A product-listing entry extracted from scraped leaderboard markdown.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct Product {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// The extracted product list.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Products {
    #[serde(default)]
    pub products: Vec<Product>,
}

/// A social or professional link attached to a maker profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct MakerLink {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// A person associated with a product listing.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct Maker {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub followers: Option<i64>,
    #[serde(default)]
    pub links: Option<Vec<MakerLink>>,
}

/// Makers extracted for one product.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProductMakers {
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub product_url: Option<String>,
    #[serde(default)]
    pub makers: Option<Vec<Maker>>,
}

/// One numbered tweet of a product promotion thread.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ProductTweet {
    pub tweet_number: u32,
    pub content: String,
}

/// A generated promotion thread for one product.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProductThread {
    #[serde(default)]
    pub tweets: Vec<ProductTweet>,
}
