//! Leaderboard scrape and product-list extraction.
//!
//! First half of the product-listing flow: scrape the daily leaderboard to
//! markdown (cached under `producthunt_cache`), then ask the generation
//! backend to extract the structured product list from the latest cached
//! markdown (cached under `producthunt_data_cache`).

use chrono::{Datelike, NaiveDate};
use tracing::{info, instrument, warn};

use super::{date_stamp, parse_extraction};
use crate::backends::{Generate, Scrape};
use crate::cache::{CacheFormat, CacheStore};
use crate::error::Result;
use crate::models::Products;

/// Cache directory for scraped leaderboard markdown.
pub const PRODUCTHUNT_CACHE_DIR: &str = "producthunt_cache";
/// Cache directory for extracted product lists.
pub const PRODUCTHUNT_DATA_CACHE_DIR: &str = "producthunt_data_cache";

/// Daily leaderboard URL for a date. Date parts are unpadded.
pub fn leaderboard_url(date: NaiveDate) -> String {
    format!(
        "https://www.producthunt.com/leaderboard/daily/{}/{}/{}",
        date.year(),
        date.month(),
        date.day()
    )
}

/// Extraction prompt for the product list.
fn build_product_list_prompt(markdown: &str) -> String {
    format!(
        r#"You are a data extractor. Read the markdown content of a product leaderboard page and extract every listed product.

For each product, extract:
- name
- description
- url

Return ONLY valid JSON matching this shape, with null for anything missing:

{{
    "products": [
        {{"name": "...", "description": "...", "url": "..."}}
    ]
}}

Do not include any explanatory text, code blocks, or markdown formatting.
Do not make up any data.

The markdown content is:
{markdown}"#
    )
}

/// Scrape the leaderboard for `date` and cache the markdown.
///
/// A scrape failure propagates as a backend error; a cache write failure
/// is only a warning since the markdown is returned in memory.
#[instrument(level = "info", skip_all, fields(%date))]
pub async fn scrape_leaderboard<S: Scrape>(
    scraper: &S,
    cache: &CacheStore,
    date: NaiveDate,
) -> Result<String> {
    let url = leaderboard_url(date);
    info!(%url, "Scraping leaderboard");

    let markdown = scraper.scrape(&url).await?;
    if let Err(e) = cache
        .write_text_at(
            PRODUCTHUNT_CACHE_DIR,
            &markdown,
            CacheFormat::Markdown,
            date_stamp(date),
        )
        .await
    {
        warn!(error = %e, "Failed to cache leaderboard markdown");
    }
    Ok(markdown)
}

/// Extract the product list from the latest cached leaderboard markdown.
#[instrument(level = "info", skip_all, fields(%date))]
pub async fn extract_products<G: Generate>(
    generator: &G,
    cache: &CacheStore,
    date: NaiveDate,
) -> Result<Products> {
    let cache_file = cache
        .latest(PRODUCTHUNT_CACHE_DIR, CacheFormat::Markdown)
        .await?;
    info!(path = %cache_file.display(), "Using leaderboard cache file");

    let markdown = tokio::fs::read_to_string(&cache_file).await?;
    let response = generator
        .generate(&build_product_list_prompt(&markdown))
        .await?;
    let products: Products = parse_extraction(&response)?;
    info!(count = products.products.len(), "Extracted products");

    if let Err(e) = cache
        .write_json_at(PRODUCTHUNT_DATA_CACHE_DIR, &products, date_stamp(date))
        .await
    {
        warn!(error = %e, "Failed to cache extracted product list");
    }
    Ok(products)
}

/// Scrape and extract in sequence.
pub async fn get_products_list<S: Scrape, G: Generate>(
    scraper: &S,
    generator: &G,
    cache: &CacheStore,
    date: NaiveDate,
) -> Result<Products> {
    scrape_leaderboard(scraper, cache, date).await?;
    extract_products(generator, cache, date).await
}
