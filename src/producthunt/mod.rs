//! Product-listing variant of the pipeline.
//!
//! Same three-stage shape as the main pipeline, pointed at a product
//! leaderboard: scrape the daily leaderboard to markdown, extract the
//! product list with the generation backend, scrape each product's detail
//! and makers pages, then produce two workbooks per run date — maker leads
//! and promotion threads.

pub mod details;
pub mod leads;
pub mod list;
pub mod tweets;
pub mod workbook;

use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone};
use serde::de::DeserializeOwned;
use tracing::{info, instrument};

use crate::backends::firecrawl::FirecrawlClient;
use crate::backends::gemini::GeminiClient;
use crate::cache::CacheStore;
use crate::error::{Error, Result};
use crate::stages::transform::clean_response;
use crate::utils::ensure_writable_dir;

/// Cache stamp for a run date: local midnight of that date.
pub(crate) fn date_stamp(date: NaiveDate) -> DateTime<Local> {
    Local
        .from_local_datetime(&date.and_time(NaiveTime::MIN))
        .earliest()
        .unwrap_or_else(Local::now)
}

/// Parse a generation response into an extraction model, tolerating the
/// same markdown fences the thread parser strips.
pub(crate) fn parse_extraction<T: DeserializeOwned>(response: &str) -> Result<T> {
    let cleaned = clean_response(response);
    serde_json::from_str(&cleaned).map_err(|e| Error::Parse(e.to_string()))
}

/// Run the full product-listing flow for one leaderboard date.
#[instrument(level = "info", skip_all, fields(%date))]
pub async fn run(cache_root: &str, date: NaiveDate) -> Result<()> {
    ensure_writable_dir(cache_root).await?;
    let cache = CacheStore::new(cache_root);

    let scraper = FirecrawlClient::from_env()?;
    let generator = GeminiClient::from_env()?;

    let products = list::get_products_list(&scraper, &generator, &cache, date).await?;
    info!(count = products.products.len(), "Extracted product list");

    let scraped = details::ingest_details(&scraper, &cache, date).await?;
    info!(count = scraped, "Scraped product detail pages");

    tweets::tweets_transform(&generator, &cache, date).await?;
    leads::leads_transform(&generator, &cache, date).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Products;

    #[test]
    fn test_parse_extraction_accepts_fenced_json() {
        let response = "```json\n{\"products\": [{\"name\": \"Gadget\"}]}\n```";
        let products: Products = parse_extraction(response).unwrap();
        assert_eq!(products.products.len(), 1);
        assert_eq!(products.products[0].name.as_deref(), Some("Gadget"));
    }

    #[test]
    fn test_parse_extraction_rejects_prose() {
        let err = parse_extraction::<Products>("here are the products you asked for").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_date_stamp_hits_midnight() {
        let stamp = date_stamp(NaiveDate::from_ymd_opt(2025, 8, 7).unwrap());
        assert_eq!(stamp.format("%Y-%m-%dT%H").to_string(), "2025-08-07T00");
    }
}
