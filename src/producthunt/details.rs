//! Per-product detail and makers scrapes.
//!
//! Reads the latest extracted product list and scrapes two pages per
//! product — the product page and its `/makers` page — into date-prefixed
//! files under `producthunt_product_cache`. These files feed the leads and
//! tweets transforms, which glob them back by date prefix; they are plain
//! named files, not sequence-numbered cache entries.

use chrono::NaiveDate;
use tokio::fs;
use tracing::{info, instrument, warn};

use super::list::PRODUCTHUNT_DATA_CACHE_DIR;
use crate::backends::Scrape;
use crate::cache::{CacheFormat, CacheStore};
use crate::error::{Error, Result};
use crate::models::Products;
use crate::utils::slugify;

/// Directory for per-product detail, makers, and workbook files.
pub const PRODUCT_CACHE_DIR: &str = "producthunt_product_cache";

/// Scrape detail and makers pages for every product in the latest
/// extracted list. Returns the number of products scraped.
///
/// A failed scrape aborts the run: half-scraped products would silently
/// thin out the exported workbooks.
#[instrument(level = "info", skip_all, fields(%date))]
pub async fn ingest_details<S: Scrape>(
    scraper: &S,
    cache: &CacheStore,
    date: NaiveDate,
) -> Result<usize> {
    let list_file = cache
        .latest(PRODUCTHUNT_DATA_CACHE_DIR, CacheFormat::Json)
        .await?;
    info!(path = %list_file.display(), "Using product list cache file");

    let body = fs::read_to_string(&list_file).await?;
    let products: Products = serde_json::from_str(&body)
        .map_err(|e| Error::Format(format!("product list cache entry is malformed: {e}")))?;

    if products.products.is_empty() {
        return Err(Error::Format(
            "no products found in the latest product list".to_string(),
        ));
    }

    let product_dir = cache.dir(PRODUCT_CACHE_DIR);
    fs::create_dir_all(&product_dir).await?;

    let date_prefix = date.format("%Y-%m-%d").to_string();
    let mut scraped = 0usize;

    for product in &products.products {
        let Some(product_url) = product.url.as_deref().filter(|u| !u.is_empty()) else {
            warn!(name = ?product.name, "Product has no URL; skipping");
            continue;
        };
        let makers_url = format!("{product_url}/makers");

        let details = scraper.scrape(product_url).await?;
        let makers = scraper.scrape(&makers_url).await?;

        let slug = slugify(product.name.as_deref().unwrap_or("product"));
        let base = format!("{date_prefix}_{slug}");

        fs::write(
            product_dir.join(format!("{base}_details.md")),
            format!("# Product Details\n{details}"),
        )
        .await?;
        fs::write(
            product_dir.join(format!("{base}_makers.md")),
            format!("# Team/Makers\n{makers}"),
        )
        .await?;

        scraped += 1;
        info!(name = ?product.name, "Saved product details and makers files");
    }

    info!(count = scraped, "Finished scraping products");
    Ok(scraped)
}

/// List file names in the product cache matching a date prefix and suffix,
/// sorted for deterministic processing order.
pub(crate) async fn files_for_date(
    cache: &CacheStore,
    date: NaiveDate,
    suffix: &str,
) -> Result<Vec<String>> {
    let product_dir = cache.dir(PRODUCT_CACHE_DIR);
    if !product_dir.is_dir() {
        return Ok(Vec::new());
    }

    let date_prefix = date.format("%Y-%m-%d").to_string();
    let mut names = Vec::new();
    let mut entries = fs::read_dir(&product_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if let Some(name) = entry.file_name().to_str() {
            if name.starts_with(&date_prefix) && name.ends_with(suffix) {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

/// Recover the product name a file was written for, given its date prefix
/// and suffix.
pub(crate) fn product_name_from_file(name: &str, date: NaiveDate, suffix: &str) -> String {
    let date_prefix = format!("{}_", date.format("%Y-%m-%d"));
    name.strip_prefix(&date_prefix)
        .unwrap_or(name)
        .strip_suffix(suffix)
        .unwrap_or(name)
        .to_string()
}
