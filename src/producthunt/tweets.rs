//! Promotion-thread generation and workbook export.
//!
//! For every product details file scraped for the run date, asks the
//! generation backend for a short promotion thread and writes one workbook
//! sheet per product: Tweet Number / Content columns, widths capped at 100
//! to leave room for full tweet text.

use chrono::NaiveDate;
use tokio::fs;
use tracing::{info, instrument, warn};

use super::details::{files_for_date, product_name_from_file, PRODUCT_CACHE_DIR};
use super::parse_extraction;
use super::workbook::{Sheet, Workbook};
use crate::backends::Generate;
use crate::cache::CacheStore;
use crate::error::Result;
use crate::models::ProductThread;

const DETAILS_SUFFIX: &str = "_details.md";
const TWEETS_WIDTH_CAP: usize = 100;

/// Generation prompt for a product promotion thread.
fn build_thread_prompt(product_details: &str) -> String {
    format!(
        r#"You are a skilled writer who specializes in creating engaging Twitter threads about tech products.

Using the product information below, write an engaging tweet thread about the product.
The thread should be informative, engaging, and encourage interaction.
Focus on the most compelling features, benefits, and unique selling points.

For each tweet return the tweet number and the content of the tweet.
Do not make up any data.
Return ONLY valid JSON matching this shape:

{{
    "tweets": [
        {{"tweet_number": 1, "content": "..."}}
    ]
}}

Do not include any explanatory text, code blocks, or markdown formatting.

Product Information:
{product_details}"#
    )
}

/// Generate a promotion thread for every product scraped on `date` and
/// write the threads workbook. Products whose generation yields no tweets
/// are skipped with a warning; generation and parse failures propagate.
#[instrument(level = "info", skip_all, fields(%date))]
pub async fn tweets_transform<G: Generate>(
    generator: &G,
    cache: &CacheStore,
    date: NaiveDate,
) -> Result<()> {
    info!("Starting thread transformation");

    let files = files_for_date(cache, date, DETAILS_SUFFIX).await?;
    if files.is_empty() {
        info!("No product detail files found for this date");
        return Ok(());
    }

    let product_dir = cache.dir(PRODUCT_CACHE_DIR);
    let mut workbook = Workbook::new();

    for file in &files {
        let product_name = product_name_from_file(file, date, DETAILS_SUFFIX);
        info!(product = %product_name, "Generating thread");

        let details = fs::read_to_string(product_dir.join(file)).await?;
        let response = generator.generate(&build_thread_prompt(&details)).await?;
        let thread: ProductThread = parse_extraction(&response)?;

        if thread.tweets.is_empty() {
            warn!(product = %product_name, "Generation produced no tweets");
            continue;
        }

        let mut sheet = Sheet::new(&product_name, &["Tweet Number", "Content"], TWEETS_WIDTH_CAP);
        for tweet in &thread.tweets {
            sheet.push_row(vec![tweet.tweet_number.to_string(), tweet.content.clone()]);
        }
        workbook.add_sheet(sheet);
    }

    if workbook.is_empty() {
        warn!("No threads were generated");
        return Ok(());
    }

    let output = product_dir.join(format!("{}_tweet_threads.md", date.format("%Y-%m-%d")));
    fs::write(&output, workbook.to_markdown()).await?;
    info!(
        path = %output.display(),
        products = workbook.sheets.len(),
        "Saved threads workbook"
    );
    Ok(())
}
