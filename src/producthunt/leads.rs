//! Maker-lead extraction and workbook export.
//!
//! For every makers file scraped for the run date, asks the generation
//! backend for structured maker profiles and flattens them into one
//! workbook sheet per product: merged header rows (product name, URL), a
//! spacer, then Name / Role / Description / Followers / Links columns with
//! widths capped at 50.

use chrono::NaiveDate;
use tokio::fs;
use tracing::{info, instrument, warn};

use super::details::{files_for_date, product_name_from_file, PRODUCT_CACHE_DIR};
use super::parse_extraction;
use super::workbook::{Sheet, Workbook};
use crate::backends::Generate;
use crate::cache::CacheStore;
use crate::error::Result;
use crate::models::{Maker, ProductMakers};

const MAKERS_SUFFIX: &str = "_makers.md";
const LEADS_WIDTH_CAP: usize = 50;

/// Extraction prompt for maker profiles.
fn build_makers_prompt(markdown: &str) -> String {
    format!(
        r#"Analyze the provided product and makers markdown content and extract structured information about each maker.
The content is divided into two sections: Product Details and Team/Makers.

For each maker, extract the following information:
- Name
- Role (if mentioned)
- Description/bio
- Number of followers (if available)
- List of links (each with name and URL)

Return ONLY valid JSON matching this shape, with null for anything missing:

{{
    "product_name": "...",
    "product_url": "...",
    "makers": [
        {{"name": "...", "role": "...", "description": "...", "followers": 0, "links": [{{"name": "...", "url": "..."}}]}}
    ]
}}

Do not include any explanatory text, code blocks, or markdown formatting.
Do not make up any data.

The markdown content is:
{markdown}"#
    )
}

/// Flatten maker records into workbook rows, links joined as `name (url)`.
fn makers_to_rows(makers: &[Maker]) -> Vec<Vec<String>> {
    makers
        .iter()
        .map(|maker| {
            let links = maker
                .links
                .as_deref()
                .unwrap_or(&[])
                .iter()
                .map(|link| {
                    format!(
                        "{} ({})",
                        link.name.as_deref().unwrap_or(""),
                        link.url.as_deref().unwrap_or("")
                    )
                })
                .collect::<Vec<_>>()
                .join(", ");

            vec![
                maker.name.clone().unwrap_or_default(),
                maker.role.clone().unwrap_or_default(),
                maker.description.clone().unwrap_or_default(),
                maker
                    .followers
                    .map(|f| f.to_string())
                    .unwrap_or_default(),
                links,
            ]
        })
        .collect()
}

/// Extract maker leads for every product scraped on `date` and write the
/// leads workbook. Products whose extraction yields no makers are skipped
/// with a warning; generation and parse failures propagate.
#[instrument(level = "info", skip_all, fields(%date))]
pub async fn leads_transform<G: Generate>(
    generator: &G,
    cache: &CacheStore,
    date: NaiveDate,
) -> Result<()> {
    info!("Starting leads transformation");

    let files = files_for_date(cache, date, MAKERS_SUFFIX).await?;
    if files.is_empty() {
        info!("No makers files found for this date");
        return Ok(());
    }

    let product_dir = cache.dir(PRODUCT_CACHE_DIR);
    let mut workbook = Workbook::new();

    for file in &files {
        let product_name = product_name_from_file(file, date, MAKERS_SUFFIX);
        info!(product = %product_name, "Processing makers");

        let markdown = fs::read_to_string(product_dir.join(file)).await?;
        let response = generator.generate(&build_makers_prompt(&markdown)).await?;
        let extracted: ProductMakers = parse_extraction(&response)?;

        let Some(makers) = extracted.makers.filter(|m| !m.is_empty()) else {
            warn!(product = %product_name, "No makers data found");
            continue;
        };

        let product_url = extracted.product_url.unwrap_or_default();
        let mut sheet = Sheet::new(
            &product_name,
            &["Name", "Role", "Description", "Followers", "Links"],
            LEADS_WIDTH_CAP,
        )
        .with_header(
            format!("Name: {product_name}"),
            format!("URL: {product_url}"),
        );
        for row in makers_to_rows(&makers) {
            sheet.push_row(row);
        }
        workbook.add_sheet(sheet);
    }

    if workbook.is_empty() {
        warn!("No makers data was processed");
        return Ok(());
    }

    let output = product_dir.join(format!("{}_product_makers.md", date.format("%Y-%m-%d")));
    fs::write(&output, workbook.to_markdown()).await?;
    info!(
        path = %output.display(),
        products = workbook.sheets.len(),
        "Saved makers workbook"
    );
    Ok(())
}
