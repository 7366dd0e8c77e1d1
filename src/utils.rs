//! Utility functions for string handling and file system checks.
//!
//! Helpers shared across the pipeline stages:
//! - String truncation for log output
//! - Slugification for product cache filenames
//! - Truthy-flag parsing for boolean environment variables
//! - Output directory validation

use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};

use crate::error::Result;

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` bytes with an ellipsis and byte
/// count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut cut = max;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
    }
}

/// Convert a product name to a filename-friendly slug.
///
/// Lowercases the text, removes special characters, and replaces spaces
/// with underscores. Used to build product cache filenames such as
/// `2025-08-07_my_product_details.md`.
pub fn slugify(name: &str) -> String {
    name.to_lowercase()
        .replace(|c: char| !c.is_alphanumeric() && c != ' ' && c != '_' && c != '-', "")
        .replace(' ', "_")
}

/// Interpret an environment value as a boolean flag.
///
/// Accepts the same truthy spellings the original configuration did:
/// `true`, `True`, `1`, `t`, `T`. A missing variable yields `default`.
pub fn env_flag(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(v) => matches!(v.as_str(), "true" | "True" | "1" | "t" | "T"),
        Err(_) => default,
    }
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if it doesn't exist, then performs a write test by
/// creating and immediately deleting a probe file.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<()> {
    fs::create_dir_all(path).await?;
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    stdfs::File::create(&probe_path)?;
    let _ = stdfs::remove_file(&probe_path);
    info!("Cache root is writable");
    Ok(())
}
