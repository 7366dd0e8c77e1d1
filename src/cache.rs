//! Timestamped file cache shared by every pipeline stage.
//!
//! Each stage persists its output as a new file in a flat per-stage
//! directory, named `{YYYY-MM-DDTHH}.{seq}.{ext}` where `seq` is the
//! smallest non-negative integer not yet used for that hour stamp. Entries
//! are never rewritten; the directory is an ad hoc append-only log and
//! "latest" is resolved by filesystem modification time.
//!
//! # Directory Layout
//!
//! ```text
//! cache_root/
//! ├── ingest_cache/
//! │   ├── 2025-08-07T09.0.json
//! │   └── 2025-08-07T09.1.json
//! ├── raw_cache/
//! ├── transform_cache/
//! └── producthunt_cache/
//!     └── 2025-08-07T00.0.md
//! ```
//!
//! Ties on exactly equal modification times resolve to the lexicographically
//! largest filename, which for files sharing an hour stamp is the highest
//! sequence number.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Serialize;
use tokio::fs;
use tracing::{debug, info, instrument};

use crate::error::{Error, Result};

/// On-disk encoding of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheFormat {
    /// Pretty-printed JSON, `.json` extension.
    Json,
    /// Verbatim text, `.md` extension.
    Markdown,
}

impl CacheFormat {
    /// File extension for this format, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            CacheFormat::Json => "json",
            CacheFormat::Markdown => "md",
        }
    }
}

/// A root directory holding one flat cache directory per pipeline stage.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    /// Create a store rooted at `root`. Nothing is touched on disk until
    /// the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Absolute path of a named cache directory under the root.
    pub fn dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Serialize `value` as pretty JSON into the next free slot of `dir`,
    /// stamped with the current local hour.
    pub async fn write_json<T: Serialize>(&self, dir: &str, value: &T) -> Result<PathBuf> {
        self.write_json_at(dir, value, Local::now()).await
    }

    /// Serialize `value` as pretty JSON into the next free slot of `dir`,
    /// stamped with an explicit timestamp.
    pub async fn write_json_at<T: Serialize>(
        &self,
        dir: &str,
        value: &T,
        stamp: DateTime<Local>,
    ) -> Result<PathBuf> {
        let body = serde_json::to_string_pretty(value)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        self.write_raw(dir, &body, CacheFormat::Json, stamp).await
    }

    /// Write `text` verbatim into the next free slot of `dir`, stamped with
    /// the current local hour.
    pub async fn write_text(&self, dir: &str, text: &str, format: CacheFormat) -> Result<PathBuf> {
        self.write_raw(dir, text, format, Local::now()).await
    }

    /// Write `text` verbatim into the next free slot of `dir`, stamped with
    /// an explicit timestamp.
    pub async fn write_text_at(
        &self,
        dir: &str,
        text: &str,
        format: CacheFormat,
        stamp: DateTime<Local>,
    ) -> Result<PathBuf> {
        self.write_raw(dir, text, format, stamp).await
    }

    #[instrument(level = "debug", skip(self, body), fields(dir = %dir))]
    async fn write_raw(
        &self,
        dir: &str,
        body: &str,
        format: CacheFormat,
        stamp: DateTime<Local>,
    ) -> Result<PathBuf> {
        let cache_dir = self.dir(dir);
        fs::create_dir_all(&cache_dir).await?;

        let path = next_free_path(&cache_dir, stamp, format.extension());
        fs::write(&path, body).await?;
        info!(path = %path.display(), bytes = body.len(), "Wrote cache entry");
        Ok(path)
    }

    /// Return the most recently modified entry of the given format in `dir`.
    ///
    /// Fails with [`Error::NotFound`] if the directory is absent or holds no
    /// file with the requested extension.
    #[instrument(level = "debug", skip(self), fields(dir = %dir))]
    pub async fn latest(&self, dir: &str, format: CacheFormat) -> Result<PathBuf> {
        let cache_dir = self.dir(dir);
        if !cache_dir.is_dir() {
            return Err(Error::NotFound(format!(
                "cache directory not found: {}",
                cache_dir.display()
            )));
        }

        let ext = format.extension();
        let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;
        let mut entries = fs::read_dir(&cache_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ext) {
                continue;
            }
            let modified = entry.metadata().await?.modified()?;
            let replace = match &newest {
                None => true,
                Some((best_time, best_path)) => {
                    modified > *best_time
                        || (modified == *best_time && path.file_name() > best_path.file_name())
                }
            };
            if replace {
                newest = Some((modified, path));
            }
        }

        match newest {
            Some((_, path)) => {
                debug!(path = %path.display(), "Resolved latest cache entry");
                Ok(path)
            }
            None => Err(Error::NotFound(format!(
                "no cache files found in {}",
                cache_dir.display()
            ))),
        }
    }
}

/// Probe `seq = 0, 1, 2, …` until an unused `{stamp}.{seq}.{ext}` name is
/// found in `dir`.
fn next_free_path(dir: &Path, stamp: DateTime<Local>, ext: &str) -> PathBuf {
    let base = stamp.format("%Y-%m-%dT%H").to_string();
    let mut seq = 0u32;
    loop {
        let candidate = dir.join(format!("{base}.{seq}.{ext}"));
        if !candidate.exists() {
            return candidate;
        }
        seq += 1;
    }
}
