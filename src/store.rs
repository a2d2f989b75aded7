//! On-disk layout and IO for pipeline artifacts.
//!
//! Everything lives under one data root:
//!
//! ```text
//! data/
//! ├── raw/          links_{symbol}_{date}.json, articles_{symbol}_{date}.ndjson
//! ├── processed/    cleaned_articles_{symbol}_{date}.json
//! └── storage/      analyzed_articles_{symbol}_{date}.json
//! ```
//!
//! `{symbol}` is the lowercase file key and `{date}` the run date, so one
//! run per symbol per day overwrites its own artifacts and nothing else.
//! Raw article logs are line-delimited JSON appended record by record;
//! batch artifacts are pretty-printed JSON arrays written in one shot.

use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::models::{AnalyzedArticle, ProcessedArticle, RawArticle, Symbol};
use crate::utils::ensure_writable_dir;

const RAW_DIR: &str = "raw";
const PROCESSED_DIR: &str = "processed";
const STORAGE_DIR: &str = "storage";

/// Handle to the pipeline's data root.
#[derive(Debug, Clone)]
pub struct DataStore {
    root: PathBuf,
}

impl DataStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DataStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the stage directories and verify each is writable.
    pub async fn ensure_layout(&self) -> io::Result<()> {
        for dir in [RAW_DIR, PROCESSED_DIR, STORAGE_DIR] {
            ensure_writable_dir(&self.root.join(dir)).await?;
        }
        Ok(())
    }

    pub fn links_path(&self, symbol: &Symbol, date: NaiveDate) -> PathBuf {
        self.root
            .join(RAW_DIR)
            .join(format!("links_{}_{}.json", symbol.file_key(), date))
    }

    pub fn raw_articles_path(&self, symbol: &Symbol, date: NaiveDate) -> PathBuf {
        self.root
            .join(RAW_DIR)
            .join(format!("articles_{}_{}.ndjson", symbol.file_key(), date))
    }

    pub fn cleaned_path(&self, symbol: &Symbol, date: NaiveDate) -> PathBuf {
        self.root.join(PROCESSED_DIR).join(format!(
            "cleaned_articles_{}_{}.json",
            symbol.file_key(),
            date
        ))
    }

    pub fn analyzed_path(&self, symbol: &Symbol, date: NaiveDate) -> PathBuf {
        self.root.join(STORAGE_DIR).join(format!(
            "analyzed_articles_{}_{}.json",
            symbol.file_key(),
            date
        ))
    }

    /// Persist the discovery snapshot for `symbol`.
    pub async fn write_links(
        &self,
        symbol: &Symbol,
        date: NaiveDate,
        links: &[String],
    ) -> crate::Result<PathBuf> {
        let path = self.links_path(symbol, date);
        let json = serde_json::to_string_pretty(links)?;
        fs::write(&path, json).await?;
        info!(path = %path.display(), links = links.len(), "Wrote link snapshot");
        Ok(path)
    }

    /// All raw article logs matching `symbol` and `date`, sorted by name.
    ///
    /// Missing `raw/` directory reads as "no logs", not an error.
    pub async fn raw_log_paths(
        &self,
        symbol: &Symbol,
        date: NaiveDate,
    ) -> crate::Result<Vec<PathBuf>> {
        let raw_dir = self.root.join(RAW_DIR);
        let prefix = format!("articles_{}_{}", symbol.file_key(), date);

        let mut entries = match fs::read_dir(&raw_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(&prefix) && name.ends_with(".ndjson") {
                paths.push(entry.path());
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Read every raw article logged for `symbol` on `date`.
    ///
    /// Returns `None` when no matching log exists at all. Unparseable
    /// lines are logged and skipped; a half-written trailing line from an
    /// interrupted run must not sink the records before it.
    pub async fn read_raw_articles(
        &self,
        symbol: &Symbol,
        date: NaiveDate,
    ) -> crate::Result<Option<Vec<RawArticle>>> {
        let paths = self.raw_log_paths(symbol, date).await?;
        if paths.is_empty() {
            return Ok(None);
        }

        let mut articles = Vec::new();
        for path in &paths {
            let contents = fs::read_to_string(path).await?;
            for (index, line) in contents.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<RawArticle>(line) {
                    Ok(article) => articles.push(article),
                    Err(e) => warn!(
                        path = %path.display(),
                        line = index + 1,
                        error = %e,
                        "Skipping unparseable raw article line"
                    ),
                }
            }
        }
        Ok(Some(articles))
    }

    pub async fn write_cleaned(
        &self,
        symbol: &Symbol,
        date: NaiveDate,
        batch: &[ProcessedArticle],
    ) -> crate::Result<PathBuf> {
        let path = self.cleaned_path(symbol, date);
        let json = serde_json::to_string_pretty(batch)?;
        fs::write(&path, json).await?;
        info!(path = %path.display(), articles = batch.len(), "Wrote cleaned batch");
        Ok(path)
    }

    /// Read the cleaned batch for `symbol`, or `None` when the transformer
    /// never produced one.
    pub async fn read_cleaned(
        &self,
        symbol: &Symbol,
        date: NaiveDate,
    ) -> crate::Result<Option<Vec<ProcessedArticle>>> {
        let path = self.cleaned_path(symbol, date);
        let contents = match fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&contents)?))
    }

    pub async fn write_analyzed(
        &self,
        symbol: &Symbol,
        date: NaiveDate,
        batch: &[AnalyzedArticle],
    ) -> crate::Result<PathBuf> {
        let path = self.analyzed_path(symbol, date);
        let json = serde_json::to_string_pretty(batch)?;
        fs::write(&path, json).await?;
        info!(path = %path.display(), articles = batch.len(), "Wrote analyzed batch");
        Ok(path)
    }
}

/// Append-only writer for one run's raw article log.
///
/// Each appended record is serialized to a single line and flushed before
/// `append` returns, so a crash mid-run loses at most the record in
/// flight.
pub struct RawArticleLog {
    file: fs::File,
    path: PathBuf,
}

impl RawArticleLog {
    /// Create (truncating any previous run's log for the same key).
    pub async fn create(path: PathBuf) -> io::Result<Self> {
        let file = fs::File::create(&path).await?;
        Ok(RawArticleLog { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn append(&mut self, article: &RawArticle) -> crate::Result<()> {
        let mut line = serde_json::to_string(article)?;
        line.push('\n');
        self.file.write_all(line.as_bytes()).await?;
        self.file.flush().await?;
        Ok(())
    }
}
