//! Extraction scheduling: all of a symbol's article links in flight at
//! once, throttled by the run-wide admission gate.
//!
//! The gate is a plain [`Semaphore`] handle shared by every symbol's
//! scheduler, so the permit count bounds simultaneous page work across
//! the whole run, not per symbol. Results are appended to the raw log in
//! completion order, each record flushed before the next completion is
//! taken, so an interrupted run keeps everything that finished.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tracing::{info, instrument, warn};

use crate::driver::PageDriver;
use crate::models::Symbol;
use crate::scrape::extract::extract;
use crate::store::{DataStore, RawArticleLog};

/// Outcome counts for one symbol's extraction batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionStats {
    /// Links the scheduler was handed.
    pub total: usize,
    /// Articles that extracted and reached the raw log.
    pub written: usize,
}

/// Run every extraction for `symbol`, appending results as they finish.
///
/// Individual failures are absences, not errors; only storage faults (the
/// log cannot be created or appended to) fail the batch.
#[instrument(level = "info", skip_all, fields(symbol = %symbol, links = links.len()))]
pub async fn run_extractions<D: PageDriver>(
    driver: &Arc<D>,
    gate: &Arc<Semaphore>,
    symbol: &Symbol,
    links: Vec<String>,
    store: &DataStore,
    date: NaiveDate,
    settle: Duration,
) -> crate::Result<ExtractionStats> {
    let total = links.len();
    let mut log = RawArticleLog::create(store.raw_articles_path(symbol, date)).await?;

    let mut jobs: FuturesUnordered<_> = links
        .into_iter()
        .map(|url| {
            let driver = Arc::clone(driver);
            let gate = Arc::clone(gate);
            async move {
                // Closed gate means the run is tearing down; count the
                // article as not extracted.
                let Ok(_permit) = gate.acquire_owned().await else {
                    warn!(url = %url, "admission gate closed; skipping article");
                    return None;
                };
                extract(driver.as_ref(), &url, settle).await
            }
        })
        .collect();

    let mut completed = 0usize;
    let mut written = 0usize;
    while let Some(outcome) = jobs.next().await {
        completed += 1;
        if let Some(article) = outcome {
            log.append(&article).await?;
            written += 1;
        }
        info!(completed, total, written, "Extraction progress");
    }

    info!(path = %log.path().display(), written, total, "Raw article log complete");
    Ok(ExtractionStats { total, written })
}
