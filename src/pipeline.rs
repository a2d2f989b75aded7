//! Run orchestration: scrape every symbol concurrently, then transform
//! and enrich each symbol's output in turn.
//!
//! Symbols are isolated best-effort. A symbol that fails at any stage is
//! logged and abandoned at that stage; the others keep going. The only
//! shared resources are the browser, the admission gate bounding total
//! in-flight extractions, and the inference client.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{error, info, instrument};

use crate::driver::PageDriver;
use crate::enrich::enrich;
use crate::inference::Classifier;
use crate::models::Symbol;
use crate::scrape::discovery::discover;
use crate::scrape::scheduler::{ExtractionStats, run_extractions};
use crate::store::DataStore;
use crate::transform::transform;

pub struct Pipeline<D, C> {
    driver: Arc<D>,
    classifier: Arc<C>,
    store: DataStore,
    gate: Arc<Semaphore>,
    run_date: NaiveDate,
    settle: Duration,
}

impl<D: PageDriver, C: Classifier> Pipeline<D, C> {
    /// `extraction_cap` bounds simultaneous in-flight article extractions
    /// across every symbol in the run; a cap of zero is lifted to one, since
    /// a zero-permit gate would park every job forever. `run_date` is fixed
    /// once here so a run that crosses midnight still writes one coherent
    /// artifact set.
    pub fn new(
        driver: Arc<D>,
        classifier: Arc<C>,
        store: DataStore,
        extraction_cap: usize,
        run_date: NaiveDate,
    ) -> Self {
        Pipeline {
            driver,
            classifier,
            store,
            gate: Arc::new(Semaphore::new(extraction_cap.max(1))),
            run_date,
            settle: crate::scrape::SETTLE_INTERVAL,
        }
    }

    /// Override the scroll settle interval. Test hook; production runs
    /// keep the default.
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Run the full pipeline for `symbols`.
    ///
    /// Scrapes run concurrently across symbols; transform and enrichment
    /// run per symbol afterwards, in the order given.
    #[instrument(level = "info", skip_all, fields(symbols = symbols.len(), date = %self.run_date))]
    pub async fn run(&self, symbols: &[Symbol]) {
        info!(
            permits = self.gate.available_permits(),
            "Starting scrape phase"
        );
        join_all(symbols.iter().map(|symbol| self.scrape_symbol(symbol))).await;

        info!("Scrape phase complete; transforming and enriching");
        for symbol in symbols {
            self.finish_symbol(symbol).await;
        }
    }

    async fn scrape_symbol(&self, symbol: &Symbol) {
        match self.try_scrape(symbol).await {
            Ok(Some(stats)) => info!(
                symbol = %symbol,
                extracted = stats.written,
                links = stats.total,
                "Symbol scrape complete"
            ),
            // Nothing discovered; discovery already said so.
            Ok(None) => {}
            Err(e) => error!(
                symbol = %symbol,
                error = %e,
                "Scrape failed; symbol will have no raw log"
            ),
        }
    }

    async fn try_scrape(&self, symbol: &Symbol) -> crate::Result<Option<ExtractionStats>> {
        let links = discover(
            self.driver.as_ref(),
            symbol,
            &self.store,
            self.run_date,
            self.settle,
        )
        .await?;
        if links.is_empty() {
            return Ok(None);
        }

        let stats = run_extractions(
            &self.driver,
            &self.gate,
            symbol,
            links,
            &self.store,
            self.run_date,
            self.settle,
        )
        .await?;
        Ok(Some(stats))
    }

    async fn finish_symbol(&self, symbol: &Symbol) {
        match transform(&self.store, symbol, self.run_date).await {
            Ok(Some(count)) => info!(symbol = %symbol, articles = count, "Transform complete"),
            Ok(None) => return,
            Err(e) => {
                error!(symbol = %symbol, error = %e, "Transform failed; abandoning symbol");
                return;
            }
        }

        if let Err(e) = enrich(
            self.classifier.as_ref(),
            &self.store,
            symbol,
            self.run_date,
        )
        .await
        {
            error!(symbol = %symbol, error = %e, "Enrichment failed for symbol");
        }
    }
}
