//! Interface boundary between the pipeline and the rendering engine.
//!
//! Scraping ticker news requires a real browser: the listing page populates
//! its article stream from script, and article bodies hide behind lazy
//! loading and "Story Continues" expanders. The pipeline only ever talks to
//! that browser through [`PageDriver`] and [`PageSession`], so the scrape
//! logic stays testable against a scripted in-process stand-in.
//!
//! The production implementation lives in [`crate::chrome`].

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Faults raised by the rendering engine.
#[derive(Debug, Error)]
pub enum DriverError {
    /// A navigation or wait did not finish inside its deadline.
    #[error("timed out after {timeout:?} waiting for {what}")]
    Timeout { what: String, timeout: Duration },

    /// Navigation was refused or abandoned by the browser.
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// In-page script evaluation failed or produced an unusable value.
    #[error("script evaluation failed: {0}")]
    Evaluation(String),

    /// The underlying browser session misbehaved (lost connection,
    /// closed target, protocol error).
    #[error("browser session fault: {0}")]
    Session(String),
}

/// Something that can open rendered pages.
///
/// Implementations are shared across concurrent extraction jobs, so they
/// must hand out independent [`PageSession`]s.
#[async_trait]
pub trait PageDriver: Send + Sync + 'static {
    type Page: PageSession;

    /// Open a fresh page, navigate it to `url`, and hand it back once the
    /// navigation settles. Implementations must not leak the page when
    /// navigation fails.
    async fn open(&self, url: &str, timeout: Duration) -> DriverResult<Self::Page>;
}

/// One live rendered page.
///
/// `close` consumes the session; every acquisition path in the pipeline is
/// expected to reach a `close`, success or not.
#[async_trait]
pub trait PageSession: Send + Sync + 'static {
    /// Resolve once `selector` matches at least one element, or time out.
    async fn wait_for(&self, selector: &str, timeout: Duration) -> DriverResult<()>;

    /// Evaluate a script in the page and return its JSON result.
    async fn evaluate(&self, script: &str) -> DriverResult<Value>;

    /// Click the first element matching `selector`. Returns `false` when no
    /// such element exists right now.
    async fn click_first(&self, selector: &str) -> DriverResult<bool>;

    /// The page's current HTML.
    async fn content(&self) -> DriverResult<String>;

    async fn close(self) -> DriverResult<()>;
}

/// Close a page, demoting any failure to a debug log.
///
/// Used on paths where the page's useful work is already done (or already
/// failed) and a close error has nothing left to poison.
pub(crate) async fn close_quietly<P: PageSession>(page: P, context: &'static str) {
    if let Err(e) = page.close().await {
        debug!(context, error = %e, "failed to close page");
    }
}
