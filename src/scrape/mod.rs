//! Scraping stages: link discovery, article extraction, and the
//! concurrency-gated extraction scheduler.
//!
//! Both page-facing stages share the scroll-to-stable loop below: the
//! listing page keeps appending stream items while you scroll, and article
//! pages lazy-load their lower halves, so "fully rendered" means "the
//! document stopped growing".

use std::time::Duration;

use tracing::{debug, warn};

use crate::driver::{DriverError, DriverResult, PageSession};

pub mod discovery;
pub mod extract;
pub mod scheduler;

/// How long a page gets to grow between scroll rounds.
pub const SETTLE_INTERVAL: Duration = Duration::from_secs(2);

/// Upper bound on scroll rounds for pages that never stop growing
/// (infinite feeds, ads re-flowing the layout).
const MAX_SCROLL_ROUNDS: usize = 40;

pub(crate) const SCROLL_TO_BOTTOM: &str = "window.scrollTo(0, document.body.scrollHeight)";
pub(crate) const DOCUMENT_HEIGHT: &str = "document.body.scrollHeight";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScrollPhase {
    /// About to issue a scroll to the bottom of the document.
    Scrolling,
    /// Scrolled; waiting out the settle interval before re-measuring.
    Settling,
    /// Height repeated (or the round cap was hit); the page is done.
    Stable,
}

async fn document_height<P: PageSession>(page: &P) -> DriverResult<u64> {
    let value = page.evaluate(DOCUMENT_HEIGHT).await?;
    value
        .as_u64()
        .or_else(|| value.as_f64().map(|h| h as u64))
        .ok_or_else(|| DriverError::Evaluation(format!("document height was not numeric: {value}")))
}

/// Scroll to the bottom until the document height stops changing.
///
/// One round is scroll, wait `settle`, re-measure. The loop ends when a
/// measurement repeats the previous one, or when [`MAX_SCROLL_ROUNDS`]
/// rounds have passed without the page settling.
pub(crate) async fn scroll_until_stable<P: PageSession>(
    page: &P,
    settle: Duration,
) -> DriverResult<()> {
    let mut previous = document_height(page).await?;
    let mut rounds = 0usize;
    let mut phase = ScrollPhase::Scrolling;

    loop {
        phase = match phase {
            ScrollPhase::Scrolling => {
                page.evaluate(SCROLL_TO_BOTTOM).await?;
                ScrollPhase::Settling
            }
            ScrollPhase::Settling => {
                tokio::time::sleep(settle).await;
                let height = document_height(page).await?;
                rounds += 1;
                if height == previous {
                    ScrollPhase::Stable
                } else if rounds >= MAX_SCROLL_ROUNDS {
                    warn!(rounds, height, "page still growing at scroll round cap");
                    ScrollPhase::Stable
                } else {
                    previous = height;
                    ScrollPhase::Scrolling
                }
            }
            ScrollPhase::Stable => break,
        };
    }

    debug!(rounds, final_height = previous, "page height stabilized");
    Ok(())
}
