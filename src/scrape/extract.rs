//! Article extraction: one rendered page in, at most one raw article out.
//!
//! Extraction is deliberately forgiving. A page that never renders, times
//! out, or navigates into an error wall produces `None` and a log line;
//! the scheduler treats that as "this article does not exist today" and
//! the raw log simply never sees it.

use std::time::Duration;

use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, warn};

use crate::driver::{DriverResult, PageDriver, PageSession, close_quietly};
use crate::models::{RawArticle, article_id_from_url};

const ARTICLE_NAV_TIMEOUT: Duration = Duration::from_secs(50);
const ARTICLE_WAIT_TIMEOUT: Duration = Duration::from_secs(30);

/// The semantic shell every full article page renders.
const ARTICLE_CONTAINER_SELECTOR: &str = "article";

/// The "Story Continues" expander that hides the lower body sections.
const EXPANDER_SELECTOR: &str = ".readmore button";

/// Cap on expander clicks for pages whose expander never goes away.
const MAX_EXPANDER_CLICKS: usize = 12;

static TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".cover-title").expect("title selector"));
static TIMESTAMP_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("time.byline-attr-meta-time").expect("timestamp selector"));
static BODY_PARAGRAPH_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".body p").expect("body paragraph selector"));

/// Extract one article, or record why it could not be had.
///
/// `settle` is the scroll/expander settle interval, [`super::SETTLE_INTERVAL`]
/// in production.
pub async fn extract<D: PageDriver>(driver: &D, url: &str, settle: Duration) -> Option<RawArticle> {
    match try_extract(driver, url, settle).await {
        Ok(article) => {
            debug!(article_id = %article.article_id, url = %url, "Extracted article");
            Some(article)
        }
        Err(e) => {
            warn!(url = %url, error = %e, "Article extraction failed");
            None
        }
    }
}

async fn try_extract<D: PageDriver>(
    driver: &D,
    url: &str,
    settle: Duration,
) -> DriverResult<RawArticle> {
    let page = driver.open(url, ARTICLE_NAV_TIMEOUT).await?;
    let outcome = scrape_article(&page, url, settle).await;
    close_quietly(page, "extract").await;
    outcome
}

async fn scrape_article<P: PageSession>(
    page: &P,
    url: &str,
    settle: Duration,
) -> DriverResult<RawArticle> {
    page.wait_for(ARTICLE_CONTAINER_SELECTOR, ARTICLE_WAIT_TIMEOUT)
        .await?;
    super::scroll_until_stable(page, settle).await?;
    expand_story(page, settle).await?;

    let html = page.content().await?;
    Ok(parse_article(&html, url))
}

/// Click through "Story Continues" expanders until none are left.
async fn expand_story<P: PageSession>(page: &P, settle: Duration) -> DriverResult<()> {
    let mut clicks = 0usize;
    while page.click_first(EXPANDER_SELECTOR).await? {
        clicks += 1;
        if clicks >= MAX_EXPANDER_CLICKS {
            warn!(clicks, "expander still present at click cap");
            break;
        }
        tokio::time::sleep(settle).await;
    }
    if clicks > 0 {
        debug!(clicks, "expanded story sections");
    }
    Ok(())
}

/// Parse the rendered article HTML into a raw record.
///
/// Title and timestamp are best-effort; the body is every paragraph under
/// the article body container, joined by newlines.
pub fn parse_article(html: &str, url: &str) -> RawArticle {
    let document = Html::parse_document(html);

    let title = document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty());

    let published_date = document
        .select(&TIMESTAMP_SELECTOR)
        .next()
        .and_then(|element| element.value().attr("data-timestamp"))
        .map(str::to_string);

    let content = document
        .select(&BODY_PARAGRAPH_SELECTOR)
        .map(|paragraph| paragraph.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
        .join("\n");

    RawArticle {
        article_id: article_id_from_url(url),
        title,
        content,
        url: url.to_string(),
        published_date,
    }
}
