//! Link discovery: one listing page per symbol, scrolled to exhaustion,
//! filtered down to article URLs.

use std::time::Duration;

use chrono::NaiveDate;
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{info, instrument};
use url::Url;

use crate::driver::{DriverResult, PageDriver, PageSession, close_quietly};
use crate::models::Symbol;
use crate::store::DataStore;

/// Listing pages are slow: the stream populates from script well after
/// the document loads.
const LISTING_NAV_TIMEOUT: Duration = Duration::from_secs(300);
const STREAM_WAIT_TIMEOUT: Duration = Duration::from_secs(30);

const STREAM_LIST_SELECTOR: &str = "ul.stream-items";

/// Only hyperlinks to full article pages count; video cards, quote pages,
/// and off-site promos share the same stream markup.
const ARTICLE_URL_PREFIX: &str = "https://finance.yahoo.com/news/";
const ARTICLE_URL_SUFFIX: &str = ".html";

static STREAM_LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("ul.stream-items li a").expect("stream link selector"));

/// The latest-news listing URL for a symbol.
pub fn listing_url(symbol: &Symbol) -> String {
    format!(
        "https://finance.yahoo.com/quote/{}/latest-news/",
        symbol.as_str()
    )
}

/// Pull every qualifying article URL out of listing-page HTML.
///
/// Relative hrefs are resolved against `base` before filtering, duplicates
/// collapse to their first occurrence, and document order is preserved.
pub fn collect_article_links(html: &str, base: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&STREAM_LINK_SELECTOR)
        .filter_map(|anchor| anchor.value().attr("href"))
        .filter_map(|href| base.join(href).ok())
        .map(String::from)
        .filter(|url| url.starts_with(ARTICLE_URL_PREFIX) && url.ends_with(ARTICLE_URL_SUFFIX))
        .unique()
        .collect()
}

/// Discover article links for `symbol` and persist the snapshot.
///
/// `settle` is the scroll settle interval, [`super::SETTLE_INTERVAL`] in
/// production. An empty result is a valid outcome (quiet ticker, empty
/// stream): the run records it and moves on without writing a snapshot.
#[instrument(level = "info", skip_all, fields(symbol = %symbol))]
pub async fn discover<D: PageDriver>(
    driver: &D,
    symbol: &Symbol,
    store: &DataStore,
    date: NaiveDate,
    settle: Duration,
) -> crate::Result<Vec<String>> {
    let url = listing_url(symbol);
    info!(url = %url, "Opening listing page");

    let page = driver.open(&url, LISTING_NAV_TIMEOUT).await?;
    let outcome = scrape_listing(&page, &url, settle).await;
    close_quietly(page, "discovery").await;
    let links = outcome?;

    if links.is_empty() {
        info!("No article links discovered");
        return Ok(links);
    }

    store.write_links(symbol, date, &links).await?;
    info!(links = links.len(), "Discovery complete");
    Ok(links)
}

async fn scrape_listing<P: PageSession>(
    page: &P,
    url: &str,
    settle: Duration,
) -> DriverResult<Vec<String>> {
    page.wait_for(STREAM_LIST_SELECTOR, STREAM_WAIT_TIMEOUT)
        .await?;
    super::scroll_until_stable(page, settle).await?;

    let html = page.content().await?;
    let base = Url::parse(url)
        .map_err(|e| crate::driver::DriverError::Navigation(format!("bad listing url: {e}")))?;
    Ok(collect_article_links(&html, &base))
}
