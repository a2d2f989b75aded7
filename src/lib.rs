//! # Ticker News Sentiment
//!
//! A market-news pipeline that discovers the latest articles for a set of
//! ticker symbols, extracts them from fully rendered pages, and annotates
//! each one with model-classified sentiment and key topics.
//!
//! ## Features
//!
//! - Discovers article links from each symbol's latest-news listing,
//!   scrolling until the stream stops growing
//! - Extracts article pages in parallel behind one run-wide admission
//!   gate, streaming results into a crash-safe line-delimited log
//! - Normalizes and gzip-archives article bodies for storage
//! - Classifies sentiment and key topics through an OpenAI-compatible
//!   chat completions endpoint, dropping anything that fails validation
//!
//! ## Usage
//!
//! ```sh
//! ticker_news_sentiment run article --quotes NFLX,TSLA,NVDA
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Discovery**: Collect article URLs from each symbol's listing page
//! 2. **Extraction**: Render and scrape article pages (gated, 5 at a time
//!    by default), appending raw records in completion order
//! 3. **Transformation**: Clean and compress body text into a processed
//!    batch
//! 4. **Enrichment**: Ask the model for sentiment and key topics, keeping
//!    only fully validated records

pub mod chrome;
pub mod cli;
pub mod driver;
pub mod enrich;
pub mod error;
pub mod inference;
pub mod models;
pub mod pipeline;
pub mod scrape;
pub mod store;
pub mod transform;
pub mod utils;

#[cfg(test)]
pub(crate) mod testkit;

pub use error::{PipelineError, Result};
