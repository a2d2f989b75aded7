//! Transformation stage: raw article logs in, cleaned batches out.
//!
//! Two derived renditions of each body text:
//! - `processed_content`, a lowercased plain-text form for the classifier
//!   (markup stripped, punctuation spaced out, whitespace collapsed);
//! - `compressed_content`, a gzip + base64 archive of the original body so
//!   storage records stay small without losing the source text.
//!
//! The stage is pure given its input files. Gzip output here carries no
//! timestamp, so re-running over the same raw input rewrites the cleaned
//! batch byte for byte.

use std::io::{Read, Write};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::NaiveDate;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{info, instrument};

use crate::models::{ProcessedArticle, Symbol};
use crate::store::DataStore;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<.*?>").expect("tag pattern"));
static NON_ALNUM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9\s]").expect("non-alnum pattern"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

/// Normalize body text for classification.
///
/// Strips leftover markup, replaces everything outside `[a-zA-Z0-9\s]`
/// with a space, collapses whitespace runs, trims, and lowercases.
pub fn clean_text(text: &str) -> String {
    let text = TAG_RE.replace_all(text, "");
    let text = NON_ALNUM_RE.replace_all(&text, " ");
    let text = WHITESPACE_RE.replace_all(&text, " ");
    text.trim().to_lowercase()
}

/// Gzip `text` and base64-encode the result for JSON transport.
pub fn compress_text(text: &str) -> std::io::Result<String> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes())?;
    Ok(BASE64.encode(encoder.finish()?))
}

/// Invert [`compress_text`]: base64-decode, gunzip, return the text.
pub fn decompress_text(encoded: &str) -> crate::Result<String> {
    let compressed = BASE64.decode(encoded)?;
    let mut decoder = GzDecoder::new(compressed.as_slice());
    let mut text = String::new();
    decoder.read_to_string(&mut text)?;
    Ok(text)
}

/// Transform all raw articles logged for `symbol` on `date` into one
/// cleaned batch.
///
/// Returns `Ok(None)` when no raw log exists for the key, or when the
/// logs hold no articles, without writing anything. A symbol whose
/// extractions all failed stays a no-op here and at every later stage.
#[instrument(level = "info", skip_all, fields(symbol = %symbol, date = %date))]
pub async fn transform(
    store: &DataStore,
    symbol: &Symbol,
    date: NaiveDate,
) -> crate::Result<Option<usize>> {
    let Some(raw_articles) = store.read_raw_articles(symbol, date).await? else {
        info!("No raw articles for this key; nothing to transform");
        return Ok(None);
    };
    if raw_articles.is_empty() {
        info!("Raw log is empty; nothing to transform");
        return Ok(None);
    }

    let mut batch = Vec::with_capacity(raw_articles.len());
    for article in raw_articles {
        let processed_content = clean_text(&article.content);
        let compressed_content = compress_text(&article.content)?;
        batch.push(ProcessedArticle {
            raw: article,
            processed_content,
            compressed_content,
        });
    }

    store.write_cleaned(symbol, date, &batch).await?;
    Ok(Some(batch.len()))
}
