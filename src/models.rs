//! Data models for ticker news articles at each pipeline stage.
//!
//! This module defines the core data structures used throughout the application:
//! - [`Symbol`]: A ticker symbol in canonical form
//! - [`RawArticle`]: Article data exactly as extracted from the rendered page
//! - [`ProcessedArticle`]: Raw data plus normalized and compressed body renditions
//! - [`AnalyzedArticle`]: The final storage record with model annotations
//!
//! Records flow strictly forward: raw articles are appended to a line-delimited
//! log during extraction, the transformer lifts them into processed batches, and
//! enrichment produces analyzed records while discarding the plain body text.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A ticker symbol, held in canonical uppercase form.
///
/// Construction trims whitespace and uppercases, so `" nflx "` and `"NFLX"`
/// compare equal. Listing URLs use the canonical form; on-disk artifact names
/// use the lowercase [`Symbol::file_key`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(raw: &str) -> Self {
        Symbol(raw.trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercase rendition used in artifact file names.
    pub fn file_key(&self) -> String {
        self.0.to_lowercase()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive a stable article id from an article URL.
///
/// The id is the token after the last hyphen of the URL's final path segment,
/// with any `.html` suffix removed first. For the article URLs this pipeline
/// follows, that token is the publisher's numeric story id.
///
/// # Examples
///
/// ```
/// use ticker_news_sentiment::models::article_id_from_url;
///
/// let id = article_id_from_url("https://finance.yahoo.com/news/nvidia-soars-123456789.html");
/// assert_eq!(id, "123456789");
/// ```
pub fn article_id_from_url(url: &str) -> String {
    let tail = url.trim_end_matches('/').rsplit('/').next().unwrap_or(url);
    let stem = tail.strip_suffix(".html").unwrap_or(tail);
    stem.rsplit('-').next().unwrap_or(stem).to_string()
}

/// A raw news article as captured from the rendered page.
///
/// `title` and `published_date` are optional because pages really do ship
/// without them; extraction records what it saw and moves on. `published_date`
/// stays an opaque string, preserving the page's own timestamp attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawArticle {
    /// Identifier derived from the article URL.
    pub article_id: String,
    /// The headline, when the page carried one.
    pub title: Option<String>,
    /// The article body as visible text, paragraphs joined by newlines.
    pub content: String,
    /// The source URL of the article.
    pub url: String,
    /// The page's machine-readable publication timestamp, verbatim.
    pub published_date: Option<String>,
}

/// A raw article with its transformed body renditions attached.
///
/// Serializes flat: the raw fields and the two derived fields live side by
/// side in one JSON object, so downstream readers never see the nesting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedArticle {
    #[serde(flatten)]
    pub raw: RawArticle,
    /// Lowercased plain text with markup and punctuation stripped.
    pub processed_content: String,
    /// Gzip-compressed body text, base64-encoded for JSON transport.
    pub compressed_content: String,
}

/// Model-assigned sentiment for one article.
///
/// Deserialization is strict: anything outside the three lowercase labels is
/// rejected, which is what keeps off-vocabulary model output from reaching
/// storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

/// The final storage record: annotations plus the compressed archive of the
/// body text. The bulky plain-text fields are gone for good.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzedArticle {
    pub article_id: String,
    pub title: Option<String>,
    pub url: String,
    pub published_date: Option<String>,
    pub compressed_content: String,
    pub sentiment: Sentiment,
    pub key_topics: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_normalizes_to_uppercase() {
        let symbol = Symbol::new("  nflx ");
        assert_eq!(symbol.as_str(), "NFLX");
        assert_eq!(symbol.file_key(), "nflx");
        assert_eq!(symbol.to_string(), "NFLX");
        assert_eq!(symbol, Symbol::new("NFLX"));
    }

    #[test]
    fn test_article_id_uses_last_hyphen_token() {
        assert_eq!(
            article_id_from_url("https://finance.yahoo.com/news/nvidia-stock-soars-123456789.html"),
            "123456789"
        );
    }

    #[test]
    fn test_article_id_tolerates_missing_suffix_and_hyphens() {
        assert_eq!(
            article_id_from_url("https://finance.yahoo.com/news/markets"),
            "markets"
        );
        assert_eq!(
            article_id_from_url("https://finance.yahoo.com/news/plain.html"),
            "plain"
        );
        assert_eq!(
            article_id_from_url("https://finance.yahoo.com/news/story-9.html/"),
            "9"
        );
    }

    #[test]
    fn test_raw_article_round_trips_with_missing_fields() {
        let line = r#"{"article_id":"42","title":null,"content":"body","url":"https://finance.yahoo.com/news/x-42.html","published_date":null}"#;
        let article: RawArticle = serde_json::from_str(line).unwrap();
        assert_eq!(article.article_id, "42");
        assert!(article.title.is_none());
        assert!(article.published_date.is_none());

        let back = serde_json::to_string(&article).unwrap();
        assert_eq!(back, line);
    }

    #[test]
    fn test_processed_article_serializes_flat() {
        let processed = ProcessedArticle {
            raw: RawArticle {
                article_id: "7".to_string(),
                title: Some("A title".to_string()),
                content: "Body!".to_string(),
                url: "https://finance.yahoo.com/news/a-7.html".to_string(),
                published_date: Some("2026-08-24T10:00:00.000Z".to_string()),
            },
            processed_content: "body".to_string(),
            compressed_content: "H4sIAA==".to_string(),
        };

        let value = serde_json::to_value(&processed).unwrap();
        let object = value.as_object().unwrap();
        assert!(object.contains_key("article_id"));
        assert!(object.contains_key("content"));
        assert!(object.contains_key("processed_content"));
        assert!(object.contains_key("compressed_content"));
        assert!(!object.contains_key("raw"));
    }

    #[test]
    fn test_sentiment_rejects_values_outside_the_enum() {
        assert!(serde_json::from_str::<Sentiment>(r#""positive""#).is_ok());
        assert!(serde_json::from_str::<Sentiment>(r#""neutral""#).is_ok());
        assert!(serde_json::from_str::<Sentiment>(r#""negative""#).is_ok());
        assert!(serde_json::from_str::<Sentiment>(r#""bullish""#).is_err());
        assert!(serde_json::from_str::<Sentiment>(r#""Positive""#).is_err());
    }

    #[test]
    fn test_analyzed_article_carries_no_plain_body() {
        let analyzed = AnalyzedArticle {
            article_id: "9".to_string(),
            title: None,
            url: "https://finance.yahoo.com/news/b-9.html".to_string(),
            published_date: None,
            compressed_content: "H4sIAA==".to_string(),
            sentiment: Sentiment::Negative,
            key_topics: vec!["earnings".to_string()],
        };

        let value = serde_json::to_value(&analyzed).unwrap();
        let object = value.as_object().unwrap();
        assert!(!object.contains_key("content"));
        assert!(!object.contains_key("processed_content"));
        assert_eq!(object["sentiment"], "negative");
        assert_eq!(object["key_topics"][0], "earnings");
    }
}
