//! Enrichment stage: cleaned batches in, analyzed batches out.
//!
//! Every article gets two classification calls: a sentiment verdict and a
//! key-topic list. Both replies are validated against the record types
//! before anything is kept; an article whose calls fail or whose verdicts
//! do not parse is dropped whole. No partial or placeholder records reach
//! storage.

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::inference::{ChatMessage, Classifier, InferenceError, ResponseSchema};
use crate::models::{AnalyzedArticle, Sentiment, Symbol};
use crate::store::DataStore;

/// Topic lists are clipped here no matter how chatty the model gets.
const MAX_KEY_TOPICS: usize = 7;

pub(crate) const SENTIMENT_SCHEMA_NAME: &str = "sentiment_verdict";
pub(crate) const TOPICS_SCHEMA_NAME: &str = "key_topic_list";

const SENTIMENT_SYSTEM_PROMPT: &str = r#"You are a financial sentiment analyst. Judge the overall sentiment of a news article for investors in the companies it covers. Reply with a JSON object of the form {"sentiment": "..."} where the value is exactly one of "positive", "neutral", or "negative"."#;

const TOPICS_SYSTEM_PROMPT: &str = r#"You are a financial news analyst. Extract the key topics of a news article: companies, tickers, sectors, market moves, economic indicators, and notable events. Reply with a JSON object of the form {"key_topics": ["..."]} holding at most 7 short topic phrases."#;

/// Outcome counts for one symbol's enrichment batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrichStats {
    pub analyzed: usize,
    pub dropped: usize,
}

#[derive(Debug, Error)]
enum AnnotationFault {
    #[error("classification call failed: {0}")]
    Call(#[from] InferenceError),

    #[error("sentiment verdict rejected: {0}")]
    BadSentiment(serde_json::Error),

    #[error("topic verdict rejected: {0}")]
    BadTopics(serde_json::Error),
}

#[derive(Deserialize)]
struct SentimentVerdict {
    sentiment: Sentiment,
}

#[derive(Deserialize)]
struct TopicsVerdict {
    key_topics: Vec<String>,
}

fn sentiment_schema() -> ResponseSchema {
    ResponseSchema {
        name: SENTIMENT_SCHEMA_NAME,
        schema: json!({
            "type": "object",
            "properties": {
                "sentiment": {
                    "type": "string",
                    "enum": ["positive", "neutral", "negative"]
                }
            },
            "required": ["sentiment"]
        }),
    }
}

fn topics_schema() -> ResponseSchema {
    ResponseSchema {
        name: TOPICS_SCHEMA_NAME,
        schema: json!({
            "type": "object",
            "properties": {
                "key_topics": {
                    "type": "array",
                    "items": { "type": "string" }
                }
            },
            "required": ["key_topics"]
        }),
    }
}

async fn classify_sentiment<C: Classifier>(
    classifier: &C,
    text: &str,
) -> Result<Sentiment, AnnotationFault> {
    let messages = [
        ChatMessage::system(SENTIMENT_SYSTEM_PROMPT),
        ChatMessage::user(format!("News article:\n{text}")),
    ];
    let value = classifier.classify(&messages, &sentiment_schema()).await?;
    let verdict: SentimentVerdict =
        serde_json::from_value(value).map_err(AnnotationFault::BadSentiment)?;
    Ok(verdict.sentiment)
}

async fn classify_topics<C: Classifier>(
    classifier: &C,
    text: &str,
) -> Result<Vec<String>, AnnotationFault> {
    let messages = [
        ChatMessage::system(TOPICS_SYSTEM_PROMPT),
        ChatMessage::user(format!("News article:\n{text}")),
    ];
    let value = classifier.classify(&messages, &topics_schema()).await?;
    let verdict: TopicsVerdict =
        serde_json::from_value(value).map_err(AnnotationFault::BadTopics)?;
    let mut key_topics = verdict.key_topics;
    key_topics.truncate(MAX_KEY_TOPICS);
    Ok(key_topics)
}

async fn annotate<C: Classifier>(
    classifier: &C,
    text: &str,
) -> Result<(Sentiment, Vec<String>), AnnotationFault> {
    let sentiment = classify_sentiment(classifier, text).await?;
    let key_topics = classify_topics(classifier, text).await?;
    Ok((sentiment, key_topics))
}

/// Annotate the cleaned batch for `symbol` on `date`.
///
/// Returns `Ok(None)` when no cleaned batch exists for the key, or when
/// the batch holds no articles. Articles with empty processed content are
/// dropped without spending calls on them.
#[instrument(level = "info", skip_all, fields(symbol = %symbol, date = %date))]
pub async fn enrich<C: Classifier>(
    classifier: &C,
    store: &DataStore,
    symbol: &Symbol,
    date: NaiveDate,
) -> crate::Result<Option<EnrichStats>> {
    let Some(batch) = store.read_cleaned(symbol, date).await? else {
        info!("No cleaned batch for this key; nothing to enrich");
        return Ok(None);
    };
    if batch.is_empty() {
        info!("Cleaned batch is empty; nothing to enrich");
        return Ok(None);
    }

    let mut analyzed = Vec::with_capacity(batch.len());
    let mut dropped = 0usize;

    for article in batch {
        if article.processed_content.is_empty() {
            debug!(article_id = %article.raw.article_id, "Empty processed content; dropping");
            dropped += 1;
            continue;
        }

        match annotate(classifier, &article.processed_content).await {
            Ok((sentiment, key_topics)) => analyzed.push(AnalyzedArticle {
                article_id: article.raw.article_id,
                title: article.raw.title,
                url: article.raw.url,
                published_date: article.raw.published_date,
                compressed_content: article.compressed_content,
                sentiment,
                key_topics,
            }),
            Err(fault) => {
                warn!(
                    article_id = %article.raw.article_id,
                    error = %fault,
                    "Dropping article after failed annotation"
                );
                dropped += 1;
            }
        }
    }

    let stats = EnrichStats {
        analyzed: analyzed.len(),
        dropped,
    };
    store.write_analyzed(symbol, date, &analyzed).await?;
    info!(analyzed = stats.analyzed, dropped = stats.dropped, "Enrichment complete");
    Ok(Some(stats))
}
