//! Client for an OpenAI-compatible chat completions endpoint.
//!
//! Enrichment asks the model for structured verdicts, so every request
//! carries a `json_schema` response format and every reply is required to
//! be a single JSON document. The [`Classifier`] trait is the seam the
//! enrichment stage consumes; tests substitute a scripted implementation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::utils::truncate_for_log;

/// Default endpoint: the Hugging Face inference router's OpenAI-compatible
/// surface.
pub const DEFAULT_BASE_URL: &str = "https://router.huggingface.co/v1";
pub const DEFAULT_MODEL: &str = "Qwen/QwQ-32B";

const MAX_COMPLETION_TOKENS: u32 = 1024;
const TEMPERATURE: f32 = 0.7;
const TOP_P: f32 = 0.7;

/// Faults raised by the inference endpoint.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("inference request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("inference endpoint returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("inference response held no content")]
    EmptyResponse,

    #[error("inference response was not valid JSON: {preview}")]
    MalformedJson { preview: String },
}

/// One chat message in a classification request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// A named JSON schema the endpoint must shape its reply to.
#[derive(Debug, Clone)]
pub struct ResponseSchema {
    pub name: &'static str,
    pub schema: Value,
}

/// Something that can turn chat messages into a structured JSON verdict.
#[async_trait]
pub trait Classifier: Send + Sync + 'static {
    async fn classify(
        &self,
        messages: &[ChatMessage],
        schema: &ResponseSchema,
    ) -> Result<Value, InferenceError>;
}

/// HTTP client for the real endpoint.
pub struct InferenceClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl InferenceClient {
    /// Build a client for `base_url`, which must expose
    /// `POST {base_url}/chat/completions`.
    ///
    /// The bearer token is optional so that unauthenticated local
    /// endpoints work out of the box.
    pub fn new(base_url: &str, model: &str, api_key: Option<String>) -> Self {
        InferenceClient {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
    stream: bool,
    response_format: ResponseFormat<'a>,
}

#[derive(Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    format_type: &'static str,
    json_schema: JsonSchemaFormat<'a>,
}

#[derive(Serialize)]
struct JsonSchemaFormat<'a> {
    name: &'a str,
    strict: bool,
    schema: &'a Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl Classifier for InferenceClient {
    async fn classify(
        &self,
        messages: &[ChatMessage],
        schema: &ResponseSchema,
    ) -> Result<Value, InferenceError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: TEMPERATURE,
            top_p: TOP_P,
            max_tokens: MAX_COMPLETION_TOKENS,
            stream: false,
            response_format: ResponseFormat {
                format_type: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: schema.name,
                    strict: true,
                    schema: &schema.schema,
                },
            },
        };

        debug!(model = %self.model, schema = schema.name, "sending classification request");

        let mut call = self.http.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            call = call.bearer_auth(key);
        }
        let response = call.send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(InferenceError::Api {
                status: status.as_u16(),
                message: truncate_for_log(&message, 300),
            });
        }

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(InferenceError::EmptyResponse)?;

        serde_json::from_str(&content).map_err(|_| InferenceError::MalformedJson {
            preview: truncate_for_log(&content, 200),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chat_request_wire_shape() {
        let messages = vec![
            ChatMessage::system("You judge sentiment."),
            ChatMessage::user("News article:\nshares fell"),
        ];
        let schema = ResponseSchema {
            name: "sentiment_verdict",
            schema: json!({"type": "object"}),
        };
        let request = ChatRequest {
            model: "Qwen/QwQ-32B",
            messages: &messages,
            temperature: TEMPERATURE,
            top_p: TOP_P,
            max_tokens: MAX_COMPLETION_TOKENS,
            stream: false,
            response_format: ResponseFormat {
                format_type: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: schema.name,
                    strict: true,
                    schema: &schema.schema,
                },
            },
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "Qwen/QwQ-32B");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["role"], "user");
        assert_eq!(value["response_format"]["type"], "json_schema");
        assert_eq!(
            value["response_format"]["json_schema"]["name"],
            "sentiment_verdict"
        );
        assert_eq!(value["response_format"]["json_schema"]["strict"], true);
        assert_eq!(value["stream"], false);
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = InferenceClient::new("http://localhost:8080/v1/", "m", None);
        assert_eq!(client.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn test_chat_response_parses_missing_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.choices[0].message.content.is_none());
    }
}
