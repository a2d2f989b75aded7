//! Scripted stand-ins for the two external boundaries: a page driver that
//! serves canned pages and a classifier that answers from stub rules.
//!
//! The sim driver also keeps the counters the concurrency tests read:
//! currently open pages, the high-water mark of simultaneously open
//! pages, and expander click hits.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::driver::{DriverError, DriverResult, PageDriver, PageSession};
use crate::enrich::{SENTIMENT_SCHEMA_NAME, TOPICS_SCHEMA_NAME};
use crate::inference::{ChatMessage, Classifier, InferenceError, ResponseSchema, Role};
use crate::scrape::{DOCUMENT_HEIGHT, SCROLL_TO_BOTTOM};

/// Everything a [`SimDriver`] needs to know to play one page.
#[derive(Debug, Clone)]
pub(crate) struct SimPageScript {
    html: String,
    /// Successive document heights reported to the scroll loop; the last
    /// value repeats once the list is exhausted.
    heights: Vec<u64>,
    fail_navigation: bool,
    missing_container: bool,
    expander_clicks: usize,
    open_delay: Duration,
}

impl Default for SimPageScript {
    fn default() -> Self {
        SimPageScript {
            html: "<html><body></body></html>".to_string(),
            heights: vec![100],
            fail_navigation: false,
            missing_container: false,
            expander_clicks: 0,
            open_delay: Duration::ZERO,
        }
    }
}

impl SimPageScript {
    pub(crate) fn html(mut self, html: &str) -> Self {
        self.html = html.to_string();
        self
    }

    pub(crate) fn heights(mut self, heights: &[u64]) -> Self {
        self.heights = heights.to_vec();
        self
    }

    pub(crate) fn fail_navigation(mut self) -> Self {
        self.fail_navigation = true;
        self
    }

    pub(crate) fn missing_container(mut self) -> Self {
        self.missing_container = true;
        self
    }

    pub(crate) fn expander_clicks(mut self, clicks: usize) -> Self {
        self.expander_clicks = clicks;
        self
    }

    pub(crate) fn open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = delay;
        self
    }
}

/// A minimal article page that satisfies the extraction selectors.
pub(crate) fn article_page(title: &str, body: &str) -> SimPageScript {
    SimPageScript::default().html(&format!(
        r#"<html><body><article>
             <h1 class="cover-title">{title}</h1>
             <time class="byline-attr-meta-time" data-timestamp="2026-08-24T12:00:00.000Z">today</time>
             <div class="body"><p>{body}</p></div>
           </article></body></html>"#
    ))
}

#[derive(Default)]
struct SimState {
    open_now: AtomicUsize,
    high_water: AtomicUsize,
    expander_hits: AtomicUsize,
}

/// In-process [`PageDriver`] playing scripted pages.
///
/// Opening a URL with no script is a navigation error, so a test that
/// fat-fingers a URL fails loudly instead of silently extracting nothing.
pub(crate) struct SimDriver {
    scripts: Mutex<HashMap<String, SimPageScript>>,
    state: Arc<SimState>,
}

impl SimDriver {
    pub(crate) fn new() -> Self {
        SimDriver {
            scripts: Mutex::new(HashMap::new()),
            state: Arc::new(SimState::default()),
        }
    }

    pub(crate) fn script_page(&self, url: &str, script: SimPageScript) {
        self.scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), script);
    }

    /// Pages open right now.
    pub(crate) fn open_pages(&self) -> usize {
        self.state.open_now.load(Ordering::SeqCst)
    }

    /// Most pages ever open at once.
    pub(crate) fn max_open_pages(&self) -> usize {
        self.state.high_water.load(Ordering::SeqCst)
    }

    /// Successful expander clicks across all pages.
    pub(crate) fn expander_hits(&self) -> usize {
        self.state.expander_hits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageDriver for SimDriver {
    type Page = SimPage;

    async fn open(&self, url: &str, _timeout: Duration) -> DriverResult<SimPage> {
        let script = self
            .scripts
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| DriverError::Navigation(format!("no scripted page for {url}")))?;

        if script.fail_navigation {
            return Err(DriverError::Navigation(format!(
                "scripted navigation failure for {url}"
            )));
        }

        let open_now = self.state.open_now.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.high_water.fetch_max(open_now, Ordering::SeqCst);

        if !script.open_delay.is_zero() {
            tokio::time::sleep(script.open_delay).await;
        }

        Ok(SimPage {
            html: script.html,
            missing_container: script.missing_container,
            heights: Mutex::new(script.heights.into()),
            scrolls: AtomicUsize::new(0),
            expander_remaining: AtomicUsize::new(script.expander_clicks),
            state: Arc::clone(&self.state),
        })
    }
}

pub(crate) struct SimPage {
    html: String,
    missing_container: bool,
    heights: Mutex<VecDeque<u64>>,
    scrolls: AtomicUsize,
    expander_remaining: AtomicUsize,
    state: Arc<SimState>,
}

impl SimPage {
    pub(crate) fn scroll_count(&self) -> usize {
        self.scrolls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageSession for SimPage {
    async fn wait_for(&self, selector: &str, timeout: Duration) -> DriverResult<()> {
        if self.missing_container {
            return Err(DriverError::Timeout {
                what: format!("selector {selector}"),
                timeout,
            });
        }
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> DriverResult<Value> {
        if script == SCROLL_TO_BOTTOM {
            self.scrolls.fetch_add(1, Ordering::SeqCst);
            return Ok(Value::Null);
        }
        if script == DOCUMENT_HEIGHT {
            let mut heights = self.heights.lock().unwrap();
            let height = if heights.len() > 1 {
                heights.pop_front().unwrap()
            } else {
                heights.front().copied().unwrap_or(0)
            };
            return Ok(json!(height));
        }
        Ok(Value::Null)
    }

    async fn click_first(&self, _selector: &str) -> DriverResult<bool> {
        let clicked = self
            .expander_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if clicked {
            self.state.expander_hits.fetch_add(1, Ordering::SeqCst);
        }
        Ok(clicked)
    }

    async fn content(&self) -> DriverResult<String> {
        Ok(self.html.clone())
    }

    async fn close(self) -> DriverResult<()> {
        self.state.open_now.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

enum ScriptedResponse {
    Json(Value),
    Fail,
}

struct StubRule {
    schema: String,
    needle: String,
    response: ScriptedResponse,
}

/// [`Classifier`] answering from needle-in-user-message stub rules.
///
/// Unmatched sentiment requests get a neutral verdict and unmatched topic
/// requests a one-entry list, so tests only script what they assert on.
pub(crate) struct ScriptedClassifier {
    rules: Vec<StubRule>,
    calls: AtomicUsize,
}

impl ScriptedClassifier {
    pub(crate) fn new() -> Self {
        ScriptedClassifier {
            rules: Vec::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn stub(mut self, schema: &str, needle: &str, response: Value) -> Self {
        self.rules.push(StubRule {
            schema: schema.to_string(),
            needle: needle.to_string(),
            response: ScriptedResponse::Json(response),
        });
        self
    }

    pub(crate) fn stub_failure(mut self, schema: &str, needle: &str) -> Self {
        self.rules.push(StubRule {
            schema: schema.to_string(),
            needle: needle.to_string(),
            response: ScriptedResponse::Fail,
        });
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    async fn classify(
        &self,
        messages: &[ChatMessage],
        schema: &ResponseSchema,
    ) -> Result<Value, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let user_text = messages
            .iter()
            .rev()
            .find(|message| matches!(message.role, Role::User))
            .map(|message| message.content.as_str())
            .unwrap_or("");

        for rule in &self.rules {
            if rule.schema == schema.name && user_text.contains(&rule.needle) {
                return match &rule.response {
                    ScriptedResponse::Json(value) => Ok(value.clone()),
                    ScriptedResponse::Fail => Err(InferenceError::Api {
                        status: 503,
                        message: "scripted failure".to_string(),
                    }),
                };
            }
        }

        match schema.name {
            SENTIMENT_SCHEMA_NAME => Ok(json!({"sentiment": "neutral"})),
            TOPICS_SCHEMA_NAME => Ok(json!({"key_topics": ["markets"]})),
            _ => Ok(Value::Null),
        }
    }
}
