//! Headless Chrome implementation of the rendering driver.
//!
//! One browser process serves the whole run. Each extraction job gets its
//! own tab via [`PageDriver::open`]; the CDP event handler runs on a
//! dedicated task for the lifetime of the driver.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, instrument};

use crate::driver::{DriverError, DriverResult, PageDriver, PageSession};

/// How often to re-probe the DOM while waiting for a selector.
const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(250);

fn session_fault(e: CdpError) -> DriverError {
    DriverError::Session(e.to_string())
}

/// A running headless Chrome instance.
pub struct ChromeDriver {
    browser: Mutex<Browser>,
    event_loop: JoinHandle<()>,
}

impl ChromeDriver {
    /// Launch a headless browser and start draining its CDP event stream.
    #[instrument(level = "info", skip_all)]
    pub async fn launch() -> DriverResult<Self> {
        let config = BrowserConfig::builder()
            .build()
            .map_err(DriverError::Session)?;
        let (browser, mut handler) = Browser::launch(config).await.map_err(session_fault)?;

        let event_loop = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        debug!("headless browser launched");
        Ok(Self {
            browser: Mutex::new(browser),
            event_loop,
        })
    }

    /// Close the browser and stop the event loop.
    ///
    /// Best-effort: the process is told to close, then reaped.
    #[instrument(level = "info", skip_all)]
    pub async fn shutdown(&self) -> DriverResult<()> {
        let mut browser = self.browser.lock().await;
        browser.close().await.map_err(session_fault)?;
        let _ = browser.wait().await;
        self.event_loop.abort();
        Ok(())
    }
}

#[async_trait]
impl PageDriver for ChromeDriver {
    type Page = ChromePage;

    async fn open(&self, url: &str, timeout: Duration) -> DriverResult<ChromePage> {
        let page = {
            let browser = self.browser.lock().await;
            browser
                .new_page("about:blank")
                .await
                .map_err(session_fault)?
        };

        let navigation = tokio::time::timeout(timeout, async {
            page.goto(url).await?;
            page.wait_for_navigation().await?;
            Ok::<_, CdpError>(())
        })
        .await;

        match navigation {
            Ok(Ok(())) => Ok(ChromePage { page }),
            Ok(Err(e)) => {
                let _ = page.close().await;
                Err(DriverError::Navigation(e.to_string()))
            }
            Err(_) => {
                let _ = page.close().await;
                Err(DriverError::Timeout {
                    what: format!("navigation to {url}"),
                    timeout,
                })
            }
        }
    }
}

/// One Chrome tab.
pub struct ChromePage {
    page: Page,
}

#[async_trait]
impl PageSession for ChromePage {
    async fn wait_for(&self, selector: &str, timeout: Duration) -> DriverResult<()> {
        let found = tokio::time::timeout(timeout, async {
            loop {
                if self.page.find_element(selector).await.is_ok() {
                    return;
                }
                tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
            }
        })
        .await;

        found.map_err(|_| DriverError::Timeout {
            what: format!("selector {selector}"),
            timeout,
        })
    }

    async fn evaluate(&self, script: &str) -> DriverResult<Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| DriverError::Evaluation(e.to_string()))?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn click_first(&self, selector: &str) -> DriverResult<bool> {
        match self.page.find_element(selector).await {
            Ok(element) => {
                element.click().await.map_err(session_fault)?;
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }

    async fn content(&self) -> DriverResult<String> {
        self.page.content().await.map_err(session_fault)
    }

    async fn close(self) -> DriverResult<()> {
        self.page.close().await.map_err(session_fault)
    }
}
