use crate::actions::{js_string, with_timeout, BrowserContext, BrowserLauncher, PageDriver};
use crate::error::{BrowserError, Result};
use crate::fingerprint::FingerprintConfig;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures_util::stream::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Interval between element lookups while waiting for a selector.
const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Chromium browsing context driven over CDP.
pub struct BrowserEngine {
    browser: Mutex<Option<Browser>>,
    handler: JoinHandle<()>,
}

impl BrowserEngine {
    /// Launch a browser with a specific fingerprint
    pub async fn launch_with(fingerprint: FingerprintConfig, headless: bool) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(fingerprint.viewport_width, fingerprint.viewport_height)
            .args(fingerprint.launch_args());
        if !headless {
            builder = builder.with_head();
        }
        let config = builder.build().map_err(BrowserError::ChromiumError)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        // Drive CDP events for as long as the browser lives
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!("CDP handler event error: {}", e);
                }
            }
        });

        tracing::info!(
            headless,
            width = fingerprint.viewport_width,
            height = fingerprint.viewport_height,
            "Chromium launched"
        );

        Ok(Self {
            browser: Mutex::new(Some(browser)),
            handler,
        })
    }
}

#[async_trait::async_trait]
impl BrowserContext for BrowserEngine {
    async fn open_tab(&self) -> Result<Box<dyn PageDriver>> {
        let guard = self.browser.lock().await;
        let browser = guard
            .as_ref()
            .ok_or_else(|| BrowserError::ChromiumError("browser already shut down".to_string()))?;
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;
        Ok(Box::new(ChromiumTab { page }))
    }

    async fn shutdown(&self) -> Result<()> {
        let browser = self.browser.lock().await.take();
        if let Some(mut browser) = browser {
            if let Err(e) = browser.close().await {
                tracing::warn!("Failed to close browser cleanly: {}", e);
            }
            let _ = browser.wait().await;
        }
        self.handler.abort();
        Ok(())
    }
}

/// One Chromium tab.
pub struct ChromiumTab {
    page: Page,
}

impl ChromiumTab {
    async fn wait_for_element(&self, selector: &str, timeout: Duration) -> Result<Element> {
        let lookup = async {
            loop {
                if let Ok(element) = self.page.find_element(selector).await {
                    return Ok(element);
                }
                tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
            }
        };
        with_timeout(&format!("wait for {selector}"), timeout, lookup).await
    }
}

#[async_trait::async_trait]
impl PageDriver for ChromiumTab {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()> {
        let load = async {
            self.page
                .goto(url)
                .await
                .map_err(|e| BrowserError::NavigationError(format!("{url}: {e}")))?;
            Ok(())
        };
        with_timeout(&format!("navigate to {url}"), timeout, load).await
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
        self.wait_for_element(selector, timeout).await.map(|_| ())
    }

    async fn count_elements(&self, selector: &str) -> Result<usize> {
        let script = format!("document.querySelectorAll({}).length", js_string(selector));
        let value = self.evaluate(&script).await?;
        value
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| BrowserError::ScriptError(format!("non-numeric count: {value}")))
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| BrowserError::ScriptError(e.to_string()))?;
        // Scripts evaluating to `undefined` carry no value
        Ok(result
            .into_value::<serde_json::Value>()
            .unwrap_or(serde_json::Value::Null))
    }

    async fn get_attribute(
        &self,
        selector: &str,
        name: &str,
        timeout: Duration,
    ) -> Result<Option<String>> {
        let element = self.wait_for_element(selector, timeout).await?;
        element
            .attribute(name)
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))
    }

    async fn get_text(&self, selector: &str, timeout: Duration) -> Result<Option<String>> {
        let element = self.wait_for_element(selector, timeout).await?;
        element
            .inner_text()
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))
    }

    async fn get_all_texts(&self, selector: &str) -> Result<Vec<String>> {
        let script = format!(
            "Array.from(document.querySelectorAll({})).map(e => e.textContent || '')",
            js_string(selector)
        );
        let value = self.evaluate(&script).await?;
        Ok(string_array(&value))
    }

    async fn get_all_attributes(&self, selector: &str, name: &str) -> Result<Vec<String>> {
        let script = format!(
            "Array.from(document.querySelectorAll({})).map(e => e.getAttribute({}))",
            js_string(selector),
            js_string(name)
        );
        let value = self.evaluate(&script).await?;
        Ok(string_array(&value))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.page
            .close()
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))
    }
}

/// Keep the string entries of a JSON array, dropping nulls.
fn string_array(value: &serde_json::Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Launches one [`BrowserEngine`] per crawl session.
#[derive(Debug, Clone)]
pub struct ChromiumLauncher {
    config: mapscout_core::BrowserConfig,
}

impl ChromiumLauncher {
    pub fn new(config: mapscout_core::BrowserConfig) -> Self {
        Self { config }
    }
}

#[async_trait::async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self, headless: bool) -> Result<Arc<dyn BrowserContext>> {
        let fingerprint = FingerprintConfig::from_config(&self.config);
        let engine = BrowserEngine::launch_with(fingerprint, headless).await?;
        Ok(Arc::new(engine))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_string_array_drops_nulls() {
        let value = json!(["https://a", null, "https://b"]);
        assert_eq!(string_array(&value), vec!["https://a", "https://b"]);
    }

    #[test]
    fn test_string_array_non_array() {
        assert!(string_array(&json!(null)).is_empty());
        assert!(string_array(&json!(42)).is_empty());
    }
}
