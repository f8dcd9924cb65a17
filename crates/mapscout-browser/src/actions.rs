//! Page driver capability traits.
//!
//! The crawler only talks to the browser through these traits, so the whole
//! orchestration stack can run against a scripted driver in tests.

use crate::error::{BrowserError, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Operations on a single browser tab.
///
/// Every operation may fail independently with a timeout or not-found
/// condition; callers decide which failures are tolerable.
#[async_trait::async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate to a URL and wait for the DOM to load
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<()>;

    /// Wait for a selector to match at least one element
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()>;

    /// Count elements currently matching a selector
    async fn count_elements(&self, selector: &str) -> Result<usize>;

    /// Evaluate a script in the page and return its JSON value
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value>;

    /// Read an attribute of the first element matching `selector`,
    /// waiting up to `timeout` for it to appear
    async fn get_attribute(
        &self,
        selector: &str,
        name: &str,
        timeout: Duration,
    ) -> Result<Option<String>>;

    /// Read the text of the first element matching `selector`,
    /// waiting up to `timeout` for it to appear
    async fn get_text(&self, selector: &str, timeout: Duration) -> Result<Option<String>>;

    /// Text content of every element matching `selector` (no waiting)
    async fn get_all_texts(&self, selector: &str) -> Result<Vec<String>>;

    /// Attribute value of every element matching `selector` that carries it
    async fn get_all_attributes(&self, selector: &str, name: &str) -> Result<Vec<String>>;

    /// Close the tab, releasing its browser resources
    async fn close(self: Box<Self>) -> Result<()>;
}

/// A browsing context shared by all tabs of one session
/// (cookie jar, network identity).
#[async_trait::async_trait]
pub trait BrowserContext: Send + Sync {
    /// Open a new blank tab
    async fn open_tab(&self) -> Result<Box<dyn PageDriver>>;

    /// Close the browser and every tab still open
    async fn shutdown(&self) -> Result<()>;
}

/// Starts a browsing context for a crawl session.
#[async_trait::async_trait]
pub trait BrowserLauncher: Send + Sync {
    /// Launch a browser; `headless` comes from the crawl request
    async fn launch(&self, headless: bool) -> Result<Arc<dyn BrowserContext>>;
}

/// Run a browser future with a deadline, mapping elapsed time to
/// [`BrowserError::Timeout`].
pub async fn with_timeout<T, F>(operation: &str, timeout: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(BrowserError::timeout(operation, timeout)),
    }
}

/// Quote a string as a JavaScript literal for script interpolation.
pub fn js_string(value: &str) -> String {
    // serde_json string escaping is valid JavaScript string syntax
    serde_json::Value::String(value.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_string_escapes_quotes() {
        assert_eq!(
            js_string(r#"div[role="feed"]"#),
            r#""div[role=\"feed\"]""#
        );
        assert_eq!(js_string("plain"), "\"plain\"");
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_timeout_elapsed() {
        let result: Result<()> = with_timeout("slow op", Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(BrowserError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_with_timeout_passes_inner_error() {
        let result: Result<()> = with_timeout("fails", Duration::from_secs(1), async {
            Err(BrowserError::SelectorNotFound("h1".to_string()))
        })
        .await;
        assert!(matches!(result, Err(BrowserError::SelectorNotFound(_))));
    }
}
