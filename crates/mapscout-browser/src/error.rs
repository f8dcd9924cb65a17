use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserError>;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("chromium error: {0}")]
    ChromiumError(String),

    #[error("navigation failed: {0}")]
    NavigationError(String),

    #[error("selector not found: {0}")]
    SelectorNotFound(String),

    #[error("timeout after {timeout:?}: {operation}")]
    Timeout { operation: String, timeout: Duration },

    #[error("script evaluation failed: {0}")]
    ScriptError(String),

    #[error("tab already closed")]
    TabClosed,
}

impl BrowserError {
    pub fn timeout(operation: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout,
        }
    }

    /// Timeouts and missing elements are expected on sparse place pages.
    pub fn is_absence(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::SelectorNotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BrowserError::NavigationError("net::ERR_NAME_NOT_RESOLVED".to_string());
        assert_eq!(
            err.to_string(),
            "navigation failed: net::ERR_NAME_NOT_RESOLVED"
        );
    }

    #[test]
    fn test_timeout_error() {
        let err = BrowserError::timeout("wait for div[role=\"feed\"]", Duration::from_secs(30));
        assert!(err.to_string().contains("30s"));
        assert!(err.is_absence());
        assert!(!BrowserError::TabClosed.is_absence());
    }
}
