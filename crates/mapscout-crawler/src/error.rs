use mapscout_core::SessionState;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("a crawl session is already {state}")]
    AlreadyRunning { state: SessionState },

    #[error("no active crawl session")]
    NoActiveSession,

    #[error("cannot {action} a session that is {from}")]
    InvalidTransition {
        from: SessionState,
        action: &'static str,
    },

    #[error("invalid crawl request: {0}")]
    InvalidRequest(String),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),
}

impl CrawlError {
    /// Precondition failures are rejected commands, not crawl faults.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::AlreadyRunning { .. }
                | Self::NoActiveSession
                | Self::InvalidTransition { .. }
                | Self::InvalidRequest(_)
                | Self::Export(ExportError::NoResults)
        )
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no results to export")]
    NoResults,

    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, CrawlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_error_display() {
        let err = CrawlError::InvalidTransition {
            from: SessionState::Paused,
            action: "pause",
        };
        assert_eq!(err.to_string(), "cannot pause a session that is paused");
        assert!(err.is_precondition());
    }

    #[test]
    fn test_export_no_results_is_precondition() {
        let err: CrawlError = ExportError::NoResults.into();
        assert!(err.is_precondition());
        assert_eq!(err.to_string(), "Export error: no results to export");
    }

    #[test]
    fn test_write_failure_is_not_precondition() {
        let err: CrawlError = ExportError::Io {
            path: PathBuf::from("/read-only/farmacia.csv"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        }
        .into();
        assert!(!err.is_precondition());
        assert!(err.to_string().contains("/read-only/farmacia.csv"));
    }
}
