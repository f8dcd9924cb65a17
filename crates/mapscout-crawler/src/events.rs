//! Progress events and the broadcast sink that fans them out.
//!
//! Publishing never waits: when nobody listens, or a listener falls more than
//! the channel capacity behind, events are dropped for that listener only and
//! the crawl carries on.

use mapscout_core::BusinessRecord;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Severity of a user-facing log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// An event emitted while a session runs.
///
/// Serialized as `{"type": "...", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum ProgressEvent {
    /// Human-readable status line.
    Log { message: String, severity: Severity },
    /// Store size against the session target.
    Progress {
        current: usize,
        total: u32,
        percentage: u64,
    },
    /// A newly accepted record and its 1-based position in the store.
    Result {
        record: BusinessRecord,
        index: usize,
    },
    /// A failure that ended (or prevented) the session.
    Error { message: String },
}

impl ProgressEvent {
    /// Build a progress event; `percentage` is `floor(current * 100 / total)`
    /// and is not clamped to 100.
    pub fn progress(current: usize, total: u32) -> Self {
        let percentage = if total == 0 {
            0
        } else {
            (current as u64).saturating_mul(100) / u64::from(total)
        };
        Self::Progress {
            current,
            total,
            percentage,
        }
    }
}

/// Cloneable publishing handle over a broadcast channel.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: broadcast::Sender<ProgressEvent>,
}

impl EventSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Register a new listener; it only sees events published afterwards.
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.tx.subscribe()
    }

    /// Publish an event, ignoring the absence of listeners.
    pub fn emit(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }

    /// Publish a log line and mirror it to tracing at the matching level.
    pub fn log(&self, severity: Severity, message: impl Into<String>) {
        let message = message.into();
        match severity {
            Severity::Info | Severity::Success => tracing::info!("{}", message),
            Severity::Warning => tracing::warn!("{}", message),
            Severity::Error => tracing::error!("{}", message),
        }
        self.emit(ProgressEvent::Log { message, severity });
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(Severity::Info, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.log(Severity::Success, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.log(Severity::Warning, message);
    }

    pub fn error_log(&self, message: impl Into<String>) {
        self.log(Severity::Error, message);
    }

    pub fn progress(&self, current: usize, total: u32) {
        self.emit(ProgressEvent::progress(current, total));
    }

    pub fn result(&self, record: BusinessRecord, index: usize) {
        self.emit(ProgressEvent::Result { record, index });
    }

    /// Publish a session-level failure. Not mirrored to tracing; callers
    /// pair it with an error log.
    pub fn error(&self, message: impl Into<String>) {
        self.emit(ProgressEvent::Error {
            message: message.into(),
        });
    }
}

impl Default for EventSink {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_log_wire_format() {
        let event = ProgressEvent::Log {
            message: "crawl finished: 3 businesses".to_string(),
            severity: Severity::Success,
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "type": "log",
                "data": {"message": "crawl finished: 3 businesses", "severity": "success"}
            })
        );
    }

    #[test]
    fn test_result_wire_format() {
        let record = BusinessRecord::named("Botica Central").with_address("Av. Principal 123");
        let value = serde_json::to_value(ProgressEvent::Result { record, index: 1 }).unwrap();
        assert_eq!(value["type"], "result");
        assert_eq!(value["data"]["index"], 1);
        assert_eq!(value["data"]["record"]["name"], "Botica Central");
    }

    #[test]
    fn test_progress_percentage_floors_and_is_unclamped() {
        assert_eq!(
            ProgressEvent::progress(1, 3),
            ProgressEvent::Progress {
                current: 1,
                total: 3,
                percentage: 33
            }
        );
        let ProgressEvent::Progress { percentage, .. } = ProgressEvent::progress(12, 10) else {
            panic!("expected progress event");
        };
        assert_eq!(percentage, 120);
    }

    #[test]
    fn test_emit_without_listeners_is_silent() {
        let sink = EventSink::new(4);
        sink.info("nobody is listening");

        let mut rx = sink.subscribe();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_subscribers_receive_in_order() {
        let sink = EventSink::new(16);
        let mut rx = sink.subscribe();

        sink.info("first");
        sink.progress(1, 10);
        sink.error("boom");

        assert!(matches!(rx.recv().await.unwrap(), ProgressEvent::Log { .. }));
        assert!(matches!(rx.recv().await.unwrap(), ProgressEvent::Progress { current: 1, .. }));
        assert_eq!(
            rx.recv().await.unwrap(),
            ProgressEvent::Error {
                message: "boom".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_lagging_listener_does_not_block_publisher() {
        let sink = EventSink::new(2);
        let mut rx = sink.subscribe();
        for i in 0..10 {
            sink.progress(i, 10);
        }
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(_))
        ));
    }
}
