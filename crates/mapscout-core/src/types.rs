//! Shared types used across MapScout.
//!
//! This module defines the extracted business record, its deduplication
//! identity, and the crawl session state enum.

use crate::text;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A business extracted from a single place page.
///
/// Only `name` is mandatory; every other field is filled best-effort and
/// stays `None` when its read failed or came back empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessRecord {
    /// Business display name
    pub name: String,
    /// Street address with the label prefix removed
    pub address: Option<String>,
    /// Phone number with the label prefix removed
    pub phone: Option<String>,
    /// Star rating as displayed (e.g. `"4,5"`)
    pub rating: Option<String>,
    /// Review count, digits only
    pub review_count: Option<String>,
    /// Opening-hours summary (e.g. `"Abierto · Cierra a las 22:00"`)
    pub open_status: Option<String>,
    /// First non-provider email found in the summary block
    pub email: Option<String>,
    /// Business website
    pub website: Option<String>,
    /// Region the crawl was started for
    pub region: Option<String>,
}

impl BusinessRecord {
    /// Create a record with only a name set.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the address (builder style).
    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// A record is only stored when its name is non-blank.
    #[must_use]
    pub fn is_acceptable(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

/// Normalized `(name, address)` identity used to collapse duplicate extractions.
///
/// Both parts are lowercased, accent-folded, whitespace-collapsed and trimmed,
/// so `"Botica Central "` and `"botica  central"` produce equal keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DedupKey {
    name: String,
    address: String,
}

impl DedupKey {
    /// Build a key from raw name and address strings.
    #[must_use]
    pub fn new(name: &str, address: &str) -> Self {
        Self {
            name: text::normalize(name),
            address: text::normalize(address),
        }
    }

    /// Build the key for a record; a missing address counts as empty.
    #[must_use]
    pub fn for_record(record: &BusinessRecord) -> Self {
        Self::new(&record.name, record.address.as_deref().unwrap_or_default())
    }

    /// Normalized name component.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Normalized address component.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {}", self.name, self.address)
    }
}

/// Lifecycle state of a crawl session.
///
/// `Paused` is only reachable from `Running`. `Stopped` is terminal for the
/// session; a new session may be started from it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No session has run yet
    #[default]
    Idle,
    /// Drive loop is active
    Running,
    /// Drive loop is suspended at a checkpoint
    Paused,
    /// Stop requested; drive loop is winding down
    Stopping,
    /// Session finished or was stopped
    Stopped,
}

impl SessionState {
    /// Whether the session counts as running for status reporting.
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }

    /// Whether a new session may be started from this state.
    #[must_use]
    pub fn can_start(self) -> bool {
        matches!(self, Self::Idle | Self::Stopped)
    }

    /// Whether a stop request has been issued or completed.
    #[must_use]
    pub fn is_halting(self) -> bool {
        matches!(self, Self::Stopping | Self::Stopped)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_key_collapses_case_and_whitespace() {
        let a = DedupKey::new("Botica Central", "Av. Principal 123");
        let b = DedupKey::new("  botica   CENTRAL ", "Av. Principal 123   ");
        assert_eq!(a, b);
        assert_eq!(a.name(), "botica central");
        assert_eq!(a.address(), "av. principal 123");
    }

    #[test]
    fn test_dedup_key_folds_accents() {
        let a = DedupKey::new("Panadería Ñaño", "Jesús María");
        let b = DedupKey::new("panaderia nano", "jesus maria");
        assert_eq!(a, b);
    }

    #[test]
    fn test_dedup_key_idempotent() {
        let raw = DedupKey::new(" Café  Perú ", "Calle Lima\t45 ");
        let again = DedupKey::new(raw.name(), raw.address());
        assert_eq!(raw, again);
    }

    #[test]
    fn test_dedup_key_missing_address() {
        let record = BusinessRecord::named("Hotel Sol");
        assert_eq!(DedupKey::for_record(&record), DedupKey::new("hotel sol", ""));
    }

    #[test]
    fn test_record_acceptance() {
        assert!(BusinessRecord::named("Ferretería Lima").is_acceptable());
        assert!(!BusinessRecord::named("   ").is_acceptable());
        assert!(!BusinessRecord::default().is_acceptable());
    }

    #[test]
    fn test_record_serialization() {
        let mut record = BusinessRecord::named("Botica Central").with_address("Av. Principal 123");
        record.review_count = Some("120".to_string());
        let json = serde_json::to_string(&record).expect("serialize record");
        assert!(json.contains("\"reviewCount\":\"120\""));
        assert!(json.contains("\"openStatus\":null"));
    }

    #[test]
    fn test_session_state_predicates() {
        assert!(SessionState::Idle.can_start());
        assert!(SessionState::Stopped.can_start());
        assert!(!SessionState::Running.can_start());
        assert!(!SessionState::Stopping.can_start());

        assert!(SessionState::Running.is_active());
        assert!(SessionState::Paused.is_active());
        assert!(!SessionState::Stopping.is_active());

        assert!(SessionState::Stopping.is_halting());
        assert!(SessionState::Stopped.is_halting());
        assert!(!SessionState::Paused.is_halting());
    }

    #[test]
    fn test_session_state_serialization() {
        let json = serde_json::to_string(&SessionState::Stopping).expect("serialize state");
        assert_eq!(json, "\"stopping\"");
        assert_eq!(SessionState::Paused.to_string(), "paused");
    }
}
