//! MapScout Core - Foundation crate for the MapScout business crawler.
//!
//! This crate provides shared types, error handling, text normalization and
//! configuration management that the browser and crawler crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Configuration error type using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`text`] - Accent folding and whitespace normalization
//! - [`types`] - Shared domain types (`BusinessRecord`, `DedupKey`, `SessionState`)
//!
//! # Example
//!
//! ```rust
//! use mapscout_core::{AppConfig, BusinessRecord, DedupKey};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! assert_eq!(config.crawl.max_concurrent_extractions, 5);
//!
//! let record = BusinessRecord::named("Botica Central");
//! let key = DedupKey::for_record(&record);
//! assert_eq!(key.name(), "botica central");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod text;
pub mod types;

// Re-export commonly used types
pub use config::{
    AppConfig, BrowserConfig, CrawlConfig, EventsConfig, ExportConfig, SelectorConfig,
};
pub use error::{ConfigError, ConfigResult};
pub use types::{BusinessRecord, DedupKey, SessionState};
