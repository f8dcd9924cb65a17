//! MapScout Crawler - crawl session orchestration.
//!
//! This crate drives a browser through a mapping service's search results
//! and turns every place page into a [`BusinessRecord`](mapscout_core::BusinessRecord).
//! It owns the session state machine, search-space expansion, the scroll
//! convergence loop and the bounded-concurrency extraction stage.
//!
//! # Features
//!
//! - Category synonym and capital-district expansion of the search space
//! - Page loads retried with a fixed backoff, then tolerated
//! - Scrolling until the target is visible or the feed stops growing
//! - Concurrent extraction with `(name, address)` deduplication
//! - Pause, resume and stop at well-defined checkpoints
//! - Progress events over a broadcast channel
//! - CSV export
//!
//! # Example
//!
//! ```rust,ignore
//! use mapscout_browser::ChromiumLauncher;
//! use mapscout_crawler::{CrawlController, CrawlRequest};
//! use std::sync::Arc;
//!
//! let config = mapscout_core::AppConfig::load_with_env()?;
//! let launcher = Arc::new(ChromiumLauncher::new(config.browser.clone()));
//! let controller = CrawlController::new(config, launcher);
//!
//! let mut events = controller.subscribe();
//! controller.start(CrawlRequest::new("farmacia", "Cusco").with_target(50))?;
//! controller.wait().await?;
//!
//! let path = controller.export(&output_dir)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

#[allow(missing_docs)]
pub mod controller;
#[allow(missing_docs)]
pub mod error;
#[allow(missing_docs)]
pub mod events;
pub mod expander;
pub mod export;
#[allow(missing_docs)]
pub mod fields;
pub mod pool;
#[allow(missing_docs)]
pub mod scroll;
mod session;
#[allow(missing_docs)]
pub mod signal;
#[allow(missing_docs)]
pub mod store;
#[allow(missing_docs)]
pub mod url_builder;

// Re-export commonly used types
pub use controller::{CrawlController, CrawlRequest, SessionStatus};
pub use error::{CrawlError, ExportError, Result};
pub use events::{EventSink, ProgressEvent, Severity};
pub use expander::{expand_region, expand_terms, SearchPlan};
pub use fields::{FieldExtractor, FieldMiss, FieldRead};
pub use pool::{BatchSummary, ExtractionPool};
pub use scroll::{ScrollDetector, ScrollOutcome, ScrollReason};
pub use signal::SessionSignal;
pub use store::{InsertOutcome, ResultStore};
pub use url_builder::build_search_url;
