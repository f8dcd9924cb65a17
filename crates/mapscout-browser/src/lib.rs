//! Browser automation for the MapScout crawler.
//!
//! Defines the page driver capability traits the crawler is written against
//! and a Chromium implementation with basic identity spoofing.

pub mod actions;
pub mod engine;
pub mod error;
pub mod fingerprint;

pub use actions::{BrowserContext, BrowserLauncher, PageDriver};
pub use engine::{BrowserEngine, ChromiumLauncher, ChromiumTab};
pub use error::{BrowserError, Result};
pub use fingerprint::FingerprintConfig;
