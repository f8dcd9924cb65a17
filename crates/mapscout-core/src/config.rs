//! Configuration management for MapScout.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides. Every timing constant of the crawl loop
//! lives here with its default, so tuning does not require a rebuild.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main application configuration.
///
/// This is loaded from `~/.config/mapscout/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Browser launch settings
    pub browser: BrowserConfig,
    /// Crawl loop timing and limits
    pub crawl: CrawlConfig,
    /// CSS selectors for the mapping service markup
    pub selectors: SelectorConfig,
    /// Progress event channel settings
    pub events: EventsConfig,
    /// Tabular export settings
    pub export: ExportConfig,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit file, defaulting when it is absent.
    pub fn load_from(config_path: &Path) -> ConfigResult<Self> {
        if config_path.exists() {
            tracing::debug!("Loading config from {}", config_path.display());
            let contents = fs::read_to_string(config_path)?;
            let config: Self = toml::from_str(&contents)?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `MAPSCOUT_HEADLESS`: Override browser headless mode (true/false)
    /// - `MAPSCOUT_MAX_CONCURRENCY`: Override concurrent extraction tabs
    /// - `MAPSCOUT_EXPORT_DIR`: Override export directory
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply `MAPSCOUT_*` environment overrides in place.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("MAPSCOUT_HEADLESS") {
            if let Ok(headless) = val.parse() {
                self.browser.headless = headless;
                tracing::debug!("Override browser.headless from env: {}", headless);
            }
        }

        if let Ok(val) = std::env::var("MAPSCOUT_MAX_CONCURRENCY") {
            if let Ok(max) = val.parse() {
                self.crawl.max_concurrent_extractions = max;
                tracing::debug!("Override crawl.max_concurrent_extractions from env: {}", max);
            }
        }

        if let Ok(val) = std::env::var("MAPSCOUT_EXPORT_DIR") {
            if !val.trim().is_empty() {
                tracing::debug!("Override export.output_dir from env: {}", val);
                self.export.output_dir = Some(PathBuf::from(val));
            }
        }
    }

    /// Reject values the crawl loop cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.crawl.retry_attempts == 0 {
            return Err(invalid("crawl.retry_attempts", "must be at least 1"));
        }
        if self.crawl.max_concurrent_extractions == 0 {
            return Err(invalid(
                "crawl.max_concurrent_extractions",
                "must be at least 1",
            ));
        }
        if self.crawl.scroll_stall_threshold == 0 {
            return Err(invalid("crawl.scroll_stall_threshold", "must be at least 1"));
        }
        if self.crawl.unlimited_target == 0 {
            return Err(invalid("crawl.unlimited_target", "must be at least 1"));
        }
        if self.events.channel_capacity == 0 {
            return Err(invalid("events.channel_capacity", "must be at least 1"));
        }
        Ok(())
    }

    /// Save configuration to the XDG config path and return that path.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<PathBuf> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    /// Write the configuration to `config_path`, creating parent directories.
    pub fn save_to(&self, config_path: &Path) -> ConfigResult<()> {
        let config_dir = config_path
            .parent()
            .ok_or_else(|| invalid("config_path", "no parent directory"))?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", config_path.display());

        fs::write(config_path, self.to_toml()?)?;
        Ok(())
    }

    /// Render the configuration as pretty-printed TOML.
    pub fn to_toml(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/mapscout/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("com", "mapscout", "mapscout").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path.
    ///
    /// Uses XDG base directories: `~/.local/share/mapscout`
    pub fn data_dir() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("com", "mapscout", "mapscout").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.data_dir().to_path_buf())
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// Browser launch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run browser in headless mode (a crawl request may override this)
    pub headless: bool,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
    /// Default navigation timeout in seconds
    pub navigation_timeout_secs: u64,
    /// Pass `--disable-blink-features=AutomationControlled` to Chromium
    pub disable_automation_flag: bool,
    /// Fixed user agent; a randomized desktop agent is used when unset
    pub user_agent: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1920,
            window_height: 1080,
            navigation_timeout_secs: 60,
            disable_automation_flag: true,
            user_agent: None,
        }
    }
}

/// Crawl loop timing and limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Navigation attempts per search page
    pub retry_attempts: u32,
    /// Fixed wait between navigation attempts in milliseconds
    pub retry_backoff_ms: u64,
    /// Wait after a successful search navigation in milliseconds
    pub post_navigation_settle_ms: u64,
    /// How long to wait for the results feed to appear, in seconds
    pub feed_wait_timeout_secs: u64,
    /// Wait after each scroll in milliseconds
    pub scroll_settle_ms: u64,
    /// Consecutive non-growing scrolls before accepting a partial list
    pub scroll_stall_threshold: u32,
    /// Hard cap on scroll iterations
    pub scroll_max_iterations: u32,
    /// Concurrent extraction tabs
    pub max_concurrent_extractions: usize,
    /// Place page navigation timeout in seconds
    pub tab_navigation_timeout_secs: u64,
    /// Wait after a place page loads in milliseconds
    pub tab_settle_ms: u64,
    /// Timeout for name, address and phone reads in milliseconds
    pub field_timeout_ms: u64,
    /// Timeout for rating, reviews, status and website reads in milliseconds
    pub short_field_timeout_ms: u64,
    /// Target used when a request has no (or a zero) target count
    pub unlimited_target: u32,
    /// How long `stop()` waits for the drive task before aborting it, in seconds
    pub stop_grace_secs: u64,
    /// Search endpoint; the encoded query is appended
    pub search_base_url: String,
    /// Country used when a request does not name one
    pub default_country: String,
}

impl CrawlConfig {
    /// Backoff between navigation attempts.
    #[must_use]
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Settle time after a successful search navigation.
    #[must_use]
    pub fn post_navigation_settle(&self) -> Duration {
        Duration::from_millis(self.post_navigation_settle_ms)
    }

    /// Bounded wait for the results feed.
    #[must_use]
    pub fn feed_wait_timeout(&self) -> Duration {
        Duration::from_secs(self.feed_wait_timeout_secs)
    }

    /// Settle time after each scroll.
    #[must_use]
    pub fn scroll_settle(&self) -> Duration {
        Duration::from_millis(self.scroll_settle_ms)
    }

    /// Place page navigation timeout.
    #[must_use]
    pub fn tab_navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.tab_navigation_timeout_secs)
    }

    /// Settle time after a place page loads.
    #[must_use]
    pub fn tab_settle(&self) -> Duration {
        Duration::from_millis(self.tab_settle_ms)
    }

    /// Timeout for the primary field reads.
    #[must_use]
    pub fn field_timeout(&self) -> Duration {
        Duration::from_millis(self.field_timeout_ms)
    }

    /// Timeout for the secondary field reads.
    #[must_use]
    pub fn short_field_timeout(&self) -> Duration {
        Duration::from_millis(self.short_field_timeout_ms)
    }

    /// Grace period for the drive task after a stop.
    #[must_use]
    pub fn stop_grace(&self) -> Duration {
        Duration::from_secs(self.stop_grace_secs)
    }

    /// Resolve a requested target count, mapping `None`/`0` to the unlimited sentinel.
    #[must_use]
    pub fn effective_target(&self, requested: Option<u32>) -> u32 {
        match requested {
            Some(n) if n > 0 => n,
            _ => self.unlimited_target,
        }
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            retry_attempts: 3,
            retry_backoff_ms: 2000,
            post_navigation_settle_ms: 3000,
            feed_wait_timeout_secs: 30,
            scroll_settle_ms: 1200,
            scroll_stall_threshold: 8,
            scroll_max_iterations: 100,
            max_concurrent_extractions: 5,
            tab_navigation_timeout_secs: 45,
            tab_settle_ms: 1500,
            field_timeout_ms: 8000,
            short_field_timeout_ms: 5000,
            unlimited_target: 1_000_000,
            stop_grace_secs: 10,
            search_base_url: "https://www.google.com/maps/search/".to_string(),
            default_country: "Perú".to_string(),
        }
    }
}

/// CSS selectors for the mapping service markup.
///
/// The service changes class names without notice; keeping these in config
/// lets a broken crawl be fixed by editing `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Scrollable results container
    pub feed: String,
    /// One element per loaded result
    pub feed_items: String,
    /// Anchors pointing to individual place pages
    pub place_links: String,
    /// Place name heading
    pub name: String,
    /// Address button (value in `aria-label`)
    pub address: String,
    /// Phone button (value in `aria-label`)
    pub phone: String,
    /// Rating element (value in text)
    pub rating: String,
    /// Review count element (value in text)
    pub reviews: String,
    /// Opening-hours element (value in `aria-label`)
    pub open_status: String,
    /// Website anchor (value in `href`)
    pub website: String,
    /// Summary block scanned for email addresses
    pub summary: String,
    /// Emails containing this fragment belong to the provider and are skipped
    pub provider_domain_fragment: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            feed: r#"div[role="feed"]"#.to_string(),
            feed_items: r#"div[role="feed"] > div"#.to_string(),
            place_links: r#"a[href*="/maps/place/"]"#.to_string(),
            name: "h1.DUwDvf".to_string(),
            address: r#"button[data-item-id="address"]"#.to_string(),
            phone: r#"button[data-item-id^="phone:tel:"]"#.to_string(),
            rating: r#"span[aria-label*="estrellas"]"#.to_string(),
            reviews: r#"span[aria-label*="reseñas"]"#.to_string(),
            open_status: r#"div[role="button"][data-item-id="oh"] div[aria-label]"#.to_string(),
            website: r#"a[data-item-id="authority"]"#.to_string(),
            summary: r#"div[data-item-id="summary"]"#.to_string(),
            provider_domain_fragment: "google".to_string(),
        }
    }
}

/// Progress event channel settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Broadcast buffer size; slow listeners past this lag and skip events
    pub channel_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
        }
    }
}

/// Tabular export settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Export root; defaults to `<data_dir>/results`
    pub output_dir: Option<PathBuf>,
}

impl ExportConfig {
    /// Resolve the export root directory.
    pub fn resolve_output_dir(&self) -> ConfigResult<PathBuf> {
        match &self.output_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(AppConfig::data_dir()?.join("results")),
        }
    }
}
