//! Scripted in-memory browser for crawler tests.
//!
//! A [`FakeSite`] holds the search feed and the place pages; every tab opened
//! through [`FakeLauncher`] reads from it and records what it was asked to do.

#![allow(dead_code)]

use async_trait::async_trait;
use mapscout_browser::{BrowserContext, BrowserError, BrowserLauncher, PageDriver, Result};
use mapscout_core::{AppConfig, SelectorConfig};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const PLACE_BASE: &str = "https://www.google.com/maps/place/";

/// Content of one place page.
#[derive(Debug, Clone, Default)]
pub struct Place {
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub rating: Option<String>,
    pub reviews: Option<String>,
    pub status: Option<String>,
    pub website: Option<String>,
    pub summary: Vec<String>,
}

impl Place {
    pub fn new(name: &str, address: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            address: Some(format!("Dirección: {address}")),
            ..Self::default()
        }
    }

    pub fn unnamed() -> Self {
        Self::default()
    }
}

#[derive(Debug, Default)]
pub struct SiteState {
    /// Search navigations that fail before one succeeds
    pub search_failures: usize,
    /// Whether the results feed ever appears
    pub feed_missing: bool,
    /// Successive feed item counts; the last one repeats
    pub feed_counts: VecDeque<usize>,
    /// Place hrefs listed on every search page
    pub links: Vec<String>,
    pub places: HashMap<String, Place>,
    /// How long a place page takes to load
    pub place_delay: Duration,

    pub navigations: Vec<String>,
    pub search_navigations: usize,
    pub scrolls: usize,
    pub open_tabs: usize,
    pub max_open_tabs: usize,
    pub tabs_opened: usize,
    pub shutdowns: usize,
    pub launched_headless: Option<bool>,
}

#[derive(Debug, Default)]
pub struct FakeSite {
    pub state: Mutex<SiteState>,
    selectors: SelectorConfig,
}

impl FakeSite {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A site whose feed shows every link immediately.
    pub fn with_places(places: Vec<Place>) -> Arc<Self> {
        let site = Self::new();
        {
            let mut state = site.state();
            for (i, place) in places.into_iter().enumerate() {
                let url = format!("{PLACE_BASE}place-{i}");
                state.links.push(url.clone());
                state.places.insert(url, place);
            }
            let count = state.links.len();
            state.feed_counts = VecDeque::from(vec![count]);
        }
        site
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, SiteState> {
        self.state.lock().unwrap()
    }

    fn next_feed_count(&self) -> usize {
        let mut state = self.state();
        if state.feed_counts.len() > 1 {
            state.feed_counts.pop_front().unwrap_or_default()
        } else {
            state.feed_counts.front().copied().unwrap_or_default()
        }
    }
}

pub struct FakeTab {
    site: Arc<FakeSite>,
    current: Mutex<Option<String>>,
}

impl FakeTab {
    fn place(&self) -> Option<Place> {
        let current = self.current.lock().unwrap().clone()?;
        self.site.state().places.get(&current).cloned()
    }

    fn missing(selector: &str) -> BrowserError {
        BrowserError::SelectorNotFound(selector.to_string())
    }
}

#[async_trait]
impl PageDriver for FakeTab {
    async fn navigate(&self, url: &str, _timeout: Duration) -> Result<()> {
        let delay = {
            let mut state = self.site.state();
            state.navigations.push(url.to_string());
            if url.contains("/maps/search/") {
                state.search_navigations += 1;
                if state.search_failures > 0 {
                    state.search_failures -= 1;
                    return Err(BrowserError::NavigationError(
                        "net::ERR_CONNECTION_RESET".to_string(),
                    ));
                }
                Duration::ZERO
            } else {
                state.place_delay
            }
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        *self.current.lock().unwrap() = Some(url.to_string());
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
        if selector == self.site.selectors.feed && self.site.state().feed_missing {
            tokio::time::sleep(timeout).await;
            return Err(BrowserError::timeout(format!("wait for {selector}"), timeout));
        }
        Ok(())
    }

    async fn count_elements(&self, selector: &str) -> Result<usize> {
        if selector == self.site.selectors.feed_items {
            Ok(self.site.next_feed_count())
        } else {
            Ok(0)
        }
    }

    async fn evaluate(&self, _script: &str) -> Result<serde_json::Value> {
        self.site.state().scrolls += 1;
        Ok(serde_json::Value::Bool(true))
    }

    async fn get_attribute(
        &self,
        selector: &str,
        name: &str,
        _timeout: Duration,
    ) -> Result<Option<String>> {
        let place = self.place().ok_or_else(|| Self::missing(selector))?;
        let selectors = &self.site.selectors;
        let value = match (selector, name) {
            (s, "aria-label") if s == selectors.address => place.address,
            (s, "aria-label") if s == selectors.phone => place.phone,
            (s, "aria-label") if s == selectors.open_status => place.status,
            (s, "href") if s == selectors.website => place.website,
            _ => None,
        };
        value.map(Some).ok_or_else(|| Self::missing(selector))
    }

    async fn get_text(&self, selector: &str, _timeout: Duration) -> Result<Option<String>> {
        let place = self.place().ok_or_else(|| Self::missing(selector))?;
        let selectors = &self.site.selectors;
        let value = if selector == selectors.name {
            place.name
        } else if selector == selectors.rating {
            place.rating
        } else if selector == selectors.reviews {
            place.reviews
        } else {
            None
        };
        value.map(Some).ok_or_else(|| Self::missing(selector))
    }

    async fn get_all_texts(&self, selector: &str) -> Result<Vec<String>> {
        if selector == self.site.selectors.summary {
            Ok(self.place().map(|p| p.summary).unwrap_or_default())
        } else {
            Ok(Vec::new())
        }
    }

    async fn get_all_attributes(&self, selector: &str, name: &str) -> Result<Vec<String>> {
        if selector == self.site.selectors.place_links && name == "href" {
            Ok(self.site.state().links.clone())
        } else {
            Ok(Vec::new())
        }
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.site.state().open_tabs -= 1;
        Ok(())
    }
}

pub struct FakeBrowser {
    site: Arc<FakeSite>,
}

#[async_trait]
impl BrowserContext for FakeBrowser {
    async fn open_tab(&self) -> Result<Box<dyn PageDriver>> {
        {
            let mut state = self.site.state();
            state.open_tabs += 1;
            state.tabs_opened += 1;
            state.max_open_tabs = state.max_open_tabs.max(state.open_tabs);
        }
        Ok(Box::new(FakeTab {
            site: self.site.clone(),
            current: Mutex::new(None),
        }))
    }

    async fn shutdown(&self) -> Result<()> {
        self.site.state().shutdowns += 1;
        Ok(())
    }
}

pub struct FakeLauncher {
    site: Arc<FakeSite>,
    fail: bool,
}

impl FakeLauncher {
    pub fn new(site: Arc<FakeSite>) -> Arc<Self> {
        Arc::new(Self { site, fail: false })
    }

    pub fn failing(site: Arc<FakeSite>) -> Arc<Self> {
        Arc::new(Self { site, fail: true })
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self, headless: bool) -> Result<Arc<dyn BrowserContext>> {
        self.site.state().launched_headless = Some(headless);
        if self.fail {
            return Err(BrowserError::ChromiumError(
                "no Chrome executable found".to_string(),
            ));
        }
        Ok(Arc::new(FakeBrowser {
            site: self.site.clone(),
        }))
    }
}

/// Open a tab straight off a site, for driving components directly.
pub async fn open_tab(site: &Arc<FakeSite>) -> Box<dyn PageDriver> {
    FakeBrowser { site: site.clone() }.open_tab().await.unwrap()
}

pub fn test_config() -> AppConfig {
    AppConfig::default()
}
