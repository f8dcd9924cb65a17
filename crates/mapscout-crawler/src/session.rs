//! The drive loop of one crawl session.
//!
//! Locations are visited in order, and every search term within each one.
//! Each `(location, term)` pair is a strict navigate -> scroll -> extract
//! sequence on a single search tab. Nothing in here fails the session: page
//! loads are retried and then tolerated, scroll and extraction degrade to
//! fewer results.

use crate::events::EventSink;
use crate::expander::SearchPlan;
use crate::fields::FieldExtractor;
use crate::pool::ExtractionPool;
use crate::scroll::ScrollDetector;
use crate::signal::SessionSignal;
use crate::store::ResultStore;
use crate::url_builder::{build_search_url, resolve_place_url};
use mapscout_browser::{BrowserContext, PageDriver};
use mapscout_core::AppConfig;
use std::sync::Arc;
use std::time::Duration;

/// Everything the drive task needs, fixed at session start.
pub(crate) struct Session {
    pub config: Arc<AppConfig>,
    pub plan: SearchPlan,
    pub region: String,
    pub target: u32,
    pub store: ResultStore,
    pub events: EventSink,
    pub signal: SessionSignal,
}

impl Session {
    fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.config.browser.navigation_timeout_secs)
    }

    /// Run the whole search plan against `context`.
    pub async fn drive(&self, context: Arc<dyn BrowserContext>) {
        let page = match context.open_tab().await {
            Ok(page) => page,
            Err(e) => {
                self.events.error(format!("could not open search tab: {e}"));
                self.events
                    .error_log(format!("could not open search tab: {e}"));
                return;
            }
        };

        let extractor = Arc::new(FieldExtractor::from_config(
            &self.config.crawl,
            &self.config.selectors,
        ));
        let pool = ExtractionPool::new(
            context,
            extractor,
            self.store.clone(),
            self.events.clone(),
            self.signal.clone(),
            &self.config.crawl,
        )
        .with_region(self.region.clone());
        let detector = ScrollDetector::from_config(&self.config.crawl, &self.config.selectors);

        self.visit_plan(page.as_ref(), &detector, &pool).await;

        if let Err(e) = page.close().await {
            tracing::debug!("closing search tab failed: {}", e);
        }

        self.events.success(format!(
            "crawl finished: {} businesses",
            self.store.len()
        ));
    }

    async fn visit_plan(
        &self,
        page: &dyn PageDriver,
        detector: &ScrollDetector,
        pool: &ExtractionPool,
    ) {
        let terms = self.plan.terms();
        let locations = self.plan.locations();
        let announce = self.plan.len() > 1;

        'locations: for (loc_idx, location) in locations.iter().enumerate() {
            if !self.signal.is_running() {
                break;
            }

            for (term_idx, term) in terms.iter().enumerate() {
                if !self.signal.is_running() || !self.signal.wait_if_paused().await {
                    break 'locations;
                }
                if self.store.remaining(self.target) == 0 {
                    self.events
                        .success(format!("target of {} reached", self.target));
                    break 'locations;
                }

                if announce {
                    self.events.info(format!(
                        "term {}/{} in area {}/{}: {} @ {}",
                        term_idx + 1,
                        terms.len(),
                        loc_idx + 1,
                        locations.len(),
                        term,
                        location
                    ));
                }

                self.search(page, term, location, detector, pool).await;
            }
        }
    }

    /// One navigate -> scroll -> extract pass.
    async fn search(
        &self,
        page: &dyn PageDriver,
        term: &str,
        location: &str,
        detector: &ScrollDetector,
        pool: &ExtractionPool,
    ) {
        let url = build_search_url(&self.config.crawl.search_base_url, term, location);
        self.navigate_with_retry(page, &url).await;
        if !self.signal.is_running() {
            return;
        }

        let outcome = detector
            .converge(page, self.target as usize, &self.signal, &self.events)
            .await;
        tracing::debug!("scroll outcome for {} @ {}: {:?}", term, location, outcome);

        if !self.signal.is_running() {
            return;
        }

        let remaining = self.store.remaining(self.target);
        if remaining == 0 {
            return;
        }

        self.events.info("extracting business data...");
        let hrefs = match page
            .get_all_attributes(&self.config.selectors.place_links, "href")
            .await
        {
            Ok(hrefs) => hrefs,
            Err(e) => {
                self.events
                    .error_log(format!("could not read result links: {e}"));
                return;
            }
        };

        let candidates: Vec<String> = hrefs
            .iter()
            .filter_map(|href| resolve_place_url(&url, href))
            .take(remaining)
            .collect();

        pool.run(candidates, self.target).await;
    }

    /// Navigate with a fixed backoff between attempts.
    ///
    /// Returns whether the page loaded. Exhausting every attempt is logged
    /// and otherwise ignored; the caller carries on with whatever loaded.
    pub async fn navigate_with_retry(&self, page: &dyn PageDriver, url: &str) -> bool {
        let attempts = self.config.crawl.retry_attempts.max(1);

        for attempt in 1..=attempts {
            self.events
                .info(format!("loading page (attempt {attempt})..."));

            match page.navigate(url, self.navigation_timeout()).await {
                Ok(()) => {
                    self.signal
                        .sleep(self.config.crawl.post_navigation_settle())
                        .await;
                    self.events.success("page loaded");
                    return true;
                }
                Err(e) if attempt < attempts => {
                    tracing::warn!(
                        "Navigation failed (attempt {}/{}), retrying in {:?}: {}",
                        attempt,
                        attempts,
                        self.config.crawl.retry_backoff(),
                        e
                    );
                    if !self.signal.sleep(self.config.crawl.retry_backoff()).await {
                        return false;
                    }
                }
                Err(e) => {
                    self.events.error_log(format!("error loading page: {e}"));
                }
            }
        }
        false
    }
}
