//! Bounded-concurrency extraction of candidate place pages.
//!
//! Each candidate gets its own tab in the shared browsing context. At most
//! `max_concurrency` tabs are open at once; a candidate failure only skips
//! that candidate.

use crate::events::EventSink;
use crate::fields::FieldExtractor;
use crate::signal::SessionSignal;
use crate::store::{InsertOutcome, ResultStore};
use futures::stream::{FuturesUnordered, StreamExt};
use mapscout_browser::{BrowserContext, PageDriver};
use mapscout_core::CrawlConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Tally of one extraction batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Candidates handed to an extraction task
    pub dispatched: usize,
    /// New records stored
    pub accepted: usize,
    /// Records dropped as already seen
    pub duplicates: usize,
    /// Candidates that produced no record
    pub failed: usize,
}

impl BatchSummary {
    fn record(&mut self, outcome: CandidateOutcome) {
        match outcome {
            CandidateOutcome::Accepted => self.accepted += 1,
            CandidateOutcome::Duplicate => self.duplicates += 1,
            CandidateOutcome::Failed => self.failed += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CandidateOutcome {
    Accepted,
    Duplicate,
    Failed,
}

/// Fans candidate URLs out to extraction tasks, one tab each.
#[derive(Clone)]
pub struct ExtractionPool {
    context: Arc<dyn BrowserContext>,
    extractor: Arc<FieldExtractor>,
    store: ResultStore,
    events: EventSink,
    signal: SessionSignal,
    max_concurrency: usize,
    navigation_timeout: Duration,
    settle: Duration,
    region: Option<String>,
}

impl ExtractionPool {
    /// Pool over one browsing context, sized by `crawl.max_concurrent_extractions`.
    pub fn new(
        context: Arc<dyn BrowserContext>,
        extractor: Arc<FieldExtractor>,
        store: ResultStore,
        events: EventSink,
        signal: SessionSignal,
        crawl: &CrawlConfig,
    ) -> Self {
        Self {
            context,
            extractor,
            store,
            events,
            signal,
            max_concurrency: crawl.max_concurrent_extractions.max(1),
            navigation_timeout: crawl.tab_navigation_timeout(),
            settle: crawl.tab_settle(),
            region: None,
        }
    }

    /// Tag every extracted record with the crawl region.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Extract every candidate, waiting for all dispatched tasks.
    ///
    /// Dispatch stops as soon as the session is no longer running; tasks
    /// already in flight run to completion.
    pub async fn run(&self, candidates: Vec<String>, target: u32) -> BatchSummary {
        let mut summary = BatchSummary::default();
        self.events
            .info(format!("processing {} businesses", candidates.len()));

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks = FuturesUnordered::new();

        for url in candidates {
            if !self.signal.is_running() {
                break;
            }
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            if !self.signal.is_running() {
                break;
            }

            summary.dispatched += 1;
            let pool = self.clone();
            tasks.push(tokio::spawn(async move {
                let _permit = permit;
                pool.extract_candidate(&url, target).await
            }));
        }

        while let Some(joined) = tasks.next().await {
            match joined {
                Ok(outcome) => summary.record(outcome),
                Err(e) => {
                    tracing::debug!("extraction task ended abnormally: {}", e);
                    summary.failed += 1;
                }
            }
        }

        self.events
            .success(format!("batch complete, total {}", self.store.len()));
        tracing::debug!("batch summary: {:?}", summary);
        summary
    }

    async fn extract_candidate(&self, url: &str, target: u32) -> CandidateOutcome {
        let tab = match self.context.open_tab().await {
            Ok(tab) => tab,
            Err(e) => {
                tracing::debug!("could not open tab for {}: {}", url, e);
                return CandidateOutcome::Failed;
            }
        };

        let outcome = self.visit(tab.as_ref(), url, target).await;

        if let Err(e) = tab.close().await {
            tracing::debug!("closing tab for {} failed: {}", url, e);
        }
        outcome
    }

    async fn visit(&self, tab: &dyn PageDriver, url: &str, target: u32) -> CandidateOutcome {
        if let Err(e) = tab.navigate(url, self.navigation_timeout).await {
            tracing::debug!("navigation to {} failed: {}", url, e);
            return CandidateOutcome::Failed;
        }
        if !self.signal.sleep(self.settle).await {
            return CandidateOutcome::Failed;
        }

        let record = match self.extractor.extract(tab, self.region.as_deref()).await {
            Ok(record) => record,
            Err(miss) => {
                tracing::debug!("no name on {}: {}", url, miss);
                return CandidateOutcome::Failed;
            }
        };

        match self.store.insert(record, target) {
            InsertOutcome::Accepted(_) => CandidateOutcome::Accepted,
            InsertOutcome::Duplicate => CandidateOutcome::Duplicate,
            InsertOutcome::Unnamed | InsertOutcome::Sealed => CandidateOutcome::Failed,
        }
    }
}
