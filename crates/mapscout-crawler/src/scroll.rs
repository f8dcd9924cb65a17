//! Scroll-to-convergence over the lazily loaded results feed.
//!
//! The feed grows as it is scrolled. The detector keeps scrolling until the
//! target count is visible, growth stalls for a number of consecutive
//! scrolls, an iteration cap is hit, or the session stops. Driver failures
//! end the loop with whatever count was last observed.

use crate::events::EventSink;
use crate::signal::SessionSignal;
use mapscout_browser::actions::js_string;
use mapscout_browser::PageDriver;
use mapscout_core::{CrawlConfig, SelectorConfig};
use std::time::Duration;

/// Why the scroll loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollReason {
    TargetReached,
    Stalled,
    IterationCap,
    Stopped,
    DriverError,
}

/// Final feed size and the reason scrolling ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollOutcome {
    pub count: usize,
    pub reason: ScrollReason,
}

#[derive(Debug, Clone)]
pub struct ScrollDetector {
    feed: String,
    feed_items: String,
    feed_wait_timeout: Duration,
    settle: Duration,
    stall_threshold: u32,
    max_iterations: u32,
}

impl ScrollDetector {
    pub fn from_config(crawl: &CrawlConfig, selectors: &SelectorConfig) -> Self {
        Self {
            feed: selectors.feed.clone(),
            feed_items: selectors.feed_items.clone(),
            feed_wait_timeout: crawl.feed_wait_timeout(),
            settle: crawl.scroll_settle(),
            stall_threshold: crawl.scroll_stall_threshold,
            max_iterations: crawl.scroll_max_iterations,
        }
    }

    fn scroll_script(&self) -> String {
        format!(
            "(() => {{ const feed = document.querySelector({}); \
             if (feed) {{ feed.scrollTop = feed.scrollHeight; \
             setTimeout(() => {{ feed.scrollTop = feed.scrollHeight + 1000; }}, 100); }} \
             return true; }})()",
            js_string(&self.feed)
        )
    }

    /// Scroll the feed until it holds at least `target` items or stops growing.
    ///
    /// Never fails: driver errors are reported as an error log and the last
    /// observed count is returned.
    pub async fn converge(
        &self,
        page: &dyn PageDriver,
        target: usize,
        signal: &SessionSignal,
        events: &EventSink,
    ) -> ScrollOutcome {
        events.info("loading results...");

        if let Err(e) = page
            .wait_for_selector(&self.feed, self.feed_wait_timeout)
            .await
        {
            events.error_log(format!("scroll error: {e}"));
            return ScrollOutcome {
                count: 0,
                reason: ScrollReason::DriverError,
            };
        }

        let script = self.scroll_script();
        let mut last_seen = 0;
        let mut previous = 0;
        let mut stall_streak = 0;
        let mut iterations = 0;

        let reason = loop {
            if iterations >= self.max_iterations {
                break ScrollReason::IterationCap;
            }
            if stall_streak >= self.stall_threshold {
                break ScrollReason::Stalled;
            }
            if !signal.is_running() {
                break ScrollReason::Stopped;
            }

            let current = match page.count_elements(&self.feed_items).await {
                Ok(n) => n,
                Err(e) => {
                    events.error_log(format!("scroll error: {e}"));
                    return ScrollOutcome {
                        count: last_seen,
                        reason: ScrollReason::DriverError,
                    };
                }
            };
            last_seen = current;

            if !signal.wait_if_paused().await {
                break ScrollReason::Stopped;
            }

            if current >= target {
                events.success(format!("enough results loaded: {current}"));
                break ScrollReason::TargetReached;
            }

            if let Err(e) = page.evaluate(&script).await {
                events.error_log(format!("scroll error: {e}"));
                return ScrollOutcome {
                    count: last_seen,
                    reason: ScrollReason::DriverError,
                };
            }

            if !signal.sleep(self.settle).await {
                break ScrollReason::Stopped;
            }
            iterations += 1;

            if current == previous {
                stall_streak += 1;
            } else {
                stall_streak = 0;
                previous = current;
                if current % 10 == 0 {
                    events.info(format!("loaded: {current} results"));
                }
            }
        };

        let count = match page.count_elements(&self.feed_items).await {
            Ok(n) => n,
            Err(e) => {
                tracing::debug!("final feed count failed: {}", e);
                last_seen
            }
        };
        tracing::debug!(
            "scroll ended after {} iterations: {:?}",
            iterations,
            reason
        );
        events.success(format!("total found: {count} results"));

        ScrollOutcome { count, reason }
    }
}
