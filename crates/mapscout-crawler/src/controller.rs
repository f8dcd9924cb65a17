//! Command surface for crawl sessions.
//!
//! A [`CrawlController`] owns at most one active session at a time and the
//! result store that outlives it. Commands are validated against the session
//! state; rejected commands leave everything untouched.

use crate::error::{CrawlError, ExportError, Result};
use crate::events::{EventSink, ProgressEvent};
use crate::expander::SearchPlan;
use crate::export::export_records;
use crate::session::Session;
use crate::signal::SessionSignal;
use crate::store::ResultStore;
use mapscout_browser::{BrowserContext, BrowserLauncher};
use mapscout_core::{AppConfig, BusinessRecord, SessionState};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{broadcast, watch, OnceCell};
use tokio::task::JoinHandle;

/// Parameters of one crawl.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlRequest {
    /// Business category, e.g. `"farmacia"`
    pub category: String,
    /// Region name, e.g. `"Lima"` or `"Cusco"`
    pub region: String,
    /// Country appended to every location; the configured default when `None`
    #[serde(default)]
    pub country: Option<String>,
    /// Stop after this many records; `None` or `0` means no limit
    #[serde(default)]
    pub target_count: Option<u32>,
    #[serde(default = "default_true")]
    pub headless: bool,
    /// Search category synonyms as well as the category itself
    #[serde(default = "default_true")]
    pub expanded_search: bool,
}

fn default_true() -> bool {
    true
}

impl CrawlRequest {
    pub fn new(category: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            region: region.into(),
            country: None,
            target_count: None,
            headless: true,
            expanded_search: true,
        }
    }

    #[must_use]
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    #[must_use]
    pub fn with_target(mut self, target: u32) -> Self {
        self.target_count = Some(target);
        self
    }

    #[must_use]
    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    #[must_use]
    pub fn expanded(mut self, expanded: bool) -> Self {
        self.expanded_search = expanded;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.category.trim().is_empty() {
            return Err(CrawlError::InvalidRequest("category is empty".to_string()));
        }
        if self.region.trim().is_empty() {
            return Err(CrawlError::InvalidRequest("region is empty".to_string()));
        }
        Ok(())
    }
}

/// Snapshot returned by [`CrawlController::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub running: bool,
    pub paused: bool,
    pub result_count: usize,
    pub state: SessionState,
}

struct ActiveSession {
    request: CrawlRequest,
    state: Arc<watch::Sender<SessionState>>,
    handle: Option<JoinHandle<()>>,
    browser: Arc<OnceCell<Arc<dyn BrowserContext>>>,
}

impl ActiveSession {
    fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Atomically move `from -> to`, reporting the actual state on mismatch.
    fn transition(
        &self,
        from: SessionState,
        to: SessionState,
        action: &'static str,
    ) -> Result<()> {
        let mut actual = from;
        let changed = self.state.send_if_modified(|state| {
            actual = *state;
            if *state == from {
                *state = to;
                true
            } else {
                false
            }
        });
        if changed {
            Ok(())
        } else {
            Err(CrawlError::InvalidTransition {
                from: actual,
                action,
            })
        }
    }
}

/// Marks the session stopped when the drive task ends, however it ends.
struct StopOnExit(Arc<watch::Sender<SessionState>>);

impl Drop for StopOnExit {
    fn drop(&mut self) {
        self.0.send_replace(SessionState::Stopped);
    }
}

/// Starts, steers and inspects crawl sessions.
pub struct CrawlController {
    config: Arc<AppConfig>,
    launcher: Arc<dyn BrowserLauncher>,
    events: EventSink,
    store: ResultStore,
    session: Mutex<Option<ActiveSession>>,
}

impl CrawlController {
    pub fn new(config: AppConfig, launcher: Arc<dyn BrowserLauncher>) -> Self {
        let events = EventSink::new(config.events.channel_capacity);
        let store = ResultStore::new(events.clone());
        Self {
            config: Arc::new(config),
            launcher,
            events,
            store,
            session: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<ActiveSession>> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Start a new session in the background.
    ///
    /// Only valid when no session exists or the last one has stopped. The
    /// previous results are discarded; the browser is launched by the
    /// session task, so launch failures arrive as events.
    pub fn start(&self, request: CrawlRequest) -> Result<()> {
        request.validate()?;

        let mut slot = self.lock();
        if let Some(active) = slot.as_ref() {
            let state = active.state();
            if !state.can_start() {
                return Err(CrawlError::AlreadyRunning { state });
            }
        }

        let country = request
            .country
            .clone()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| self.config.crawl.default_country.clone());
        let plan = SearchPlan::build(
            &request.category,
            &request.region,
            &country,
            request.expanded_search,
        );
        let target = self.config.crawl.effective_target(request.target_count);

        self.store.reset();
        let (state_tx, signal) = SessionSignal::channel(SessionState::Running);
        let state_tx = Arc::new(state_tx);
        let browser = Arc::new(OnceCell::new());

        self.events.info(format!(
            "starting search: {} in {}, {}",
            request.category, request.region, country
        ));
        if plan.terms().len() > 1 {
            self.events
                .info(format!("smart search: {}", plan.terms().join(", ")));
        }

        let session = Session {
            config: self.config.clone(),
            plan,
            region: request.region.clone(),
            target,
            store: self.store.clone(),
            events: self.events.clone(),
            signal,
        };

        let handle = tokio::spawn(run_session(
            session,
            self.launcher.clone(),
            request.headless,
            browser.clone(),
            StopOnExit(state_tx.clone()),
        ));

        *slot = Some(ActiveSession {
            request,
            state: state_tx,
            handle: Some(handle),
            browser,
        });
        Ok(())
    }

    /// Suspend the drive loop at its next checkpoint.
    pub fn pause(&self) -> Result<()> {
        let slot = self.lock();
        let active = slot.as_ref().ok_or(CrawlError::NoActiveSession)?;
        active.transition(SessionState::Running, SessionState::Paused, "pause")?;
        self.events.warning("crawl paused");
        Ok(())
    }

    pub fn resume(&self) -> Result<()> {
        let slot = self.lock();
        let active = slot.as_ref().ok_or(CrawlError::NoActiveSession)?;
        active.transition(SessionState::Paused, SessionState::Running, "resume")?;
        self.events.info("crawl resumed");
        Ok(())
    }

    /// Stop the session and wait for it to wind down.
    ///
    /// The store is sealed first, so nothing is stored after this call
    /// starts. The drive task gets `stop_grace` to finish before it is
    /// aborted. Stopping a stopped session is a no-op.
    pub async fn stop(&self) -> Result<()> {
        let (handle, browser, state_tx) = {
            let mut slot = self.lock();
            let active = slot.as_mut().ok_or(CrawlError::NoActiveSession)?;
            let mut was = SessionState::Stopped;
            active.state.send_if_modified(|state| {
                was = *state;
                if state.is_halting() {
                    false
                } else {
                    *state = SessionState::Stopping;
                    true
                }
            });
            if was.is_halting() {
                return Ok(());
            }
            self.store.seal();
            (
                active.handle.take(),
                active.browser.clone(),
                active.state.clone(),
            )
        };

        self.events.warning("stopping crawl...");

        if let Some(mut handle) = handle {
            let grace = self.config.crawl.stop_grace();
            if tokio::time::timeout(grace, &mut handle).await.is_err() {
                tracing::warn!("Drive task still busy after {:?}, aborting", grace);
                handle.abort();
                let _ = handle.await;
                if let Some(context) = browser.get() {
                    if let Err(e) = context.shutdown().await {
                        tracing::warn!("Browser shutdown after abort failed: {}", e);
                    }
                }
            }
        }

        state_tx.send_replace(SessionState::Stopped);
        self.events.warning("crawl stopped");
        Ok(())
    }

    /// Wait until the current session has stopped.
    pub async fn wait(&self) -> Result<()> {
        let mut rx = {
            let slot = self.lock();
            let active = slot.as_ref().ok_or(CrawlError::NoActiveSession)?;
            active.state.subscribe()
        };
        // A dropped sender means the controller itself is gone.
        let _ = rx.wait_for(|state| *state == SessionState::Stopped).await;
        Ok(())
    }

    pub fn state(&self) -> SessionState {
        self.lock()
            .as_ref()
            .map_or(SessionState::Idle, ActiveSession::state)
    }

    pub fn status(&self) -> SessionStatus {
        let state = self.state();
        SessionStatus {
            running: state.is_active(),
            paused: state == SessionState::Paused,
            result_count: self.store.len(),
            state,
        }
    }

    /// Records of the current (or last) session in discovery order.
    pub fn results(&self) -> Vec<BusinessRecord> {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.events.subscribe()
    }

    /// Write the current results to a CSV file under `dir`.
    ///
    /// # Errors
    /// [`ExportError::NoResults`] when there is nothing to export.
    pub fn export(&self, dir: &Path) -> Result<PathBuf> {
        let (category, region) = {
            let slot = self.lock();
            let active = slot
                .as_ref()
                .ok_or(CrawlError::Export(ExportError::NoResults))?;
            (active.request.category.clone(), active.request.region.clone())
        };

        let records = self.store.snapshot();
        let now = chrono::Local::now().naive_local();
        let path = export_records(dir, &category, &region, &records, now)?;

        let file = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |f| f.to_string_lossy().into_owned());
        self.events.success(format!("exported {file}"));
        Ok(path)
    }
}

async fn run_session(
    session: Session,
    launcher: Arc<dyn BrowserLauncher>,
    headless: bool,
    browser: Arc<OnceCell<Arc<dyn BrowserContext>>>,
    _stop_on_exit: StopOnExit,
) {
    let context = match launcher.launch(headless).await {
        Ok(context) => context,
        Err(e) => {
            session.events.error(format!("browser launch failed: {e}"));
            session
                .events
                .error_log(format!("browser launch failed: {e}"));
            return;
        }
    };
    let _ = browser.set(context.clone());

    session.drive(context.clone()).await;

    if let Err(e) = context.shutdown().await {
        tracing::warn!("Browser shutdown failed: {}", e);
    }
}
