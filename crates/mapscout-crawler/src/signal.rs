//! Cooperative run/pause/stop signalling for the drive task.
//!
//! The controller owns the `watch::Sender<SessionState>`; every component of
//! the drive task holds a [`SessionSignal`] and checks it at checkpoints.

use mapscout_core::SessionState;
use std::time::Duration;
use tokio::sync::watch;

/// Read side of the session state, cheap to clone into tasks.
#[derive(Debug, Clone)]
pub struct SessionSignal {
    rx: watch::Receiver<SessionState>,
}

impl SessionSignal {
    pub fn new(rx: watch::Receiver<SessionState>) -> Self {
        Self { rx }
    }

    /// Create a sender/signal pair starting in `state`.
    pub fn channel(state: SessionState) -> (watch::Sender<SessionState>, Self) {
        let (tx, rx) = watch::channel(state);
        (tx, Self::new(rx))
    }

    pub fn state(&self) -> SessionState {
        *self.rx.borrow()
    }

    /// False once a stop has been requested.
    pub fn is_running(&self) -> bool {
        self.state().is_active()
    }

    /// Block while the session is paused.
    ///
    /// Returns `true` when the session is running again and `false` when it
    /// was stopped (or the controller went away) instead.
    pub async fn wait_if_paused(&self) -> bool {
        let mut rx = self.rx.clone();
        let running = match rx.wait_for(|state| *state != SessionState::Paused).await {
            Ok(state) => state.is_active(),
            Err(_) => false,
        };
        running
    }

    /// Sleep for `duration`, waking early if the session stops.
    ///
    /// Returns `true` if the full duration elapsed with the session still
    /// running.
    pub async fn sleep(&self, duration: Duration) -> bool {
        let mut rx = self.rx.clone();
        tokio::select! {
            () = tokio::time::sleep(duration) => self.is_running(),
            _ = rx.wait_for(|state| !state.is_active()) => false,
        }
    }
}
