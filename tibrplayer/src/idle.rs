//! Inactivity reset timer
//!
//! Armed when playback stops; if nothing plays again within the timeout the
//! panel is reset to its idle presentation. Starting playback cancels it.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::debug;

use tibrapi::constants::inactive_reset_timeout;

/// One-shot timer firing a callback after a period of inactivity.
#[derive(Debug)]
pub struct IdleReset {
    timeout: Duration,
    /// When the armed timer fires.
    deadline: Option<Instant>,
    handle: Option<JoinHandle<()>>,
}

impl Default for IdleReset {
    fn default() -> Self {
        Self::new(inactive_reset_timeout())
    }
}

impl IdleReset {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            deadline: None,
            handle: None,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Start or restart the timer. `on_expire` runs once on the runtime
    /// unless the timer is cancelled or re-armed first.
    pub fn arm<F>(&mut self, on_expire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.cancel();

        let timeout = self.timeout;
        self.deadline = Some(Instant::now() + timeout);
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            debug!(?timeout, "Inactivity timeout reached");
            on_expire();
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.deadline = None;
    }

    /// True while armed and not yet fired.
    pub fn is_active(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Time left before the timer fires, or None if not armed.
    pub fn remaining(&self) -> Option<Duration> {
        if !self.is_active() {
            return None;
        }
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }
}

impl Drop for IdleReset {
    fn drop(&mut self) {
        self.cancel();
    }
}
