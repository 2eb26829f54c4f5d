use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use quiz_core::Clock;
use quiz_core::model::{AssessmentSession, SessionState, TickOutcome};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, interval_at};

pub(crate) type SharedSession = Arc<Mutex<AssessmentSession>>;

/// Lock the shared session.
///
/// Every session command leaves the state consistent before returning, so a
/// poisoned lock still guards a valid session.
pub(crate) fn lock(session: &SharedSession) -> MutexGuard<'_, AssessmentSession> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cancelable one-second countdown bound to a shared session.
///
/// The background task ticks the session once per period and stops on its own
/// when the session completes. Cancelling or dropping the handle stops it
/// immediately, so no tick can reach a torn-down session.
#[derive(Debug)]
pub struct CountdownHandle {
    task: JoinHandle<()>,
}

impl CountdownHandle {
    pub(crate) const PERIOD: Duration = Duration::from_secs(1);

    /// Spawn the countdown on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub(crate) fn spawn(
        session: SharedSession,
        clock: Clock,
        state: Arc<watch::Sender<SessionState>>,
        period: Duration,
    ) -> Self {
        let task = tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + period, period);
            loop {
                ticks.tick().await;
                // Publish expiry under the lock so a retake cannot slip in
                // before the watch reports it.
                let outcome = {
                    let mut guard = lock(&session);
                    let outcome = guard.tick(clock.now());
                    if outcome == TickOutcome::Expired {
                        state.send_replace(SessionState::Completed);
                    }
                    outcome
                };
                match outcome {
                    TickOutcome::Running(remaining) => {
                        tracing::trace!(remaining, "countdown tick");
                    }
                    TickOutcome::Expired => {
                        tracing::info!("time is up, auto-submitting assessment");
                        break;
                    }
                    TickOutcome::Inactive => break,
                }
            }
        });
        Self { task }
    }

    /// Stop the countdown. Safe to call more than once.
    pub fn cancel(&self) {
        self.task.abort();
    }

    /// True once the task has stopped, by completion or cancellation.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for CountdownHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
