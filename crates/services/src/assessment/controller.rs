use std::fmt;
use std::sync::{Arc, Mutex};

use quiz_core::Clock;
use quiz_core::model::{
    AssessmentProgress, AssessmentResult, AssessmentSession, CompletionKind, DurationLabel,
    Navigation, Question, QuestionSet, SessionState, TickOutcome,
};
use storage::QuestionBank;
use tokio::sync::watch;

use super::countdown::{CountdownHandle, SharedSession, lock};
use crate::error::SessionError;

//
// ─── CONFIG ────────────────────────────────────────────────────────────────────
//

/// Construction input for an [`AssessmentController`].
///
/// `default_minutes` applies when `duration_label` carries no minute count;
/// callers state it explicitly instead of relying on a hidden fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssessmentConfig {
    pub questions: Vec<Question>,
    pub duration_label: DurationLabel,
    pub default_minutes: u32,
}

impl AssessmentConfig {
    #[must_use]
    pub fn new(
        questions: Vec<Question>,
        duration_label: impl Into<DurationLabel>,
        default_minutes: u32,
    ) -> Self {
        Self {
            questions,
            duration_label: duration_label.into(),
            default_minutes,
        }
    }

    #[must_use]
    pub fn from_bank(bank: &QuestionBank, default_minutes: u32) -> Self {
        Self {
            questions: bank.questions.as_slice().to_vec(),
            duration_label: bank.duration_label.clone(),
            default_minutes,
        }
    }
}

/// What the candidate had done when they walked away from a running attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitReport {
    pub answered: usize,
    pub total: usize,
    pub remaining_seconds: u32,
}

type ExitHook = Box<dyn FnOnce(ExitReport) + Send>;

//
// ─── CONTROLLER ────────────────────────────────────────────────────────────────
//

/// Drives one timed assessment from start to scored completion.
///
/// The controller exclusively owns the session and its countdown. Commands
/// return `true` when they changed state and `false` when their preconditions
/// did not hold; ignored commands never error.
pub struct AssessmentController {
    session: SharedSession,
    clock: Clock,
    state: Arc<watch::Sender<SessionState>>,
    countdown: Option<CountdownHandle>,
    timed: bool,
    attempt_number: u32,
    on_exit: Option<ExitHook>,
}

impl AssessmentController {
    /// Build the controller and start its one-second countdown.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Assessment` if the question set is empty or has duplicate ids.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn start(config: AssessmentConfig, clock: Clock) -> Result<Self, SessionError> {
        let mut controller = Self::build(config, clock, true)?;
        controller.start_countdown();
        Ok(controller)
    }

    /// Build a controller whose countdown is driven manually via [`Self::tick`].
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Assessment` if the question set is empty or has duplicate ids.
    pub fn without_timer(config: AssessmentConfig, clock: Clock) -> Result<Self, SessionError> {
        Self::build(config, clock, false)
    }

    fn build(config: AssessmentConfig, clock: Clock, timed: bool) -> Result<Self, SessionError> {
        let questions = QuestionSet::new(config.questions)?;
        let duration = config.duration_label.resolve(config.default_minutes);
        let session = AssessmentSession::from_set(questions, duration, clock.now());
        tracing::info!(
            questions = session.total_questions(),
            minutes = duration.minutes(),
            label = config.duration_label.as_str(),
            "assessment started"
        );
        let (state, _) = watch::channel(SessionState::Active);

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            clock,
            state: Arc::new(state),
            countdown: None,
            timed,
            attempt_number: 1,
            on_exit: None,
        })
    }

    /// Register the hook invoked when a running attempt is abandoned.
    #[must_use]
    pub fn with_exit_hook(mut self, hook: impl FnOnce(ExitReport) + Send + 'static) -> Self {
        self.on_exit = Some(Box::new(hook));
        self
    }

    fn start_countdown(&mut self) {
        self.countdown = Some(CountdownHandle::spawn(
            Arc::clone(&self.session),
            self.clock,
            Arc::clone(&self.state),
            CountdownHandle::PERIOD,
        ));
    }

    fn stop_countdown(&mut self) {
        if let Some(countdown) = self.countdown.take() {
            countdown.cancel();
        }
    }

    // ─── Commands ─────────────────────────────────────────────────────────────

    pub fn select_option(&mut self, position: usize, option: usize) -> bool {
        let applied = lock(&self.session).select_option(position, option);
        tracing::debug!(position, option, applied, "select option");
        applied
    }

    pub fn confirm_answer(&mut self, position: usize) -> bool {
        let applied = lock(&self.session).confirm_answer(position);
        tracing::debug!(position, applied, "confirm answer");
        applied
    }

    pub fn navigate(&mut self, navigation: Navigation) -> bool {
        let (applied, index) = {
            let mut session = lock(&self.session);
            let applied = session.navigate(navigation);
            (applied, session.current_index())
        };
        tracing::debug!(?navigation, applied, index, "navigate");
        applied
    }

    pub fn next(&mut self) -> bool {
        self.navigate(Navigation::Next)
    }

    pub fn previous(&mut self) -> bool {
        self.navigate(Navigation::Previous)
    }

    pub fn jump_to(&mut self, index: usize) -> bool {
        self.navigate(Navigation::JumpTo(index))
    }

    /// Manual submit; ignored until every question is confirmed.
    pub fn submit(&mut self) -> bool {
        let submitted = {
            let mut session = lock(&self.session);
            let submitted = session.submit(self.clock.now());
            if submitted {
                self.state.send_replace(SessionState::Completed);
            }
            submitted
        };
        if !submitted {
            tracing::debug!("submit ignored, assessment incomplete or finished");
            return false;
        }
        self.stop_countdown();
        tracing::info!("assessment submitted");
        true
    }

    /// Advance the countdown by one second by hand.
    ///
    /// Only controllers built with [`Self::without_timer`] tick manually; on a
    /// timed controller this returns `TickOutcome::Inactive` and leaves the
    /// countdown to the background task.
    pub fn tick(&mut self) -> TickOutcome {
        if self.timed {
            tracing::debug!("manual tick ignored, countdown is timer driven");
            return TickOutcome::Inactive;
        }
        let outcome = {
            let mut session = lock(&self.session);
            let outcome = session.tick(self.clock.now());
            if outcome == TickOutcome::Expired {
                self.state.send_replace(SessionState::Completed);
            }
            outcome
        };
        if outcome == TickOutcome::Expired {
            tracing::info!("time is up, auto-submitting assessment");
        }
        outcome
    }

    /// Retake a completed assessment with the same questions and duration.
    pub fn reset(&mut self) -> bool {
        let reset = {
            let mut session = lock(&self.session);
            let reset = session.reset(self.clock.now());
            if reset {
                self.state.send_replace(SessionState::Active);
            }
            reset
        };
        if !reset {
            tracing::debug!("reset ignored, assessment still running");
            return false;
        }
        self.stop_countdown();
        self.attempt_number = self.attempt_number.saturating_add(1);
        if self.timed {
            self.start_countdown();
        }
        tracing::info!(attempt = self.attempt_number, "assessment reset for retake");
        true
    }

    /// Tear the assessment down.
    ///
    /// Abandoning a running attempt fires the exit hook and discards all
    /// progress. Returns `true` when the hook was invoked.
    pub fn exit(mut self) -> bool {
        self.stop_countdown();
        let (active, report) = {
            let session = lock(&self.session);
            let report = ExitReport {
                answered: session.answered_count(),
                total: session.total_questions(),
                remaining_seconds: session.remaining_seconds(),
            };
            (session.is_active(), report)
        };
        if !active {
            return false;
        }

        tracing::info!(
            answered = report.answered,
            total = report.total,
            remaining = report.remaining_seconds,
            "assessment abandoned"
        );
        match self.on_exit.take() {
            Some(hook) => {
                hook(report);
                true
            }
            None => false,
        }
    }

    // ─── Queries ──────────────────────────────────────────────────────────────

    /// Run `f` against a consistent view of the session.
    pub fn with_session<R>(&self, f: impl FnOnce(&AssessmentSession) -> R) -> R {
        f(&lock(&self.session))
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.with_session(AssessmentSession::state)
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.with_session(AssessmentSession::is_completed)
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.with_session(AssessmentSession::current_index)
    }

    #[must_use]
    pub fn current_question(&self) -> Question {
        self.with_session(|session| session.current_question().clone())
    }

    #[must_use]
    pub fn pending_selection(&self) -> Option<usize> {
        self.with_session(AssessmentSession::pending_selection)
    }

    #[must_use]
    pub fn is_answered(&self, position: usize) -> bool {
        self.with_session(|session| session.is_answered(position))
    }

    #[must_use]
    pub fn remaining_seconds(&self) -> u32 {
        self.with_session(AssessmentSession::remaining_seconds)
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.with_session(AssessmentSession::answered_count)
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.with_session(AssessmentSession::total_questions)
    }

    #[must_use]
    pub fn can_submit(&self) -> bool {
        self.with_session(AssessmentSession::can_submit)
    }

    #[must_use]
    pub fn progress(&self) -> AssessmentProgress {
        self.with_session(AssessmentSession::progress)
    }

    #[must_use]
    pub fn completion(&self) -> Option<CompletionKind> {
        self.with_session(AssessmentSession::completion)
    }

    /// Scored result once the attempt has completed.
    #[must_use]
    pub fn result(&self) -> Option<AssessmentResult> {
        self.with_session(AssessmentSession::result)
    }

    /// Counts attempts made with this controller, starting at 1.
    #[must_use]
    pub fn attempt_number(&self) -> u32 {
        self.attempt_number
    }

    /// Subscribe to state transitions, including auto-submit on timeout.
    #[must_use]
    pub fn completion_watch(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    #[must_use]
    pub fn countdown_running(&self) -> bool {
        self.countdown
            .as_ref()
            .is_some_and(|countdown| !countdown.is_finished())
    }

    #[cfg(test)]
    pub(crate) fn tick_period() -> std::time::Duration {
        CountdownHandle::PERIOD
    }
}

impl fmt::Debug for AssessmentController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssessmentController")
            .field("session", &*lock(&self.session))
            .field("timed", &self.timed)
            .field("attempt_number", &self.attempt_number)
            .field("countdown", &self.countdown.is_some())
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
