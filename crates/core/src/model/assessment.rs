use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

use crate::model::duration::AssessmentDuration;
use crate::model::ids::QuestionId;
use crate::model::progress::AssessmentProgress;
use crate::model::question::{Question, QuestionSet};
use crate::model::result::{AssessmentResult, CompletionKind, compute_result};

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

/// Construction failures. Every other illegal command is an inert no-op.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AssessmentError {
    #[error("invalid input: an assessment needs at least one question")]
    InvalidInput,

    #[error("duplicate question id {0}")]
    DuplicateQuestionId(QuestionId),
}

//
// ─── STATE ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    Active,
    Completed,
}

/// Navigation request understood by [`AssessmentSession::navigate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Next,
    Previous,
    JumpTo(usize),
}

/// Outcome of a single countdown tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Still running with this many seconds left.
    Running(u32),
    /// This tick exhausted the countdown and completed the attempt.
    Expired,
    /// The attempt was already completed; nothing changed.
    Inactive,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// Runtime state of one timed, confirm-then-lock attempt.
///
/// The session is a plain state container: it never reads the clock or spawns
/// timers itself. Callers feed it timestamps and one `tick` per elapsed second.
/// Commands whose preconditions fail leave the state untouched and return
/// `false`.
#[derive(Clone)]
pub struct AssessmentSession {
    questions: QuestionSet,
    duration: AssessmentDuration,
    current_index: usize,
    answers: Vec<Option<usize>>,
    pending: Option<usize>,
    confirmed: BTreeSet<usize>,
    remaining_seconds: u32,
    state: SessionState,
    completion: Option<CompletionKind>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl AssessmentSession {
    /// Start an attempt over `questions`.
    ///
    /// # Errors
    ///
    /// Returns `AssessmentError::InvalidInput` if `questions` is empty and
    /// `AssessmentError::DuplicateQuestionId` if ids collide.
    pub fn new(
        questions: Vec<Question>,
        duration: AssessmentDuration,
        started_at: DateTime<Utc>,
    ) -> Result<Self, AssessmentError> {
        Ok(Self::from_set(QuestionSet::new(questions)?, duration, started_at))
    }

    /// Start an attempt over an already validated set.
    #[must_use]
    pub fn from_set(
        questions: QuestionSet,
        duration: AssessmentDuration,
        started_at: DateTime<Utc>,
    ) -> Self {
        let len = questions.len();
        Self {
            questions,
            duration,
            current_index: 0,
            answers: vec![None; len],
            pending: None,
            confirmed: BTreeSet::new(),
            remaining_seconds: duration.total_seconds(),
            state: SessionState::Active,
            completion: None,
            started_at,
            completed_at: None,
        }
    }

    // ─── Queries ──────────────────────────────────────────────────────────────

    #[must_use]
    pub fn questions(&self) -> &QuestionSet {
        &self.questions
    }

    #[must_use]
    pub fn duration(&self) -> AssessmentDuration {
        self.duration
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.state == SessionState::Completed
    }

    /// How the attempt ended, once completed.
    #[must_use]
    pub fn completion(&self) -> Option<CompletionKind> {
        self.completion
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[must_use]
    pub fn current_question(&self) -> &Question {
        &self.questions.as_slice()[self.current_index]
    }

    /// Selection shown for the current question: pending if not yet
    /// confirmed, the locked answer otherwise.
    #[must_use]
    pub fn pending_selection(&self) -> Option<usize> {
        self.pending
    }

    #[must_use]
    pub fn is_answered(&self, position: usize) -> bool {
        self.confirmed.contains(&position)
    }

    /// Confirmed answer at `position`, if any.
    #[must_use]
    pub fn answer(&self, position: usize) -> Option<usize> {
        self.answers.get(position).copied().flatten()
    }

    #[must_use]
    pub fn answers(&self) -> &[Option<usize>] {
        &self.answers
    }

    /// Positions whose answer is locked, in ascending order.
    pub fn confirmed_positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.confirmed.iter().copied()
    }

    #[must_use]
    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.confirmed.len()
    }

    /// True when every question is confirmed and a manual submit would succeed.
    #[must_use]
    pub fn can_submit(&self) -> bool {
        self.is_active() && self.answered_count() == self.total_questions()
    }

    #[must_use]
    pub fn progress(&self) -> AssessmentProgress {
        AssessmentProgress {
            total: self.total_questions(),
            answered: self.answered_count(),
            remaining_seconds: self.remaining_seconds,
            can_submit: self.can_submit(),
            is_complete: self.is_completed(),
        }
    }

    /// Scored result, available once the attempt is completed.
    ///
    /// Elapsed time is measured up to the completion timestamp, so repeated
    /// calls return the same result.
    #[must_use]
    pub fn result(&self) -> Option<AssessmentResult> {
        let completed_at = self.completed_at?;
        let completion = self.completion?;
        Some(compute_result(
            &self.questions,
            &self.answers,
            self.started_at,
            completed_at,
            completion,
        ))
    }

    // ─── Commands ─────────────────────────────────────────────────────────────

    /// Record a pending selection for the displayed, unconfirmed question.
    pub fn select_option(&mut self, position: usize, option: usize) -> bool {
        if !self.is_active() || position != self.current_index || self.is_answered(position) {
            return false;
        }
        if option >= self.current_question().option_count() {
            return false;
        }
        self.pending = Some(option);
        true
    }

    /// Lock the pending selection for `position`.
    pub fn confirm_answer(&mut self, position: usize) -> bool {
        if !self.is_active() || position != self.current_index || self.is_answered(position) {
            return false;
        }
        let Some(option) = self.pending else {
            return false;
        };
        self.answers[position] = Some(option);
        self.confirmed.insert(position);
        true
    }

    pub fn navigate(&mut self, navigation: Navigation) -> bool {
        match navigation {
            Navigation::Next => self.next(),
            Navigation::Previous => self.previous(),
            Navigation::JumpTo(index) => self.jump_to(index),
        }
    }

    /// Advance one question; only once the current one is confirmed.
    pub fn next(&mut self) -> bool {
        let has_next = self.current_index + 1 < self.total_questions();
        if !self.is_active() || !has_next || !self.is_answered(self.current_index) {
            return false;
        }
        self.move_to(self.current_index + 1);
        true
    }

    pub fn previous(&mut self) -> bool {
        if !self.is_active() || self.current_index == 0 {
            return false;
        }
        self.move_to(self.current_index - 1);
        true
    }

    /// Jump to any question, answered or not.
    pub fn jump_to(&mut self, index: usize) -> bool {
        if !self.is_active() || index >= self.total_questions() {
            return false;
        }
        self.move_to(index);
        true
    }

    /// Manual submit; requires every question to be confirmed.
    pub fn submit(&mut self, now: DateTime<Utc>) -> bool {
        if !self.can_submit() {
            return false;
        }
        self.complete(CompletionKind::Submitted, now);
        true
    }

    /// Count down one second, completing the attempt when time runs out.
    pub fn tick(&mut self, now: DateTime<Utc>) -> TickOutcome {
        if !self.is_active() {
            return TickOutcome::Inactive;
        }
        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds == 0 {
            self.complete(CompletionKind::TimedOut, now);
            return TickOutcome::Expired;
        }
        TickOutcome::Running(self.remaining_seconds)
    }

    /// Retake: reinitialize everything with the same questions and duration.
    pub fn reset(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_completed() {
            return false;
        }
        let questions = self.questions.clone();
        *self = Self::from_set(questions, self.duration, now);
        true
    }

    fn move_to(&mut self, index: usize) {
        self.current_index = index;
        self.pending = if self.is_answered(index) {
            self.answers[index]
        } else {
            None
        };
    }

    fn complete(&mut self, kind: CompletionKind, now: DateTime<Utc>) {
        self.state = SessionState::Completed;
        self.completion = Some(kind);
        self.completed_at = Some(now.max(self.started_at));
    }
}

impl fmt::Debug for AssessmentSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssessmentSession")
            .field("questions_len", &self.questions.len())
            .field("current_index", &self.current_index)
            .field("answered", &self.confirmed.len())
            .field("pending", &self.pending)
            .field("remaining_seconds", &self.remaining_seconds)
            .field("state", &self.state)
            .field("started_at", &self.started_at)
            .field("completed_at", &self.completed_at)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
