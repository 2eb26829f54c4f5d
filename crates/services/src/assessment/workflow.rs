use std::sync::Arc;

use quiz_core::Clock;
use quiz_core::model::{AttemptId, BankId, DEFAULT_DURATION_MINUTES, DurationLabel};
use storage::{AttemptRepository, QuestionBankRepository};

use super::controller::{AssessmentConfig, AssessmentController, ExitReport};
use crate::error::SessionError;

/// A live attempt started from a stored bank.
#[derive(Debug)]
pub struct AssessmentRun {
    bank_id: BankId,
    title: String,
    controller: AssessmentController,
    retained: Option<(u32, AttemptId)>,
}

impl AssessmentRun {
    #[must_use]
    pub fn bank_id(&self) -> BankId {
        self.bank_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn controller(&self) -> &AssessmentController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut AssessmentController {
        &mut self.controller
    }

    /// Id of the retained result for the current attempt, if already stored.
    #[must_use]
    pub fn attempt_id(&self) -> Option<AttemptId> {
        self.retained
            .filter(|(attempt, _)| *attempt == self.controller.attempt_number())
            .map(|(_, id)| id)
    }

    /// Install a hook fired if the run is abandoned mid-attempt.
    #[must_use]
    pub fn with_exit_hook(mut self, hook: impl FnOnce(ExitReport) + Send + 'static) -> Self {
        self.controller = self.controller.with_exit_hook(hook);
        self
    }

    /// Abandon the run; see [`AssessmentController::exit`].
    pub fn exit(self) -> bool {
        self.controller.exit()
    }
}

/// Orchestrates starting attempts from stored banks and retaining their results.
#[derive(Clone)]
pub struct AssessmentLoopService {
    clock: Clock,
    banks: Arc<dyn QuestionBankRepository>,
    attempts: Arc<dyn AttemptRepository>,
    default_minutes: u32,
    duration_override: Option<DurationLabel>,
    timed: bool,
}

impl AssessmentLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        banks: Arc<dyn QuestionBankRepository>,
        attempts: Arc<dyn AttemptRepository>,
    ) -> Self {
        Self {
            clock,
            banks,
            attempts,
            default_minutes: DEFAULT_DURATION_MINUTES,
            duration_override: None,
            timed: true,
        }
    }

    /// Minutes used when a bank's duration label has no number in it.
    #[must_use]
    pub fn with_default_minutes(mut self, default_minutes: u32) -> Self {
        self.default_minutes = default_minutes;
        self
    }

    /// Use this label instead of the one stored with each bank.
    #[must_use]
    pub fn with_duration_label(mut self, label: impl Into<DurationLabel>) -> Self {
        self.duration_override = Some(label.into());
        self
    }

    /// Disable the background countdown; callers tick by hand.
    #[must_use]
    pub fn with_manual_ticks(mut self) -> Self {
        self.timed = false;
        self
    }

    /// Start an attempt over the given bank.
    ///
    /// A timed service must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the bank cannot be loaded.
    pub async fn start(&self, bank_id: BankId) -> Result<AssessmentRun, SessionError> {
        let bank = self.banks.get_bank(bank_id).await?;
        let mut config = AssessmentConfig::from_bank(&bank, self.default_minutes);
        if let Some(label) = &self.duration_override {
            config.duration_label = label.clone();
        }
        let controller = if self.timed {
            AssessmentController::start(config, self.clock)?
        } else {
            AssessmentController::without_timer(config, self.clock)?
        };
        tracing::debug!(%bank_id, title = %bank.title, "run started");

        Ok(AssessmentRun {
            bank_id,
            title: bank.title,
            controller,
            retained: None,
        })
    }

    /// Retain the result of a completed attempt.
    ///
    /// Calling this again for the same attempt returns the stored id; a retake
    /// gets a new record.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InProgress` if the attempt has not completed, or
    /// `SessionError::Storage` if persistence fails.
    pub async fn finalize(&self, run: &mut AssessmentRun) -> Result<AttemptId, SessionError> {
        if let Some(id) = run.attempt_id() {
            return Ok(id);
        }
        let result = run.controller.result().ok_or(SessionError::InProgress)?;
        let recorded_at = self.clock.now();
        let id = self
            .attempts
            .append_attempt(run.bank_id, recorded_at, &result)
            .await?;
        run.retained = Some((run.controller.attempt_number(), id));
        tracing::info!(
            attempt_id = %id,
            bank_id = %run.bank_id,
            score = result.score,
            total = result.total_questions,
            "attempt retained"
        );
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{Question, QuestionId};
    use quiz_core::time::fixed_clock;
    use storage::{InMemoryRepository, QuestionBank};

    async fn service_with_bank(label: &str) -> (AssessmentLoopService, InMemoryRepository) {
        let repo = InMemoryRepository::new();
        let questions = (1..=2)
            .map(|id| {
                Question::new(
                    QuestionId::new(id),
                    format!("Q{id}"),
                    vec!["yes".into(), "no".into()],
                    0,
                    "",
                )
                .unwrap()
            })
            .collect();
        let bank = QuestionBank::new(BankId::new(1), "Basics", label, questions).unwrap();
        repo.upsert_bank(&bank).await.unwrap();

        let service = AssessmentLoopService::new(
            fixed_clock(),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        )
        .with_manual_ticks();
        (service, repo)
    }

    #[tokio::test]
    async fn start_uses_explicit_default_for_unlabelled_banks() {
        let (service, _repo) = service_with_bank("untimed").await;
        let run = service.with_default_minutes(60).start(BankId::new(1)).await.unwrap();
        assert_eq!(run.controller().remaining_seconds(), 3_600);
        assert_eq!(run.title(), "Basics");
    }

    #[tokio::test]
    async fn duration_override_replaces_bank_label() {
        let (service, _repo) = service_with_bank("5 mins").await;
        let run = service
            .with_duration_label("2 minutes")
            .start(BankId::new(1))
            .await
            .unwrap();
        assert_eq!(run.controller().remaining_seconds(), 120);
    }

    #[tokio::test]
    async fn start_reports_missing_bank() {
        let (service, _repo) = service_with_bank("5 mins").await;
        let err = service.start(BankId::new(99)).await.unwrap_err();
        assert!(matches!(err, SessionError::Storage(storage::StorageError::NotFound)));
    }

    #[tokio::test]
    async fn finalize_requires_completion() {
        let (service, _repo) = service_with_bank("5 mins").await;
        let mut run = service.start(BankId::new(1)).await.unwrap();
        let err = service.finalize(&mut run).await.unwrap_err();
        assert!(matches!(err, SessionError::InProgress));
    }

    #[tokio::test]
    async fn finalize_is_idempotent_per_attempt() {
        let (service, repo) = service_with_bank("5 mins").await;
        let mut run = service.start(BankId::new(1)).await.unwrap();
        for position in 0..2 {
            let controller = run.controller_mut();
            controller.jump_to(position);
            controller.select_option(position, 0);
            controller.confirm_answer(position);
        }
        assert!(run.controller_mut().submit());

        let first = service.finalize(&mut run).await.unwrap();
        let again = service.finalize(&mut run).await.unwrap();
        assert_eq!(first, again);

        assert!(run.controller_mut().reset());
        assert!(run.attempt_id().is_none());
        while run.controller().state() == quiz_core::model::SessionState::Active {
            run.controller_mut().tick();
        }
        let retake = service.finalize(&mut run).await.unwrap();
        assert_ne!(first, retake);

        let stored = repo.list_attempts(BankId::new(1), 10).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(repo.get_attempt(first).await.unwrap().result.score, 2);
        assert_eq!(repo.get_attempt(retake).await.unwrap().result.score, 0);
    }
}
