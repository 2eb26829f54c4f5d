use chrono::{DateTime, Utc};
use std::sync::Arc;

use quiz_core::model::{AttemptId, BankId, CompletionKind};
use storage::{AttemptRecord, AttemptRepository};

use crate::error::SessionError;

/// Presentation-agnostic list item for a retained attempt.
///
/// No pre-formatted strings: the presentation layer decides how to round the
/// percentage and render timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptListItem {
    pub id: AttemptId,
    pub recorded_at: DateTime<Utc>,
    pub score: u32,
    pub total: u32,
    pub percentage: f64,
    pub skipped: usize,
    pub completion: CompletionKind,
}

impl AttemptListItem {
    #[must_use]
    pub fn from_record(record: &AttemptRecord) -> Self {
        let result = &record.result;
        Self {
            id: record.id,
            recorded_at: record.recorded_at,
            score: result.score,
            total: result.total_questions,
            percentage: result.percentage,
            skipped: result.skipped_count(),
            completion: result.completion,
        }
    }
}

/// Read side for results that outlive the assessment screen.
#[derive(Clone)]
pub struct AttemptHistoryService {
    attempts: Arc<dyn AttemptRepository>,
}

impl AttemptHistoryService {
    #[must_use]
    pub fn new(attempts: Arc<dyn AttemptRepository>) -> Self {
        Self { attempts }
    }

    /// Recent attempts for a bank, newest first.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on repository failures.
    pub async fn list_recent(
        &self,
        bank_id: BankId,
        limit: u32,
    ) -> Result<Vec<AttemptListItem>, SessionError> {
        let records = self.attempts.list_attempts(bank_id, limit).await?;
        Ok(records.iter().map(AttemptListItem::from_record).collect())
    }

    /// Full record, including the per-question breakdown.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the attempt is unknown.
    pub async fn get(&self, id: AttemptId) -> Result<AttemptRecord, SessionError> {
        Ok(self.attempts.get_attempt(id).await?)
    }

    /// Best percentage recorded for a bank, if any attempt exists.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` on repository failures.
    pub async fn best_percentage(&self, bank_id: BankId) -> Result<Option<f64>, SessionError> {
        let records = self.attempts.list_attempts(bank_id, u32::MAX).await?;
        Ok(records
            .iter()
            .map(|record| record.result.percentage)
            .reduce(f64::max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{Question, QuestionId, QuestionSet, compute_result};
    use quiz_core::time::fixed_now;

    fn set() -> QuestionSet {
        let questions = (1..=4)
            .map(|id| {
                Question::new(
                    QuestionId::new(id),
                    "Q",
                    vec!["a".into(), "b".into()],
                    1,
                    "",
                )
                .unwrap()
            })
            .collect();
        QuestionSet::new(questions).unwrap()
    }

    #[tokio::test]
    async fn lists_items_and_best_score() {
        let repo = storage::InMemoryRepository::new();
        let history = AttemptHistoryService::new(Arc::new(repo.clone()));
        let bank = BankId::new(3);
        assert_eq!(history.best_percentage(bank).await.unwrap(), None);

        let questions = set();
        let half = compute_result(
            &questions,
            &[Some(1), Some(1), None, Some(0)],
            fixed_now(),
            fixed_now(),
            CompletionKind::TimedOut,
        );
        let full = compute_result(
            &questions,
            &[Some(1); 4],
            fixed_now(),
            fixed_now(),
            CompletionKind::Submitted,
        );
        repo.append_attempt(bank, fixed_now(), &half).await.unwrap();
        let latest = repo
            .append_attempt(bank, fixed_now() + chrono::Duration::hours(1), &full)
            .await
            .unwrap();

        let items = history.list_recent(bank, 5).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, latest);
        assert_eq!(items[1].skipped, 1);
        assert_eq!(items[1].completion, CompletionKind::TimedOut);
        assert_eq!(history.best_percentage(bank).await.unwrap(), Some(100.0));

        let record = history.get(latest).await.unwrap();
        assert_eq!(record.result.breakdown.len(), 4);
    }

    #[tokio::test]
    async fn unknown_attempt_is_a_storage_error() {
        let repo = storage::InMemoryRepository::new();
        let history = AttemptHistoryService::new(Arc::new(repo));
        let err = history.get(AttemptId::generate()).await.unwrap_err();
        assert!(matches!(err, SessionError::Storage(_)));
    }
}
