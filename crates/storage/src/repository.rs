use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{AssessmentResult, AttemptId, BankId, DurationLabel, Question, QuestionSet};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Static question bank: a titled question set plus its duration descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionBank {
    pub id: BankId,
    pub title: String,
    #[serde(alias = "duration")]
    pub duration_label: DurationLabel,
    pub questions: QuestionSet,
}

impl QuestionBank {
    /// Build a bank from raw questions.
    ///
    /// # Errors
    ///
    /// Returns `quiz_core::Error::Assessment` if the questions are empty or ids collide.
    pub fn new(
        id: BankId,
        title: impl Into<String>,
        duration_label: impl Into<DurationLabel>,
        questions: Vec<Question>,
    ) -> Result<Self, quiz_core::Error> {
        Ok(Self {
            id,
            title: title.into(),
            duration_label: duration_label.into(),
            questions: QuestionSet::new(questions)?,
        })
    }
}

/// Retained result of a finished attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub id: AttemptId,
    pub bank_id: BankId,
    pub recorded_at: DateTime<Utc>,
    pub result: AssessmentResult,
}

/// Repository contract for question banks.
#[async_trait]
pub trait QuestionBankRepository: Send + Sync {
    /// Persist or replace a bank.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the bank cannot be stored.
    async fn upsert_bank(&self, bank: &QuestionBank) -> Result<(), StorageError>;

    /// Fetch a bank by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_bank(&self, id: BankId) -> Result<QuestionBank, StorageError>;

    /// List all banks ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn list_banks(&self) -> Result<Vec<QuestionBank>, StorageError>;
}

/// Repository contract for retained attempt results.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Retain a finished attempt and return its new id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn append_attempt(
        &self,
        bank_id: BankId,
        recorded_at: DateTime<Utc>,
        result: &AssessmentResult,
    ) -> Result<AttemptId, StorageError>;

    /// Fetch a retained attempt.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing.
    async fn get_attempt(&self, id: AttemptId) -> Result<AttemptRecord, StorageError>;

    /// Most recent attempts for a bank, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn list_attempts(
        &self,
        bank_id: BankId,
        limit: u32,
    ) -> Result<Vec<AttemptRecord>, StorageError>;
}

/// Simple in-memory repository implementation for the app and tests.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    banks: Arc<Mutex<HashMap<BankId, QuestionBank>>>,
    attempts: Arc<Mutex<Vec<AttemptRecord>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            banks: Arc::new(Mutex::new(HashMap::new())),
            attempts: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl QuestionBankRepository for InMemoryRepository {
    async fn upsert_bank(&self, bank: &QuestionBank) -> Result<(), StorageError> {
        let mut guard = self
            .banks
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(bank.id, bank.clone());
        Ok(())
    }

    async fn get_bank(&self, id: BankId) -> Result<QuestionBank, StorageError> {
        let guard = self
            .banks
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_banks(&self) -> Result<Vec<QuestionBank>, StorageError> {
        let guard = self
            .banks
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut banks: Vec<QuestionBank> = guard.values().cloned().collect();
        banks.sort_by_key(|bank| bank.id);
        Ok(banks)
    }
}

#[async_trait]
impl AttemptRepository for InMemoryRepository {
    async fn append_attempt(
        &self,
        bank_id: BankId,
        recorded_at: DateTime<Utc>,
        result: &AssessmentResult,
    ) -> Result<AttemptId, StorageError> {
        let mut guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let id = AttemptId::generate();
        guard.push(AttemptRecord {
            id,
            bank_id,
            recorded_at,
            result: result.clone(),
        });
        Ok(id)
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<AttemptRecord, StorageError> {
        let guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard
            .iter()
            .find(|record| record.id == id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list_attempts(
        &self,
        bank_id: BankId,
        limit: u32,
    ) -> Result<Vec<AttemptRecord>, StorageError> {
        let guard = self
            .attempts
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        // Insertion order breaks ties between identical timestamps.
        let mut records: Vec<AttemptRecord> = guard
            .iter()
            .rev()
            .filter(|record| record.bank_id == bank_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        records.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(records)
    }
}

/// Aggregates bank and attempt repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub banks: Arc<dyn QuestionBankRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let banks: Arc<dyn QuestionBankRepository> = Arc::new(repo.clone());
        let attempts: Arc<dyn AttemptRepository> = Arc::new(repo);
        Self { banks, attempts }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiz_core::model::{CompletionKind, QuestionId, compute_result};
    use quiz_core::time::fixed_now;

    fn build_bank(id: u64) -> QuestionBank {
        let question = Question::new(
            QuestionId::new(1),
            "Capital of France?",
            vec!["Paris".into(), "Rome".into()],
            0,
            "Paris is the capital.",
        )
        .unwrap();
        QuestionBank::new(BankId::new(id), format!("Bank {id}"), "10 mins", vec![question]).unwrap()
    }

    fn build_result(bank: &QuestionBank, answer: Option<usize>) -> AssessmentResult {
        compute_result(
            &bank.questions,
            &[answer],
            fixed_now(),
            fixed_now(),
            CompletionKind::Submitted,
        )
    }

    #[test]
    fn bank_requires_questions() {
        let err = QuestionBank::new(BankId::new(1), "Empty", "5 mins", Vec::new()).unwrap_err();
        assert!(matches!(err, quiz_core::Error::Assessment(_)));
    }

    #[tokio::test]
    async fn round_trips_banks() {
        let repo = InMemoryRepository::new();
        repo.upsert_bank(&build_bank(2)).await.unwrap();
        repo.upsert_bank(&build_bank(1)).await.unwrap();

        let fetched = repo.get_bank(BankId::new(2)).await.unwrap();
        assert_eq!(fetched.title, "Bank 2");

        let ids: Vec<_> = repo
            .list_banks()
            .await
            .unwrap()
            .into_iter()
            .map(|bank| bank.id)
            .collect();
        assert_eq!(ids, vec![BankId::new(1), BankId::new(2)]);
    }

    #[tokio::test]
    async fn missing_bank_is_not_found() {
        let repo = InMemoryRepository::new();
        let err = repo.get_bank(BankId::new(9)).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn attempts_list_newest_first_per_bank() {
        let repo = InMemoryRepository::new();
        let bank = build_bank(1);
        let other = build_bank(2);

        let first = repo
            .append_attempt(bank.id, fixed_now(), &build_result(&bank, Some(1)))
            .await
            .unwrap();
        let second = repo
            .append_attempt(
                bank.id,
                fixed_now() + Duration::minutes(5),
                &build_result(&bank, Some(0)),
            )
            .await
            .unwrap();
        repo.append_attempt(other.id, fixed_now(), &build_result(&other, None))
            .await
            .unwrap();

        let listed = repo.list_attempts(bank.id, 10).await.unwrap();
        let ids: Vec<_> = listed.iter().map(|record| record.id).collect();
        assert_eq!(ids, vec![second, first]);
        assert_eq!(listed[0].result.score, 1);

        let limited = repo.list_attempts(bank.id, 1).await.unwrap();
        assert_eq!(limited.len(), 1);

        let fetched = repo.get_attempt(first).await.unwrap();
        assert_eq!(fetched.result.score, 0);
    }
}
