//! Loading question banks from static JSON data.
//!
//! A bank file holds either a single bank object or an array of banks:
//!
//! ```json
//! { "id": 1, "title": "Basics", "duration": "15 mins",
//!   "questions": [ { "id": 1, "prompt": "…", "options": ["a", "b"],
//!                    "correctOptionIndex": 0, "explanation": "…" } ] }
//! ```

use std::collections::HashSet;
use std::path::Path;

use crate::repository::{QuestionBank, QuestionBankRepository, StorageError};

/// Parse banks from JSON text.
///
/// # Errors
///
/// Returns `StorageError::Serialization` for malformed or invalid questions,
/// and `StorageError::Conflict` when two banks share an id.
pub fn parse_banks(json: &str) -> Result<Vec<QuestionBank>, StorageError> {
    let to_storage = |e: serde_json::Error| StorageError::Serialization(e.to_string());
    // Pick the shape up front so validation errors reach the caller intact.
    let banks = if json.trim_start().starts_with('[') {
        serde_json::from_str::<Vec<QuestionBank>>(json).map_err(to_storage)?
    } else {
        vec![serde_json::from_str::<QuestionBank>(json).map_err(to_storage)?]
    };

    let mut seen = HashSet::with_capacity(banks.len());
    for bank in &banks {
        if !seen.insert(bank.id) {
            return Err(StorageError::Conflict);
        }
    }
    Ok(banks)
}

/// Read and parse a bank file.
///
/// # Errors
///
/// Returns `StorageError::Io` if the file cannot be read, otherwise see [`parse_banks`].
pub fn load_banks(path: &Path) -> Result<Vec<QuestionBank>, StorageError> {
    let raw = std::fs::read_to_string(path)?;
    let banks = parse_banks(&raw)?;
    tracing::info!(path = %path.display(), banks = banks.len(), "loaded question banks");
    Ok(banks)
}

/// Store every bank in `repo`, returning how many were written.
///
/// # Errors
///
/// Returns the first `StorageError` raised by the repository.
pub async fn seed_banks(
    repo: &dyn QuestionBankRepository,
    banks: &[QuestionBank],
) -> Result<usize, StorageError> {
    for bank in banks {
        repo.upsert_bank(bank).await?;
        tracing::debug!(bank_id = %bank.id, questions = bank.questions.len(), "seeded bank");
    }
    Ok(banks.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryRepository;
    use quiz_core::model::BankId;

    const SINGLE: &str = r#"{
        "id": 4,
        "title": "Arithmetic",
        "duration": "Duration: 5 mins",
        "questions": [
            { "id": 1, "prompt": "1 + 1?", "options": ["1", "2"], "correctOptionIndex": 1,
              "explanation": "One plus one is two." },
            { "id": 2, "prompt": "2 * 3?", "options": ["5", "6"], "correct_option": 1 }
        ]
    }"#;

    #[test]
    fn parses_single_bank() {
        let banks = parse_banks(SINGLE).unwrap();
        assert_eq!(banks.len(), 1);
        assert_eq!(banks[0].id, BankId::new(4));
        assert_eq!(banks[0].duration_label.resolve(30).minutes(), 5);
        assert_eq!(banks[0].questions.len(), 2);
        assert_eq!(banks[0].questions.as_slice()[1].explanation(), "");
    }

    #[test]
    fn parses_bank_array() {
        let json = format!("[{SINGLE}]");
        assert_eq!(parse_banks(&json).unwrap().len(), 1);
    }

    #[test]
    fn rejects_duplicate_bank_ids() {
        let json = format!("[{SINGLE}, {SINGLE}]");
        assert!(matches!(parse_banks(&json), Err(StorageError::Conflict)));
    }

    #[test]
    fn rejects_invalid_questions() {
        let json = r#"{ "id": 1, "title": "Broken", "duration": "5",
            "questions": [ { "id": 1, "prompt": "Q", "options": [], "correct_option": 0 } ] }"#;
        assert!(matches!(
            parse_banks(json),
            Err(StorageError::Serialization(_))
        ));
    }

    #[test]
    fn invalid_question_reports_validation_message() {
        let json = r#"[{ "id": 1, "title": "Broken", "duration": "5",
            "questions": [ { "id": 1, "prompt": "Q", "options": ["a"], "correct_option": 3 } ] }]"#;
        let Err(StorageError::Serialization(message)) = parse_banks(json) else {
            panic!("expected a serialization error");
        };
        assert!(message.contains("out of range"), "{message}");
        assert!(!message.contains("untagged"), "{message}");
    }

    #[test]
    fn rejects_empty_question_list() {
        let json = r#"{ "id": 1, "title": "Empty", "duration": "5", "questions": [] }"#;
        assert!(parse_banks(json).is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_banks(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, StorageError::Io(_)));
    }

    #[tokio::test]
    async fn seeds_repository() {
        let repo = InMemoryRepository::new();
        let banks = parse_banks(SINGLE).unwrap();
        assert_eq!(seed_banks(&repo, &banks).await.unwrap(), 1);
        assert!(repo.get_bank(BankId::new(4)).await.is_ok());
    }
}
