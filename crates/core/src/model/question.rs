use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::assessment::AssessmentError;
use crate::model::ids::QuestionId;

//
// ─── QUESTION ERRORS ───────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question prompt cannot be empty")]
    EmptyPrompt,

    #[error("question must offer at least one option")]
    NoOptions,

    #[error("correct option {index} is out of range for {len} options")]
    CorrectOptionOutOfRange { index: usize, len: usize },
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A single multiple-choice question with exactly one correct option.
///
/// Questions are immutable once built; an assessment never edits them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "QuestionRecord")]
pub struct Question {
    id: QuestionId,
    prompt: String,
    options: Vec<String>,
    correct_option: usize,
    explanation: String,
}

impl Question {
    /// Build a validated question.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError::EmptyPrompt` if the prompt is blank,
    /// `QuestionError::NoOptions` if `options` is empty, and
    /// `QuestionError::CorrectOptionOutOfRange` if `correct_option` does not index `options`.
    pub fn new(
        id: QuestionId,
        prompt: impl Into<String>,
        options: Vec<String>,
        correct_option: usize,
        explanation: impl Into<String>,
    ) -> Result<Self, QuestionError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }
        if options.is_empty() {
            return Err(QuestionError::NoOptions);
        }
        if correct_option >= options.len() {
            return Err(QuestionError::CorrectOptionOutOfRange {
                index: correct_option,
                len: options.len(),
            });
        }

        Ok(Self {
            id,
            prompt,
            options,
            correct_option,
            explanation: explanation.into(),
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn option_count(&self) -> usize {
        self.options.len()
    }

    #[must_use]
    pub fn correct_option(&self) -> usize {
        self.correct_option
    }

    #[must_use]
    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    /// Returns true if `option` is the correct choice for this question.
    #[must_use]
    pub fn is_correct(&self, option: usize) -> bool {
        option == self.correct_option
    }
}

/// Wire shape for a question as it appears in static question banks.
#[derive(Deserialize)]
struct QuestionRecord {
    id: QuestionId,
    prompt: String,
    options: Vec<String>,
    #[serde(alias = "correctOptionIndex")]
    correct_option: usize,
    #[serde(default)]
    explanation: String,
}

impl TryFrom<QuestionRecord> for Question {
    type Error = QuestionError;

    fn try_from(record: QuestionRecord) -> Result<Self, Self::Error> {
        Question::new(
            record.id,
            record.prompt,
            record.options,
            record.correct_option,
            record.explanation,
        )
    }
}

//
// ─── QUESTION SET ──────────────────────────────────────────────────────────────
//

/// Non-empty ordered set of questions with unique ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct QuestionSet(Vec<Question>);

impl QuestionSet {
    /// # Errors
    ///
    /// Returns `AssessmentError::InvalidInput` if `questions` is empty.
    /// Returns `AssessmentError::DuplicateQuestionId` if two questions share an id.
    pub fn new(questions: Vec<Question>) -> Result<Self, AssessmentError> {
        if questions.is_empty() {
            return Err(AssessmentError::InvalidInput);
        }

        let mut seen = HashSet::with_capacity(questions.len());
        for question in &questions {
            if !seen.insert(question.id()) {
                return Err(AssessmentError::DuplicateQuestionId(question.id()));
            }
        }

        Ok(Self(questions))
    }

    /// Number of questions; always at least one.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, position: usize) -> Option<&Question> {
        self.0.get(position)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Question> {
        self.0.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Question] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a QuestionSet {
    type Item = &'a Question;
    type IntoIter = std::slice::Iter<'a, Question>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<'de> Deserialize<'de> for QuestionSet {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let questions = Vec::<Question>::deserialize(deserializer)?;
        QuestionSet::new(questions).map_err(serde::de::Error::custom)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    fn options(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("option {i}")).collect()
    }

    fn question(id: u64) -> Question {
        Question::new(QuestionId::new(id), "Q", options(3), 0, "because").unwrap()
    }

    #[test]
    fn question_rejects_blank_prompt() {
        let err = Question::new(QuestionId::new(1), "  ", options(2), 0, "").unwrap_err();
        assert_eq!(err, QuestionError::EmptyPrompt);
    }

    #[test]
    fn question_rejects_missing_options() {
        let err = Question::new(QuestionId::new(1), "Q", Vec::new(), 0, "").unwrap_err();
        assert_eq!(err, QuestionError::NoOptions);
    }

    #[test]
    fn question_rejects_out_of_range_answer() {
        let err = Question::new(QuestionId::new(1), "Q", options(4), 4, "").unwrap_err();
        assert_eq!(
            err,
            QuestionError::CorrectOptionOutOfRange { index: 4, len: 4 }
        );
    }

    #[test]
    fn question_knows_its_correct_option() {
        let q = Question::new(QuestionId::new(7), "Q", options(4), 2, "why").unwrap();
        assert!(q.is_correct(2));
        assert!(!q.is_correct(0));
        assert_eq!(q.option_count(), 4);
        assert_eq!(q.explanation(), "why");
    }

    #[test]
    fn question_set_rejects_empty_input() {
        let err = QuestionSet::new(Vec::new()).unwrap_err();
        assert!(matches!(err, AssessmentError::InvalidInput));
    }

    #[test]
    fn question_set_rejects_duplicate_ids() {
        let err = QuestionSet::new(vec![question(1), question(2), question(1)]).unwrap_err();
        assert!(matches!(err, AssessmentError::DuplicateQuestionId(id) if id == QuestionId::new(1)));
    }

    #[test]
    fn question_deserializes_camel_case_answer_key() {
        let json = r#"{
            "id": 3,
            "prompt": "2 + 2?",
            "options": ["3", "4"],
            "correctOptionIndex": 1,
            "explanation": "basic arithmetic"
        }"#;
        let q: Question = serde_json::from_str(json).unwrap();
        assert_eq!(q.id(), QuestionId::new(3));
        assert_eq!(q.correct_option(), 1);
    }

    #[test]
    fn question_deserialization_validates() {
        let json = r#"{ "id": 3, "prompt": "Q", "options": ["a"], "correct_option": 5 }"#;
        assert!(serde_json::from_str::<Question>(json).is_err());
    }

    #[test]
    fn question_set_deserialization_rejects_empty_list() {
        assert!(serde_json::from_str::<QuestionSet>("[]").is_err());
    }
}
