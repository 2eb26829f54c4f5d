use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::QuestionId;
use crate::model::question::QuestionSet;

//
// ─── SELECTION ─────────────────────────────────────────────────────────────────
//

/// What the candidate locked in for one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Selection {
    Selected(usize),
    /// Never confirmed before the attempt ended.
    Skipped,
}

impl Selection {
    /// Sentinel index used by result views: the option index, or `-1` when skipped.
    #[must_use]
    pub fn as_index(self) -> i64 {
        match self {
            Selection::Selected(index) => i64::try_from(index).unwrap_or(i64::MAX),
            Selection::Skipped => -1,
        }
    }

    #[must_use]
    pub fn is_skipped(self) -> bool {
        matches!(self, Selection::Skipped)
    }
}

impl From<Option<usize>> for Selection {
    fn from(value: Option<usize>) -> Self {
        value.map_or(Selection::Skipped, Selection::Selected)
    }
}

//
// ─── OUTCOMES ──────────────────────────────────────────────────────────────────
//

/// How an attempt reached completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompletionKind {
    /// Manual submit after every question was confirmed.
    Submitted,
    /// The countdown reached zero.
    TimedOut,
}

/// Per-question line of an [`AssessmentResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOutcome {
    pub question_id: QuestionId,
    pub selection: Selection,
    pub is_correct: bool,
    pub explanation: String,
}

/// Scored view of a completed attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentResult {
    pub score: u32,
    pub total_questions: u32,
    pub percentage: f64,
    pub breakdown: Vec<QuestionOutcome>,
    pub elapsed_seconds: u64,
    pub completion: CompletionKind,
}

impl AssessmentResult {
    /// Number of questions that were never confirmed.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.breakdown
            .iter()
            .filter(|outcome| outcome.selection.is_skipped())
            .count()
    }

    #[must_use]
    pub fn timed_out(&self) -> bool {
        self.completion == CompletionKind::TimedOut
    }
}

/// Score `answers` against `questions`.
///
/// Positions without a confirmed answer (including any beyond the end of
/// `answers`) are reported as skipped and counted incorrect.
#[must_use]
pub fn compute_result(
    questions: &QuestionSet,
    answers: &[Option<usize>],
    started_at: DateTime<Utc>,
    computed_at: DateTime<Utc>,
    completion: CompletionKind,
) -> AssessmentResult {
    let mut score = 0_u32;
    let breakdown: Vec<QuestionOutcome> = questions
        .iter()
        .enumerate()
        .map(|(position, question)| {
            let selection = Selection::from(answers.get(position).copied().flatten());
            let is_correct = match selection {
                Selection::Selected(index) => question.is_correct(index),
                Selection::Skipped => false,
            };
            if is_correct {
                score = score.saturating_add(1);
            }
            QuestionOutcome {
                question_id: question.id(),
                selection,
                is_correct,
                explanation: question.explanation().to_owned(),
            }
        })
        .collect();

    let total_questions = u32::try_from(questions.len()).unwrap_or(u32::MAX);
    let percentage = if total_questions == 0 {
        0.0
    } else {
        100.0 * f64::from(score) / f64::from(total_questions)
    };
    let elapsed_seconds = u64::try_from((computed_at - started_at).num_seconds()).unwrap_or(0);

    AssessmentResult {
        score,
        total_questions,
        percentage,
        breakdown,
        elapsed_seconds,
        completion,
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
