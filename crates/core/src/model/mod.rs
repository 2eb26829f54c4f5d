mod assessment;
mod duration;
mod ids;
mod progress;
mod question;
mod result;

pub use assessment::{AssessmentError, AssessmentSession, Navigation, SessionState, TickOutcome};
pub use duration::{AssessmentDuration, DEFAULT_DURATION_MINUTES, DurationLabel};
pub use ids::{AttemptId, BankId, ParseIdError, QuestionId};
pub use progress::AssessmentProgress;
pub use question::{Question, QuestionError, QuestionSet};
pub use result::{AssessmentResult, CompletionKind, QuestionOutcome, Selection, compute_result};
