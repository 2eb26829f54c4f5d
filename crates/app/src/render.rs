use std::fmt::Write as _;

use quiz_core::model::{AssessmentResult, AssessmentSession, CompletionKind, Selection};
use quiz_core::time::format_countdown;
use services::AttemptListItem;

/// Question screen: navigator strip, prompt, options and timer.
#[must_use]
pub fn question_screen(session: &AssessmentSession) -> String {
    let mut out = String::new();
    let index = session.current_index();
    let question = session.current_question();

    let navigator: Vec<String> = (0..session.total_questions())
        .map(|position| {
            let mark = if session.is_answered(position) { "x" } else { " " };
            if position == index {
                format!("<{}{mark}>", position + 1)
            } else {
                format!("[{}{mark}]", position + 1)
            }
        })
        .collect();

    let _ = writeln!(out);
    let _ = writeln!(out, "{}", navigator.join(" "));
    let _ = writeln!(
        out,
        "Question {} of {}   time left {}   answered {}/{}",
        index + 1,
        session.total_questions(),
        format_countdown(session.remaining_seconds()),
        session.answered_count(),
        session.total_questions()
    );
    let _ = writeln!(out, "{}", question.prompt());

    let pending = session.pending_selection();
    for (i, option) in question.options().iter().enumerate() {
        let marker = if pending == Some(i) { '*' } else { ' ' };
        let _ = writeln!(out, " {marker} {}. {option}", i + 1);
    }

    if session.is_answered(index) {
        let _ = writeln!(out, "Answer locked. {}", question.explanation());
    } else if pending.is_some() {
        let _ = writeln!(out, "Type c to confirm your choice.");
    }
    if session.can_submit() {
        let _ = writeln!(out, "All questions answered. Type submit to finish.");
    }
    out
}

/// Results screen with the per-question breakdown.
#[must_use]
pub fn result_screen(result: &AssessmentResult) -> String {
    let mut out = String::new();
    let heading = match result.completion {
        CompletionKind::Submitted => "Assessment submitted",
        CompletionKind::TimedOut => "Time is up, assessment submitted automatically",
    };
    let _ = writeln!(out);
    let _ = writeln!(out, "{heading}");
    let _ = writeln!(
        out,
        "Score {}/{} ({:.0}%) in {}",
        result.score,
        result.total_questions,
        result.percentage,
        format_elapsed(result.elapsed_seconds)
    );

    for (position, outcome) in result.breakdown.iter().enumerate() {
        let verdict = match (outcome.selection, outcome.is_correct) {
            (Selection::Skipped, _) => "skipped".to_string(),
            (Selection::Selected(i), true) => format!("option {} correct", i + 1),
            (Selection::Selected(i), false) => format!("option {} wrong", i + 1),
        };
        let _ = writeln!(out, " {}. {verdict}", position + 1);
        if !outcome.explanation.is_empty() {
            let _ = writeln!(out, "    {}", outcome.explanation);
        }
    }
    let _ = writeln!(out, "Type r to retake or q to leave.");
    out
}

#[must_use]
pub fn history_screen(title: &str, items: &[AttemptListItem]) -> String {
    let mut out = String::new();
    if items.is_empty() {
        return out;
    }
    let _ = writeln!(out, "Recent attempts for {title}:");
    for item in items {
        let _ = writeln!(
            out,
            " {}  {}/{} ({:.0}%){}",
            item.recorded_at.format("%Y-%m-%d %H:%M"),
            item.score,
            item.total,
            item.percentage,
            if item.completion == CompletionKind::TimedOut {
                "  timed out"
            } else {
                ""
            }
        );
    }
    out
}

fn format_elapsed(seconds: u64) -> String {
    format_countdown(u32::try_from(seconds).unwrap_or(u32::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{AssessmentDuration, Question, QuestionId};
    use quiz_core::time::fixed_now;

    fn session() -> AssessmentSession {
        let questions = (1..=2)
            .map(|id| {
                Question::new(
                    QuestionId::new(id),
                    format!("Prompt {id}"),
                    vec!["left".into(), "right".into()],
                    1,
                    "Right is right.",
                )
                .unwrap()
            })
            .collect();
        AssessmentSession::new(questions, AssessmentDuration::from_minutes(2), fixed_now())
            .unwrap()
    }

    #[test]
    fn question_screen_marks_pending_and_timer() {
        let mut s = session();
        s.select_option(0, 1);
        let screen = question_screen(&s);
        assert!(screen.contains("<1 > [2 ]"));
        assert!(screen.contains("time left 02:00"));
        assert!(screen.contains(" * 2. right"));
        assert!(screen.contains("Type c to confirm"));
    }

    #[test]
    fn question_screen_shows_explanation_once_locked() {
        let mut s = session();
        s.select_option(0, 0);
        s.confirm_answer(0);
        let screen = question_screen(&s);
        assert!(screen.contains("<1x>"));
        assert!(screen.contains("Answer locked. Right is right."));
    }

    #[test]
    fn result_screen_lists_skips() {
        let mut s = session();
        s.select_option(0, 1);
        s.confirm_answer(0);
        while s.is_active() {
            s.tick(fixed_now());
        }
        let screen = result_screen(&s.result().unwrap());
        assert!(screen.contains("Time is up"));
        assert!(screen.contains("Score 1/2 (50%)"));
        assert!(screen.contains(" 1. option 2 correct"));
        assert!(screen.contains(" 2. skipped"));
    }
}
