/// Aggregated view of assessment progress, useful for UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssessmentProgress {
    pub total: usize,
    pub answered: usize,
    pub remaining_seconds: u32,
    pub can_submit: bool,
    pub is_complete: bool,
}

impl AssessmentProgress {
    /// Share of confirmed questions in `0.0..=1.0`.
    #[must_use]
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.answered as f64 / self.total as f64
    }
}
