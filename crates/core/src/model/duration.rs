use serde::{Deserialize, Serialize};

/// Recommended fallback when a duration label carries no minute count.
pub const DEFAULT_DURATION_MINUTES: u32 = 30;

/// Time allowed for one attempt, in whole minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssessmentDuration {
    minutes: u32,
}

impl AssessmentDuration {
    #[must_use]
    pub fn from_minutes(minutes: u32) -> Self {
        Self { minutes }
    }

    #[must_use]
    pub fn minutes(&self) -> u32 {
        self.minutes
    }

    /// Countdown length in seconds, saturating at `u32::MAX`.
    #[must_use]
    pub fn total_seconds(&self) -> u32 {
        self.minutes.saturating_mul(60)
    }
}

/// Human-facing duration descriptor such as `"30 mins"` or `"Time: 45 minutes"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DurationLabel(String);

impl DurationLabel {
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse the first embedded run of ASCII digits as minutes.
    ///
    /// Falls back to `default_minutes` when the label holds no digits or the
    /// number does not fit in a `u32`.
    #[must_use]
    pub fn parse(label: &str, default_minutes: u32) -> AssessmentDuration {
        let minutes = first_number(label).unwrap_or(default_minutes);
        AssessmentDuration::from_minutes(minutes)
    }

    /// Resolve this label against an explicit default.
    #[must_use]
    pub fn resolve(&self, default_minutes: u32) -> AssessmentDuration {
        Self::parse(&self.0, default_minutes)
    }
}

impl From<&str> for DurationLabel {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DurationLabel {
    fn from(value: String) -> Self {
        Self(value)
    }
}

fn first_number(label: &str) -> Option<u32> {
    let start = label.find(|c: char| c.is_ascii_digit())?;
    let digits = &label[start..];
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_leading_minutes() {
        assert_eq!(DurationLabel::parse("45 mins", 30).minutes(), 45);
    }

    #[test]
    fn parses_embedded_minutes() {
        let duration = DurationLabel::parse("Duration: 20 minutes (approx. 10 questions)", 30);
        assert_eq!(duration.minutes(), 20);
        assert_eq!(duration.total_seconds(), 1200);
    }

    #[test]
    fn falls_back_to_the_caller_default() {
        assert_eq!(DurationLabel::parse("untimed", 30).minutes(), 30);
        assert_eq!(DurationLabel::parse("", 60).minutes(), 60);
    }

    #[test]
    fn oversized_numbers_use_the_default() {
        assert_eq!(DurationLabel::parse("99999999999 mins", 30).minutes(), 30);
    }

    #[test]
    fn total_seconds_saturates() {
        let duration = AssessmentDuration::from_minutes(u32::MAX);
        assert_eq!(duration.total_seconds(), u32::MAX);
    }

    #[test]
    fn label_resolves_against_default() {
        let label = DurationLabel::from("1 hr");
        assert_eq!(label.resolve(30).minutes(), 1);
        assert_eq!(label.as_str(), "1 hr");
    }
}
