use crate::applied::Applied;
use std::fmt;

/// Multiplicative plausibility of a match, in `[0, 1]`, with a reason.
#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    value: f64,
    reason: String,
}

impl Score {
    pub fn new(value: f64, reason: impl Into<String>) -> Self {
        Self {
            value: value.clamp(0.0, 1.0),
            reason: reason.into(),
        }
    }

    pub fn certain() -> Self {
        Self::new(1.0, "no bindings yet")
    }

    pub fn zero(reason: impl Into<String>) -> Self {
        Self::new(0.0, reason)
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn times(&self, other: &Score) -> Score {
        let reason = if other.value == 1.0 {
            self.reason.clone()
        } else if self.value == 1.0 {
            other.reason.clone()
        } else {
            format!("{}; {}", self.reason, other.reason)
        };
        Score {
            value: self.value * other.value,
            reason,
        }
    }

    /// How well a candidate for a variable agrees with the value it was
    /// given before.
    pub fn against_hint(current: &Applied, hint: &Applied) -> Score {
        let hint_text = hint.text();
        if hint_text.is_some() && current.text() == hint_text {
            Score::new(1.0, "matches given value")
        } else if hint.flex().max_len() == 0 && current.flex().min_len() > 0 {
            Score::new(0.5, "omitted given value")
        } else if current.merge(hint).is_some() {
            Score::new(0.9, "compatible with given value")
        } else {
            Score::new(0.2, "differs from given value")
        }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} ({})", self.value, self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::applied::Host;
    use crate::range::{Constraint, RangeFlex};

    #[test]
    fn test_times_multiplies() {
        let a = Score::new(0.5, "half");
        let b = Score::new(0.2, "fifth");
        let product = a.times(&b);
        assert!((product.value() - 0.1).abs() < 1e-12);
        assert_eq!(product.reason(), "half; fifth");
        assert_eq!(Score::certain().times(&b).reason(), "fifth");
    }

    #[test]
    fn test_against_identical_hint() {
        let score = Score::against_hint(&Applied::of("x"), &Applied::of("x"));
        assert_eq!(score.value(), 1.0);
    }

    #[test]
    fn test_against_empty_hint() {
        let score = Score::against_hint(&Applied::of("x"), &Applied::of(""));
        assert_eq!(score.value(), 0.5);
        assert_eq!(score.reason(), "omitted given value");
    }

    #[test]
    fn test_against_compatible_hint() {
        let host = Host::new("my test value");
        let current = RangeFlex::within(host.len()).apply_to(&host).unwrap();
        let score = Score::against_hint(&current, &Applied::of("test"));
        assert_eq!(score.value(), 0.9);
    }

    #[test]
    fn test_against_conflicting_hint() {
        let score = Score::against_hint(
            &Applied::of("my test value"),
            &Applied::of("my original value"),
        );
        assert_eq!(score.value(), 0.2);
    }

    #[test]
    fn test_flexible_empty_hint_counts_as_empty() {
        let host = Host::new("abc");
        let hint = RangeFlex::within(3)
            .constrain(&Constraint::ToMaxLength(0))
            .unwrap()
            .apply_to(&host)
            .unwrap();
        assert_eq!(Score::against_hint(&Applied::of(""), &hint).value(), 1.0);
    }
}
