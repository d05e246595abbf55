use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const MAX_HOURS: u32 = 99;

/// Raw hours/minutes/seconds as entered for a countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimeInput {
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
}

impl TimeInput {
    pub fn new(hours: u32, minutes: u32, seconds: u32) -> Self {
        Self {
            hours,
            minutes,
            seconds,
        }
    }

    /// Parse three text fields. Blank fields count as zero.
    pub fn parse(hours: &str, minutes: &str, seconds: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            hours: parse_field("hours", hours)?,
            minutes: parse_field("minutes", minutes)?,
            seconds: parse_field("seconds", seconds)?,
        })
    }

    /// Carry seconds into minutes and minutes into hours; hours cap at 99.
    pub fn normalized(self) -> Self {
        let minutes = u64::from(self.minutes) + u64::from(self.seconds) / 60;
        let seconds = self.seconds % 60;
        let hours = u64::from(self.hours) + minutes / 60;
        let minutes = (minutes % 60) as u32;
        Self {
            hours: hours.min(u64::from(MAX_HOURS)) as u32,
            minutes,
            seconds,
        }
    }

    pub fn total_secs(self) -> i64 {
        i64::from(self.hours) * 3600 + i64::from(self.minutes) * 60 + i64::from(self.seconds)
    }

    pub fn is_zero(self) -> bool {
        self.hours == 0 && self.minutes == 0 && self.seconds == 0
    }
}

fn parse_field(field: &str, raw: &str) -> Result<u32, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0);
    }
    raw.parse::<u32>().map_err(|e| ValidationError::InvalidValue {
        field: field.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn seventy_five_minutes_carry_into_an_hour() {
        let n = TimeInput::new(0, 75, 0).normalized();
        assert_eq!(n, TimeInput::new(1, 15, 0));
        assert_eq!(n.total_secs(), 4500);
    }

    #[test]
    fn seconds_cascade_through_minutes() {
        assert_eq!(TimeInput::new(0, 59, 61).normalized(), TimeInput::new(1, 0, 1));
    }

    #[test]
    fn hours_are_capped() {
        assert_eq!(TimeInput::new(120, 5, 0).normalized(), TimeInput::new(99, 5, 0));
        assert_eq!(TimeInput::new(99, 60, 0).normalized(), TimeInput::new(99, 0, 0));
    }

    #[test]
    fn parse_accepts_blanks_and_rejects_text() {
        assert_eq!(TimeInput::parse("", "1", " 5 ").unwrap(), TimeInput::new(0, 1, 5));
        assert!(TimeInput::parse("a", "0", "0").is_err());
        assert!(TimeInput::parse("0", "-1", "0").is_err());
    }

    proptest! {
        #[test]
        fn normalization_preserves_total_below_cap(h in 0u32..50, m in 0u32..600, s in 0u32..6000) {
            let raw = TimeInput::new(h, m, s);
            let n = raw.normalized();
            prop_assert!(n.minutes < 60);
            prop_assert!(n.seconds < 60);
            prop_assert!(n.hours <= MAX_HOURS);
            if raw.total_secs() < i64::from(MAX_HOURS + 1) * 3600 {
                prop_assert_eq!(n.total_secs(), raw.total_secs());
            }
        }

        #[test]
        fn normalization_is_idempotent(h in 0u32..200, m in 0u32..200, s in 0u32..200) {
            let once = TimeInput::new(h, m, s).normalized();
            prop_assert_eq!(once.normalized(), once);
        }
    }
}
