//! Display formatting shared by every widget.
//!
//! A unit is zero-padded to two digits only when a higher unit is shown:
//! `5`, `1:05`, `1:00:05`. Hours appear only when non-zero, minutes only when
//! they or the hours are non-zero.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Display strings for one widget value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Display {
    pub hours: Option<String>,
    pub minutes: Option<String>,
    pub seconds: String,
    /// Hundredths of a second; only the stopwatch renders these.
    pub hundredths: Option<String>,
}

impl Display {
    /// Countdown value in whole seconds. Negative values render as zero.
    pub fn from_secs(total_secs: i64) -> Self {
        let total = total_secs.max(0) as u64;
        let hours = total / 3600;
        let minutes = (total % 3600) / 60;
        let seconds = total % 60;

        let (hours, minutes, seconds) = if hours > 0 {
            (
                Some(hours.to_string()),
                Some(format!("{minutes:02}")),
                format!("{seconds:02}"),
            )
        } else if minutes > 0 {
            (None, Some(minutes.to_string()), format!("{seconds:02}"))
        } else {
            (None, None, seconds.to_string())
        };

        Self {
            hours,
            minutes,
            seconds,
            hundredths: None,
        }
    }

    /// Elapsed value in milliseconds, truncated to hundredths.
    pub fn from_millis(elapsed_ms: u64) -> Self {
        let mut display = Self::from_secs((elapsed_ms / 1000) as i64);
        display.hundredths = Some(format!("{:02}", (elapsed_ms % 1000) / 10));
        display
    }

    /// Same value without the sub-second part, used for the page title.
    pub fn whole_seconds(&self) -> String {
        let mut out = String::new();
        if let Some(h) = &self.hours {
            out.push_str(h);
            out.push(':');
        }
        if let Some(m) = &self.minutes {
            out.push_str(m);
            out.push(':');
        }
        out.push_str(&self.seconds);
        out
    }
}

impl fmt::Display for Display {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.whole_seconds())?;
        if let Some(hs) = &self.hundredths {
            write!(f, ".{hs}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_alone_are_unpadded() {
        assert_eq!(Display::from_secs(5).to_string(), "5");
        assert_eq!(Display::from_secs(0).to_string(), "0");
        assert_eq!(Display::from_secs(59).to_string(), "59");
    }

    #[test]
    fn seconds_pad_once_minutes_show() {
        let d = Display::from_secs(65);
        assert_eq!(d.minutes.as_deref(), Some("1"));
        assert_eq!(d.seconds, "05");
        assert_eq!(d.to_string(), "1:05");
    }

    #[test]
    fn minutes_pad_once_hours_show() {
        assert_eq!(Display::from_secs(3605).to_string(), "1:00:05");
        assert_eq!(Display::from_secs(99 * 3600 + 59 * 60 + 59).to_string(), "99:59:59");
    }

    #[test]
    fn negative_renders_as_zero() {
        assert_eq!(Display::from_secs(-1).to_string(), "0");
    }

    #[test]
    fn millis_truncate_to_hundredths() {
        assert_eq!(Display::from_millis(1234).to_string(), "1.23");
        assert_eq!(Display::from_millis(1239).to_string(), "1.23");
        assert_eq!(Display::from_millis(65_040).to_string(), "1:05.04");
        assert_eq!(Display::from_millis(7).to_string(), "0.00");
    }

    #[test]
    fn whole_seconds_drops_hundredths() {
        assert_eq!(Display::from_millis(65_990).whole_seconds(), "1:05");
    }
}
