//! Relative time windows for the `since` parameter
//!
//! Grammar: `^[1-9][0-9]*[dw]$`. `5d` means "the last five days", `3w`
//! "the last three weeks". Anything else is rejected with
//! [`Error::InvalidTimeWindow`]; nothing is clamped or defaulted.

use crate::error::{Error, Result};
use crate::timestamp::Timestamp;
use chrono::Duration;
use std::fmt;
use std::str::FromStr;

/// Unit suffix of a time window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowUnit {
    /// `d`
    Days,
    /// `w`
    Weeks,
}

/// A parsed `since` expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    count: u32,
    unit: WindowUnit,
}

impl TimeWindow {
    /// Parse a window expression
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = || Error::InvalidTimeWindow(raw.to_string());

        let (digits, suffix) = match raw.char_indices().last() {
            Some((pos, c)) => (&raw[..pos], c),
            None => return Err(invalid()),
        };
        let unit = match suffix {
            'd' => WindowUnit::Days,
            'w' => WindowUnit::Weeks,
            _ => return Err(invalid()),
        };

        // Leading zero, sign and whitespace are all rejected here; u32::from_str
        // would otherwise accept a leading '+'.
        let mut bytes = digits.bytes();
        match bytes.next() {
            Some(b'1'..=b'9') => {}
            _ => return Err(invalid()),
        }
        if !bytes.all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let count = digits.parse::<u32>().map_err(|_| invalid())?;

        Ok(TimeWindow { count, unit })
    }

    /// Resolve an optional `since` parameter against `now`
    ///
    /// `None` means "no lower bound" and is valid.
    pub fn resolve(since: Option<&str>, now: Timestamp) -> Result<Option<Timestamp>> {
        match since {
            None => Ok(None),
            Some(raw) => TimeWindow::parse(raw)?.lower_bound(now).map(Some),
        }
    }

    /// Number of units
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Unit of the window
    pub fn unit(&self) -> WindowUnit {
        self.unit
    }

    /// Length of the window
    pub fn duration(&self) -> Duration {
        let count = i64::from(self.count);
        match self.unit {
            WindowUnit::Days => Duration::days(count),
            WindowUnit::Weeks => Duration::weeks(count),
        }
    }

    /// Absolute lower bound: `now` minus the window
    pub fn lower_bound(&self, now: Timestamp) -> Result<Timestamp> {
        now.checked_sub(self.duration())
            .ok_or_else(|| Error::InvalidTimeWindow(self.to_string()))
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = match self.unit {
            WindowUnit::Days => 'd',
            WindowUnit::Weeks => 'w',
        };
        write!(f, "{}{}", self.count, suffix)
    }
}

impl FromStr for TimeWindow {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        TimeWindow::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> Timestamp {
        Timestamp::parse("2024-06-30T12:00:00.000Z").unwrap()
    }

    #[test]
    fn test_days() {
        let bound = TimeWindow::resolve(Some("5d"), now()).unwrap().unwrap();
        assert_eq!(bound.to_rfc3339(), "2024-06-25T12:00:00.000Z");
    }

    #[test]
    fn test_weeks() {
        let bound = TimeWindow::resolve(Some("3w"), now()).unwrap().unwrap();
        assert_eq!(bound.to_rfc3339(), "2024-06-09T12:00:00.000Z");
    }

    #[test]
    fn test_absent_is_unbounded() {
        assert_eq!(TimeWindow::resolve(None, now()).unwrap(), None);
    }

    #[test]
    fn test_multi_digit_count() {
        let window = TimeWindow::parse("120d").unwrap();
        assert_eq!(window.count(), 120);
        assert_eq!(window.unit(), WindowUnit::Days);
        assert_eq!(window.to_string(), "120d");
    }

    #[test]
    fn test_rejected_forms() {
        for raw in ["0d", "-1d", "5", "5x", "", "d", "w", "05d", "+5d", " 5d", "5d ", "5 d", "5D", "1.5w", "٣d"] {
            let err = TimeWindow::resolve(Some(raw), now()).unwrap_err();
            assert!(
                matches!(err, Error::InvalidTimeWindow(ref s) if s == raw),
                "expected {:?} to be rejected",
                raw
            );
        }
    }

    #[test]
    fn test_count_overflow_is_rejected() {
        assert!(TimeWindow::parse("99999999999d").is_err());
    }

    #[test]
    fn test_window_reaching_before_representable_range_is_rejected() {
        let err = TimeWindow::resolve(Some("4000000000w"), now()).unwrap_err();
        assert!(matches!(err, Error::InvalidTimeWindow(_)));
    }
}
