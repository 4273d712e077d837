//! Millisecond-precision UTC timestamp type
//!
//! Every changeset and every bookkeeping field of a document carries a
//! timestamp. The backend stores them as RFC 3339 strings with exactly three
//! fractional digits and a `Z` suffix, e.g. `2024-03-01T12:00:00.000Z`.
//! That fixed-width form sorts lexicographically in time order, which the
//! backends rely on when sorting by `timestamp`.
//!
//! ## Usage
//!
//! ```
//! use catalog_core::Timestamp;
//!
//! let ts = Timestamp::from_millis(0).unwrap();
//! assert_eq!(ts.to_rfc3339(), "1970-01-01T00:00:00.000Z");
//! assert_eq!("1970-01-01T00:00:00.000Z".parse::<Timestamp>().unwrap(), ts);
//! ```

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};

/// Millisecond-precision UTC instant
///
/// ## Invariants
///
/// - Sub-millisecond precision is always truncated, so rendering and parsing
///   round-trip exactly
/// - Timestamps are comparable and orderable
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp for the current moment
    pub fn now() -> Self {
        Self::from_millis(Utc::now().timestamp_millis()).unwrap_or_default()
    }

    /// Create a timestamp from milliseconds since Unix epoch
    ///
    /// Returns `None` when the value is outside the representable range.
    pub fn from_millis(millis: i64) -> Option<Self> {
        DateTime::<Utc>::from_timestamp_millis(millis).map(Timestamp)
    }

    /// Milliseconds since Unix epoch
    #[inline]
    pub fn as_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    /// Render as RFC 3339 with millisecond precision and `Z` suffix
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Parse an RFC 3339 string in any offset
    pub fn parse(raw: &str) -> Result<Self> {
        let parsed = DateTime::parse_from_rfc3339(raw)
            .map_err(|e| Error::Serialization(format!("invalid timestamp '{}': {}", raw, e)))?;
        Self::from_millis(parsed.timestamp_millis())
            .ok_or_else(|| Error::Serialization(format!("timestamp '{}' out of range", raw)))
    }

    /// Subtract a duration, `None` on underflow
    pub fn checked_sub(&self, duration: Duration) -> Option<Self> {
        self.0.checked_sub_signed(duration).map(Timestamp)
    }

    /// Add a duration, `None` on overflow
    pub fn checked_add(&self, duration: Duration) -> Option<Self> {
        self.0.checked_add_signed(duration).map(Timestamp)
    }

    /// Check if this timestamp is before another
    #[inline]
    pub fn is_before(&self, other: Timestamp) -> bool {
        self.0 < other.0
    }

    /// Check if this timestamp is after another
    #[inline]
    pub fn is_after(&self, other: Timestamp) -> bool {
        self.0 > other.0
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Timestamp(DateTime::<Utc>::default())
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

impl FromStr for Timestamp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Timestamp::parse(s)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_rfc3339())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Timestamp::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Clocks
// ============================================================================

/// Source of "now" for the write path and the time-window resolver
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> Timestamp;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Manually driven clock for deterministic tests and replays
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    /// Start the clock at the given instant
    pub fn new(start: Timestamp) -> Self {
        Self {
            millis: AtomicI64::new(start.as_millis()),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, duration: Duration) {
        self.millis
            .fetch_add(duration.num_milliseconds(), Ordering::SeqCst);
    }

    /// Jump to an instant
    pub fn set(&self, ts: Timestamp) {
        self.millis.store(ts.as_millis(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.millis.load(Ordering::SeqCst)).unwrap_or_default()
    }
}
