//! Registry version stamps

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wall-clock seconds written to a registry's `version` header.
///
/// Every mutating write must produce a stamp strictly greater than the
/// previous one, even if the clock has not moved or went backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VersionStamp(i64);

impl VersionStamp {
    pub fn new(secs: i64) -> Self {
        Self(secs)
    }

    pub fn now() -> Self {
        Self(Utc::now().timestamp())
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// Next stamp after `self`: the current time, or `self + 1` if that is
    /// not later
    pub fn bump(&self) -> Self {
        self.bump_at(Utc::now())
    }

    pub fn bump_at(&self, now: DateTime<Utc>) -> Self {
        Self(now.timestamp().max(self.0 + 1))
    }

    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.0, 0)
    }
}

impl fmt::Display for VersionStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for VersionStamp {
    fn from(secs: i64) -> Self {
        Self(secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_bump_uses_clock_when_later() {
        let now = Utc.timestamp_opt(1_760_000_500, 0).unwrap();
        let stamp = VersionStamp::new(1_760_000_003).bump_at(now);
        assert_eq!(stamp.value(), 1_760_000_500);
    }

    #[test]
    fn test_bump_is_strictly_increasing() {
        let now = Utc.timestamp_opt(1_000, 0).unwrap();
        let stamp = VersionStamp::new(5_000);
        assert_eq!(stamp.bump_at(now).value(), 5_001);
        assert!(stamp.bump() > stamp);
    }
}
