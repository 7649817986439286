//! # Temporal Types: UTC-Only Timestamps
//!
//! `Timestamp` is a UTC instant truncated to whole seconds. Submission and
//! document records carry these so a persisted snapshot reloads to an
//! identical value, and so callers can compare a submission's age against
//! their own review deadline.
//!
//! Non-UTC inputs are **rejected** by [`Timestamp::parse()`]; there is no
//! silent offset conversion on the strict path.

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::KycCoreError;

/// A UTC-only timestamp, truncated to seconds precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Current UTC time, truncated to seconds.
    pub fn now() -> Self {
        Self(truncate_to_seconds(Utc::now()))
    }

    /// Build from a `DateTime<Utc>`, truncating sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// Parse an RFC 3339 string that must carry the `Z` suffix.
    ///
    /// # Errors
    ///
    /// Returns [`KycCoreError::InvalidTimestamp`] if the string is not valid
    /// RFC 3339 or uses any explicit offset, `+00:00` included.
    pub fn parse(s: &str) -> Result<Self, KycCoreError> {
        if !s.ends_with('Z') {
            return Err(KycCoreError::InvalidTimestamp(format!(
                "timestamp must use Z suffix (UTC only), got: {s:?}"
            )));
        }
        let dt = DateTime::parse_from_rfc3339(s).map_err(|e| {
            KycCoreError::InvalidTimestamp(format!("invalid RFC 3339 timestamp {s:?}: {e}"))
        })?;
        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    /// Build from Unix epoch seconds.
    pub fn from_epoch_secs(secs: i64) -> Result<Self, KycCoreError> {
        DateTime::from_timestamp(secs, 0)
            .map(Self)
            .ok_or_else(|| KycCoreError::InvalidTimestamp(format!("invalid Unix timestamp: {secs}")))
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Unix epoch seconds.
    pub fn epoch_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// Time elapsed from `earlier` to `self`. Negative if `earlier` is later.
    pub fn since(&self, earlier: Timestamp) -> Duration {
        self.0 - earlier.0
    }

    /// Render as ISO8601 with Z suffix (e.g., `2026-01-15T12:00:00Z`).
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_now_has_no_subseconds() {
        assert_eq!(Timestamp::now().as_datetime().nanosecond(), 0);
    }

    #[test]
    fn test_from_utc_truncates() {
        let dt = Utc.with_ymd_and_hms(2026, 3, 2, 8, 15, 30).unwrap();
        let ts = Timestamp::from_utc(dt.with_nanosecond(987_654_321).unwrap());
        assert_eq!(ts.to_iso8601(), "2026-03-02T08:15:30Z");
    }

    #[test]
    fn test_parse_requires_z_suffix() {
        assert!(Timestamp::parse("2026-03-02T08:15:30Z").is_ok());
        assert!(Timestamp::parse("2026-03-02T08:15:30+00:00").is_err());
        assert!(Timestamp::parse("2026-03-02T13:15:30+05:00").is_err());
        assert!(Timestamp::parse("2026-03-02").is_err());
    }

    #[test]
    fn test_since_measures_submission_age() {
        let submitted = Timestamp::parse("2026-03-02T08:00:00Z").unwrap();
        let later = Timestamp::parse("2026-03-04T08:00:00Z").unwrap();
        assert_eq!(later.since(submitted), Duration::days(2));
        assert!(submitted.since(later) < Duration::zero());
    }

    #[test]
    fn test_epoch_secs() {
        let ts = Timestamp::from_epoch_secs(1_767_225_600).unwrap();
        assert_eq!(ts.epoch_secs(), 1_767_225_600);
        assert_eq!(ts.to_iso8601(), "2026-01-01T00:00:00Z");
    }

    #[test]
    fn test_serde_preserves_instant() {
        let ts = Timestamp::parse("2026-03-02T08:15:30Z").unwrap();
        let json = serde_json::to_string(&ts).unwrap();
        let parsed: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(ts, parsed);
    }
}
