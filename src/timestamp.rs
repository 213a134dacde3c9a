//! Timestamp keys for the ordered index.
//!
//! The same instant can be written several ways ("2024-03-01 09:00",
//! "2024-03-01T09:00:00Z", ...). Keys compare by the parsed UTC instant, never by
//! their text, and keep the original text for display.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M%z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

// Bare times of day are anchored to 1970-01-01.
const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"];

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Timestamp {
    instant: DateTime<Utc>,
    original: String,
}

impl Timestamp {
    /// Parse a timestamp, failing with [`Error::InvalidKeyOrdering`] when the
    /// text is not a recognised date/time.
    pub fn parse(text: &str) -> Result<Self> {
        let trimmed = text.trim();
        let instant =
            parse_instant(trimmed).ok_or_else(|| Error::InvalidKeyOrdering(text.to_owned()))?;
        Ok(Self {
            instant,
            original: trimmed.to_owned(),
        })
    }

    pub fn from_instant(instant: DateTime<Utc>) -> Self {
        Self {
            instant,
            original: instant.to_rfc3339(),
        }
    }

    #[inline]
    pub fn instant(&self) -> DateTime<Utc> {
        self.instant
    }

    /// The text the timestamp was parsed from.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.original
    }
}

fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ndt.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|ndt| ndt.and_utc());
    }
    for fmt in TIME_FORMATS {
        if let Ok(time) = NaiveTime::parse_from_str(s, fmt) {
            return NaiveDate::from_ymd_opt(1970, 1, 1).map(|d| d.and_time(time).and_utc());
        }
    }
    None
}

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        self.instant == other.instant
    }
}

impl Eq for Timestamp {}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.instant.cmp(&other.instant)
    }
}

impl Hash for Timestamp {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.instant.hash(state);
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl FromStr for Timestamp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<Timestamp> for String {
    fn from(ts: Timestamp) -> Self {
        ts.original
    }
}

impl TryFrom<String> for Timestamp {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equivalent_spellings_compare_equal() {
        let a = Timestamp::parse("2024-03-01 09:00").unwrap();
        let b = Timestamp::parse("2024-03-01T09:00:00Z").unwrap();
        let c = Timestamp::parse("2024-03-01T06:00:00-03:00").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.as_str(), "2024-03-01 09:00");
        assert_eq!(c.to_string(), "2024-03-01T06:00:00-03:00");
    }

    #[test]
    fn test_ordering_by_instant() {
        let early = Timestamp::parse("2024-03-01 09:00:00").unwrap();
        let late = Timestamp::parse("2024-03-01T10:30").unwrap();
        let day = Timestamp::parse("2024-03-02").unwrap();
        assert!(early < late);
        assert!(late < day);
    }

    #[test]
    fn test_time_of_day() {
        let nine = Timestamp::parse("09:00").unwrap();
        let ten = Timestamp::parse("10:00:00").unwrap();
        assert!(nine < ten);
        assert_eq!(nine.instant().timestamp(), 9 * 3600);
    }

    #[test]
    fn test_rejects_garbage() {
        assert_eq!(
            Timestamp::parse("next tuesday"),
            Err(Error::InvalidKeyOrdering("next tuesday".to_owned()))
        );
        assert!("2024-13-01 09:00".parse::<Timestamp>().is_err());
    }

    #[test]
    fn test_serde_keeps_original_text() {
        let ts = Timestamp::parse("2024-03-01 09:00").unwrap();
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(json, "\"2024-03-01 09:00\"");
        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back.as_str(), "2024-03-01 09:00");
        assert!(serde_json::from_str::<Timestamp>("\"soon\"").is_err());
    }
}
