use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDate};

/// Sentinel stored and reported for a record with no coordinates.
pub const SENTINEL_UNKNOWN_LOCATION: &str = "Unknown location";
/// Sentinel for a successful lookup whose address had no usable components.
pub const SENTINEL_UNKNOWN_NAME: &str = "Unknown place name";
/// Sentinel for a lookup that timed out after all retries.
pub const SENTINEL_TIMEOUT: &str = "ERROR: geocoding timed out";
/// Sentinel for any other lookup failure.
pub const SENTINEL_FAILED: &str = "ERROR: geocoding failed";

/// One timestamped point from the history export. Immutable once parsed;
/// coordinates are absent when a visit segment carries none.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationRecord {
    pub timestamp: DateTime<FixedOffset>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// The record chosen to represent one calendar day within a date range.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyPick {
    pub date: NaiveDate,
    /// Record timestamp shifted into the range's offset, when one is set.
    pub local_timestamp: DateTime<FixedOffset>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Outcome of resolving coordinates to a place name.
///
/// The cache file stores plain strings; failure meaning lives in this enum
/// rather than in substring conventions, with an exact bidirectional mapping
/// to the sentinel strings for persistence and display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Human-readable place name, e.g. "Seattle, Washington, United States".
    Place(String),
    /// The record had no coordinates to resolve.
    UnknownLocation,
    /// The provider answered but every address component was absent.
    UnknownName,
    /// The lookup timed out on every attempt.
    Timeout,
    /// The lookup failed for a non-timeout reason.
    Failed,
}

impl Resolution {
    /// True only for a real place name; sentinels never carry a country.
    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Place(_))
    }

    /// Decodes a cached string back into a tagged resolution.
    pub fn from_cached(value: &str) -> Resolution {
        match value {
            SENTINEL_UNKNOWN_LOCATION => Resolution::UnknownLocation,
            SENTINEL_UNKNOWN_NAME => Resolution::UnknownName,
            SENTINEL_TIMEOUT => Resolution::Timeout,
            SENTINEL_FAILED => Resolution::Failed,
            place => Resolution::Place(place.to_string()),
        }
    }

    /// The string persisted in the cache file (and shown in the report).
    pub fn as_cached(&self) -> &str {
        match self {
            Resolution::Place(name) => name,
            Resolution::UnknownLocation => SENTINEL_UNKNOWN_LOCATION,
            Resolution::UnknownName => SENTINEL_UNKNOWN_NAME,
            Resolution::Timeout => SENTINEL_TIMEOUT,
            Resolution::Failed => SENTINEL_FAILED,
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_cached())
    }
}

/// A daily pick joined with its geocoding result.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedRecord {
    pub date: NaiveDate,
    pub timestamp: DateTime<FixedOffset>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub place: Resolution,
}

/// A maximal run of consecutive days spent outside the home country.
#[derive(Debug, Clone, PartialEq)]
pub struct Trip {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// One (date, place name) entry per away day, in date order.
    pub days: Vec<(NaiveDate, String)>,
    /// True when the data ran out before a home day closed the trip.
    pub ongoing: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_round_trip() {
        for res in [
            Resolution::UnknownLocation,
            Resolution::UnknownName,
            Resolution::Timeout,
            Resolution::Failed,
            Resolution::Place("Toronto, Ontario, Canada".to_string()),
        ] {
            assert_eq!(Resolution::from_cached(res.as_cached()), res);
        }
    }

    #[test]
    fn test_only_places_are_resolved() {
        assert!(Resolution::Place("Lisbon, Portugal".to_string()).is_resolved());
        assert!(!Resolution::Timeout.is_resolved());
        assert!(!Resolution::UnknownLocation.is_resolved());
    }
}
