//! Parsing of Google Timeline exports.
//!
//! Two document shapes exist in the wild: the older Records export with a
//! flat `locations` array of E7-integer coordinates, and the newer
//! semantic-segments export where only `visit` segments carry a coordinate,
//! formatted as a `"lat°, lon°"` string pair. Both reduce to the same
//! [`LocationRecord`] stream.

use std::path::Path;

use chrono::DateTime;
use log::{debug, warn};
use serde::Deserialize;

use crate::error_handling::{ErrorStats, ErrorType, InputError};
use crate::models::LocationRecord;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HistoryDocument {
    Records {
        locations: Vec<RawLocation>,
    },
    Segments {
        #[serde(rename = "semanticSegments")]
        semantic_segments: Vec<RawSegment>,
    },
}

#[derive(Debug, Deserialize)]
struct RawLocation {
    timestamp: String,
    #[serde(rename = "latitudeE7")]
    latitude_e7: Option<i64>,
    #[serde(rename = "longitudeE7")]
    longitude_e7: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RawSegment {
    #[serde(rename = "startTime")]
    start_time: String,
    visit: Option<RawVisit>,
}

#[derive(Debug, Deserialize)]
struct RawVisit {
    #[serde(rename = "topCandidate")]
    top_candidate: Option<RawCandidate>,
}

#[derive(Debug, Deserialize)]
struct RawCandidate {
    #[serde(rename = "placeLocation")]
    place_location: Option<RawPlaceLocation>,
}

#[derive(Debug, Deserialize)]
struct RawPlaceLocation {
    #[serde(rename = "latLng")]
    lat_lng: Option<String>,
}

/// Loads a history export into location records.
///
/// A missing or structurally corrupt file is fatal. A record whose timestamp
/// does not parse is skipped, counted, and logged; the run continues.
pub fn load_history(path: &Path, stats: &ErrorStats) -> Result<Vec<LocationRecord>, InputError> {
    let contents = std::fs::read_to_string(path).map_err(|e| InputError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let document: HistoryDocument = serde_json::from_str(&contents)?;

    let records = match document {
        HistoryDocument::Records { locations } => {
            debug!("History file is a Records export ({} entries)", locations.len());
            locations
                .into_iter()
                .filter_map(|raw| convert_location(raw, stats))
                .collect()
        }
        HistoryDocument::Segments { semantic_segments } => {
            debug!(
                "History file is a semantic-segments export ({} segments)",
                semantic_segments.len()
            );
            semantic_segments
                .into_iter()
                .filter_map(|raw| convert_segment(raw, stats))
                .collect()
        }
    };

    Ok(records)
}

fn convert_location(raw: RawLocation, stats: &ErrorStats) -> Option<LocationRecord> {
    let timestamp = parse_timestamp(&raw.timestamp, stats)?;
    Some(LocationRecord {
        timestamp,
        latitude: raw.latitude_e7.map(|e7| e7 as f64 / 1e7),
        longitude: raw.longitude_e7.map(|e7| e7 as f64 / 1e7),
    })
}

fn convert_segment(raw: RawSegment, stats: &ErrorStats) -> Option<LocationRecord> {
    let timestamp = parse_timestamp(&raw.start_time, stats)?;

    // Only visit segments carry a place coordinate; activity and path
    // segments still contribute a coordinate-less record.
    let lat_lng = raw
        .visit
        .and_then(|v| v.top_candidate)
        .and_then(|c| c.place_location)
        .and_then(|p| p.lat_lng);

    let (latitude, longitude) = match lat_lng.as_deref().map(parse_lat_lng) {
        Some(Some(pair)) => (Some(pair.0), Some(pair.1)),
        Some(None) => {
            warn!("Skipping unparsable visit coordinate: {:?}", lat_lng);
            (None, None)
        }
        None => (None, None),
    };

    Some(LocationRecord {
        timestamp,
        latitude,
        longitude,
    })
}

/// Parses an RFC 3339 timestamp, with or without fractional seconds, in any
/// offset (`Z` included).
fn parse_timestamp(value: &str, stats: &ErrorStats) -> Option<chrono::DateTime<chrono::FixedOffset>> {
    match DateTime::parse_from_rfc3339(value) {
        Ok(ts) => Some(ts),
        Err(e) => {
            stats.increment(ErrorType::TimestampParseError);
            warn!("Skipping record with unparsable timestamp '{}': {}", value, e);
            None
        }
    }
}

/// Parses the `"47.6062095°, -122.3320708°"` coordinate pair format.
fn parse_lat_lng(value: &str) -> Option<(f64, f64)> {
    let mut parts = value.split(',');
    let lat = parts.next()?.trim().trim_end_matches('°').parse().ok()?;
    let lon = parts.next()?.trim().trim_end_matches('°').parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((lat, lon))
}
