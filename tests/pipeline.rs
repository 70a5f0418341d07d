//! End-to-end pipeline tests.
//!
//! These runs are fully offline: every coordinate in the history is
//! pre-seeded in the cache file, so `run_report` never reaches the network.

use clap::Parser;
use std::path::Path;
use tempfile::TempDir;
use timeline_to_city::{run_report, Config};

const RANGES_YAML: &str = "date_ranges:
  - start: '2024-01-01'
    end: '2024-01-05'
    closest_time: '12:00:00'
";

/// Records export with one point per day, 2024-01-01 through 2024-01-05.
/// Coordinates are chosen to round cleanly to 5 decimal places.
const HISTORY_JSON: &str = r#"{
  "locations": [
    {"timestamp": "2024-01-01T12:00:00Z", "latitudeE7": 437000000, "longitudeE7": -794000000},
    {"timestamp": "2024-01-02T12:00:00Z", "latitudeE7": 476000000, "longitudeE7": -1223000000},
    {"timestamp": "2024-01-03T12:00:00Z", "latitudeE7": 476000000, "longitudeE7": -1223000000},
    {"timestamp": "2024-01-04T12:00:00Z", "latitudeE7": 493000000, "longitudeE7": -1231000000},
    {"timestamp": "2024-01-05T12:00:00Z", "latitudeE7": 493000000, "longitudeE7": -1231000000}
  ]
}"#;

const SEEDED_CACHE: &str = r#"{
  "43.70000,-79.40000": "Toronto, Ontario, Canada",
  "47.60000,-122.30000": "Seattle, Washington, USA",
  "49.30000,-123.10000": "Vancouver, British Columbia, Canada"
}"#;

fn test_config(dir: &Path) -> Config {
    Config::try_parse_from([
        "timeline_to_city",
        dir.join("history.json").to_str().unwrap(),
        "--email",
        "test@example.com",
        "--config",
        dir.join("ranges.yaml").to_str().unwrap(),
        "--cache-path",
        dir.join("cache.json").to_str().unwrap(),
        "--output",
        dir.join("output.tsv").to_str().unwrap(),
        "--home-country",
        "Canada",
    ])
    .expect("test args should parse")
}

fn write_fixtures(dir: &Path, history: &str, cache: &str) {
    std::fs::write(dir.join("ranges.yaml"), RANGES_YAML).expect("write ranges");
    std::fs::write(dir.join("history.json"), history).expect("write history");
    std::fs::write(dir.join("cache.json"), cache).expect("write cache");
}

#[tokio::test]
async fn test_full_run_from_seeded_cache() {
    let dir = TempDir::new().expect("temp dir");
    write_fixtures(dir.path(), HISTORY_JSON, SEEDED_CACHE);

    let report = run_report(test_config(dir.path()))
        .await
        .expect("run should succeed");

    assert_eq!(report.total_picks, 5);
    assert_eq!(report.cache_hits, 5);
    assert_eq!(report.network_lookups, 0);

    // The two Seattle days form the single trip outside Canada
    assert_eq!(report.trips.len(), 1);
    assert_eq!(report.trips[0].start.to_string(), "2024-01-02");
    assert_eq!(report.trips[0].end.to_string(), "2024-01-03");
    assert!(!report.trips[0].ongoing);

    let tsv = std::fs::read_to_string(dir.path().join("output.tsv")).expect("read report");
    let lines: Vec<&str> = tsv.lines().collect();
    assert_eq!(lines.len(), 6);
    assert_eq!(
        lines[0],
        "Timestamp (Local)\tLatitude\tLongitude\tClosest City"
    );
    assert!(lines[1].ends_with("Toronto, Ontario, Canada"));
    assert!(lines[2].ends_with("Seattle, Washington, USA"));

    // Cache untouched: all lookups were hits
    let cache: std::collections::HashMap<String, String> =
        serde_json::from_str(&std::fs::read_to_string(dir.path().join("cache.json")).unwrap())
            .expect("cache should stay parseable");
    assert_eq!(cache.len(), 3);
}

#[tokio::test]
async fn test_empty_history_yields_empty_report_and_no_trips() {
    let dir = TempDir::new().expect("temp dir");
    write_fixtures(dir.path(), r#"{"locations": []}"#, "{}");

    let report = run_report(test_config(dir.path()))
        .await
        .expect("empty input is not an error");

    assert_eq!(report.total_picks, 0);
    assert!(report.trips.is_empty());

    let tsv = std::fs::read_to_string(dir.path().join("output.tsv")).expect("read report");
    assert_eq!(tsv.lines().count(), 1);
}

#[tokio::test]
async fn test_malformed_config_is_fatal() {
    let dir = TempDir::new().expect("temp dir");
    write_fixtures(dir.path(), HISTORY_JSON, SEEDED_CACHE);
    std::fs::write(dir.path().join("ranges.yaml"), "date_ranges: []").expect("write ranges");

    let err = run_report(test_config(dir.path())).await.unwrap_err();
    assert!(err.to_string().contains("Invalid configuration"));
}

#[tokio::test]
async fn test_missing_history_is_fatal() {
    let dir = TempDir::new().expect("temp dir");
    write_fixtures(dir.path(), HISTORY_JSON, SEEDED_CACHE);
    std::fs::remove_file(dir.path().join("history.json")).expect("remove history");

    let err = run_report(test_config(dir.path())).await.unwrap_err();
    assert!(err.to_string().contains("location history"));
}

#[tokio::test]
async fn test_records_without_coordinates_get_sentinel_rows() {
    let dir = TempDir::new().expect("temp dir");
    let history = r#"{
      "locations": [
        {"timestamp": "2024-01-01T12:00:00Z"},
        {"timestamp": "2024-01-02T12:00:00Z", "latitudeE7": 437000000, "longitudeE7": -794000000}
      ]
    }"#;
    write_fixtures(dir.path(), history, SEEDED_CACHE);

    let report = run_report(test_config(dir.path()))
        .await
        .expect("run should succeed");

    assert_eq!(report.total_picks, 2);
    // The coordinate-less day resolves without cache or network
    assert_eq!(report.cache_hits, 1);
    assert_eq!(report.network_lookups, 0);

    let tsv = std::fs::read_to_string(dir.path().join("output.tsv")).expect("read report");
    let lines: Vec<&str> = tsv.lines().collect();
    assert!(lines[1].contains("N/A\tN/A\tUnknown location"));
}
