use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::NaiveDate;
use strum::IntoEnumIterator;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;
use tokio_retry::strategy::ExponentialBackoff;

/// Fatal config-file errors. Any of these aborts before processing starts.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read at all.
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Config file is not valid YAML.
    #[error("Config file is not valid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Config file must declare at least one date range.
    #[error("Config file must include a non-empty 'date_ranges' list")]
    NoDateRanges,

    /// A range entry is missing a required field.
    #[error("date_ranges[{range}] is missing required field '{field}'")]
    MissingField { range: usize, field: String },

    /// A range entry has a field that does not parse.
    #[error("date_ranges[{range}] has invalid {field}: '{value}'")]
    BadField {
        range: usize,
        field: String,
        value: String,
    },

    /// A range ends before it starts.
    #[error("date_ranges[{range}] starts {start} after it ends {end}")]
    InvertedRange {
        range: usize,
        start: NaiveDate,
        end: NaiveDate,
    },
}

/// Fatal input-document errors.
#[derive(Error, Debug)]
pub enum InputError {
    /// History file could not be read.
    #[error("Failed to read history file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// History file is not a recognized Timeline export.
    #[error("History file is not a recognized Timeline export: {0}")]
    Json(#[from] serde_json::Error),
}

/// Marker error for an operator interrupt (Ctrl-C). The run terminates
/// promptly and cleanly; no partial cache entry is written.
#[derive(Error, Debug)]
#[error("Interrupted by user")]
pub struct Cancelled;

/// Types of non-fatal errors absorbed during a run.
///
/// Each variant represents a failure mode that degrades a single record or
/// lookup without stopping the run; counts are reported at the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum ErrorType {
    TimestampParseError,
    GeocodeTimeoutError,
    GeocodeFailureError,
    CacheIoError,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::TimestampParseError => "Timestamp parse error",
            ErrorType::GeocodeTimeoutError => "Geocode timeout",
            ErrorType::GeocodeFailureError => "Geocode failure",
            ErrorType::CacheIoError => "Cache I/O error",
        }
    }
}

/// Per-run error statistics tracker.
///
/// Tracks the count of each absorbed error type using atomic counters.
/// All error types are initialized to zero on creation.
pub struct ErrorStats {
    errors: HashMap<ErrorType, AtomicUsize>,
}

impl ErrorStats {
    pub fn new() -> Self {
        let mut errors = HashMap::new();
        for error in ErrorType::iter() {
            errors.insert(error, AtomicUsize::new(0));
        }
        ErrorStats { errors }
    }

    pub fn increment(&self, error: ErrorType) {
        // All ErrorType variants are initialized in new(), so unwrap() is safe
        self.errors
            .get(&error)
            .unwrap()
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_count(&self, error: ErrorType) -> usize {
        // All ErrorType variants are initialized in new(), so unwrap() is safe
        self.errors.get(&error).unwrap().load(Ordering::SeqCst)
    }
}

impl Default for ErrorStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Creates the exponential backoff strategy used for timed-out lookups.
///
/// Configured with:
/// - Initial delay: `RETRY_INITIAL_DELAY_MS` milliseconds
/// - Backoff factor: `RETRY_FACTOR` (doubles delay each retry)
/// - Maximum delay: `RETRY_MAX_DELAY_SECS` seconds
/// - At most `RETRY_MAX_ATTEMPTS - 1` retries after the initial attempt
pub fn get_retry_strategy() -> impl Iterator<Item = Duration> {
    ExponentialBackoff::from_millis(crate::config::RETRY_INITIAL_DELAY_MS)
        .factor(crate::config::RETRY_FACTOR)
        .max_delay(Duration::from_secs(crate::config::RETRY_MAX_DELAY_SECS))
        .take(crate::config::RETRY_MAX_ATTEMPTS - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_stats_initialization() {
        let stats = ErrorStats::new();
        // All error types should be initialized to 0
        for error_type in ErrorType::iter() {
            assert_eq!(stats.get_count(error_type), 0);
        }
    }

    #[test]
    fn test_error_stats_increment() {
        let stats = ErrorStats::new();
        stats.increment(ErrorType::GeocodeTimeoutError);
        assert_eq!(stats.get_count(ErrorType::GeocodeTimeoutError), 1);
        assert_eq!(stats.get_count(ErrorType::GeocodeFailureError), 0);
    }

    #[test]
    fn test_retry_strategy_is_bounded() {
        let delays: Vec<_> = get_retry_strategy().collect();
        assert_eq!(delays.len(), crate::config::RETRY_MAX_ATTEMPTS - 1);
        // Delays grow until capped
        for pair in delays.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
        let cap = Duration::from_secs(crate::config::RETRY_MAX_DELAY_SECS);
        assert!(delays.iter().all(|d| *d <= cap));
    }
}
