use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{FixedOffset, NaiveDate, NaiveTime};
use clap::{Parser, ValueEnum};
use serde::Deserialize;

use crate::error_handling::ConfigError;

// constants (used as defaults)
pub const CONFIG_PATH: &str = "./config.yaml";
pub const CACHE_PATH: &str = "./geocode_cache.json";
pub const OUTPUT_PATH: &str = "./output.tsv";

/// Decimal places kept when rounding coordinates into cache keys.
/// Five places is roughly 1.1 m at the equator; distinct raw coordinates
/// that round to the same key share one cached answer.
pub const CACHE_KEY_PRECISION: usize = 5;

/// Nominatim reverse-geocoding endpoint.
pub const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/reverse";

/// Pause before every network lookup. Nominatim's usage policy allows at
/// most one request per second; we stay well under it.
pub const GEOCODE_REQUEST_DELAY: Duration = Duration::from_secs(3);

// Retry strategy
/// Initial delay in milliseconds before first retry
pub const RETRY_INITIAL_DELAY_MS: u64 = 1000;
/// Factor by which retry delay is multiplied on each attempt
pub const RETRY_FACTOR: u64 = 2;
/// Maximum delay between retries in seconds
pub const RETRY_MAX_DELAY_SECS: u64 = 20;
/// Total attempts for a timed-out lookup (first try plus retries)
pub const RETRY_MAX_ATTEMPTS: usize = 5;

/// Date format accepted in the YAML config (`start`, `end`).
pub const CONFIG_DATE_FORMAT: &str = "%Y-%m-%d";
/// Time format accepted in the YAML config (`closest_time`).
pub const CONFIG_TIME_FORMAT: &str = "%H:%M:%S";

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace). Used with the `--log-level` CLI option.
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Plain,
    Json,
}

/// How trip detection treats a day whose geocode lookup failed.
///
/// The source data gives no country for such days; `Home` (the conservative
/// default) means they never start or extend a trip, `Extend` means they keep
/// an already-open trip alive but still never start one. A mid-trip lookup
/// failure under `Home` splits the trip in two.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum UnresolvedPolicy {
    Home,
    Extend,
}

/// Command-line options and configuration.
///
/// This struct is automatically generated by `clap` from the field attributes.
/// All options except the input file and contact email have defaults.
///
/// # Examples
///
/// ```bash
/// # Basic usage
/// timeline_to_city Records.json --email you@example.com
///
/// # Custom config and output locations
/// timeline_to_city Records.json --email you@example.com \
///     --config ./ranges.yaml --output ./report.tsv
/// ```
#[derive(Debug, Parser)]
#[command(
    name = "timeline_to_city",
    about = "Reduces a Google Timeline export to one geocoded point per day and summarizes trips abroad."
)]
pub struct Config {
    /// Location-history JSON export to read
    #[arg(value_parser)]
    pub json_file: PathBuf,

    /// Contact email sent with every Nominatim request (provider policy)
    #[arg(long)]
    pub email: String,

    /// YAML file declaring the date ranges to sample
    #[arg(long, value_parser, default_value = CONFIG_PATH)]
    pub config: PathBuf,

    /// Geocode cache file (flat JSON map, rewritten on every new entry)
    #[arg(long, value_parser, default_value = CACHE_PATH)]
    pub cache_path: PathBuf,

    /// TSV report destination
    #[arg(long, value_parser, default_value = OUTPUT_PATH)]
    pub output: PathBuf,

    /// Country that does not count as travel
    #[arg(long, default_value = "United States")]
    pub home_country: String,

    /// Treatment of days whose geocoding failed: home|extend
    #[arg(long, value_enum, default_value_t = UnresolvedPolicy::Home)]
    pub unresolved_policy: UnresolvedPolicy,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout_seconds: u64,

    /// Log level: error|warn|info|debug|trace
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log format: plain|json
    #[arg(long, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,
}

/// One validated selection window from the YAML config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Preferred clock time; the record closest to it wins each day.
    pub target_time: NaiveTime,
    /// When set, record timestamps are shifted into this offset before
    /// bucketing; otherwise each record's own offset is used.
    pub utc_offset: Option<FixedOffset>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    date_ranges: Option<Vec<RawDateRange>>,
}

#[derive(Debug, Deserialize)]
struct RawDateRange {
    start: Option<String>,
    end: Option<String>,
    closest_time: Option<String>,
    utc_offset: Option<String>,
}

/// Loads and validates the date-range config.
///
/// Fails fast with a field-level message on any malformed or missing value;
/// nothing is processed on a bad config.
pub fn load_date_ranges(path: &Path) -> Result<Vec<DateRange>, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let raw: RawConfig = serde_yaml::from_str(&contents)?;

    let raw_ranges = raw
        .date_ranges
        .filter(|r| !r.is_empty())
        .ok_or(ConfigError::NoDateRanges)?;

    raw_ranges
        .into_iter()
        .enumerate()
        .map(|(idx, raw)| validate_range(idx, raw))
        .collect()
}

fn validate_range(idx: usize, raw: RawDateRange) -> Result<DateRange, ConfigError> {
    let field = |name: &str| ConfigError::MissingField {
        range: idx,
        field: name.to_string(),
    };

    let start_str = raw.start.ok_or_else(|| field("start"))?;
    let end_str = raw.end.ok_or_else(|| field("end"))?;
    let time_str = raw.closest_time.ok_or_else(|| field("closest_time"))?;

    let parse_date = |name: &str, value: &str| {
        NaiveDate::parse_from_str(value, CONFIG_DATE_FORMAT).map_err(|_| ConfigError::BadField {
            range: idx,
            field: name.to_string(),
            value: value.to_string(),
        })
    };

    let start = parse_date("start", &start_str)?;
    let end = parse_date("end", &end_str)?;
    let target_time =
        NaiveTime::parse_from_str(&time_str, CONFIG_TIME_FORMAT).map_err(|_| {
            ConfigError::BadField {
                range: idx,
                field: "closest_time".to_string(),
                value: time_str.clone(),
            }
        })?;

    if start > end {
        return Err(ConfigError::InvertedRange {
            range: idx,
            start,
            end,
        });
    }

    let utc_offset = raw
        .utc_offset
        .map(|s| {
            s.parse::<FixedOffset>().map_err(|_| ConfigError::BadField {
                range: idx,
                field: "utc_offset".to_string(),
                value: s,
            })
        })
        .transpose()?;

    Ok(DateRange {
        start,
        end,
        target_time,
        utc_offset,
    })
}
