//! timeline_to_city library: daily location sampling and geocoded reporting.
//!
//! Reduces a Google Timeline export to one representative point per calendar
//! day inside configured date windows, resolves each point to a place name
//! through a cached Nominatim lookup, writes a chronological TSV report, and
//! derives the trips spent outside the home country.
//!
//! # Example
//!
//! ```no_run
//! use clap::Parser;
//! use timeline_to_city::{run_report, Config};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::parse_from([
//!     "timeline_to_city",
//!     "Records.json",
//!     "--email",
//!     "you@example.com",
//! ]);
//! let report = run_report(config).await?;
//! println!("Geocoded {} days, found {} trips", report.total_picks, report.trips.len());
//! # Ok(())
//! # }
//! ```
//!
//! Lookups run strictly sequentially: Nominatim's usage policy caps request
//! rate, so no work is overlapped with a pending lookup.

pub mod cache;
pub mod config;
pub mod error_handling;
pub mod geocode;
pub mod initialization;
pub mod models;
pub mod report;
pub mod sampler;
pub mod timeline;
pub mod trips;

// Re-export public API
pub use config::{Config, DateRange, LogFormat, LogLevel, UnresolvedPolicy};
pub use error_handling::Cancelled;
pub use models::{GeocodedRecord, Resolution, Trip};
pub use report::print_trip_summary;
pub use run::{run_report, RunReport};

// Internal run module (contains the end-to-end pipeline)
mod run {
    use std::path::PathBuf;

    use anyhow::{Context, Result};
    use log::info;
    use tokio_util::sync::CancellationToken;

    use crate::cache::GeocodeCache;
    use crate::config::{load_date_ranges, Config};
    use crate::error_handling::{Cancelled, ErrorStats};
    use crate::geocode::Geocoder;
    use crate::initialization::init_client;
    use crate::models::{GeocodedRecord, Trip};
    use crate::{report, sampler, timeline, trips};

    /// Results of a completed report run.
    #[derive(Debug, Clone)]
    pub struct RunReport {
        /// Daily picks selected across all date ranges
        pub total_picks: usize,
        /// Lookups answered from the cache
        pub cache_hits: usize,
        /// Lookups that went to the network
        pub network_lookups: usize,
        /// Detected trips outside the home country, in date order
        pub trips: Vec<Trip>,
        /// Path of the TSV report
        pub output_path: PathBuf,
        /// Elapsed wall time in seconds
        pub elapsed_seconds: f64,
    }

    /// Runs the full pipeline: config → history → sampling → geocoding →
    /// TSV report → trip detection.
    ///
    /// # Errors
    ///
    /// Fatal errors are a malformed config, an unreadable or unrecognizable
    /// history file, a failed HTTP client build, an unwritable report, or a
    /// user interrupt ([`Cancelled`]). Per-record and per-lookup failures
    /// degrade to sentinels and never abort the run.
    pub async fn run_report(config: Config) -> Result<RunReport> {
        let start_time = std::time::Instant::now();

        let ranges = load_date_ranges(&config.config).context("Invalid configuration")?;
        info!("Loaded {} date range(s) from {}", ranges.len(), config.config.display());

        let stats = ErrorStats::new();
        let records = timeline::load_history(&config.json_file, &stats)
            .context("Failed to load location history")?;
        info!("Loaded {} location records", records.len());

        let mut cache = GeocodeCache::load(&config.cache_path);
        let client = init_client(&config).context("Failed to initialize HTTP client")?;
        let geocoder = Geocoder::new(client, config.email.clone());

        // Ranges are sampled independently and concatenated; overlapping
        // ranges can pick the same date twice and both picks are kept.
        let mut picks = Vec::new();
        for range in &ranges {
            picks.extend(sampler::daily_picks(&records, range));
        }
        let total_picks = picks.len();

        let cancel = CancellationToken::new();
        {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            });
        }

        let mut geocoded = Vec::with_capacity(total_picks);
        for (idx, pick) in picks.into_iter().enumerate() {
            // Cancellation is checked at lookup boundaries; dropping an
            // in-flight lookup writes nothing to the cache.
            let place = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Interrupted after {} of {} lookups", idx, total_picks);
                    return Err(Cancelled.into());
                }
                place = cache.lookup(
                    pick.latitude,
                    pick.longitude,
                    |lat, lon| geocoder.resolve(lat, lon, &stats),
                    &stats,
                ) => place,
            };

            info!("[{}/{}] {} -> {}", idx + 1, total_picks, pick.date, place);
            geocoded.push(GeocodedRecord {
                date: pick.date,
                timestamp: pick.local_timestamp,
                latitude: pick.latitude,
                longitude: pick.longitude,
                place,
            });
        }

        geocoded.sort_by_key(|r| r.timestamp);

        report::write_tsv(&config.output, &geocoded).with_context(|| {
            format!("Failed to write report to {}", config.output.display())
        })?;

        let detected = trips::detect_trips(&geocoded, &config.home_country, config.unresolved_policy);
        report::print_error_statistics(&stats);

        Ok(RunReport {
            total_picks,
            cache_hits: cache.hits(),
            network_lookups: cache.misses(),
            trips: detected,
            output_path: config.output.clone(),
            elapsed_seconds: start_time.elapsed().as_secs_f64(),
        })
    }
}
