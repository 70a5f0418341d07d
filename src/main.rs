//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `timeline_to_city` library that handles:
//! - Command-line argument parsing
//! - Logger initialization
//! - User-facing output formatting
//!
//! All core functionality is implemented in the library crate.

use anyhow::{Context, Result};
use clap::Parser;
use std::process;

use timeline_to_city::initialization::init_logger_with;
use timeline_to_city::{print_trip_summary, run_report, Cancelled, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments into Config
    let config = Config::parse();

    // Initialize logger based on config
    let log_level = config.log_level.clone();
    let log_format = config.log_format.clone();
    init_logger_with(log_level.into(), log_format).context("Failed to initialize logger")?;

    match run_report(config).await {
        Ok(report) => {
            println!(
                "Geocoded {} day{} ({} from cache, {} network lookup{}) in {:.1}s",
                report.total_picks,
                if report.total_picks == 1 { "" } else { "s" },
                report.cache_hits,
                report.network_lookups,
                if report.network_lookups == 1 { "" } else { "s" },
                report.elapsed_seconds
            );
            println!("Report saved in {}", report.output_path.display());
            println!();
            print_trip_summary(&report.trips);
            Ok(())
        }
        Err(e) if e.is::<Cancelled>() => {
            eprintln!("timeline_to_city: {}", e);
            process::exit(130);
        }
        Err(e) => {
            eprintln!("timeline_to_city error: {:#}", e);
            process::exit(1);
        }
    }
}
