//! Report output: the TSV file and the console trip summary.

use std::io::Write;
use std::path::Path;

use colored::Colorize;
use log::info;
use strum::IntoEnumIterator;

use crate::error_handling::{ErrorStats, ErrorType};
use crate::models::{GeocodedRecord, Trip};

/// Decimal places written for coordinates (the export's E7 precision).
const COORDINATE_DECIMALS: usize = 7;
/// Placeholder for an absent coordinate.
const NOT_AVAILABLE: &str = "N/A";

fn format_coordinate(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.prec$}", v, prec = COORDINATE_DECIMALS),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Writes the chronological TSV report: one header line, then one line per
/// daily pick. `records` must already be sorted.
pub fn write_tsv(path: &Path, records: &[GeocodedRecord]) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    writeln!(file, "Timestamp (Local)\tLatitude\tLongitude\tClosest City")?;
    for record in records {
        writeln!(
            file,
            "{}\t{}\t{}\t{}",
            record.timestamp.to_rfc3339(),
            format_coordinate(record.latitude),
            format_coordinate(record.longitude),
            record.place
        )?;
    }
    info!("Wrote {} report lines to {}", records.len(), path.display());
    Ok(())
}

/// Prints the human-readable trip enumeration.
pub fn print_trip_summary(trips: &[Trip]) {
    if trips.is_empty() {
        println!("{}", "No trips found.".yellow());
        return;
    }

    for (idx, trip) in trips.iter().enumerate() {
        let ongoing = if trip.ongoing {
            " (ongoing at end of data)"
        } else {
            ""
        };
        println!(
            "{} {} to {} ({} day{}){}",
            format!("Trip {}:", idx + 1).bold().green(),
            trip.start,
            trip.end,
            trip.days.len(),
            if trip.days.len() == 1 { "" } else { "s" },
            ongoing
        );
        for (date, place) in &trip.days {
            println!("    {}  {}", date, place);
        }
    }
}

/// Logs the absorbed-error counters accumulated during the run.
pub fn print_error_statistics(stats: &ErrorStats) {
    for error_type in ErrorType::iter() {
        let count = stats.get_count(error_type);
        if count > 0 {
            log::warn!("{}: {}", error_type.as_str(), count);
        }
    }
}
