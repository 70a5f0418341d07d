//! Day sampling: one representative record per calendar day.

use std::collections::BTreeMap;

use chrono::TimeDelta;
use log::info;

use crate::config::DateRange;
use crate::models::{DailyPick, LocationRecord};

/// Selects at most one record per calendar date inside `range`.
///
/// A record qualifies when its date (after shifting into the range's offset,
/// if one is configured) falls within `[start, end]` inclusive. Within each
/// day the record whose timestamp is closest to the target time wins; exact
/// ties keep the earliest-encountered record. Records without coordinates
/// participate like any other — their place resolves to a sentinel later.
///
/// Output is ascending by date; dates with no qualifying records are simply
/// absent.
pub fn daily_picks(records: &[LocationRecord], range: &DateRange) -> Vec<DailyPick> {
    // BTreeMap keeps the output date-ordered for free.
    let mut best: BTreeMap<chrono::NaiveDate, (TimeDelta, DailyPick)> = BTreeMap::new();

    for record in records {
        let local = match range.utc_offset {
            Some(offset) => record.timestamp.with_timezone(&offset),
            None => record.timestamp,
        };
        let date = local.date_naive();
        if date < range.start || date > range.end {
            continue;
        }

        let target = date.and_time(range.target_time);
        let distance = (local.naive_local() - target).abs();

        let candidate = DailyPick {
            date,
            local_timestamp: local,
            latitude: record.latitude,
            longitude: record.longitude,
        };

        match best.get(&date) {
            // strict comparison keeps the first record on exact ties
            Some((best_distance, _)) if distance >= *best_distance => {}
            _ => {
                best.insert(date, (distance, candidate));
            }
        }
    }

    let picks: Vec<DailyPick> = best.into_values().map(|(_, pick)| pick).collect();
    info!(
        "Selected {} daily picks in {}..{}",
        picks.len(),
        range.start,
        range.end
    );
    picks
}
