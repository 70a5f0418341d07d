//! Trip detection over the geocoded daily sequence.
//!
//! A two-state machine (Home, Away) walks the records in date order. A day
//! counts as away when its place name resolves to a country other than the
//! home country; unresolved days are governed by [`UnresolvedPolicy`].

use chrono::NaiveDate;
use log::debug;

use crate::config::UnresolvedPolicy;
use crate::models::{GeocodedRecord, Resolution, Trip};

/// Common alternate spellings, normalized before comparing against the
/// configured home country.
const COUNTRY_ALIASES: &[(&str, &[&str])] = &[
    (
        "United States",
        &["USA", "US", "United States of America", "America"],
    ),
    ("United Kingdom", &["UK", "Great Britain"]),
    ("Netherlands", &["The Netherlands", "Holland"]),
];

/// Last comma-separated component of a resolved place name.
fn extract_country(record: &GeocodedRecord) -> Option<String> {
    match &record.place {
        Resolution::Place(name) => name
            .rsplit(',')
            .next()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty()),
        _ => None,
    }
}

fn canonical(country: &str) -> &str {
    for (canonical_name, aliases) in COUNTRY_ALIASES {
        if country.eq_ignore_ascii_case(canonical_name)
            || aliases.iter().any(|a| country.eq_ignore_ascii_case(a))
        {
            return canonical_name;
        }
    }
    country
}

fn is_home(country: &str, home_country: &str) -> bool {
    canonical(country).eq_ignore_ascii_case(canonical(home_country))
}

enum State {
    Home,
    Away(Trip),
}

/// Groups consecutive away days into trips.
///
/// `records` must already be sorted chronologically. A trip opens on the
/// first day whose country differs from home, extends through every
/// subsequent non-home day, and closes on the first home day (end date is
/// the last away day). A trip still open when the data ends is closed at the
/// last record and marked ongoing.
pub fn detect_trips(
    records: &[GeocodedRecord],
    home_country: &str,
    policy: UnresolvedPolicy,
) -> Vec<Trip> {
    let mut trips = Vec::new();
    let mut state = State::Home;

    for record in records {
        let away_day = match extract_country(record) {
            Some(country) => !is_home(&country, home_country),
            // Unresolved days never start a trip; under the Extend policy
            // they keep an open trip alive instead of closing it.
            None => policy == UnresolvedPolicy::Extend && matches!(state, State::Away(_)),
        };

        state = match (state, away_day) {
            (State::Home, false) => State::Home,
            (State::Home, true) => {
                debug!("Trip opens on {}", record.date);
                State::Away(Trip {
                    start: record.date,
                    end: record.date,
                    days: vec![(record.date, record.place.to_string())],
                    ongoing: false,
                })
            }
            (State::Away(mut trip), true) => {
                trip.end = record.date;
                trip.days.push((record.date, record.place.to_string()));
                State::Away(trip)
            }
            (State::Away(trip), false) => {
                debug!("Trip closes before {}", record.date);
                trips.push(trip);
                State::Home
            }
        };
    }

    if let State::Away(mut trip) = state {
        trip.ongoing = true;
        trips.push(trip);
    }

    trips
}
