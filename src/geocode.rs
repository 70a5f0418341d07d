//! Reverse geocoding against Nominatim.
//!
//! Every lookup waits out a fixed delay first (provider rate policy), then
//! retries timeout-class failures with bounded exponential backoff. All
//! failure paths degrade to a sentinel [`Resolution`]; a lookup never aborts
//! the run.

use std::future::Future;

use log::warn;
use serde::Deserialize;
use thiserror::Error;
use tokio_retry::RetryIf;

use crate::config::{GEOCODE_REQUEST_DELAY, NOMINATIM_URL};
use crate::error_handling::{get_retry_strategy, ErrorStats, ErrorType};
use crate::models::Resolution;

/// Internal lookup failure classification. Only timeouts are retried.
#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error("request timed out")]
    Timeout,

    #[error("lookup failed: {0}")]
    Other(String),
}

#[derive(Debug, Deserialize)]
pub struct NominatimResponse {
    address: Option<NominatimAddress>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    township: Option<String>,
    village: Option<String>,
    suburb: Option<String>,
    state: Option<String>,
    province: Option<String>,
    country: Option<String>,
}

pub struct Geocoder {
    client: reqwest::Client,
    email: String,
}

impl Geocoder {
    pub fn new(client: reqwest::Client, email: String) -> Self {
        Geocoder { client, email }
    }

    /// Resolves coordinates to a place name. Never fails: timeouts exhaust
    /// their retries and become [`Resolution::Timeout`], anything else
    /// becomes [`Resolution::Failed`] immediately.
    pub async fn resolve(&self, latitude: f64, longitude: f64, stats: &ErrorStats) -> Resolution {
        tokio::time::sleep(GEOCODE_REQUEST_DELAY).await;
        let resolution =
            resolve_with(|| self.request(latitude, longitude), stats).await;
        if !resolution.is_resolved() {
            warn!(
                "Lookup for ({}, {}) resolved to '{}'",
                latitude, longitude, resolution
            );
        }
        resolution
    }

    async fn request(&self, latitude: f64, longitude: f64) -> Result<NominatimResponse, GeocodeError> {
        let response = self
            .client
            .get(NOMINATIM_URL)
            .query(&[
                ("format", "jsonv2"),
                ("lat", latitude.to_string().as_str()),
                ("lon", longitude.to_string().as_str()),
                ("email", self.email.as_str()),
            ])
            .send()
            .await
            .map_err(classify_error)?
            .error_for_status()
            .map_err(classify_error)?;

        response.json().await.map_err(classify_error)
    }
}

fn classify_error(error: reqwest::Error) -> GeocodeError {
    if error.is_timeout() {
        GeocodeError::Timeout
    } else {
        GeocodeError::Other(error.to_string())
    }
}

/// Runs one lookup operation under the retry policy: timeouts retry with
/// exponential backoff until the attempt ceiling, other errors fail at once.
/// Separated from the HTTP layer so the retry contract is testable.
async fn resolve_with<F, Fut>(operation: F, stats: &ErrorStats) -> Resolution
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<NominatimResponse, GeocodeError>>,
{
    let outcome = RetryIf::spawn(get_retry_strategy(), operation, |e: &GeocodeError| {
        matches!(e, GeocodeError::Timeout)
    })
    .await;

    match outcome {
        Ok(response) => build_place_name(response.address),
        Err(GeocodeError::Timeout) => {
            stats.increment(ErrorType::GeocodeTimeoutError);
            Resolution::Timeout
        }
        Err(GeocodeError::Other(_)) => {
            stats.increment(ErrorType::GeocodeFailureError);
            Resolution::Failed
        }
    }
}

/// Assembles a display name from an address: the most specific locality
/// (city, then town, township, village, suburb), then state or province,
/// then country, joined with ", ". An address with nothing usable yields
/// [`Resolution::UnknownName`].
fn build_place_name(address: Option<NominatimAddress>) -> Resolution {
    let Some(address) = address else {
        return Resolution::UnknownName;
    };

    let locality = address
        .city
        .or(address.town)
        .or(address.township)
        .or(address.village)
        .or(address.suburb);
    let region = address.state.or(address.province);

    let parts: Vec<String> = [locality, region, address.country]
        .into_iter()
        .flatten()
        .collect();

    if parts.is_empty() {
        Resolution::UnknownName
    } else {
        Resolution::Place(parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use crate::config::RETRY_MAX_ATTEMPTS;

    fn address(
        city: Option<&str>,
        town: Option<&str>,
        suburb: Option<&str>,
        state: Option<&str>,
        country: Option<&str>,
    ) -> NominatimAddress {
        NominatimAddress {
            city: city.map(String::from),
            town: town.map(String::from),
            suburb: suburb.map(String::from),
            state: state.map(String::from),
            country: country.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_place_name_prefers_city() {
        let res = build_place_name(Some(address(
            Some("Seattle"),
            Some("Ballard"),
            None,
            Some("Washington"),
            Some("United States"),
        )));
        assert_eq!(
            res,
            Resolution::Place("Seattle, Washington, United States".to_string())
        );
    }

    #[test]
    fn test_place_name_falls_back_to_town_then_suburb() {
        let res = build_place_name(Some(address(None, Some("Gouda"), None, None, Some("Netherlands"))));
        assert_eq!(res, Resolution::Place("Gouda, Netherlands".to_string()));

        let res = build_place_name(Some(address(None, None, Some("Kreuzberg"), None, Some("Germany"))));
        assert_eq!(res, Resolution::Place("Kreuzberg, Germany".to_string()));
    }

    #[test]
    fn test_empty_address_is_unknown_name() {
        assert_eq!(build_place_name(None), Resolution::UnknownName);
        assert_eq!(
            build_place_name(Some(NominatimAddress::default())),
            Resolution::UnknownName
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_timeout_hits_attempt_ceiling() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let stats = ErrorStats::new();
        let counter = Arc::clone(&attempts);

        let resolution = resolve_with(
            move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(GeocodeError::Timeout)
                }
            },
            &stats,
        )
        .await;

        assert_eq!(resolution, Resolution::Timeout);
        assert_eq!(attempts.load(Ordering::SeqCst), RETRY_MAX_ATTEMPTS);
        assert_eq!(stats.get_count(ErrorType::GeocodeTimeoutError), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_failures_do_not_retry() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let stats = ErrorStats::new();
        let counter = Arc::clone(&attempts);

        let resolution = resolve_with(
            move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(GeocodeError::Other("503 Service Unavailable".to_string()))
                }
            },
            &stats,
        )
        .await;

        assert_eq!(resolution, Resolution::Failed);
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(stats.get_count(ErrorType::GeocodeFailureError), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_then_success_recovers() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let stats = ErrorStats::new();
        let counter = Arc::clone(&attempts);

        let resolution = resolve_with(
            move || {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(GeocodeError::Timeout)
                    } else {
                        Ok(NominatimResponse {
                            address: Some(NominatimAddress {
                                city: Some("Lisbon".to_string()),
                                country: Some("Portugal".to_string()),
                                ..Default::default()
                            }),
                        })
                    }
                }
            },
            &stats,
        )
        .await;

        assert_eq!(resolution, Resolution::Place("Lisbon, Portugal".to_string()));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(stats.get_count(ErrorType::GeocodeTimeoutError), 0);
    }
}
