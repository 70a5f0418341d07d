//! Flat-file geocode cache keyed by rounded coordinates.
//!
//! The mapping is held in memory and rewritten to disk in full after every
//! new entry (write-through), so an abrupt termination loses at most the
//! lookup that was in flight. Keys round both coordinates to
//! [`CACHE_KEY_PRECISION`] decimal places; distinct raw coordinates that
//! collide into one key intentionally share a cached answer.

use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::config::CACHE_KEY_PRECISION;
use crate::error_handling::{ErrorStats, ErrorType};
use crate::models::Resolution;

pub struct GeocodeCache {
    path: PathBuf,
    entries: HashMap<String, String>,
    hits: usize,
    misses: usize,
}

impl GeocodeCache {
    /// Loads the cache file, falling back to an empty cache with a warning
    /// when the file is missing or corrupt. Never fatal.
    pub fn load(path: &Path) -> Self {
        let entries = match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<HashMap<String, String>>(&contents) {
                Ok(entries) => {
                    info!("Loaded {} cached geocode entries from {}", entries.len(), path.display());
                    entries
                }
                Err(e) => {
                    warn!(
                        "Cache file {} is corrupt ({}); starting with an empty cache",
                        path.display(),
                        e
                    );
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No cache file at {}; starting empty", path.display());
                HashMap::new()
            }
            Err(e) => {
                warn!(
                    "Could not read cache file {} ({}); starting with an empty cache",
                    path.display(),
                    e
                );
                HashMap::new()
            }
        };

        GeocodeCache {
            path: path.to_path_buf(),
            entries,
            hits: 0,
            misses: 0,
        }
    }

    /// Rounded-coordinate key, e.g. `"47.60621,-122.33207"`.
    pub fn key(latitude: f64, longitude: f64) -> String {
        format!(
            "{:.prec$},{:.prec$}",
            latitude,
            longitude,
            prec = CACHE_KEY_PRECISION
        )
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Network lookups performed through [`Self::lookup`] this run.
    pub fn misses(&self) -> usize {
        self.misses
    }

    /// Lookups answered from memory this run.
    pub fn hits(&self) -> usize {
        self.hits
    }

    /// Resolves coordinates through the cache.
    ///
    /// Absent coordinates short-circuit to [`Resolution::UnknownLocation`]
    /// without touching the cache or the resolver. A hit returns the cached
    /// entry with no resolver call. A miss invokes `resolver`, stores the
    /// outcome (sentinels included) under the rounded key, and flushes the
    /// whole mapping to disk before returning; a flush failure is a counted
    /// warning, never fatal.
    pub async fn lookup<F, Fut>(
        &mut self,
        latitude: Option<f64>,
        longitude: Option<f64>,
        resolver: F,
        stats: &ErrorStats,
    ) -> Resolution
    where
        F: FnOnce(f64, f64) -> Fut,
        Fut: Future<Output = Resolution>,
    {
        let (Some(latitude), Some(longitude)) = (latitude, longitude) else {
            return Resolution::UnknownLocation;
        };

        let key = Self::key(latitude, longitude);
        if let Some(cached) = self.entries.get(&key) {
            debug!("Cache hit for {}", key);
            self.hits += 1;
            return Resolution::from_cached(cached);
        }

        debug!("Cache miss for {}; querying provider", key);
        self.misses += 1;
        let resolution = resolver(latitude, longitude).await;
        self.entries
            .insert(key, resolution.as_cached().to_string());
        if let Err(e) = self.flush() {
            stats.increment(ErrorType::CacheIoError);
            warn!("Failed to persist geocode cache to {}: {}", self.path.display(), e);
        }
        resolution
    }

    /// Rewrites the cache file atomically (temp file + rename), so a crash
    /// mid-write never leaves a corrupt mapping behind.
    pub fn flush(&self) -> std::io::Result<()> {
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let serialized = serde_json::to_string_pretty(&self.entries)?;

        let tmp = tempfile::NamedTempFile::new_in(parent)?;
        std::fs::write(tmp.path(), serialized)?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}
