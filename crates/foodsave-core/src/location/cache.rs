use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::StorageError;
use crate::geo::Coordinate;
use crate::storage::{save_json, SharedStorage, Storage};

/// Storage key for the last detected location.
pub const LOCATION_KEY: &str = "userLocation";

/// A cached location is used without re-detecting for one hour.
pub const LOCATION_FRESH_MS: i64 = 3_600_000;

/// Current time as epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CachedLocation {
    pub coordinate: Coordinate,
    /// Epoch milliseconds of the detection
    pub timestamp: i64,
}

impl CachedLocation {
    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms - self.timestamp
    }

    pub fn is_fresh(&self, now_ms: i64) -> bool {
        self.age_ms(now_ms) < LOCATION_FRESH_MS
    }
}

/// On-disk shape, shared with the browser page: `{"lat", "lng", "timestamp"}`.
#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export, rename = "CachedLocation"))]
struct StoredLocation {
    lat: f64,
    lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timestamp: Option<i64>,
}

impl From<&CachedLocation> for StoredLocation {
    fn from(cached: &CachedLocation) -> Self {
        Self {
            lat: cached.coordinate.latitude,
            lng: cached.coordinate.longitude,
            timestamp: Some(cached.timestamp),
        }
    }
}

/// Where the cache stands at a given instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CacheState {
    /// Nothing stored, or the stored entry could not be read
    Unknown,
    Fresh(CachedLocation),
    Stale(CachedLocation),
}

impl CacheState {
    pub fn needs_detection(&self) -> bool {
        !matches!(self, CacheState::Fresh(_))
    }
}

#[derive(Clone)]
pub struct LocationCache {
    storage: SharedStorage,
}

impl LocationCache {
    pub fn new(storage: SharedStorage) -> Self {
        Self { storage }
    }

    /// Classify the stored entry at `now_ms`.
    ///
    /// Read and parse failures are logged and reported as [`CacheState::Unknown`]
    /// so that detection is attempted again. An entry without a timestamp is
    /// stale.
    pub fn state(&self, now_ms: i64) -> CacheState {
        let raw = match self.storage.get_item(LOCATION_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("No cached location found");
                return CacheState::Unknown;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read cached location");
                return CacheState::Unknown;
            }
        };

        let stored: StoredLocation = match serde_json::from_str(&raw) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "Invalid stored location data");
                return CacheState::Unknown;
            }
        };

        let coordinate = Coordinate::new(stored.lat, stored.lng);
        if !coordinate.is_valid() {
            warn!(lat = stored.lat, lng = stored.lng, "Stored location out of range");
            return CacheState::Unknown;
        }

        let Some(timestamp) = stored.timestamp else {
            debug!("Cached location has no timestamp");
            return CacheState::Stale(CachedLocation {
                coordinate,
                timestamp: 0,
            });
        };

        let cached = CachedLocation {
            coordinate,
            timestamp,
        };
        if cached.is_fresh(now_ms) {
            debug!(age_ms = cached.age_ms(now_ms), "Using cached location");
            CacheState::Fresh(cached)
        } else {
            debug!(age_ms = cached.age_ms(now_ms), "Cached location expired");
            CacheState::Stale(cached)
        }
    }

    /// Overwrite the cache with a newly detected coordinate.
    pub fn store(&self, coordinate: Coordinate, now_ms: i64) -> Result<CachedLocation, StorageError> {
        let cached = CachedLocation {
            coordinate,
            timestamp: now_ms,
        };
        save_json(self.storage.as_ref(), LOCATION_KEY, &StoredLocation::from(&cached))?;
        debug!("Location cached for future use");
        Ok(cached)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    const NOW: i64 = 1_760_000_000_000;

    fn cache() -> (LocationCache, SharedStorage) {
        let storage = MemoryStorage::shared();
        (LocationCache::new(storage.clone()), storage)
    }

    #[test]
    fn test_empty_cache_is_unknown() {
        let (cache, _) = cache();
        assert_eq!(cache.state(NOW), CacheState::Unknown);
        assert!(cache.state(NOW).needs_detection());
    }

    #[test]
    fn test_freshness_boundary() {
        let (cache, _) = cache();
        let coord = Coordinate::new(55.75, 37.61);

        cache.store(coord, NOW - LOCATION_FRESH_MS + 1).unwrap();
        assert!(matches!(cache.state(NOW), CacheState::Fresh(_)));

        cache.store(coord, NOW - LOCATION_FRESH_MS).unwrap();
        assert!(matches!(cache.state(NOW), CacheState::Stale(_)));

        cache.store(coord, NOW - LOCATION_FRESH_MS - 1).unwrap();
        assert!(cache.state(NOW).needs_detection());
    }

    #[test]
    fn test_store_uses_page_format() {
        let (cache, storage) = cache();
        cache.store(Coordinate::new(55.5, 37.25), NOW).unwrap();
        assert_eq!(
            storage.get_item(LOCATION_KEY).unwrap().as_deref(),
            Some(r#"{"lat":55.5,"lng":37.25,"timestamp":1760000000000}"#)
        );
    }

    #[test]
    fn test_unparseable_entry_is_unknown() {
        let (cache, storage) = cache();
        storage.set_item(LOCATION_KEY, "{\"lat\":").unwrap();
        assert_eq!(cache.state(NOW), CacheState::Unknown);
    }

    #[test]
    fn test_missing_timestamp_is_stale() {
        let (cache, storage) = cache();
        storage
            .set_item(LOCATION_KEY, r#"{"lat":55.5,"lng":37.25}"#)
            .unwrap();
        assert!(matches!(cache.state(NOW), CacheState::Stale(_)));
    }
}
