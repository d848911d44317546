//! Location-aware distance display.
//!
//! The pipeline that runs on every page load:
//!
//! 1. [`LocationCache`] checks the stored `userLocation` entry. A fresh entry
//!    (younger than an hour) is used as-is.
//! 2. Otherwise a [`GeolocationProvider`] is asked for the current position,
//!    bounded by [`PositionOptions`] (15 s timeout, 5 min maximum age).
//! 3. Success overwrites the cache; failure is classified into a
//!    [`GeolocationError`] and leaves the cache alone.
//! 4. Every visible item gets a [`DistanceLabel`].
//!
//! [`LocationService`] owns steps 1-3; there is no global location state.

pub mod cache;
pub mod distances;
pub mod provider;
pub mod service;

pub use cache::{now_millis, CacheState, CachedLocation, LocationCache, LOCATION_FRESH_MS, LOCATION_KEY};
pub use distances::{distance_labels, DistanceLabel};
pub use provider::{
    DeniedProvider, FixedProvider, GeolocationError, GeolocationProvider, IpApiProvider,
    PositionOptions,
};
pub use service::{LocationOutcome, LocationService, LocationStep};
