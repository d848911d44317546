//! Sources of the user's current position.
//!
//! A provider plays the part of the browser's geolocation capability. A
//! session with no provider at all is one where geolocation is not
//! supported.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::future::{self, BoxFuture, FutureExt};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::geo::Coordinate;

/// Default IP geolocation endpoint.
pub const DEFAULT_IP_LOOKUP_URL: &str = "http://ip-api.com/json/?fields=status,message,lat,lon";

/// Options for a position request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    pub enable_high_accuracy: bool,
    /// Give up after this long and report [`GeolocationError::Timeout`]
    pub timeout: Duration,
    /// A position the provider obtained this recently may be reused
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            enable_high_accuracy: true,
            timeout: Duration::from_secs(15),
            maximum_age: Duration::from_secs(5 * 60),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeolocationError {
    #[error("Permission to use geolocation was denied")]
    PermissionDenied,

    #[error("Position unavailable: {0}")]
    PositionUnavailable(String),

    #[error("Geolocation request timed out")]
    Timeout,

    #[error("Unknown geolocation error: {0}")]
    Unknown(String),
}

impl GeolocationError {
    /// Numeric code as reported by the browser API (0 for unknown).
    pub fn code(&self) -> u8 {
        match self {
            GeolocationError::PermissionDenied => 1,
            GeolocationError::PositionUnavailable(_) => 2,
            GeolocationError::Timeout => 3,
            GeolocationError::Unknown(_) => 0,
        }
    }

    /// Message shown to the user in the warning notification.
    pub fn user_message(&self) -> &'static str {
        match self {
            GeolocationError::PermissionDenied => "Access to geolocation denied",
            GeolocationError::PositionUnavailable(_) => "Location unavailable",
            GeolocationError::Timeout => "Location request timed out",
            GeolocationError::Unknown(_) => "Could not determine your location",
        }
    }
}

pub trait GeolocationProvider: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    fn current_position(
        &self,
        options: &PositionOptions,
    ) -> BoxFuture<'static, Result<Coordinate, GeolocationError>>;
}

// ============================================================================
// Fixed position
// ============================================================================

/// Always reports the same coordinate, e.g. one set in the config file.
#[derive(Debug, Clone, Copy)]
pub struct FixedProvider {
    coordinate: Coordinate,
}

impl FixedProvider {
    pub fn new(coordinate: Coordinate) -> Self {
        Self { coordinate }
    }
}

impl GeolocationProvider for FixedProvider {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn current_position(
        &self,
        _options: &PositionOptions,
    ) -> BoxFuture<'static, Result<Coordinate, GeolocationError>> {
        future::ready(Ok(self.coordinate)).boxed()
    }
}

// ============================================================================
// Permission denied
// ============================================================================

/// Behaves like a browser where the user blocked location access.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeniedProvider;

impl GeolocationProvider for DeniedProvider {
    fn name(&self) -> &'static str {
        "denied"
    }

    fn current_position(
        &self,
        _options: &PositionOptions,
    ) -> BoxFuture<'static, Result<Coordinate, GeolocationError>> {
        future::ready(Err(GeolocationError::PermissionDenied)).boxed()
    }
}

// ============================================================================
// IP geolocation
// ============================================================================

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
}

/// Approximate position from an ip-api.com compatible endpoint.
///
/// Keeps the last answer and reuses it while it is younger than the
/// request's `maximum_age`, the way a browser reuses a recent fix.
pub struct IpApiProvider {
    client: Client,
    endpoint: String,
    last_fix: Arc<Mutex<Option<(Instant, Coordinate)>>>,
}

impl IpApiProvider {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            last_fix: Default::default(),
        }
    }

    fn recent_fix(&self, maximum_age: Duration) -> Option<Coordinate> {
        let last = *self.last_fix.lock().unwrap_or_else(|p| p.into_inner());
        last.filter(|(at, _)| at.elapsed() < maximum_age)
            .map(|(_, coord)| coord)
    }

    fn classify(error: reqwest::Error) -> GeolocationError {
        if error.is_timeout() {
            GeolocationError::Timeout
        } else if error.is_connect() || error.is_request() {
            GeolocationError::PositionUnavailable(error.to_string())
        } else {
            GeolocationError::Unknown(error.to_string())
        }
    }
}

impl GeolocationProvider for IpApiProvider {
    fn name(&self) -> &'static str {
        "ip-api"
    }

    fn current_position(
        &self,
        options: &PositionOptions,
    ) -> BoxFuture<'static, Result<Coordinate, GeolocationError>> {
        if let Some(coord) = self.recent_fix(options.maximum_age) {
            debug!("Reusing recent IP geolocation fix");
            return future::ready(Ok(coord)).boxed();
        }
        if options.enable_high_accuracy {
            debug!("High accuracy requested; IP geolocation is city-level at best");
        }

        let request = self.client.get(&self.endpoint).timeout(options.timeout);
        let last_fix = self.last_fix.clone();

        async move {
            let response = request.send().await.map_err(Self::classify)?;
            if !response.status().is_success() {
                return Err(GeolocationError::PositionUnavailable(format!(
                    "lookup service returned {}",
                    response.status()
                )));
            }

            let body: IpApiResponse = response
                .json()
                .await
                .map_err(|e| GeolocationError::Unknown(e.to_string()))?;

            if body.status != "success" {
                let reason = body.message.unwrap_or_else(|| body.status.clone());
                warn!(%reason, "IP geolocation lookup failed");
                return Err(GeolocationError::PositionUnavailable(reason));
            }

            let coord = match (body.lat, body.lon) {
                (Some(lat), Some(lon)) => Coordinate::new(lat, lon),
                _ => {
                    return Err(GeolocationError::PositionUnavailable(
                        "response had no coordinates".to_string(),
                    ))
                }
            };
            if !coord.is_valid() {
                return Err(GeolocationError::Unknown(format!(
                    "coordinate out of range: {}, {}",
                    coord.latitude, coord.longitude
                )));
            }

            info!(lat = coord.latitude, lon = coord.longitude, "IP geolocation resolved");
            *last_fix.lock().unwrap_or_else(|p| p.into_inner()) = Some((Instant::now(), coord));
            Ok(coord)
        }
        .boxed()
    }
}
