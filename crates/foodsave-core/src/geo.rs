//! Great-circle distance between coordinates.
//!
//! [`distance_km`] assumes well-formed input. Values read from item data
//! attributes go through [`Coordinate::from_attrs`] first, which is where
//! missing, non-numeric and zero coordinates are rejected.

use serde::{Deserialize, Serialize};

/// Earth's mean radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A geographic coordinate with latitude and longitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees (-90 to 90)
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180)
    pub longitude: f64,
}

impl Coordinate {
    #[inline]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Returns true if both components are finite and inside their range.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Build a coordinate from raw `data-lat` / `data-lng` attribute values.
    ///
    /// Missing, unparseable, NaN, zero or out-of-range values yield `None`:
    /// a branch without an address is rendered with coordinates of `0`.
    pub fn from_attrs(lat: Option<&str>, lng: Option<&str>) -> Option<Self> {
        let lat = parse_component(lat?)?;
        let lng = parse_component(lng?)?;
        let coord = Self::new(lat, lng);
        coord.is_valid().then_some(coord)
    }

    /// Parse a `"lat,lng"` pair, as used by the `FOODSAVE_LOCATION` setting.
    pub fn parse_pair(s: &str) -> Option<Self> {
        let (lat, lng) = s.split_once(',')?;
        let lat: f64 = lat.trim().parse().ok()?;
        let lng: f64 = lng.trim().parse().ok()?;
        let coord = Self::new(lat, lng);
        coord.is_valid().then_some(coord)
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((lat, lng): (f64, f64)) -> Self {
        Self::new(lat, lng)
    }
}

fn parse_component(raw: &str) -> Option<f64> {
    // Django renders decimals with the active locale, so "55,75" shows up too
    let value: f64 = raw.trim().replace(',', ".").parse().ok()?;
    (value.is_finite() && value != 0.0).then_some(value)
}

/// Great-circle distance in kilometers, rounded to one decimal place.
pub fn distance_km(from: &Coordinate, to: &Coordinate) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let d_lat = (to.latitude - from.latitude).to_radians();
    let d_lon = (to.longitude - from.longitude).to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    round_tenths(EARTH_RADIUS_KM * c)
}

fn round_tenths(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
