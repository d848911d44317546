use std::fmt;

use tracing::debug;

use crate::catalog::ItemCard;
use crate::geo::{distance_km, Coordinate};

/// What an item's distance slot shows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DistanceLabel {
    /// Detection in progress
    Detecting,
    Km(f64),
    /// The item's branch has no usable coordinates
    AddressMissing,
    /// Detection failed
    Unavailable,
    /// No geolocation capability at all
    NotSupported,
}

impl DistanceLabel {
    pub fn for_coordinate(user: &Coordinate, item: Option<Coordinate>) -> Self {
        match item {
            Some(branch) => DistanceLabel::Km(distance_km(user, &branch)),
            None => DistanceLabel::AddressMissing,
        }
    }

    /// Placeholders render muted; a real distance does not.
    pub fn is_muted(&self) -> bool {
        !matches!(self, DistanceLabel::Km(_) | DistanceLabel::Detecting)
    }
}

impl fmt::Display for DistanceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistanceLabel::Detecting => write!(f, "Detecting..."),
            DistanceLabel::Km(km) => write!(f, "{:.1} km", km),
            DistanceLabel::AddressMissing => write!(f, "Address not set"),
            DistanceLabel::Unavailable => write!(f, "Unavailable"),
            DistanceLabel::NotSupported => write!(f, "Geolocation unavailable"),
        }
    }
}

/// Distance label for every item, in order.
///
/// Items with bad coordinates get [`DistanceLabel::AddressMissing`] without
/// affecting the others. Pure, so recomputing over the same inputs gives the
/// same labels.
pub fn distance_labels(user: &Coordinate, items: &[ItemCard]) -> Vec<DistanceLabel> {
    let labels: Vec<DistanceLabel> = items
        .iter()
        .map(|item| DistanceLabel::for_coordinate(user, item.coordinate()))
        .collect();

    let calculated = labels
        .iter()
        .filter(|l| matches!(l, DistanceLabel::Km(_)))
        .count();
    debug!(
        calculated,
        missing = labels.len() - calculated,
        "Distance calculation summary"
    );
    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(lat: Option<&str>, lng: Option<&str>) -> ItemCard {
        ItemCard {
            latitude: lat.map(String::from),
            longitude: lng.map(String::from),
            ..ItemCard::default()
        }
    }

    #[test]
    fn test_labels_per_item() {
        let user = Coordinate::new(0.0, 0.0);
        let items = vec![
            item(Some("0.5"), Some("1")),
            item(None, Some("1")),
            item(Some("abc"), Some("1")),
            item(Some("0"), Some("0")),
        ];

        let labels = distance_labels(&user, &items);
        assert!(matches!(labels[0], DistanceLabel::Km(_)));
        assert_eq!(labels[1], DistanceLabel::AddressMissing);
        assert_eq!(labels[2], DistanceLabel::AddressMissing);
        assert_eq!(labels[3], DistanceLabel::AddressMissing);
    }

    #[test]
    fn test_recomputation_is_idempotent() {
        let user = Coordinate::new(55.75, 37.61);
        let items = vec![item(Some("55.80"), Some("37.50")), item(None, None)];
        assert_eq!(distance_labels(&user, &items), distance_labels(&user, &items));
    }

    #[test]
    fn test_display() {
        assert_eq!(DistanceLabel::Km(111.2).to_string(), "111.2 km");
        assert_eq!(DistanceLabel::Km(3.0).to_string(), "3.0 km");
        assert_eq!(DistanceLabel::Detecting.to_string(), "Detecting...");
        assert!(DistanceLabel::Unavailable.is_muted());
        assert!(!DistanceLabel::Km(1.0).is_muted());
    }
}
