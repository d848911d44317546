//! Core library for the FoodSave catalog client.
//!
//! This crate holds everything the catalog page does that is not drawing:
//!
//! - `geo`: coordinates and haversine distance
//! - `location`: the cached, time-boxed geolocation pipeline and per-item
//!   distance labels
//! - `store`: the cart and favorites lists persisted in local storage
//! - `catalog`: filter/sort/view state, its URL codec, page fetching and
//!   "load more" pagination
//! - `notify`: transient user-facing notifications
//! - `storage`: the local-storage abstraction everything persists through
//! - `debounce`: collapsing bursts of filter and search input
//! - `config`: config file and environment overrides
//!
//! All persisted state goes through a [`storage::Storage`] handle so the same
//! code runs against files on disk or an in-memory map in tests.

pub mod catalog;
pub mod config;
pub mod debounce;
pub mod error;
pub mod geo;
pub mod location;
pub mod notify;
pub mod storage;
pub mod store;

pub use catalog::{
    CatalogClient, CatalogController, FilterSelection, FilterState, ItemCard, LoadMoreState,
    PageFragment, QuickFilter, SortOrder, ViewMode,
};
pub use config::{Config, GeolocationMode};
pub use error::{CatalogError, Error, FilterError, Result, StorageError};
pub use geo::{distance_km, Coordinate};
pub use location::{
    DistanceLabel, GeolocationError, GeolocationProvider, LocationCache, LocationOutcome,
    LocationService, LocationStep, PositionOptions,
};
pub use notify::{Notification, NotificationCenter, NotificationLevel};
pub use storage::{FileStorage, MemoryStorage, SharedStorage, Storage};
pub use store::{CartBadge, CartItem, CartStore, FavoriteSet, FavoriteState, FavoritesStore};

pub use reqwest::Url;
