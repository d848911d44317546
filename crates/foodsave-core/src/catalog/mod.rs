//! The catalog page: filters, sorting, view mode and pagination.
//!
//! [`FilterState`] is rebuilt from the URL on every page load and produces
//! the URL for every change. [`CatalogClient`] fetches pages and
//! [`CatalogController`] holds what is on screen, including the "load more"
//! control.

pub mod client;
pub mod controller;
pub mod filter;
pub mod page;
pub mod view;

pub use client::CatalogClient;
pub use controller::{CatalogController, LoadMoreState, LOADING_MESSAGE, LOAD_MORE_PAGE_SIZE};
pub use filter::{DistanceRadius, FilterSelection, FilterState, QuickFilter, SortOrder};
pub use page::{parse_page, FilterOption, ItemCard, PageFragment};
pub use view::{ViewMode, ViewPreference, VIEW_MODE_KEY};
