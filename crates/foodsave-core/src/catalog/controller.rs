use reqwest::Url;
use tracing::{debug, info, warn};

use super::filter::{FilterSelection, FilterState, QuickFilter, SortOrder};
use super::page::{FilterOption, ItemCard, PageFragment};
use crate::error::{CatalogError, FilterError};
use crate::notify::NotificationCenter;

/// Server page size.
///
/// A load-more page with fewer cards than this is taken to be the last one.
/// Nothing in the response says so explicitly; if the server's page size
/// changes, this has to change with it.
pub const LOAD_MORE_PAGE_SIZE: usize = 12;

/// Placeholder shown while a filter change is loading.
pub const LOADING_MESSAGE: &str = "Applying filters...";

/// The "load more" control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMoreState {
    /// Enabled
    Ready,
    /// Disabled while a page is in flight
    Loading,
    /// Hidden; no more pages
    Exhausted,
}

/// Catalog page state: the current filters, the items on screen and the
/// load-more control.
///
/// Network work is split into `begin_*` (returns the URL to fetch) and
/// `finish_*` (takes the fetch result) so the caller decides where the
/// request runs.
pub struct CatalogController {
    filters: FilterState,
    items: Vec<ItemCard>,
    results_count: Option<u32>,
    load_more: LoadMoreState,
    pending_navigation: Option<Url>,
    /// URL of the load-more request in flight, if any
    pending_load_more: Option<Url>,
    categories: Vec<FilterOption>,
    vendors: Vec<FilterOption>,
    notifications: NotificationCenter,
}

impl CatalogController {
    /// Start at `start_url`. The first page has not been fetched yet; call
    /// [`Self::pending_navigation`] for the URL to load.
    pub fn new(start_url: &str, notifications: NotificationCenter) -> Result<Self, FilterError> {
        let filters = FilterState::from_url(start_url)?;
        let pending = filters.url().clone();
        Ok(Self {
            filters,
            items: Vec::new(),
            results_count: None,
            load_more: LoadMoreState::Exhausted,
            pending_navigation: Some(pending),
            pending_load_more: None,
            categories: Vec::new(),
            vendors: Vec::new(),
            notifications,
        })
    }

    pub fn filters(&self) -> &FilterState {
        &self.filters
    }

    pub fn items(&self) -> &[ItemCard] {
        &self.items
    }

    pub fn results_count(&self) -> Option<u32> {
        self.results_count
    }

    pub fn load_more_state(&self) -> LoadMoreState {
        self.load_more
    }

    pub fn categories(&self) -> &[FilterOption] {
        &self.categories
    }

    pub fn vendors(&self) -> &[FilterOption] {
        &self.vendors
    }

    pub fn pending_navigation(&self) -> Option<&Url> {
        self.pending_navigation.as_ref()
    }

    /// The loading placeholder, while a navigation is in flight.
    pub fn loading_message(&self) -> Option<&'static str> {
        self.pending_navigation.as_ref().map(|_| LOADING_MESSAGE)
    }

    // ------------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------------

    fn navigate(&mut self, url: Url) -> Url {
        info!(%url, "Navigating");
        // An in-flight load-more belongs to the old filters
        if self.pending_load_more.take().is_some() {
            self.load_more = LoadMoreState::Ready;
        }
        self.pending_navigation = Some(url.clone());
        url
    }

    pub fn apply_filters(&mut self, selection: &FilterSelection) -> Url {
        let url = self.filters.apply_url(selection);
        self.navigate(url)
    }

    pub fn clear_filters(&mut self) -> Url {
        let url = self.filters.clear_url();
        self.navigate(url)
    }

    pub fn set_quick_filter(&mut self, quick: QuickFilter) -> Url {
        let url = self.filters.quick_filter_url(quick);
        self.navigate(url)
    }

    pub fn set_sort(&mut self, sort: Option<SortOrder>) -> Url {
        let url = self.filters.sort_url(sort);
        self.navigate(url)
    }

    pub fn search(&mut self, query: &str) -> Url {
        let url = self.filters.search_url(query);
        self.navigate(url)
    }

    /// Reload the current URL.
    pub fn reload(&mut self) -> Url {
        let url = self.filters.url().clone();
        self.navigate(url)
    }

    /// Take the result of loading `url`.
    ///
    /// A result for anything other than the latest navigation is dropped.
    /// On success the page replaces everything shown; on failure the old
    /// page stays and an error is announced. Returns true if the page was
    /// replaced.
    pub fn finish_navigation(
        &mut self,
        url: &Url,
        result: Result<PageFragment, CatalogError>,
    ) -> bool {
        if self.pending_navigation.as_ref() != Some(url) {
            debug!(%url, "Dropping superseded page load");
            return false;
        }
        self.pending_navigation = None;

        let fragment = match result {
            Ok(fragment) => fragment,
            Err(e) => {
                warn!(%url, error = %e, "Error loading catalog page");
                self.notifications.error("Error loading catalog");
                return false;
            }
        };

        match FilterState::from_parsed(url.clone()) {
            Ok(filters) => self.filters = filters,
            Err(e) => {
                warn!(%url, error = %e, "Loaded page has an unusable URL");
                self.notifications.error("Error loading catalog");
                return false;
            }
        }

        self.load_more = if fragment.items.len() < LOAD_MORE_PAGE_SIZE {
            LoadMoreState::Exhausted
        } else {
            LoadMoreState::Ready
        };
        self.results_count = fragment.results_count;
        self.items = fragment.items;
        if !fragment.categories.is_empty() {
            self.categories = fragment.categories;
        }
        if !fragment.vendors.is_empty() {
            self.vendors = fragment.vendors;
        }
        info!(items = self.items.len(), load_more = ?self.load_more, "Catalog page loaded");
        true
    }

    // ------------------------------------------------------------------------
    // Load more
    // ------------------------------------------------------------------------

    /// Disable the control and return the next page's URL.
    ///
    /// `None` while the control is not enabled or a navigation is pending.
    pub fn begin_load_more(&mut self) -> Option<Url> {
        if self.load_more != LoadMoreState::Ready || self.pending_navigation.is_some() {
            return None;
        }
        self.load_more = LoadMoreState::Loading;
        let url = self.filters.next_page_url();
        debug!(%url, "Loading more items");
        self.pending_load_more = Some(url.clone());
        Some(url)
    }

    /// Append a load-more page.
    ///
    /// New cards go after the existing ones and their number is added to the
    /// results count. A short page hides the control. A failed fetch
    /// re-enables it and announces an error. A result for anything other
    /// than the request in flight is dropped. Returns the number of cards
    /// appended.
    pub fn finish_load_more(
        &mut self,
        url: &Url,
        result: Result<PageFragment, CatalogError>,
    ) -> Option<usize> {
        if self.pending_load_more.as_ref() != Some(url) {
            debug!(%url, "Dropping load-more result with no matching request");
            return None;
        }
        self.pending_load_more = None;

        let fragment = match result {
            Ok(fragment) => fragment,
            Err(e) => {
                warn!(error = %e, "Error loading more items");
                self.notifications.error("Error loading items");
                self.load_more = LoadMoreState::Ready;
                return None;
            }
        };

        let added = fragment.items.len();
        self.items.extend(fragment.items);
        if let Some(count) = self.results_count.as_mut() {
            *count = count.saturating_add(added as u32);
        }
        self.filters.page = self.filters.page.saturating_add(1);
        self.load_more = if added < LOAD_MORE_PAGE_SIZE {
            LoadMoreState::Exhausted
        } else {
            LoadMoreState::Ready
        };

        debug!(added, total = self.items.len(), load_more = ?self.load_more, "Appended items");
        Some(added)
    }
}
