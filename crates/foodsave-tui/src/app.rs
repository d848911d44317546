//! Application state for the FoodSave terminal client.
//!
//! `App` plays the part of the catalog page: it owns the catalog controller,
//! the cart and favorites stores and the location service, and runs page
//! fetches and geolocation as background tasks that report back over a
//! channel.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use foodsave_core::catalog::{
    CatalogClient, CatalogController, DistanceRadius, FilterSelection, ItemCard, PageFragment,
    QuickFilter, SortOrder, ViewMode, ViewPreference,
};
use foodsave_core::debounce::{Debouncer, FILTER_DEBOUNCE, PRICE_DEBOUNCE, SEARCH_DEBOUNCE};
use foodsave_core::location::{
    now_millis, DistanceLabel, GeolocationError, GeolocationProvider, LocationCache,
    LocationOutcome, LocationService, LocationStep,
};
use foodsave_core::{
    CartBadge, CartItem, CartStore, CatalogError, Config, Coordinate, FavoritesStore,
    FileStorage, NotificationCenter, SharedStorage, Url,
};

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the background task message channel.
/// At most one page load, one load-more and one location request are in flight.
const CHANNEL_BUFFER_SIZE: usize = 16;

/// Items per row in grid view.
pub const GRID_COLUMNS: usize = 3;

/// Subdirectory of the data directory holding local storage.
const STORAGE_DIR: &str = "storage";

/// Maximum length for the search and price inputs.
const MAX_INPUT_LENGTH: usize = 64;

// ============================================================================
// UI State Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceField {
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    /// Cursor is in the filter panel
    Filters,
    Searching,
    EditingPrice(PriceField),
    ShowingCart,
    ShowingHelp,
    Quitting,
}

/// One line of the filter panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterRow {
    Category(usize),
    Vendor(usize),
    Distance,
    MinPrice,
    MaxPrice,
}

// ============================================================================
// Background Task Results
// ============================================================================

/// Results sent back from spawned tasks.
#[derive(Debug)]
pub enum BackgroundResult {
    Page {
        url: Url,
        result: Result<PageFragment, CatalogError>,
    },
    LoadMore {
        url: Url,
        result: Result<PageFragment, CatalogError>,
    },
    Location(Result<Coordinate, GeolocationError>),
}

pub struct App {
    // Core services
    client: CatalogClient,
    pub controller: CatalogController,
    cart: CartStore,
    favorites_store: FavoritesStore,
    view_preference: ViewPreference,
    location: LocationService,
    pub notifications: NotificationCenter,

    // UI State
    pub state: AppState,
    pub view_mode: ViewMode,
    pub selection: usize,
    pub filter_cursor: usize,
    /// Filter panel contents, applied after a quiet period
    pub draft: FilterSelection,
    pub search_input: String,
    pub price_input: String,

    // Per-item decorations, parallel to the controller's items
    pub distances: Vec<DistanceLabel>,
    pub favorites: Vec<bool>,
    pub badge: CartBadge,
    /// Snapshot taken when the cart overlay opens
    pub cart_view: Vec<CartItem>,
    /// `None` while detection is running
    location_outcome: Option<LocationOutcome>,

    filter_debounce: Debouncer<FilterSelection>,
    price_debounce: Debouncer<FilterSelection>,
    search_debounce: Debouncer<String>,

    // Background task channel
    tx: mpsc::Sender<BackgroundResult>,
    rx: mpsc::Receiver<BackgroundResult>,
}

impl App {
    pub fn new(config: &Config, start_url: &str) -> Result<Self> {
        let dir = config.data_dir()?.join(STORAGE_DIR);
        let storage = FileStorage::new(dir).context("Failed to open local storage")?;
        Self::with_storage(Arc::new(storage), config.provider(), start_url)
    }

    pub fn with_storage(
        storage: SharedStorage,
        provider: Option<Arc<dyn GeolocationProvider>>,
        start_url: &str,
    ) -> Result<Self> {
        let notifications = NotificationCenter::new();
        let controller = CatalogController::new(start_url, notifications.clone())
            .with_context(|| format!("Invalid catalog URL: {}", start_url))?;
        let client = CatalogClient::new().context("Failed to build HTTP client")?;
        let location = LocationService::new(
            LocationCache::new(storage.clone()),
            provider,
            notifications.clone(),
        );
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);

        Ok(Self {
            client,
            draft: controller.filters().selection.clone(),
            search_input: controller.filters().query.clone().unwrap_or_default(),
            controller,
            cart: CartStore::new(storage.clone(), notifications.clone()),
            favorites_store: FavoritesStore::new(storage.clone(), notifications.clone()),
            view_preference: ViewPreference::new(storage),
            location,
            notifications,
            state: AppState::Normal,
            view_mode: ViewMode::default(),
            selection: 0,
            filter_cursor: 0,
            price_input: String::new(),
            distances: Vec::new(),
            favorites: Vec::new(),
            badge: CartBadge::default(),
            cart_view: Vec::new(),
            location_outcome: None,
            filter_debounce: Debouncer::new(FILTER_DEBOUNCE),
            price_debounce: Debouncer::new(PRICE_DEBOUNCE),
            search_debounce: Debouncer::new(SEARCH_DEBOUNCE),
            tx,
            rx,
        })
    }

    /// Page load: restore preferences, fetch the first page and start the
    /// location pipeline.
    pub fn start(&mut self) {
        if let Some(mode) = self.view_preference.load() {
            self.view_mode = mode;
        }
        self.badge = self.cart.badge().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read cart");
            CartBadge::default()
        });
        if let Some(url) = self.controller.pending_navigation().cloned() {
            self.spawn_page_fetch(url);
        }
        self.start_location();
    }

    fn start_location(&mut self) {
        self.location_outcome = match self.location.begin(now_millis()) {
            LocationStep::Ready(coordinate) => Some(LocationOutcome::Located {
                coordinate,
                cached: true,
            }),
            LocationStep::Unsupported => Some(LocationOutcome::Unsupported),
            LocationStep::Detect => match self.location.detect() {
                Some(request) => {
                    let tx = self.tx.clone();
                    tokio::spawn(async move {
                        let result = request.await;
                        if tx.send(BackgroundResult::Location(result)).await.is_err() {
                            debug!("App closed before location detection finished");
                        }
                    });
                    None
                }
                None => Some(LocationOutcome::Unsupported),
            },
        };
        self.refresh_distances();
    }

    // ------------------------------------------------------------------------
    // Background tasks
    // ------------------------------------------------------------------------

    fn spawn_page_fetch(&mut self, url: Url) {
        let client = self.client.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = client.fetch_page(&url).await;
            if tx.send(BackgroundResult::Page { url, result }).await.is_err() {
                debug!("App closed before page load finished");
            }
        });
    }

    fn spawn_load_more(&mut self, url: Url) {
        let client = self.client.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = client.fetch_page(&url).await;
            if tx.send(BackgroundResult::LoadMore { url, result }).await.is_err() {
                debug!("App closed before load more finished");
            }
        });
    }

    /// Drain finished background work into app state.
    pub fn check_background_tasks(&mut self) {
        let mut results = Vec::new();
        while let Ok(result) = self.rx.try_recv() {
            results.push(result);
        }
        for result in results {
            self.process_result(result);
        }
    }

    fn process_result(&mut self, result: BackgroundResult) {
        match result {
            BackgroundResult::Page { url, result } => {
                if self.controller.finish_navigation(&url, result) {
                    let filters = self.controller.filters();
                    self.draft = filters.selection.clone();
                    self.search_input = filters.query.clone().unwrap_or_default();
                    self.selection = 0;
                    let last_row = self.filter_rows().len().saturating_sub(1);
                    self.filter_cursor = self.filter_cursor.min(last_row);
                    self.refresh_item_state();
                }
            }
            BackgroundResult::LoadMore { url, result } => {
                if let Some(added) = self.controller.finish_load_more(&url, result) {
                    info!(added, "Loaded more items");
                    self.refresh_item_state();
                }
            }
            BackgroundResult::Location(result) => {
                self.location_outcome = Some(self.location.complete(result, now_millis()));
                self.refresh_distances();
            }
        }
    }

    /// Recompute distance labels and favorite highlights for every item.
    fn refresh_item_state(&mut self) {
        self.refresh_distances();
        self.refresh_favorites();
    }

    fn refresh_distances(&mut self) {
        let items = self.controller.items();
        self.distances = match &self.location_outcome {
            Some(outcome) => outcome.labels(items),
            None => vec![DistanceLabel::Detecting; items.len()],
        };
    }

    fn refresh_favorites(&mut self) {
        let ids = self
            .controller
            .items()
            .iter()
            .map(|item| item.item_id.as_deref().unwrap_or_default());
        match self.favorites_store.highlighted(ids) {
            Ok(flags) => self.favorites = flags,
            Err(e) => {
                warn!(error = %e, "Failed to read favorites");
                self.favorites = vec![false; self.controller.items().len()];
            }
        }
    }

    /// Per-frame housekeeping: fire debounced input and expire notifications.
    pub fn tick(&mut self, now: Instant) {
        if let Some(selection) = self.filter_debounce.poll(now) {
            self.apply_selection(selection);
        }
        if let Some(selection) = self.price_debounce.poll(now) {
            self.apply_selection(selection);
        }
        if let Some(query) = self.search_debounce.poll(now) {
            self.submit_search(&query);
        }
        self.notifications.prune(Utc::now());
    }

    // ------------------------------------------------------------------------
    // Item actions
    // ------------------------------------------------------------------------

    pub fn selected_item(&self) -> Option<&ItemCard> {
        self.controller.items().get(self.selection)
    }

    /// Image of the selected item, resolved against the catalog page URL.
    pub fn selected_image_url(&self) -> Option<Url> {
        let src = self.selected_item()?.image_src.as_deref()?;
        match self.controller.filters().url().join(src) {
            Ok(url) => Some(url),
            Err(e) => {
                debug!(src, error = %e, "Unusable image source");
                None
            }
        }
    }

    pub fn move_selection(&mut self, delta: isize) {
        let len = self.controller.items().len();
        if len == 0 {
            self.selection = 0;
            return;
        }
        let next = self.selection as isize + delta;
        self.selection = next.clamp(0, len as isize - 1) as usize;
    }

    /// Vertical step: a whole row in grid view, one item in list view.
    pub fn row_step(&self) -> isize {
        match self.view_mode {
            ViewMode::Grid => GRID_COLUMNS as isize,
            ViewMode::List => 1,
        }
    }

    pub fn add_selected_to_cart(&mut self) {
        let Some(item) = self.selected_item() else {
            return;
        };
        let Some(offer_id) = item.offer_id.clone() else {
            self.notifications.warning("No active offer for this item");
            return;
        };
        let name = item.name.clone();
        let price = item.price;

        match self.cart.add(&offer_id, &name, price) {
            Ok(badge) => self.badge = badge,
            Err(e) => {
                warn!(error = %e, %offer_id, "Failed to update cart");
                self.notifications.error("Could not update the cart");
            }
        }
    }

    pub fn toggle_selected_favorite(&mut self) {
        let Some(item_id) = self.selected_item().and_then(|item| item.item_id.clone()) else {
            return;
        };
        match self.favorites_store.toggle(&item_id) {
            Ok(state) => {
                debug!(%item_id, icon = state.icon(), "Favorite toggled");
                // The same item can appear twice after a load-more
                self.refresh_favorites();
            }
            Err(e) => {
                warn!(error = %e, %item_id, "Failed to update favorites");
                self.notifications.error("Could not update favorites");
            }
        }
    }

    pub fn toggle_view_mode(&mut self) {
        self.view_mode = self.view_mode.toggled();
        if let Err(e) = self.view_preference.save(self.view_mode) {
            warn!(error = %e, "Failed to save view mode");
        }
    }

    pub fn load_more(&mut self) {
        if let Some(url) = self.controller.begin_load_more() {
            self.spawn_load_more(url);
        }
    }

    pub fn open_cart(&mut self) {
        match self.cart.items() {
            Ok(items) => {
                self.cart_view = items;
                self.state = AppState::ShowingCart;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read cart");
                self.notifications.error("Could not read the cart");
            }
        }
    }

    pub fn cart_total(&self) -> Decimal {
        self.cart_view
            .iter()
            .map(|item| item.price * Decimal::from(item.quantity))
            .sum()
    }

    // ------------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------------

    fn cancel_pending_input(&mut self) {
        self.filter_debounce.cancel();
        self.price_debounce.cancel();
        self.search_debounce.cancel();
    }

    pub fn set_quick_filter(&mut self, quick: QuickFilter) {
        self.cancel_pending_input();
        let url = self.controller.set_quick_filter(quick);
        self.spawn_page_fetch(url);
    }

    pub fn cycle_sort(&mut self) {
        self.cancel_pending_input();
        let next = SortOrder::cycle(self.controller.filters().sort);
        let url = self.controller.set_sort(next);
        self.spawn_page_fetch(url);
    }

    pub fn clear_filters(&mut self) {
        self.cancel_pending_input();
        self.draft = FilterSelection::default();
        self.search_input.clear();
        let url = self.controller.clear_filters();
        self.spawn_page_fetch(url);
    }

    pub fn reload(&mut self) {
        let url = self.controller.reload();
        self.spawn_page_fetch(url);
    }

    /// Apply the filter panel right away instead of waiting for the debounce.
    pub fn apply_filters_now(&mut self) {
        self.filter_debounce.cancel();
        self.price_debounce.cancel();
        let selection = self.draft.clone();
        self.apply_selection(selection);
    }

    fn apply_selection(&mut self, selection: FilterSelection) {
        if selection == self.controller.filters().selection {
            debug!("Filter selection unchanged");
            return;
        }
        let url = self.controller.apply_filters(&selection);
        self.spawn_page_fetch(url);
    }

    fn submit_search(&mut self, query: &str) {
        let current = self.controller.filters().query.as_deref().unwrap_or_default();
        if query.trim() == current {
            return;
        }
        let url = self.controller.search(query);
        self.spawn_page_fetch(url);
    }

    // ------------------------------------------------------------------------
    // Filter panel
    // ------------------------------------------------------------------------

    pub fn filter_rows(&self) -> Vec<FilterRow> {
        let mut rows: Vec<FilterRow> = (0..self.controller.categories().len())
            .map(FilterRow::Category)
            .collect();
        rows.extend((0..self.controller.vendors().len()).map(FilterRow::Vendor));
        rows.extend([FilterRow::Distance, FilterRow::MinPrice, FilterRow::MaxPrice]);
        rows
    }

    pub fn move_filter_cursor(&mut self, delta: isize) {
        let len = self.filter_rows().len() as isize;
        self.filter_cursor = (self.filter_cursor as isize + delta).clamp(0, len - 1) as usize;
    }

    /// Activate the row under the cursor: tick a box, cycle the radius, or
    /// start editing a price.
    pub fn activate_filter_row(&mut self, now: Instant) {
        let Some(row) = self.filter_rows().get(self.filter_cursor).copied() else {
            return;
        };
        match row {
            FilterRow::Category(i) => {
                let Some(value) = self.controller.categories().get(i).map(|o| o.value.clone())
                else {
                    return;
                };
                self.draft.toggle_category(&value);
            }
            FilterRow::Vendor(i) => {
                let Some(value) = self.controller.vendors().get(i).map(|o| o.value.clone()) else {
                    return;
                };
                self.draft.toggle_vendor(&value);
            }
            FilterRow::Distance => {
                self.draft.distance = DistanceRadius::cycle(self.draft.distance);
            }
            FilterRow::MinPrice => return self.begin_price_edit(PriceField::Min),
            FilterRow::MaxPrice => return self.begin_price_edit(PriceField::Max),
        }
        self.filter_debounce.push(self.draft.clone(), now);
    }

    fn begin_price_edit(&mut self, field: PriceField) {
        let current = match field {
            PriceField::Min => self.draft.min_price,
            PriceField::Max => self.draft.max_price,
        };
        self.price_input = current.map(|p| p.to_string()).unwrap_or_default();
        self.state = AppState::EditingPrice(field);
    }

    pub fn push_price_char(&mut self, field: PriceField, c: char, now: Instant) {
        if !(c.is_ascii_digit() || c == '.') || self.price_input.len() >= MAX_INPUT_LENGTH {
            return;
        }
        self.price_input.push(c);
        self.price_changed(field, now);
    }

    pub fn pop_price_char(&mut self, field: PriceField, now: Instant) {
        self.price_input.pop();
        self.price_changed(field, now);
    }

    fn price_changed(&mut self, field: PriceField, now: Instant) {
        let price = Decimal::from_str(self.price_input.trim()).ok();
        match field {
            PriceField::Min => self.draft.min_price = price,
            PriceField::Max => self.draft.max_price = price,
        }
        self.price_debounce.push(self.draft.clone(), now);
    }

    pub fn finish_price_edit(&mut self) {
        self.state = AppState::Filters;
        if let Some(selection) = self.price_debounce.flush() {
            self.apply_selection(selection);
        }
    }

    pub fn cancel_price_edit(&mut self) {
        self.price_debounce.cancel();
        let applied = &self.controller.filters().selection;
        self.draft.min_price = applied.min_price;
        self.draft.max_price = applied.max_price;
        self.state = AppState::Filters;
    }

    // ------------------------------------------------------------------------
    // Search
    // ------------------------------------------------------------------------

    pub fn push_search_char(&mut self, c: char, now: Instant) {
        if self.search_input.len() >= MAX_INPUT_LENGTH {
            return;
        }
        self.search_input.push(c);
        self.search_debounce.push(self.search_input.clone(), now);
    }

    pub fn pop_search_char(&mut self, now: Instant) {
        self.search_input.pop();
        self.search_debounce.push(self.search_input.clone(), now);
    }

    pub fn finish_search(&mut self) {
        self.state = AppState::Normal;
        self.search_debounce.cancel();
        let query = self.search_input.clone();
        self.submit_search(&query);
    }

    pub fn cancel_search(&mut self) {
        self.search_debounce.cancel();
        self.search_input = self.controller.filters().query.clone().unwrap_or_default();
        self.state = AppState::Normal;
    }

    /// Whether anything is still in flight or waiting on a debounce.
    pub fn is_busy(&self) -> bool {
        self.controller.pending_navigation().is_some()
            || self.location_outcome.is_none()
            || self.filter_debounce.is_pending()
            || self.price_debounce.is_pending()
            || self.search_debounce.is_pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use foodsave_core::catalog::{FilterOption, LoadMoreState};
    use foodsave_core::location::{DeniedProvider, FixedProvider};
    use foodsave_core::{MemoryStorage, NotificationLevel, Storage};

    /// Port 9 (discard) refuses connections, so stray fetches fail fast.
    const START: &str = "http://127.0.0.1:9/catalog/";

    const HOME: Coordinate = Coordinate {
        latitude: 55.75,
        longitude: 37.61,
    };

    fn app_with(provider: Option<Arc<dyn GeolocationProvider>>) -> (App, SharedStorage) {
        let storage = MemoryStorage::shared();
        let app = App::with_storage(storage.clone(), provider, START).unwrap();
        (app, storage)
    }

    fn item(id: usize, offer: Option<&str>) -> ItemCard {
        ItemCard {
            item_id: Some(id.to_string()),
            offer_id: offer.map(String::from),
            name: format!("Item {}", id),
            price: Decimal::from(100 + id as i64),
            latitude: Some("55.76".into()),
            longitude: Some("37.62".into()),
            image_src: None,
        }
    }

    fn fragment(items: Vec<ItemCard>) -> PageFragment {
        PageFragment {
            results_count: Some(items.len() as u32),
            items,
            categories: vec![FilterOption {
                value: "dairy".into(),
                label: "Dairy".into(),
            }],
            vendors: Vec::new(),
        }
    }

    /// Deliver the initial page directly, bypassing the network.
    fn deliver_first_page(app: &mut App, items: Vec<ItemCard>) {
        let url = app.controller.pending_navigation().cloned().unwrap();
        app.process_result(BackgroundResult::Page {
            url,
            result: Ok(fragment(items)),
        });
    }

    #[tokio::test]
    async fn test_cached_location_gives_distances_on_load() {
        let (mut app, storage) = app_with(None);
        LocationCache::new(storage).store(HOME, now_millis()).unwrap();

        app.start();
        deliver_first_page(&mut app, vec![item(1, Some("o1")), ItemCard::default()]);

        assert!(matches!(app.distances[0], DistanceLabel::Km(_)));
        assert_eq!(app.distances[1], DistanceLabel::AddressMissing);
    }

    #[tokio::test]
    async fn test_unsupported_geolocation_labels() {
        let (mut app, _) = app_with(None);
        app.start();
        deliver_first_page(&mut app, vec![item(1, None)]);
        assert_eq!(app.distances, vec![DistanceLabel::NotSupported]);
    }

    #[tokio::test]
    async fn test_detection_result_replaces_placeholders() {
        let (mut app, _) = app_with(Some(Arc::new(FixedProvider::new(HOME))));
        deliver_first_page(&mut app, vec![item(1, None), item(2, None)]);
        assert_eq!(app.distances, vec![DistanceLabel::Detecting; 2]);

        app.process_result(BackgroundResult::Location(Ok(HOME)));
        assert!(app.distances.iter().all(|d| matches!(d, DistanceLabel::Km(_))));
    }

    #[tokio::test]
    async fn test_denied_detection_marks_unavailable() {
        let (mut app, _) = app_with(Some(Arc::new(DeniedProvider)));
        deliver_first_page(&mut app, vec![item(1, None)]);
        app.process_result(BackgroundResult::Location(Err(GeolocationError::PermissionDenied)));

        assert_eq!(app.distances, vec![DistanceLabel::Unavailable]);
        let raised = app.notifications.drain();
        assert_eq!(raised[0].level, NotificationLevel::Warning);
    }

    #[tokio::test]
    async fn test_cart_and_favorites_from_selection() {
        let (mut app, storage) = app_with(None);
        deliver_first_page(&mut app, vec![item(1, Some("o1")), item(2, None)]);

        app.add_selected_to_cart();
        app.add_selected_to_cart();
        assert_eq!(app.badge.count, 2);

        app.toggle_selected_favorite();
        assert_eq!(app.favorites, vec![true, false]);
        assert!(storage.get_item("favorites").unwrap().unwrap().contains("\"1\""));

        // Item without an offer cannot go in the cart
        app.move_selection(1);
        app.notifications.drain();
        app.add_selected_to_cart();
        assert_eq!(app.badge.count, 2);
        assert_eq!(app.notifications.drain()[0].level, NotificationLevel::Warning);

        app.open_cart();
        assert_eq!(app.state, AppState::ShowingCart);
        assert_eq!(app.cart_total(), Decimal::from(202));
    }

    #[tokio::test]
    async fn test_favorites_restored_after_load_more() {
        let (mut app, storage) = app_with(None);
        storage.set_item("favorites", r#"["13"]"#).unwrap();
        deliver_first_page(&mut app, (1..=12).map(|i| item(i, None)).collect());
        assert!(app.favorites.iter().all(|f| !f));

        let url = app.controller.filters().next_page_url();
        app.load_more();
        assert_eq!(app.controller.load_more_state(), LoadMoreState::Loading);
        app.process_result(BackgroundResult::LoadMore {
            url,
            result: Ok(fragment(vec![item(13, None)])),
        });

        assert_eq!(app.favorites.len(), 13);
        assert!(app.favorites[12]);
        assert_eq!(app.distances.len(), 13);
        assert_eq!(app.controller.load_more_state(), LoadMoreState::Exhausted);
    }

    #[tokio::test]
    async fn test_view_mode_persists() {
        let (mut app, storage) = app_with(None);
        app.start();
        assert_eq!(app.view_mode, ViewMode::Grid);
        app.toggle_view_mode();

        let mut reopened = App::with_storage(storage, None, START).unwrap();
        reopened.start();
        assert_eq!(reopened.view_mode, ViewMode::List);
        assert_eq!(reopened.row_step(), 1);
    }

    #[tokio::test]
    async fn test_filter_panel_applies_after_quiet_period() {
        let (mut app, _) = app_with(None);
        deliver_first_page(&mut app, vec![item(1, None)]);
        assert_eq!(app.filter_rows()[0], FilterRow::Category(0));

        let t0 = Instant::now();
        app.state = AppState::Filters;
        app.activate_filter_row(t0);
        assert_eq!(app.draft.categories, vec!["dairy"]);

        app.tick(t0 + Duration::from_millis(100));
        assert!(app.controller.pending_navigation().is_none());

        app.tick(t0 + FILTER_DEBOUNCE);
        let pending = app.controller.pending_navigation().unwrap();
        assert_eq!(pending.query(), Some("categories=dairy"));
        assert_eq!(app.controller.loading_message(), Some("Applying filters..."));
    }

    #[tokio::test]
    async fn test_price_edit_waits_for_longer_quiet_period() {
        let (mut app, _) = app_with(None);
        deliver_first_page(&mut app, vec![item(1, None)]);

        let t0 = Instant::now();
        app.filter_cursor = app
            .filter_rows()
            .iter()
            .position(|r| *r == FilterRow::MinPrice)
            .unwrap();
        app.activate_filter_row(t0);
        assert_eq!(app.state, AppState::EditingPrice(PriceField::Min));

        app.push_price_char(PriceField::Min, '1', t0);
        app.push_price_char(PriceField::Min, 'x', t0);
        app.push_price_char(PriceField::Min, '5', t0);
        assert_eq!(app.price_input, "15");

        app.tick(t0 + FILTER_DEBOUNCE);
        assert!(app.controller.pending_navigation().is_none());
        app.tick(t0 + PRICE_DEBOUNCE);
        assert_eq!(
            app.controller.pending_navigation().unwrap().query(),
            Some("min_price=15")
        );
    }

    #[tokio::test]
    async fn test_unchanged_selection_does_not_navigate() {
        let (mut app, _) = app_with(None);
        deliver_first_page(&mut app, vec![item(1, None)]);
        app.apply_filters_now();
        assert!(app.controller.pending_navigation().is_none());
    }

    #[tokio::test]
    async fn test_search_applies_after_quiet_period() {
        let (mut app, _) = app_with(None);
        deliver_first_page(&mut app, vec![item(1, None)]);

        let t0 = Instant::now();
        app.state = AppState::Searching;
        app.push_search_char('t', t0);
        app.push_search_char('e', t0 + Duration::from_millis(200));
        app.push_search_char('a', t0 + Duration::from_millis(250));

        // Each keystroke restarts the quiet period
        app.tick(t0 + SEARCH_DEBOUNCE);
        assert!(app.controller.pending_navigation().is_none());

        app.tick(t0 + Duration::from_millis(250) + SEARCH_DEBOUNCE);
        assert_eq!(
            app.controller.pending_navigation().unwrap().query(),
            Some("q=tea")
        );
        assert_eq!(app.state, AppState::Searching);
    }

    #[tokio::test]
    async fn test_stale_load_more_after_sort_change_is_ignored() {
        let (mut app, _) = app_with(None);
        deliver_first_page(&mut app, (1..=12).map(|i| item(i, None)).collect());

        let stale = app.controller.filters().next_page_url();
        app.load_more();
        app.cycle_sort();
        deliver_first_page(&mut app, (21..=32).map(|i| item(i, None)).collect());

        app.process_result(BackgroundResult::LoadMore {
            url: stale,
            result: Ok(fragment(vec![item(99, None)])),
        });
        assert_eq!(app.controller.items().len(), 12);
        assert_eq!(app.favorites.len(), 12);
    }

    #[tokio::test]
    async fn test_selected_image_resolves_against_page() {
        let (mut app, _) = app_with(None);
        let mut with_image = item(1, None);
        with_image.image_src = Some("/media/items/1.jpg".into());
        deliver_first_page(&mut app, vec![with_image, item(2, None)]);

        assert_eq!(
            app.selected_image_url().map(|u| u.to_string()),
            Some("http://127.0.0.1:9/media/items/1.jpg".to_string())
        );
        app.move_selection(1);
        assert_eq!(app.selected_image_url(), None);
    }

    #[tokio::test]
    async fn test_search_submits_on_enter() {
        let (mut app, _) = app_with(None);
        deliver_first_page(&mut app, vec![item(1, None)]);

        let t0 = Instant::now();
        app.state = AppState::Searching;
        for c in "milk".chars() {
            app.push_search_char(c, t0);
        }
        app.finish_search();
        assert_eq!(app.state, AppState::Normal);
        assert_eq!(
            app.controller.pending_navigation().unwrap().query(),
            Some("q=milk")
        );
    }
}
