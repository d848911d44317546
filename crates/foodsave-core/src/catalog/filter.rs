//! Filter, sort and quick-filter state and its URL codec.
//!
//! The catalog page keeps no filter state of its own: every control is
//! restored from the current URL's query and every change produces a new URL
//! to navigate to. [`FilterState`] is the value object read from a URL; the
//! `*_url` methods build the next one.

use std::fmt;
use std::str::FromStr;

use reqwest::Url;
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::FilterError;

pub const PARAM_QUERY: &str = "q";
pub const PARAM_CATEGORIES: &str = "categories";
pub const PARAM_VENDORS: &str = "vendors";
pub const PARAM_MIN_PRICE: &str = "min_price";
pub const PARAM_MAX_PRICE: &str = "max_price";
pub const PARAM_DISTANCE: &str = "distance";
pub const PARAM_TYPE: &str = "type";
pub const PARAM_DISCOUNT: &str = "discount";
pub const PARAM_SORT: &str = "sort";
pub const PARAM_PAGE: &str = "page";

/// Parameters owned by the filter panel; replaced wholesale on apply.
const PANEL_PARAMS: [&str; 5] = [
    PARAM_CATEGORIES,
    PARAM_VENDORS,
    PARAM_MIN_PRICE,
    PARAM_MAX_PRICE,
    PARAM_DISTANCE,
];

// ============================================================================
// Sort order
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortOrder {
    /// Cheapest first
    Price,
    /// Biggest discount first
    Discount,
    Name,
}

impl SortOrder {
    pub const ALL: [SortOrder; 3] = [SortOrder::Price, SortOrder::Discount, SortOrder::Name];

    pub fn as_param(&self) -> &'static str {
        match self {
            SortOrder::Price => "price",
            SortOrder::Discount => "discount",
            SortOrder::Name => "name",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortOrder::Price => "Price: low to high",
            SortOrder::Discount => "Discount",
            SortOrder::Name => "Name",
        }
    }

    /// Cycle default -> price -> discount -> name -> default.
    pub fn cycle(current: Option<SortOrder>) -> Option<SortOrder> {
        match current {
            None => Some(SortOrder::Price),
            Some(SortOrder::Price) => Some(SortOrder::Discount),
            Some(SortOrder::Discount) => Some(SortOrder::Name),
            Some(SortOrder::Name) => None,
        }
    }
}

impl FromStr for SortOrder {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "price" => Ok(SortOrder::Price),
            "discount" => Ok(SortOrder::Discount),
            "name" => Ok(SortOrder::Name),
            _ => Err(()),
        }
    }
}

// ============================================================================
// Distance radius
// ============================================================================

/// Search radius around the user, in whole kilometres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DistanceRadius(u32);

impl DistanceRadius {
    /// Radii offered by the filter panel.
    pub const OPTIONS: [u32; 5] = [1, 3, 5, 10, 25];

    pub fn new(km: u32) -> Option<Self> {
        (km > 0).then_some(Self(km))
    }

    pub fn km(&self) -> u32 {
        self.0
    }

    /// Next panel option after `current`; `None` after the largest.
    pub fn cycle(current: Option<DistanceRadius>) -> Option<DistanceRadius> {
        let next = match current {
            None => Self::OPTIONS.first(),
            Some(r) => Self::OPTIONS.iter().find(|&&km| km > r.0),
        };
        next.and_then(|&km| Self::new(km))
    }
}

impl fmt::Display for DistanceRadius {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} km", self.0)
    }
}

// ============================================================================
// Quick filter chips
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum QuickFilter {
    #[default]
    All,
    Dishes,
    Products,
    /// Offers with at least 20% off
    Discount,
}

impl QuickFilter {
    pub const ALL: [QuickFilter; 4] = [
        QuickFilter::All,
        QuickFilter::Dishes,
        QuickFilter::Products,
        QuickFilter::Discount,
    ];

    /// The single query parameter this chip sets, if any.
    pub fn param(&self) -> Option<(&'static str, &'static str)> {
        match self {
            QuickFilter::All => None,
            QuickFilter::Dishes => Some((PARAM_TYPE, "dishes")),
            QuickFilter::Products => Some((PARAM_TYPE, "products")),
            QuickFilter::Discount => Some((PARAM_DISCOUNT, "20")),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            QuickFilter::All => "All",
            QuickFilter::Dishes => "Dishes",
            QuickFilter::Products => "Products",
            QuickFilter::Discount => "Discounts",
        }
    }

    /// Which chip is lit for a given `type` / `discount` pair.
    ///
    /// A recognised `type` wins; otherwise any `discount` value lights the
    /// discount chip.
    fn from_params(kind: Option<&str>, discount: Option<&str>) -> Self {
        match kind {
            Some("dishes") => QuickFilter::Dishes,
            Some("products") => QuickFilter::Products,
            _ if discount.is_some() => QuickFilter::Discount,
            _ => QuickFilter::All,
        }
    }
}

// ============================================================================
// Filter panel selection
// ============================================================================

/// What is ticked in the filter panel.
///
/// Categories and vendors behave as sets but keep the order they were ticked
/// in, which is the order they are written to the URL.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterSelection {
    pub categories: Vec<String>,
    pub vendors: Vec<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub distance: Option<DistanceRadius>,
}

impl FilterSelection {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Tick or untick a category. Returns true if it is now ticked.
    pub fn toggle_category(&mut self, value: &str) -> bool {
        toggle(&mut self.categories, value)
    }

    /// Tick or untick a vendor. Returns true if it is now ticked.
    pub fn toggle_vendor(&mut self, value: &str) -> bool {
        toggle(&mut self.vendors, value)
    }

    /// Query pairs for this selection. Non-positive prices are left out.
    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        pairs.extend(self.categories.iter().map(|c| (PARAM_CATEGORIES, c.clone())));
        pairs.extend(self.vendors.iter().map(|v| (PARAM_VENDORS, v.clone())));
        if let Some(min) = self.min_price.filter(|p| *p > Decimal::ZERO) {
            pairs.push((PARAM_MIN_PRICE, min.to_string()));
        }
        if let Some(max) = self.max_price.filter(|p| *p > Decimal::ZERO) {
            pairs.push((PARAM_MAX_PRICE, max.to_string()));
        }
        if let Some(radius) = self.distance {
            pairs.push((PARAM_DISTANCE, radius.km().to_string()));
        }
        pairs
    }
}

fn toggle(values: &mut Vec<String>, value: &str) -> bool {
    if let Some(pos) = values.iter().position(|v| v == value) {
        values.remove(pos);
        false
    } else {
        values.push(value.to_string());
        true
    }
}

// ============================================================================
// Filter state
// ============================================================================

/// Every filter control's value, reconstructed from a catalog URL.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
    url: Url,
    pub query: Option<String>,
    pub selection: FilterSelection,
    pub sort: Option<SortOrder>,
    pub quick: QuickFilter,
    /// 1-based; a missing or unparseable `page` is page 1
    pub page: u32,
}

impl FilterState {
    pub fn from_url(raw: &str) -> Result<Self, FilterError> {
        let url = Url::parse(raw).map_err(|e| FilterError::InvalidUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })?;
        Self::from_parsed(url)
    }

    pub fn from_parsed(url: Url) -> Result<Self, FilterError> {
        if url.cannot_be_a_base() {
            return Err(FilterError::NotHierarchical(url.to_string()));
        }

        let mut query = None;
        let mut selection = FilterSelection::default();
        let mut sort = None;
        let mut kind = None;
        let mut discount = None;
        let mut page = 1;

        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                PARAM_QUERY if !value.trim().is_empty() => query = Some(value.into_owned()),
                PARAM_CATEGORIES => {
                    if !selection.categories.iter().any(|c| *c == value) {
                        selection.categories.push(value.into_owned());
                    }
                }
                PARAM_VENDORS => {
                    if !selection.vendors.iter().any(|v| *v == value) {
                        selection.vendors.push(value.into_owned());
                    }
                }
                PARAM_MIN_PRICE => selection.min_price = parse_decimal(&value),
                PARAM_MAX_PRICE => selection.max_price = parse_decimal(&value),
                PARAM_DISTANCE => {
                    selection.distance = value.trim().parse().ok().and_then(DistanceRadius::new)
                }
                PARAM_SORT => {
                    sort = value.parse().ok();
                    if sort.is_none() && !value.is_empty() {
                        debug!(sort = %value, "Ignoring unknown sort order");
                    }
                }
                PARAM_TYPE => kind = Some(value.into_owned()),
                PARAM_DISCOUNT => discount = Some(value.into_owned()),
                PARAM_PAGE => page = value.trim().parse().ok().filter(|p| *p > 0).unwrap_or(1),
                _ => {}
            }
        }

        Ok(Self {
            quick: QuickFilter::from_params(kind.as_deref(), discount.as_deref()),
            url,
            query,
            selection,
            sort,
            page,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Replace the filter panel parameters with `selection`, keeping search,
    /// sort and quick filter. Back to page 1.
    pub fn apply_url(&self, selection: &FilterSelection) -> Url {
        let mut remove = PANEL_PARAMS.to_vec();
        remove.push(PARAM_PAGE);
        rewrite(&self.url, &remove, selection.pairs())
    }

    /// The bare catalog path with no query at all.
    pub fn clear_url(&self) -> Url {
        let mut url = self.url.clone();
        url.set_query(None);
        url.set_fragment(None);
        url
    }

    pub fn quick_filter_url(&self, quick: QuickFilter) -> Url {
        let add = quick
            .param()
            .map(|(k, v)| vec![(k, v.to_string())])
            .unwrap_or_default();
        rewrite(&self.url, &[PARAM_TYPE, PARAM_DISCOUNT, PARAM_PAGE], add)
    }

    pub fn sort_url(&self, sort: Option<SortOrder>) -> Url {
        let add = sort
            .map(|s| vec![(PARAM_SORT, s.as_param().to_string())])
            .unwrap_or_default();
        rewrite(&self.url, &[PARAM_SORT, PARAM_PAGE], add)
    }

    /// Set or clear the search text.
    pub fn search_url(&self, query: &str) -> Url {
        let query = query.trim();
        let add = if query.is_empty() {
            Vec::new()
        } else {
            vec![(PARAM_QUERY, query.to_string())]
        };
        rewrite(&self.url, &[PARAM_QUERY, PARAM_PAGE], add)
    }

    pub fn page_url(&self, page: u32) -> Url {
        rewrite(&self.url, &[PARAM_PAGE], vec![(PARAM_PAGE, page.to_string())])
    }

    pub fn next_page_url(&self) -> Url {
        self.page_url(self.page.saturating_add(1))
    }
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw.trim()).ok()
}

/// Drop every pair whose key is in `remove`, then append `add` in order.
fn rewrite(url: &Url, remove: &[&str], add: Vec<(&str, String)>) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !remove.contains(&k.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut next = url.clone();
    next.set_fragment(None);
    if kept.is_empty() && add.is_empty() {
        next.set_query(None);
        return next;
    }

    next.query_pairs_mut()
        .clear()
        .extend_pairs(kept.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .extend_pairs(add.iter().map(|(k, v)| (*k, v.as_str())));
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://foodsave.example/catalog/";

    fn state(query: &str) -> FilterState {
        FilterState::from_url(&format!("{}{}", BASE, query)).unwrap()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_selection_round_trips_through_url() {
        let selection = FilterSelection {
            categories: vec!["bakery".into(), "dairy".into()],
            min_price: Some(dec("10")),
            max_price: Some(dec("50")),
            ..FilterSelection::default()
        };

        let url = state("").apply_url(&selection);
        assert_eq!(
            url.query(),
            Some("categories=bakery&categories=dairy&min_price=10&max_price=50")
        );

        let restored = FilterState::from_parsed(url).unwrap();
        assert_eq!(restored.selection, selection);
    }

    #[test]
    fn test_apply_replaces_panel_params_and_keeps_the_rest() {
        let s = state("?q=bread&categories=meat&sort=price&type=dishes&page=3");
        let selection = FilterSelection {
            vendors: vec!["7".into()],
            distance: DistanceRadius::new(5),
            ..FilterSelection::default()
        };
        let url = s.apply_url(&selection);
        assert_eq!(
            url.query(),
            Some("q=bread&sort=price&type=dishes&vendors=7&distance=5")
        );
    }

    #[test]
    fn test_non_positive_prices_are_omitted() {
        let selection = FilterSelection {
            min_price: Some(Decimal::ZERO),
            max_price: Some(dec("-5")),
            ..FilterSelection::default()
        };
        let url = state("?min_price=3").apply_url(&selection);
        assert_eq!(url.query(), None);
        assert_eq!(url.as_str(), BASE);
    }

    #[test]
    fn test_clear_goes_to_bare_path() {
        let s = state("?q=milk&categories=dairy&sort=name#top");
        assert_eq!(s.clear_url().as_str(), BASE);
    }

    #[test]
    fn test_quick_filter_restore() {
        assert_eq!(state("").quick, QuickFilter::All);
        assert_eq!(state("?type=dishes").quick, QuickFilter::Dishes);
        assert_eq!(state("?type=products&discount=20").quick, QuickFilter::Products);
        assert_eq!(state("?discount=50").quick, QuickFilter::Discount);
        assert_eq!(state("?type=other").quick, QuickFilter::All);
    }

    #[test]
    fn test_quick_filter_url_sets_single_param() {
        let s = state("?type=dishes&discount=20&sort=price");
        assert_eq!(
            s.quick_filter_url(QuickFilter::Products).query(),
            Some("sort=price&type=products")
        );
        assert_eq!(
            s.quick_filter_url(QuickFilter::Discount).query(),
            Some("sort=price&discount=20")
        );
        assert_eq!(s.quick_filter_url(QuickFilter::All).query(), Some("sort=price"));
    }

    #[test]
    fn test_sort_set_and_removed() {
        let s = state("?q=tea&sort=name&page=2");
        assert_eq!(s.sort, Some(SortOrder::Name));
        assert_eq!(s.sort_url(Some(SortOrder::Discount)).query(), Some("q=tea&sort=discount"));
        assert_eq!(s.sort_url(None).query(), Some("q=tea"));
        assert_eq!(state("?sort=random").sort, None);
    }

    #[test]
    fn test_page_parsing_and_next_page() {
        assert_eq!(state("").page, 1);
        assert_eq!(state("?page=abc").page, 1);
        assert_eq!(state("?page=0").page, 1);

        let s = state("?categories=dairy&page=2");
        assert_eq!(s.page, 2);
        assert_eq!(s.next_page_url().query(), Some("categories=dairy&page=3"));
        assert_eq!(state("").next_page_url().query(), Some("page=2"));
    }

    #[test]
    fn test_search_url() {
        let s = state("?q=old&sort=price");
        assert_eq!(s.search_url("fresh bread").query(), Some("sort=price&q=fresh+bread"));
        assert_eq!(s.search_url("  ").query(), Some("sort=price"));
        assert_eq!(state("?q=fresh+bread").query.as_deref(), Some("fresh bread"));
    }

    #[test]
    fn test_duplicate_categories_collapse() {
        let s = state("?categories=dairy&categories=dairy&categories=meat");
        assert_eq!(s.selection.categories, vec!["dairy", "meat"]);
    }

    #[test]
    fn test_toggle_and_cycles() {
        let mut selection = FilterSelection::default();
        assert!(selection.toggle_category("dairy"));
        assert!(!selection.toggle_category("dairy"));
        assert!(selection.is_empty());

        assert_eq!(DistanceRadius::cycle(None), DistanceRadius::new(1));
        assert_eq!(DistanceRadius::cycle(DistanceRadius::new(10)), DistanceRadius::new(25));
        assert_eq!(DistanceRadius::cycle(DistanceRadius::new(25)), None);
        assert_eq!(SortOrder::cycle(Some(SortOrder::Name)), None);
    }

    #[test]
    fn test_invalid_url() {
        assert!(matches!(
            FilterState::from_url("not a url"),
            Err(FilterError::InvalidUrl { .. })
        ));
        assert!(matches!(
            FilterState::from_url("mailto:someone@example.com"),
            Err(FilterError::NotHierarchical(_))
        ));
    }
}
