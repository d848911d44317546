//! Item-card extraction from catalog page HTML.
//!
//! The catalog endpoint only speaks HTML. Everything the client needs from a
//! page is carried by a few well-known hooks:
//!
//! - `.item-card` elements, one per item
//! - `data-item-id` / `data-offer-id` on the favorite and cart buttons
//! - the first `<h6>` (name) and first `.fw-bold` (price) inside a card
//! - `.distance-info` with `data-lat` / `data-lng` for the branch location
//! - `data-src` on lazily loaded images
//! - `#results-count` holding the number of results shown
//! - `.category-filter` / `.vendor-filter` checkboxes in the filter panel
//!
//! This is not an HTML parser. Tags are scanned with regexes and elements are
//! closed by counting same-name tags, which is enough for server-rendered
//! templates.

use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use tracing::debug;

use crate::geo::Coordinate;
use crate::store::parse_price;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<(/?)([A-Za-z][A-Za-z0-9]*)([^>]*)>").expect("valid tag regex")
});
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)(?:^|\s)([A-Za-z_:][-A-Za-z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("valid attribute regex")
});
static STRIP_TAGS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid strip regex"));

const ITEM_CARD_CLASS: &str = "item-card";

/// One catalog entry as rendered on the page.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ItemCard {
    pub item_id: Option<String>,
    /// Active offer, if the item has one; only then can it go in the cart
    pub offer_id: Option<String>,
    pub name: String,
    pub price: Decimal,
    /// Raw `data-lat` of the branch, exactly as rendered
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub image_src: Option<String>,
}

impl ItemCard {
    /// Branch location, if the card carries usable coordinates.
    pub fn coordinate(&self) -> Option<Coordinate> {
        Coordinate::from_attrs(self.latitude.as_deref(), self.longitude.as_deref())
    }
}

/// A checkbox in the filter panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterOption {
    pub value: String,
    pub label: String,
}

/// Everything extracted from one catalog page.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageFragment {
    pub items: Vec<ItemCard>,
    pub results_count: Option<u32>,
    pub categories: Vec<FilterOption>,
    pub vendors: Vec<FilterOption>,
}

pub fn parse_page(html: &str) -> PageFragment {
    let tags: Vec<Tag<'_>> = scan_tags(html).collect();

    let mut items = Vec::new();
    let mut resume_at = 0;
    for (i, tag) in tags.iter().enumerate() {
        if tag.start < resume_at || tag.closing || !tag.has_class(ITEM_CARD_CLASS) {
            continue;
        }
        let end = element_end(&tags[i..], html.len());
        items.push(parse_card(&html[tag.start..end]));
        resume_at = end;
    }

    let fragment = PageFragment {
        results_count: results_count(html, &tags),
        categories: filter_options(html, &tags, "category-filter"),
        vendors: filter_options(html, &tags, "vendor-filter"),
        items,
    };
    debug!(
        items = fragment.items.len(),
        results_count = ?fragment.results_count,
        "Parsed catalog page"
    );
    fragment
}

fn parse_card(card: &str) -> ItemCard {
    let tags: Vec<Tag<'_>> = scan_tags(card).collect();
    let mut item = ItemCard::default();
    let mut name = None;
    let mut price = None;
    let mut have_location = false;

    for (i, tag) in tags.iter().enumerate() {
        if tag.closing {
            continue;
        }
        if item.item_id.is_none() {
            item.item_id = tag.attr("data-item-id");
        }
        if item.offer_id.is_none() {
            item.offer_id = tag.attr("data-offer-id");
        }
        if item.image_src.is_none() {
            item.image_src = tag.attr("data-src");
        }
        if !have_location && tag.has_class("distance-info") {
            item.latitude = tag.attr("data-lat");
            item.longitude = tag.attr("data-lng");
            have_location = true;
        }
        if name.is_none() && tag.name.eq_ignore_ascii_case("h6") {
            name = Some(inner_text(card, &tags[i..]));
        }
        if price.is_none() && tag.has_class("fw-bold") {
            price = Some(inner_text(card, &tags[i..]));
        }
    }

    item.name = name.unwrap_or_default();
    item.price = price.as_deref().map(parse_price).unwrap_or_default();
    item
}

fn results_count(html: &str, tags: &[Tag<'_>]) -> Option<u32> {
    let i = tags
        .iter()
        .position(|t| !t.closing && t.attr("id").as_deref() == Some("results-count"))?;
    let text = inner_text(html, &tags[i..]);
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

fn filter_options(html: &str, tags: &[Tag<'_>], class: &str) -> Vec<FilterOption> {
    let mut options: Vec<FilterOption> = Vec::new();
    for tag in tags.iter().filter(|t| {
        !t.closing && t.name.eq_ignore_ascii_case("input") && t.has_class(class)
    }) {
        let Some(value) = tag.attr("value") else {
            continue;
        };
        if options.iter().any(|o| o.value == value) {
            continue;
        }
        let label = tag
            .attr("id")
            .and_then(|id| label_for(html, tags, &id))
            .unwrap_or_else(|| value.clone());
        options.push(FilterOption { value, label });
    }
    options
}

fn label_for(html: &str, tags: &[Tag<'_>], id: &str) -> Option<String> {
    let i = tags.iter().position(|t| {
        !t.closing && t.name.eq_ignore_ascii_case("label") && t.attr("for").as_deref() == Some(id)
    })?;
    let text = inner_text(html, &tags[i..]);
    (!text.is_empty()).then_some(text)
}

// ============================================================================
// Tag scanning
// ============================================================================

#[derive(Debug)]
struct Tag<'a> {
    name: &'a str,
    attrs: &'a str,
    closing: bool,
    self_closing: bool,
    /// Byte offset of `<`
    start: usize,
    /// Byte offset just past `>`
    end: usize,
}

impl Tag<'_> {
    fn attr(&self, name: &str) -> Option<String> {
        ATTR_RE.captures_iter(self.attrs).find_map(|caps| {
            let key = caps.get(1)?.as_str();
            if !key.eq_ignore_ascii_case(name) {
                return None;
            }
            let value = caps.get(2).or_else(|| caps.get(3)).or_else(|| caps.get(4))?;
            Some(decode_entities(value.as_str()))
        })
    }

    fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }
}

fn scan_tags(html: &str) -> impl Iterator<Item = Tag<'_>> {
    TAG_RE.captures_iter(html).filter_map(|caps| {
        let whole = caps.get(0)?;
        let attrs = caps.get(3).map_or("", |m| m.as_str());
        Some(Tag {
            name: caps.get(2)?.as_str(),
            attrs,
            closing: !caps.get(1)?.as_str().is_empty(),
            self_closing: attrs.trim_end().ends_with('/'),
            start: whole.start(),
            end: whole.end(),
        })
    })
}

/// Byte offset just past the element opened by `tags[0]`.
///
/// An element left open runs to `fallback`.
fn element_end(tags: &[Tag<'_>], fallback: usize) -> usize {
    let Some(open) = tags.first() else {
        return fallback;
    };
    if open.self_closing {
        return open.end;
    }

    let mut depth = 0usize;
    for tag in tags {
        if !tag.name.eq_ignore_ascii_case(open.name) || tag.self_closing {
            continue;
        }
        if tag.closing {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                return tag.end;
            }
        } else {
            depth += 1;
        }
    }
    fallback
}

/// Whitespace-collapsed text content of the element opened by `tags[0]`.
fn inner_text(html: &str, tags: &[Tag<'_>]) -> String {
    let Some(open) = tags.first() else {
        return String::new();
    };
    let end = element_end(tags, html.len());
    let inner = &html[open.end..end];
    // Drop the closing tag itself
    let inner = inner.rfind("</").map_or(inner, |pos| &inner[..pos]);
    let text = STRIP_TAGS_RE.replace_all(inner, " ");
    decode_entities(&text)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}
