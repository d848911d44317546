use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::StorageError;
use crate::notify::NotificationCenter;
use crate::storage::{load_json, save_json, SharedStorage};

/// Storage key for the cart list.
pub const CART_KEY: &str = "cart";

/// One offer in the cart. Stored with the page's camelCase field names and
/// the price as a plain JSON number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct CartItem {
    pub offer_id: String,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[cfg_attr(feature = "ts", ts(type = "number"))]
    pub price: Decimal,
    pub quantity: u32,
}

/// Header badge state: total number of units across the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CartBadge {
    pub count: u32,
}

impl CartBadge {
    pub fn from_items(items: &[CartItem]) -> Self {
        let count = items
            .iter()
            .fold(0u32, |sum, item| sum.saturating_add(item.quantity));
        Self { count }
    }

    /// The badge is hidden while the cart is empty.
    pub fn is_visible(&self) -> bool {
        self.count > 0
    }

    pub fn text(&self) -> String {
        self.count.to_string()
    }
}

/// Parse a price out of displayed text such as `"249.90 ₽"`.
///
/// Everything except digits and `.` is dropped first; text that still does not
/// parse counts as zero.
pub fn parse_price(text: &str) -> Decimal {
    let digits: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    Decimal::from_str(&digits).unwrap_or(Decimal::ZERO)
}

#[derive(Clone)]
pub struct CartStore {
    storage: SharedStorage,
    notifications: NotificationCenter,
}

impl CartStore {
    pub fn new(storage: SharedStorage, notifications: NotificationCenter) -> Self {
        Self {
            storage,
            notifications,
        }
    }

    /// Current cart contents; a missing or unparseable list is an empty cart.
    pub fn items(&self) -> Result<Vec<CartItem>, StorageError> {
        Ok(load_json(self.storage.as_ref(), CART_KEY)?.unwrap_or_default())
    }

    /// Add one unit of an offer.
    ///
    /// An offer already in the cart gets its quantity bumped; a new one is
    /// appended with quantity 1. Returns the refreshed badge.
    pub fn add(&self, offer_id: &str, name: &str, price: Decimal) -> Result<CartBadge, StorageError> {
        let mut items = self.items()?;

        match items.iter_mut().find(|item| item.offer_id == offer_id) {
            Some(existing) => {
                existing.quantity = existing.quantity.saturating_add(1);
                debug!(offer_id, quantity = existing.quantity, "Incremented cart item");
            }
            None => {
                if price.is_sign_negative() {
                    warn!(offer_id, %price, "Negative price clamped to zero");
                }
                items.push(CartItem {
                    offer_id: offer_id.to_string(),
                    name: name.to_string(),
                    price: price.max(Decimal::ZERO),
                    quantity: 1,
                });
                debug!(offer_id, "Added new cart item");
            }
        }

        save_json(self.storage.as_ref(), CART_KEY, &items)?;
        self.notifications.success(format!("{} added to cart!", name));
        Ok(CartBadge::from_items(&items))
    }

    /// Recompute the badge from the persisted cart.
    pub fn badge(&self) -> Result<CartBadge, StorageError> {
        Ok(CartBadge::from_items(&self.items()?))
    }

    /// Sum of price times quantity.
    pub fn total(&self) -> Result<Decimal, StorageError> {
        Ok(self
            .items()?
            .iter()
            .map(|item| item.price * Decimal::from(item.quantity))
            .sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotificationLevel;
    use crate::storage::{MemoryStorage, Storage};

    fn dec(s: &str) -> Decimal {
        s.parse().expect("valid decimal literal")
    }

    fn store() -> (CartStore, SharedStorage, NotificationCenter) {
        let storage = MemoryStorage::shared();
        let notifications = NotificationCenter::new();
        (
            CartStore::new(storage.clone(), notifications.clone()),
            storage,
            notifications,
        )
    }

    #[test]
    fn test_adding_same_offer_twice_increments_quantity() {
        let (cart, _, _) = store();
        cart.add("offer-1", "Croissant", dec("120")).unwrap();
        let badge = cart.add("offer-1", "Croissant", dec("120")).unwrap();

        let items = cart.items().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 2);
        assert_eq!(badge.count, 2);
    }

    #[test]
    fn test_badge_sums_quantities_across_offers() {
        let (cart, _, _) = store();
        for _ in 0..2 {
            cart.add("a", "Bread", dec("50")).unwrap();
        }
        for _ in 0..3 {
            cart.add("b", "Milk", dec("80.5")).unwrap();
        }

        let badge = cart.badge().unwrap();
        assert_eq!(badge.text(), "5");
        assert!(badge.is_visible());
        assert_eq!(cart.total().unwrap(), dec("341.5"));
    }

    #[test]
    fn test_empty_cart_hides_badge() {
        let (cart, _, _) = store();
        let badge = cart.badge().unwrap();
        assert_eq!(badge.count, 0);
        assert!(!badge.is_visible());
    }

    #[test]
    fn test_add_always_notifies() {
        let (cart, _, notifications) = store();
        cart.add("a", "Bread", dec("50")).unwrap();
        cart.add("a", "Bread", dec("50")).unwrap();

        let raised = notifications.drain();
        assert_eq!(raised.len(), 2);
        assert!(raised.iter().all(|n| n.level == NotificationLevel::Success));
        assert_eq!(raised[0].message, "Bread added to cart!");
    }

    #[test]
    fn test_reads_page_written_cart() {
        let (cart, storage, _) = store();
        storage
            .set_item(
                CART_KEY,
                r#"[{"offerId":"7","name":"Pie","price":99.9,"quantity":3}]"#,
            )
            .unwrap();

        let items = cart.items().unwrap();
        assert_eq!(items[0].offer_id, "7");
        assert_eq!(items[0].price, dec("99.9"));
        assert_eq!(cart.badge().unwrap().count, 3);
    }

    #[test]
    fn test_writes_price_as_number() {
        let (cart, storage, _) = store();
        cart.add("7", "Pie", dec("99.9")).unwrap();
        let raw = storage.get_item(CART_KEY).unwrap().unwrap();
        assert_eq!(raw, r#"[{"offerId":"7","name":"Pie","price":99.9,"quantity":1}]"#);
    }

    #[test]
    fn test_corrupted_cart_starts_empty() {
        let (cart, storage, _) = store();
        storage.set_item(CART_KEY, "oops").unwrap();
        assert!(cart.items().unwrap().is_empty());

        cart.add("1", "Soup", dec("10")).unwrap();
        assert_eq!(cart.items().unwrap().len(), 1);
    }

    #[test]
    fn test_parse_price_strips_currency() {
        assert_eq!(parse_price("249.90 ₽"), dec("249.90"));
        assert_eq!(parse_price("₽ 1 200"), dec("1200"));
        assert_eq!(parse_price("free"), Decimal::ZERO);
    }
}
