//! Cart and favorites persisted in local storage.
//!
//! Both stores read the whole persisted list, change it in memory and write
//! the whole list back on every operation. Nothing is cached between calls,
//! so another writer's changes are picked up on the next read (and lost if
//! they land between our read and our write).

pub mod cart;
pub mod favorites;

pub use cart::{parse_price, CartBadge, CartItem, CartStore, CART_KEY};
pub use favorites::{FavoriteSet, FavoriteState, FavoritesStore, FAVORITES_KEY};
