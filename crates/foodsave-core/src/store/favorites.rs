use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StorageError;
use crate::notify::NotificationCenter;
use crate::storage::{load_json, save_json, SharedStorage};

/// Storage key for the favorite item ids.
pub const FAVORITES_KEY: &str = "favorites";

/// Favorite item ids. Persisted as a JSON array; membership is what matters,
/// the order is just first-insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FavoriteSet {
    ids: Vec<String>,
}

impl FavoriteSet {
    pub fn contains(&self, item_id: &str) -> bool {
        self.ids.iter().any(|id| id == item_id)
    }

    /// Returns false if the id was already present.
    pub fn insert(&mut self, item_id: &str) -> bool {
        if self.contains(item_id) {
            return false;
        }
        self.ids.push(item_id.to_string());
        true
    }

    /// Returns false if the id was not present.
    pub fn remove(&mut self, item_id: &str) -> bool {
        let before = self.ids.len();
        self.ids.retain(|id| id != item_id);
        self.ids.len() != before
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    /// Drop duplicates a hand-edited or older list may contain.
    fn dedup(mut self) -> Self {
        let mut seen = FavoriteSet::default();
        for id in self.ids.drain(..) {
            seen.insert(&id);
        }
        seen
    }
}

/// Result of a toggle: which icon the item should now show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteState {
    Added,
    Removed,
}

impl FavoriteState {
    pub fn is_favorite(&self) -> bool {
        matches!(self, FavoriteState::Added)
    }

    /// Filled heart for favorites, outlined otherwise.
    pub fn icon(&self) -> &'static str {
        if self.is_favorite() {
            "♥"
        } else {
            "♡"
        }
    }
}

#[derive(Clone)]
pub struct FavoritesStore {
    storage: SharedStorage,
    notifications: NotificationCenter,
}

impl FavoritesStore {
    pub fn new(storage: SharedStorage, notifications: NotificationCenter) -> Self {
        Self {
            storage,
            notifications,
        }
    }

    pub fn load(&self) -> Result<FavoriteSet, StorageError> {
        let set: Option<FavoriteSet> = load_json(self.storage.as_ref(), FAVORITES_KEY)?;
        Ok(set.unwrap_or_default().dedup())
    }

    /// Add the id if absent, remove it if present.
    pub fn toggle(&self, item_id: &str) -> Result<FavoriteState, StorageError> {
        let mut favorites = self.load()?;

        let state = if favorites.remove(item_id) {
            self.notifications.info("Removed from favorites");
            FavoriteState::Removed
        } else {
            favorites.insert(item_id);
            self.notifications.success("Added to favorites");
            FavoriteState::Added
        };

        save_json(self.storage.as_ref(), FAVORITES_KEY, &favorites)?;
        debug!(item_id, ?state, total = favorites.len(), "Toggled favorite");
        Ok(state)
    }

    /// Which of the given item ids should render as favorites.
    pub fn highlighted<'a>(
        &self,
        item_ids: impl IntoIterator<Item = &'a str>,
    ) -> Result<Vec<bool>, StorageError> {
        let favorites = self.load()?;
        Ok(item_ids.into_iter().map(|id| favorites.contains(id)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotificationLevel;
    use crate::storage::{MemoryStorage, Storage};

    fn store() -> (FavoritesStore, SharedStorage, NotificationCenter) {
        let storage = MemoryStorage::shared();
        let notifications = NotificationCenter::new();
        (
            FavoritesStore::new(storage.clone(), notifications.clone()),
            storage,
            notifications,
        )
    }

    #[test]
    fn test_toggle_twice_restores_original_set() {
        let (favorites, _, _) = store();
        favorites.toggle("1").unwrap();
        let before = favorites.load().unwrap();

        assert_eq!(favorites.toggle("42").unwrap(), FavoriteState::Added);
        assert!(favorites.load().unwrap().contains("42"));
        assert_eq!(favorites.toggle("42").unwrap(), FavoriteState::Removed);

        assert_eq!(favorites.load().unwrap(), before);
    }

    #[test]
    fn test_toggle_notifications() {
        let (favorites, _, notifications) = store();
        favorites.toggle("7").unwrap();
        favorites.toggle("7").unwrap();

        let raised = notifications.drain();
        assert_eq!(raised[0].level, NotificationLevel::Success);
        assert_eq!(raised[0].message, "Added to favorites");
        assert_eq!(raised[1].level, NotificationLevel::Info);
        assert_eq!(raised[1].message, "Removed from favorites");
    }

    #[test]
    fn test_highlighted_matches_membership() {
        let (favorites, storage, _) = store();
        storage.set_item(FAVORITES_KEY, r#"["3","5"]"#).unwrap();

        let flags = favorites.highlighted(["1", "3", "5", "9"]).unwrap();
        assert_eq!(flags, vec![false, true, true, false]);
    }

    #[test]
    fn test_duplicates_in_storage_are_collapsed() {
        let (favorites, storage, _) = store();
        storage.set_item(FAVORITES_KEY, r#"["3","3","4"]"#).unwrap();

        assert_eq!(favorites.load().unwrap().len(), 2);
        // One toggle removes the id entirely
        assert_eq!(favorites.toggle("3").unwrap(), FavoriteState::Removed);
        assert!(!favorites.load().unwrap().contains("3"));
        assert_eq!(storage.get_item(FAVORITES_KEY).unwrap().as_deref(), Some(r#"["4"]"#));
    }

    #[test]
    fn test_icon_states() {
        assert_eq!(FavoriteState::Added.icon(), "♥");
        assert_eq!(FavoriteState::Removed.icon(), "♡");
    }
}
