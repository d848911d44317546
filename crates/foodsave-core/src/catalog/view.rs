use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::StorageError;
use crate::storage::{SharedStorage, Storage};

/// Storage key for the grid/list preference.
pub const VIEW_MODE_KEY: &str = "viewMode";

/// How the item list is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum ViewMode {
    #[default]
    Grid,
    List,
}

impl ViewMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewMode::Grid => "grid",
            ViewMode::List => "list",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "grid" => Some(ViewMode::Grid),
            "list" => Some(ViewMode::List),
            _ => None,
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            ViewMode::Grid => ViewMode::List,
            ViewMode::List => ViewMode::Grid,
        }
    }
}

/// The persisted view preference. Stored as the bare word (`grid` / `list`),
/// not as JSON, matching what the page writes.
#[derive(Clone)]
pub struct ViewPreference {
    storage: SharedStorage,
}

impl ViewPreference {
    pub fn new(storage: SharedStorage) -> Self {
        Self { storage }
    }

    /// The saved mode, if one was ever chosen. Unknown values are ignored.
    pub fn load(&self) -> Option<ViewMode> {
        match self.storage.get_item(VIEW_MODE_KEY) {
            Ok(Some(raw)) => {
                let mode = ViewMode::parse(&raw);
                if mode.is_none() {
                    debug!(value = %raw, "Ignoring unknown view mode");
                }
                mode
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Failed to read view mode");
                None
            }
        }
    }

    pub fn save(&self, mode: ViewMode) -> Result<(), StorageError> {
        self.storage.set_item(VIEW_MODE_KEY, mode.as_str())
    }
}
