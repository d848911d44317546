//! Application configuration.
//!
//! Stored at `~/.config/foodsave/config.json`. Environment variables
//! (typically from a `.env` file) override the file:
//!
//! - `FOODSAVE_URL`: catalog start URL
//! - `FOODSAVE_LOCATION`: fixed position as `lat,lng`; implies `fixed` mode
//! - `FOODSAVE_GEOLOCATION`: `ip`, `fixed`, `denied` or `off`
//! - `FOODSAVE_DATA_DIR`: where local storage lives

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::geo::Coordinate;
use crate::location::provider::DEFAULT_IP_LOOKUP_URL;
use crate::location::{DeniedProvider, FixedProvider, GeolocationProvider, IpApiProvider};

/// Application name used for config/data directory paths
const APP_NAME: &str = "foodsave";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_CATALOG_URL: &str = "http://localhost:8000/catalog/";

/// Where the user's position comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeolocationMode {
    /// Approximate position from the public IP
    #[default]
    Ip,
    /// The configured `location`
    Fixed,
    /// Act as if the user refused location access
    Denied,
    /// No geolocation capability
    Off,
}

impl GeolocationMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ip" => Some(GeolocationMode::Ip),
            "fixed" => Some(GeolocationMode::Fixed),
            "denied" => Some(GeolocationMode::Denied),
            "off" | "none" => Some(GeolocationMode::Off),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub catalog_url: String,
    pub geolocation: GeolocationMode,
    pub location: Option<Coordinate>,
    pub ip_lookup_url: String,
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            geolocation: GeolocationMode::default(),
            location: None,
            ip_lookup_url: DEFAULT_IP_LOOKUP_URL.to_string(),
            data_dir: None,
        }
    }
}

impl Config {
    /// Load the config file (if any) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory holding local storage and logs.
    pub fn data_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_dir {
            return Ok(dir.clone());
        }
        let data_dir =
            dirs::data_dir().ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// Apply overrides from `lookup`, normally the process environment.
    /// Unparseable values are logged and skipped.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("FOODSAVE_URL").filter(|s| !s.trim().is_empty()) {
            self.catalog_url = url.trim().to_string();
        }
        if let Some(raw) = lookup("FOODSAVE_LOCATION") {
            match Coordinate::parse_pair(&raw) {
                Some(coord) => {
                    self.location = Some(coord);
                    self.geolocation = GeolocationMode::Fixed;
                }
                None => warn!(value = %raw, "Ignoring invalid FOODSAVE_LOCATION"),
            }
        }
        if let Some(raw) = lookup("FOODSAVE_GEOLOCATION") {
            match GeolocationMode::parse(&raw) {
                Some(mode) => self.geolocation = mode,
                None => warn!(value = %raw, "Ignoring invalid FOODSAVE_GEOLOCATION"),
            }
        }
        if let Some(dir) = lookup("FOODSAVE_DATA_DIR").filter(|s| !s.trim().is_empty()) {
            self.data_dir = Some(PathBuf::from(dir));
        }
    }

    /// The geolocation provider for this config; `None` means unsupported.
    pub fn provider(&self) -> Option<Arc<dyn GeolocationProvider>> {
        match self.geolocation {
            GeolocationMode::Ip => Some(Arc::new(IpApiProvider::new(self.ip_lookup_url.clone()))),
            GeolocationMode::Fixed => match self.location {
                Some(coord) => Some(Arc::new(FixedProvider::new(coord))),
                None => {
                    warn!("Fixed geolocation selected but no location configured");
                    None
                }
            },
            GeolocationMode::Denied => Some(Arc::new(DeniedProvider)),
            GeolocationMode::Off => None,
        }
    }
}
