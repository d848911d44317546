use thiserror::Error;

use crate::location::GeolocationError;

/// Any failure surfaced by the library.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Geolocation(#[from] GeolocationError),
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O failed for key {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Failed to serialize value for key {key}: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("Invalid catalog URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("URL has no path to carry filters: {0}")]
    NotHierarchical(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl CatalogError {
    /// Truncate a response body to avoid logging a whole HTML page
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let cut: String = body.chars().take(MAX_ERROR_BODY_LENGTH).collect();
            format!("{}... (truncated, {} total bytes)", cut, body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            404 => CatalogError::NotFound(truncated),
            429 => CatalogError::RateLimited,
            500..=599 => CatalogError::ServerError(truncated),
            _ => CatalogError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_maps_common_codes() {
        assert!(matches!(
            CatalogError::from_status(reqwest::StatusCode::NOT_FOUND, "gone"),
            CatalogError::NotFound(_)
        ));
        assert!(matches!(
            CatalogError::from_status(reqwest::StatusCode::TOO_MANY_REQUESTS, ""),
            CatalogError::RateLimited
        ));
        assert!(matches!(
            CatalogError::from_status(reqwest::StatusCode::BAD_GATEWAY, "upstream"),
            CatalogError::ServerError(_)
        ));
        assert!(matches!(
            CatalogError::from_status(reqwest::StatusCode::FORBIDDEN, "no"),
            CatalogError::InvalidResponse(_)
        ));
    }

    #[test]
    fn test_truncate_body_keeps_short_bodies() {
        assert_eq!(CatalogError::truncate_body("short"), "short");
        let long = "x".repeat(MAX_ERROR_BODY_LENGTH + 10);
        let truncated = CatalogError::truncate_body(&long);
        assert!(truncated.contains("truncated"));
        assert!(truncated.len() < long.len() + 40);
    }
}
