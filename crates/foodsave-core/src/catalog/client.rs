//! HTTP client for catalog pages.

use std::time::Duration;

use reqwest::{header, Client, Url};
use tracing::{debug, warn};

use super::page::{parse_page, PageFragment};
use crate::error::CatalogError;

/// HTTP request timeout in seconds.
/// Catalog pages are rendered server-side and can be slow on large result sets.
const REQUEST_TIMEOUT_SECS: u64 = 30;

const USER_AGENT: &str = concat!("foodsave/", env!("CARGO_PKG_VERSION"));

/// Fetches and parses catalog pages.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct CatalogClient {
    client: Client,
}

impl CatalogClient {
    pub fn new() -> Result<Self, CatalogError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    /// GET a catalog page and extract its item cards.
    ///
    /// Any non-success status is an error; there is no retry.
    pub async fn fetch_page(&self, url: &Url) -> Result<PageFragment, CatalogError> {
        debug!(%url, "Fetching catalog page");
        let response = self
            .client
            .get(url.clone())
            .header(header::ACCEPT, "text/html")
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        let html = response.text().await?;
        Ok(parse_page(&html))
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, CatalogError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "Catalog page request failed");
            Err(CatalogError::from_status(status, &body))
        }
    }
}
