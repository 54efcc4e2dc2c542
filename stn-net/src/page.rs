//! Page inspection for onion-location announcements
//!
//! Some sites announce their onion service only in markup:
//!
//! ```html
//! <meta http-equiv="onion-location" content="http://example.onion/">
//! ```

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::debug;

use crate::{create_client, FetchError, HttpConfig};

/// Value of the `http-equiv` attribute that announces an onion service
pub const ONION_LOCATION: &str = "onion-location";

/// Fetches a page and looks for an onion-location meta tag
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// `Ok(true)` if the page at `url` carries the meta tag
    async fn has_onion_location_meta(&self, url: &str) -> Result<bool, FetchError>;
}

/// [`PageFetcher`] backed by a reqwest client
#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    client: Client,
}

impl HttpPageFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self, FetchError> {
        Ok(Self {
            client: create_client(config)?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn has_onion_location_meta(&self, url: &str) -> Result<bool, FetchError> {
        let html = fetch_page(&self.client, url).await?;
        let found = contains_onion_location_meta(&html)?;
        debug!("Onion-location meta tag on {}: {}", url, found);
        Ok(found)
    }
}

/// GET a page body; the status code is not checked
pub async fn fetch_page(client: &Client, url: &str) -> Result<String, FetchError> {
    debug!("Fetching: {}", url);

    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        debug!("Fetch of {} returned status: {}", url, response.status());
    }

    Ok(response.text().await?)
}

/// Search markup for `<meta http-equiv="onion-location">`
///
/// The attribute value must match exactly; the tag's content is ignored.
pub fn contains_onion_location_meta(html: &str) -> Result<bool, FetchError> {
    if html.trim().is_empty() {
        return Err(FetchError::EmptyDocument("no markup to parse".to_string()));
    }

    let document = Html::parse_document(html);
    let meta_selector = Selector::parse("meta").unwrap();

    let found = document
        .select(&meta_selector)
        .any(|el| el.value().attr("http-equiv") == Some(ONION_LOCATION));

    Ok(found)
}
