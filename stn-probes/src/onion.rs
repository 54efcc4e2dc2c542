//! Onion availability detector
//!
//! Decides whether a site announces an onion service, first from the
//! `Onion-Location` response header the prober already captured, then by
//! fetching each HTTPS endpoint and looking for the equivalent meta tag.

use std::sync::Arc;
use tracing::{debug, error};

use stn_core::{OnionAvailability, ProbeResult, ONION_ENDPOINTS};
use stn_net::{HttpConfig, HttpPageFetcher, PageFetcher, FetchError, ONION_LOCATION};

/// Shared page fetcher handle
pub type SharedFetcher = Arc<dyn PageFetcher>;

/// Detects onion-service availability for a probed domain
#[derive(Clone)]
pub struct OnionDetector {
    fetcher: SharedFetcher,
}

impl OnionDetector {
    pub fn new(fetcher: SharedFetcher) -> Self {
        Self { fetcher }
    }

    /// Detector fetching pages over HTTP with the given configuration
    pub fn http(config: &HttpConfig) -> Result<Self, FetchError> {
        Ok(Self::new(Arc::new(HttpPageFetcher::new(config)?)))
    }

    /// Detect availability for a probe result
    ///
    /// A fetch failure marks the result `Unknown` and moves on to the next
    /// endpoint; the last endpoint evaluated decides unless one matched.
    pub async fn detect(&self, probe: &ProbeResult) -> OnionAvailability {
        if has_onion_location_header(probe) {
            return OnionAvailability::Available;
        }

        let mut availability = OnionAvailability::Absent;

        for key in ONION_ENDPOINTS {
            let Some(url) = probe.endpoint(key).and_then(|e| e.url.as_deref()) else {
                continue;
            };

            match self.fetcher.has_onion_location_meta(url).await {
                Ok(true) => return OnionAvailability::Available,
                Ok(false) => availability = OnionAvailability::Absent,
                Err(e) => {
                    error!("Onion-location check of {} failed: {}", url, e);
                    availability = OnionAvailability::Unknown;
                }
            }
        }

        debug!("Onion availability from page content: {}", availability);
        availability
    }
}

/// Whether either HTTPS endpoint sent an `Onion-Location` header
pub fn has_onion_location_header(probe: &ProbeResult) -> bool {
    ONION_ENDPOINTS
        .iter()
        .filter_map(|key| probe.endpoint(key))
        .any(|endpoint| endpoint.has_header(ONION_LOCATION))
}
