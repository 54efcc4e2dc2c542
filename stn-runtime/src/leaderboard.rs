//! Latest grade per scanned site

use stn_core::{Site, SiteRegistry, SiteSummary};

use crate::{ScanStore, StoreError};

/// Sites with at least one scan record, ordered by name
pub async fn scanned_sites<'a>(
    registry: &'a SiteRegistry,
    store: &dyn ScanStore,
) -> Result<Vec<&'a Site>, StoreError> {
    let scanned = store.scanned_domains().await?;
    Ok(registry
        .all()
        .iter()
        .filter(|site| scanned.contains(&site.domain))
        .collect())
}

/// Each scanned site combined with its most recent record
pub async fn leaderboard(
    registry: &SiteRegistry,
    store: &dyn ScanStore,
) -> Result<Vec<SiteSummary>, StoreError> {
    let mut rows = Vec::new();

    for site in registry.all() {
        if let Some(latest) = store.latest(&site.domain).await? {
            rows.push(site.summary(&latest));
        }
    }

    Ok(rows)
}
