//! Scan orchestrator
//!
//! Runs each requested site through prober, onion detector and scoring,
//! stages the records, and commits the batch in one call:
//! - Unknown domains are rejected before anything is probed
//! - The first probe failure drops the staged batch
//! - Dropping the future before the commit leaves the store untouched

use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use stn_core::{ScanRecord, Site, SiteRegistry};
use stn_probes::{OnionDetector, ProbeError, SharedProber};

use crate::{SharedStore, StagedBatch, StoreError};

/// Errors that abort a scan batch
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Site with domain '{0}' does not exist")]
    UnknownDomain(String),

    #[error("Scan of {domain} failed: {source}")]
    Probe {
        domain: String,
        #[source]
        source: ProbeError,
    },

    #[error("Failed to commit scan batch: {0}")]
    Store(#[from] StoreError),
}

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Sites probed at once; 1 scans strictly in order
    pub concurrency: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self { concurrency: 1 }
    }
}

/// Called as each site's scan starts
pub type ProgressFn = Arc<dyn Fn(&Site) + Send + Sync>;

/// The scan orchestrator
pub struct Orchestrator {
    registry: Arc<SiteRegistry>,
    prober: SharedProber,
    detector: OnionDetector,
    store: SharedStore,
    config: OrchestratorConfig,
    progress: Option<ProgressFn>,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<SiteRegistry>,
        prober: SharedProber,
        detector: OnionDetector,
        store: SharedStore,
    ) -> Self {
        Self {
            registry,
            prober,
            detector,
            store,
            config: OrchestratorConfig::default(),
            progress: None,
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Map requested domains to sites; no domains means every known site
    pub fn resolve(&self, domains: &[String]) -> Result<Vec<Site>, ScanError> {
        if domains.is_empty() {
            return Ok(self.registry.all().to_vec());
        }

        domains
            .iter()
            .map(|domain| {
                self.registry
                    .get(domain)
                    .cloned()
                    .ok_or_else(|| ScanError::UnknownDomain(domain.clone()))
            })
            .collect()
    }

    /// Scan a batch of domains and commit all records or none
    pub async fn run_batch(&self, domains: &[String]) -> Result<Vec<ScanRecord>, ScanError> {
        let sites = self.resolve(domains)?;
        let concurrency = self.config.concurrency.max(1);

        info!(
            "Scanning {} sites with {} via {} worker(s)",
            sites.len(),
            self.prober.name(),
            concurrency
        );

        let records: Vec<ScanRecord> = stream::iter(sites.iter())
            .map(|site| self.scan_site(site))
            .buffered(concurrency)
            .try_collect::<Vec<_>>()
            .await?;

        let mut batch = StagedBatch::new();
        for record in records {
            batch.stage(record);
        }
        let staged = batch.records().to_vec();

        let committed = self.store.commit(batch).await?;
        info!("Batch complete: {} records committed", committed);

        Ok(staged)
    }

    /// Probe, detect and score one site without persisting anything
    pub async fn scan_site(&self, site: &Site) -> Result<ScanRecord, ScanError> {
        if let Some(progress) = &self.progress {
            progress(site);
        }
        debug!("Scanning: {}", site.domain);

        let probe = self
            .prober
            .probe(&site.domain)
            .await
            .map_err(|source| ScanError::Probe {
                domain: site.domain.clone(),
                source,
            })?;

        let onion = self.detector.detect(&probe).await;
        let record = ScanRecord::new(&site.domain, probe, onion);

        info!(
            "{}: score {} ({}), onion {}",
            site.domain,
            record.score(),
            record.grade().grade,
            record.onion_available()
        );

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryStore, ScanStore};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use stn_core::{Endpoint, OnionAvailability, ProbeResult};
    use stn_net::{FetchError, PageFetcher};
    use stn_probes::Prober;

    const SITES: &str = r#"
        [[site]]
        name = "Alpha"
        domain = "alpha.example"

        [[site]]
        name = "Beta"
        domain = "beta.example"

        [[site]]
        name = "Gamma"
        domain = "gamma.example"
    "#;

    /// Prober returning canned results; domains without one fail
    #[derive(Default)]
    struct MockProber {
        results: HashMap<String, ProbeResult>,
        calls: Mutex<Vec<String>>,
    }

    impl MockProber {
        fn with(mut self, domain: &str, result: ProbeResult) -> Self {
            self.results.insert(domain.to_string(), result);
            self
        }
    }

    #[async_trait]
    impl Prober for MockProber {
        async fn probe(&self, domain: &str) -> Result<ProbeResult, ProbeError> {
            self.calls.lock().push(domain.to_string());
            self.results
                .get(domain)
                .cloned()
                .ok_or(ProbeError::Shape(0))
        }

        fn name(&self) -> &str {
            "mock"
        }
    }

    /// Prober that never finishes for one domain
    struct StallingProber {
        stall_on: &'static str,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Prober for StallingProber {
        async fn probe(&self, domain: &str) -> Result<ProbeResult, ProbeError> {
            self.calls.lock().push(domain.to_string());
            if domain == self.stall_on {
                std::future::pending::<()>().await;
            }
            Ok(plain_probe())
        }

        fn name(&self) -> &str {
            "stalling"
        }
    }

    struct NoPages;

    #[async_trait]
    impl PageFetcher for NoPages {
        async fn has_onion_location_meta(&self, _url: &str) -> Result<bool, FetchError> {
            Ok(false)
        }
    }

    fn secure_probe() -> ProbeResult {
        ProbeResult {
            live: true,
            valid_https: true,
            defaults_to_https: true,
            hsts: true,
            endpoints: [(
                "https".to_string(),
                Endpoint {
                    headers: [("Onion-Location".to_string(), "http://x.onion/".to_string())]
                        .into_iter()
                        .collect(),
                    url: Some("https://alpha.example".to_string()),
                },
            )]
            .into_iter()
            .collect(),
            stdout: "[{...}]".to_string(),
            ..Default::default()
        }
    }

    fn plain_probe() -> ProbeResult {
        ProbeResult {
            live: true,
            valid_https: true,
            ..Default::default()
        }
    }

    fn orchestrator(prober: Arc<MockProber>, store: Arc<MemoryStore>) -> Orchestrator {
        let registry = Arc::new(SiteRegistry::from_toml_str(SITES).unwrap());
        Orchestrator::new(
            registry,
            prober,
            OnionDetector::new(Arc::new(NoPages)),
            store,
        )
    }

    fn domains(list: &[&str]) -> Vec<String> {
        list.iter().map(|d| d.to_string()).collect()
    }

    #[tokio::test]
    async fn test_batch_commits_all_records() {
        let prober = Arc::new(
            MockProber::default()
                .with("alpha.example", secure_probe())
                .with("beta.example", plain_probe()),
        );
        let store = Arc::new(MemoryStore::new());

        let records = orchestrator(prober, store.clone())
            .run_batch(&domains(&["alpha.example", "beta.example"]))
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].domain(), "alpha.example");
        assert_eq!(records[0].score(), 78);
        assert_eq!(records[0].onion_available(), OnionAvailability::Available);
        assert_eq!(records[0].pshtt_stdout(), "[{...}]");
        assert_eq!(records[1].score(), 50);
        assert_eq!(records[1].onion_available(), OnionAvailability::Absent);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_probe_failure_commits_nothing() {
        let prober = Arc::new(MockProber::default().with("alpha.example", secure_probe()));
        let store = Arc::new(MemoryStore::new());

        let result = orchestrator(prober.clone(), store.clone())
            .run_batch(&domains(&["alpha.example", "beta.example"]))
            .await;

        match result {
            Err(ScanError::Probe { domain, .. }) => assert_eq!(domain, "beta.example"),
            other => panic!("expected probe error, got {:?}", other),
        }
        assert!(store.is_empty());
        assert!(store.latest("alpha.example").await.unwrap().is_none());
        assert_eq!(*prober.calls.lock(), vec!["alpha.example", "beta.example"]);
    }

    #[tokio::test]
    async fn test_unknown_domain_fails_before_probing() {
        let prober = Arc::new(MockProber::default().with("alpha.example", secure_probe()));
        let store = Arc::new(MemoryStore::new());

        let result = orchestrator(prober.clone(), store.clone())
            .run_batch(&domains(&["alpha.example", "nope.example"]))
            .await;

        assert!(matches!(result, Err(ScanError::UnknownDomain(d)) if d == "nope.example"));
        assert!(prober.calls.lock().is_empty());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_no_domains_scans_every_site() {
        let prober = Arc::new(
            MockProber::default()
                .with("alpha.example", plain_probe())
                .with("beta.example", plain_probe())
                .with("gamma.example", plain_probe()),
        );
        let store = Arc::new(MemoryStore::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let progress_seen = seen.clone();

        let records = orchestrator(prober, store.clone())
            .with_progress(Arc::new(move |site: &Site| {
                progress_seen.lock().push(site.domain.clone())
            }))
            .run_batch(&[])
            .await
            .unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(store.len(), 3);
        assert_eq!(
            *seen.lock(),
            vec!["alpha.example", "beta.example", "gamma.example"]
        );
    }

    #[tokio::test]
    async fn test_concurrent_batch_keeps_order() {
        let prober = Arc::new(
            MockProber::default()
                .with("alpha.example", plain_probe())
                .with("beta.example", secure_probe())
                .with("gamma.example", plain_probe()),
        );
        let store = Arc::new(MemoryStore::new());

        let records = orchestrator(prober, store.clone())
            .with_config(OrchestratorConfig { concurrency: 3 })
            .run_batch(&domains(&["gamma.example", "beta.example", "alpha.example"]))
            .await
            .unwrap();

        let order: Vec<_> = records.iter().map(|r| r.domain()).collect();
        assert_eq!(order, vec!["gamma.example", "beta.example", "alpha.example"]);
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_failure_commits_nothing() {
        let prober = Arc::new(
            MockProber::default()
                .with("alpha.example", plain_probe())
                .with("gamma.example", plain_probe()),
        );
        let store = Arc::new(MemoryStore::new());

        let result = orchestrator(prober, store.clone())
            .with_config(OrchestratorConfig { concurrency: 3 })
            .run_batch(&[])
            .await;

        assert!(matches!(result, Err(ScanError::Probe { .. })));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_dropped_batch_commits_nothing() {
        let prober = Arc::new(StallingProber {
            stall_on: "beta.example",
            calls: Mutex::new(Vec::new()),
        });
        let store = Arc::new(MemoryStore::new());
        let registry = Arc::new(SiteRegistry::from_toml_str(SITES).unwrap());
        let orchestrator = Orchestrator::new(
            registry,
            prober.clone(),
            OnionDetector::new(Arc::new(NoPages)),
            store.clone(),
        );

        let batch = domains(&["alpha.example", "beta.example"]);
        let result = tokio::time::timeout(
            std::time::Duration::from_millis(200),
            orchestrator.run_batch(&batch),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(*prober.calls.lock(), vec!["alpha.example", "beta.example"]);
        assert!(store.is_empty());
        assert!(store.latest("alpha.example").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_scan_site_does_not_persist() {
        let prober = Arc::new(MockProber::default().with("alpha.example", plain_probe()));
        let store = Arc::new(MemoryStore::new());
        let orchestrator = orchestrator(prober, store.clone());

        let site = orchestrator.resolve(&domains(&["alpha.example"])).unwrap().remove(0);
        let record = orchestrator.scan_site(&site).await.unwrap();
        assert_eq!(record.score(), 50);
        assert!(store.is_empty());
    }
}
