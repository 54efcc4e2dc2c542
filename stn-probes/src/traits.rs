//! Common traits for transport probers

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use stn_core::ProbeResult;

/// Errors from running the external probing tool
///
/// Every variant is fatal for the scan batch that triggered it.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Probe of {domain} timed out after {secs} seconds")]
    TimedOut { domain: String, secs: u64 },

    #[error("Probe of {domain} exited abnormally ({status}): {stderr}")]
    Exit {
        domain: String,
        status: String,
        stderr: String,
    },

    #[error("{program} is installed but unusable ({status}): {stderr}")]
    Unusable {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("Unparseable probe output: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Expected a JSON array with exactly one object, got {0} elements")]
    Shape(usize),
}

/// Inspects a domain's transport security
#[async_trait]
pub trait Prober: Send + Sync {
    /// Probe a bare domain; raw tool output is carried in the result
    async fn probe(&self, domain: &str) -> Result<ProbeResult, ProbeError>;

    /// Name of the tool, for logs
    fn name(&self) -> &str;
}

/// Shared prober handle
pub type SharedProber = Arc<dyn Prober>;
