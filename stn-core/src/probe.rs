//! Transport probe results
//!
//! Typed view of the single JSON object `pshtt --json` emits for a domain.
//! Primary fields are required keys; `null` values are tolerated because
//! pshtt cannot always determine them (e.g. when a site is down).

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Endpoint keys consulted for onion availability, in evaluation order
pub const ONION_ENDPOINTS: [&str; 2] = ["https", "httpswww"];

/// A single endpoint observed by the prober
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Response headers as reported by the prober
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Endpoint URL
    #[serde(default)]
    pub url: Option<String>,
}

impl Endpoint {
    /// Check for a header by name, ignoring ASCII case
    pub fn has_header(&self, name: &str) -> bool {
        self.headers.keys().any(|k| k.eq_ignore_ascii_case(name))
    }
}

/// Parsed prober output for one domain
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbeResult {
    #[serde(rename = "Live", deserialize_with = "null_as_false")]
    pub live: bool,

    #[serde(rename = "Valid HTTPS", deserialize_with = "null_as_false")]
    pub valid_https: bool,

    #[serde(rename = "Downgrades HTTPS", deserialize_with = "null_as_false")]
    pub downgrades_https: bool,

    #[serde(rename = "Defaults to HTTPS", deserialize_with = "null_as_false")]
    pub defaults_to_https: bool,

    #[serde(rename = "HSTS", deserialize_with = "null_as_false")]
    pub hsts: bool,

    /// HSTS max-age in seconds
    #[serde(rename = "HSTS Max Age", deserialize_with = "required_nullable")]
    pub hsts_max_age: Option<i64>,

    #[serde(rename = "HSTS Entire Domain", deserialize_with = "null_as_false")]
    pub hsts_entire_domain: bool,

    #[serde(rename = "HSTS Preload Ready", deserialize_with = "null_as_false")]
    pub hsts_preload_ready: bool,

    #[serde(rename = "HSTS Preloaded", deserialize_with = "null_as_false")]
    pub hsts_preloaded: bool,

    /// Endpoints keyed by pshtt name (`https`, `httpswww`, `http`, `httpwww`)
    #[serde(default)]
    pub endpoints: HashMap<String, Endpoint>,

    /// Raw prober stdout, kept for diagnostics
    #[serde(skip)]
    pub stdout: String,

    /// Raw prober stderr, kept for diagnostics
    #[serde(skip)]
    pub stderr: String,
}

impl ProbeResult {
    /// Look up an endpoint by its pshtt key
    pub fn endpoint(&self, key: &str) -> Option<&Endpoint> {
        self.endpoints.get(key)
    }
}

fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

// A `deserialize_with` on an Option field keeps the key mandatory.
fn required_nullable<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer)
}
