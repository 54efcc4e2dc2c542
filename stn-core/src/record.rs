//! Scan records
//!
//! A [`ScanRecord`] is the persisted outcome of scanning one domain once.
//! Records are append-only; the score is always derived at construction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{score, Grade, OnionAvailability, ProbeResult};

/// One scan outcome for a domain
///
/// Fields are read through accessors so the stored score always matches the
/// probe data it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRecord {
    id: Uuid,
    domain: String,
    timestamp: DateTime<Utc>,

    live: bool,
    valid_https: bool,
    downgrades_https: bool,
    defaults_to_https: bool,
    hsts: bool,
    hsts_max_age: Option<i64>,
    hsts_entire_domain: bool,
    hsts_preload_ready: bool,
    hsts_preloaded: bool,
    onion_available: OnionAvailability,

    score: u8,

    pshtt_stdout: String,
    pshtt_stderr: String,
}

impl ScanRecord {
    /// Build a record stamped with the current time
    pub fn new(domain: &str, probe: ProbeResult, onion: OnionAvailability) -> Self {
        Self::new_at(domain, probe, onion, Utc::now())
    }

    /// Build a record with an explicit timestamp
    pub fn new_at(
        domain: &str,
        probe: ProbeResult,
        onion: OnionAvailability,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let score = score(&probe, onion);

        Self {
            id: Uuid::new_v4(),
            domain: domain.to_string(),
            timestamp,
            live: probe.live,
            valid_https: probe.valid_https,
            downgrades_https: probe.downgrades_https,
            defaults_to_https: probe.defaults_to_https,
            hsts: probe.hsts,
            hsts_max_age: probe.hsts_max_age,
            hsts_entire_domain: probe.hsts_entire_domain,
            hsts_preload_ready: probe.hsts_preload_ready,
            hsts_preloaded: probe.hsts_preloaded,
            onion_available: onion,
            score,
            pshtt_stdout: probe.stdout,
            pshtt_stderr: probe.stderr,
        }
    }

    /// Unique record id
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Domain of the scanned site
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Creation time
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn live(&self) -> bool {
        self.live
    }

    pub fn valid_https(&self) -> bool {
        self.valid_https
    }

    pub fn downgrades_https(&self) -> bool {
        self.downgrades_https
    }

    pub fn defaults_to_https(&self) -> bool {
        self.defaults_to_https
    }

    pub fn hsts(&self) -> bool {
        self.hsts
    }

    pub fn hsts_max_age(&self) -> Option<i64> {
        self.hsts_max_age
    }

    pub fn hsts_entire_domain(&self) -> bool {
        self.hsts_entire_domain
    }

    pub fn hsts_preload_ready(&self) -> bool {
        self.hsts_preload_ready
    }

    pub fn hsts_preloaded(&self) -> bool {
        self.hsts_preloaded
    }

    pub fn onion_available(&self) -> OnionAvailability {
        self.onion_available
    }

    /// Raw pshtt output kept for debugging
    pub fn pshtt_stdout(&self) -> &str {
        &self.pshtt_stdout
    }

    pub fn pshtt_stderr(&self) -> &str {
        &self.pshtt_stderr
    }

    /// Score in `0..=100`
    pub fn score(&self) -> u8 {
        self.score
    }

    pub fn grade(&self) -> Grade {
        Grade::from_score(self.score)
    }
}

impl fmt::Display for ScanRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from {}", self.domain, self.timestamp.format("%Y-%m-%d %H:%M"))
    }
}

/// Fields of a record exposed alongside its site (leaderboard row)
#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    pub live: bool,
    pub onion_available: OnionAvailability,
    pub valid_https: bool,
    pub downgrades_https: bool,
    pub defaults_to_https: bool,
    pub hsts: bool,
    pub hsts_max_age: Option<i64>,
    pub hsts_entire_domain: bool,
    pub hsts_preload_ready: bool,
    pub hsts_preloaded: bool,
    pub score: u8,
    pub grade: Grade,
}

impl From<&ScanRecord> for ScanSummary {
    fn from(record: &ScanRecord) -> Self {
        Self {
            live: record.live,
            onion_available: record.onion_available,
            valid_https: record.valid_https,
            downgrades_https: record.downgrades_https,
            defaults_to_https: record.defaults_to_https,
            hsts: record.hsts,
            hsts_max_age: record.hsts_max_age,
            hsts_entire_domain: record.hsts_entire_domain,
            hsts_preload_ready: record.hsts_preload_ready,
            hsts_preloaded: record.hsts_preloaded,
            score: record.score,
            grade: record.grade(),
        }
    }
}
