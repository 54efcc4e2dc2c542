//! Secure the News core - domain model and scoring for HTTPS posture scans
//!
//! This crate provides the pieces with no I/O of their own:
//! - Typed prober output (`ProbeResult`, `Endpoint`)
//! - Onion-service availability tri-state
//! - The scoring engine and letter grades
//! - Append-only scan records
//! - The registry of known sites

pub mod probe;
pub mod onion;
pub mod scoring;
pub mod record;
pub mod site;

pub use probe::*;
pub use onion::*;
pub use scoring::*;
pub use record::*;
pub use site::*;

/// Timeout, in seconds, handed to the prober and used for onion page fetches
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;
