//! Secure the News runtime
//!
//! Ties the stages together:
//! - Scan orchestration with all-or-nothing batch commits
//! - Scan stores (in-memory and JSON file)
//! - Latest-grade leaderboard queries

pub mod store;
pub mod orchestrator;
pub mod leaderboard;

pub use store::*;
pub use orchestrator::*;
pub use leaderboard::*;
