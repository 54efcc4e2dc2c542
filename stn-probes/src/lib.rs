//! Secure the News probes
//!
//! The two stages that touch the network for each domain:
//! - **Prober**: runs pshtt and parses its result
//! - **Onion detector**: decides onion-service availability from the
//!   probe's headers, falling back to a meta-tag fetch

pub mod traits;
pub mod pshtt;
pub mod onion;

pub use traits::*;
pub use pshtt::*;
pub use onion::*;
