//! Secure the News network layer
//!
//! Provides the HTTP side of onion detection:
//! - Client construction with optional SOCKS5h (Tor) proxy
//! - Page fetches and onion-location meta-tag inspection

pub mod client;
pub mod page;

pub use client::*;
pub use page::*;
