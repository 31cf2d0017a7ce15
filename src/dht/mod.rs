//! DHT relay transport
//!
//! HTTP client for publishing and resolving signed records through a
//! pkarr-style relay gateway.

pub mod client;

pub use client::{DhtClient, DEFAULT_GATEWAY};
