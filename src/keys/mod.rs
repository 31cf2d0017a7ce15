//! Key management module
//!
//! This module defines the signing abstraction the engine consumes and an
//! in-memory implementation suitable for tests and short-lived tools.

pub mod manager;

pub use manager::{InMemoryKeyManager, KeyAlgorithm, KeyManager, ManagedPublicKey};
