//! BEP44 signed mutable item module
//!
//! This module builds and verifies the signed envelope that makes a DHT
//! record tamper-evident and ownership-bound.

pub mod message;

pub use message::{Bep44Message, MAX_V_SIZE};
