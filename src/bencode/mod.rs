//! Bencode codec module
//!
//! This module provides canonical bencode encoding and decoding, the payload
//! envelope format used by the DHT.

pub mod codec;
pub mod value;

pub use codec::{decode, encode};
pub use value::BencodeValue;
