//! DNS wire format module
//!
//! This module implements the subset of the DNS message format the record
//! family is stored in: answer-only packets of TXT records, with name
//! compression.

pub mod name;
pub mod packet;

pub use packet::{DnsPacket, ResourceRecord, CLASS_IN, FLAGS_AUTHORITATIVE_RESPONSE, TYPE_TXT};
