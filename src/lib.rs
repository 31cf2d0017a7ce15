//! did-dht
//!
//! A did:dht method engine: canonical bencode, BEP44 signed mutable
//! records, DID document to DNS packet transcoding, and an HTTP relay
//! client for publishing and resolving identities.

pub mod bencode;
pub mod bep44;
pub mod dns;
pub mod packet;
pub mod did;
pub mod keys;
pub mod dht;
pub mod cli;
pub mod error;

pub use error::DhtError;

pub use bencode::{decode, encode, BencodeValue};
pub use bep44::{Bep44Message, MAX_V_SIZE};
pub use dns::{DnsPacket, ResourceRecord};
pub use packet::{from_packet, to_packet, KeyType, RegisteredType, RECORD_TTL};
pub use did::{
    Did, DidDocument, DidDocumentBuilder, DidDocumentMetadata, DidResolutionMetadata,
    DidResolutionResult, ResolutionError, Service, VerificationMethod,
};
pub use keys::{InMemoryKeyManager, KeyAlgorithm, KeyManager, ManagedPublicKey};
pub use dht::{DhtClient, DEFAULT_GATEWAY};
pub use cli::{CliArgs, Command, Config};
