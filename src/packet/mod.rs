//! Document and packet transcoding
//!
//! Lowers DID documents into TXT record families and rebuilds them.

pub mod decode;
pub mod encode;
pub mod records;
pub mod registry;

pub use decode::from_packet;
pub use encode::{to_packet, RECORD_TTL};
pub use records::RootRecord;
pub use registry::{KeyType, RegisteredType};
