//! DID module
//!
//! Identifier handling, the DID document model, and resolution outcomes.

pub mod document;
pub mod identifier;
pub mod resolution;

pub use document::{DidDocument, DidDocumentBuilder, Service, VerificationMethod};
pub use identifier::Did;
pub use resolution::{DidDocumentMetadata, DidResolutionMetadata, DidResolutionResult, ResolutionError};
