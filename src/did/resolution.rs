//! Resolution result envelope
//!
//! Every resolution produces one of these, success or failure. Failures
//! carry a machine-readable code instead of an error value so callers that
//! dispatch over many DID methods can treat them uniformly.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::did::document::DidDocument;
use crate::packet::registry::RegisteredType;

/// Machine-readable reasons a resolution can fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResolutionError {
    InvalidDid,
    MethodNotSupported,
    NotFound,
    InvalidSignature,
    InvalidDidDocument,
    InternalError,
}

impl ResolutionError {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionError::InvalidDid => "invalidDid",
            ResolutionError::MethodNotSupported => "methodNotSupported",
            ResolutionError::NotFound => "notFound",
            ResolutionError::InvalidSignature => "invalidSignature",
            ResolutionError::InvalidDidDocument => "invalidDidDocument",
            ResolutionError::InternalError => "internalError",
        }
    }
}

impl fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Metadata about the resolution attempt itself
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidResolutionMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ResolutionError>,
}

/// Metadata about the resolved document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidDocumentMetadata {
    /// Sequence number of the record the document came from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<RegisteredType>>,
}

/// The full outcome of a resolution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidResolutionResult {
    pub did_resolution_metadata: DidResolutionMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub did_document: Option<DidDocument>,
    pub did_document_metadata: DidDocumentMetadata,
}

impl DidResolutionResult {
    pub fn success(document: DidDocument, metadata: DidDocumentMetadata) -> Self {
        DidResolutionResult {
            did_resolution_metadata: DidResolutionMetadata::default(),
            did_document: Some(document),
            did_document_metadata: metadata,
        }
    }

    pub fn error(error: ResolutionError) -> Self {
        DidResolutionResult {
            did_resolution_metadata: DidResolutionMetadata { error: Some(error) },
            did_document: None,
            did_document_metadata: DidDocumentMetadata::default(),
        }
    }
}
