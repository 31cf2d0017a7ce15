//! Error types for the did:dht engine
//!
//! This module defines comprehensive error types for all components
//! of the did:dht method engine.

use std::fmt;

/// Comprehensive error type for did:dht operations
#[derive(Debug, Clone)]
pub enum DhtError {
    /// Malformed bencode or wire data
    DecodeError {
        message: String,
        source: Option<String>,
    },

    /// Signature creation or verification failures
    SignatureError {
        message: String,
    },

    /// Key material misuse (wrong algorithm, bad key bytes)
    KeyError {
        message: String,
    },

    /// Structural DNS packet errors during transcoding
    PacketError {
        message: String,
        record: Option<String>,
    },

    /// Payload exceeds a hard protocol limit
    SizeLimitError {
        message: String,
        size: usize,
        limit: usize,
    },

    /// Malformed did:dht identifier
    IdentifierError {
        message: String,
        did: Option<String>,
    },

    /// DID document validation failures
    DocumentError {
        message: String,
        violations: Vec<String>,
    },

    /// Gateway transport errors
    TransportError {
        message: String,
        status: Option<u16>,
        source: Option<String>,
    },

    /// Configuration errors
    ConfigError {
        message: String,
        field: Option<String>,
    },
}

impl DhtError {
    /// Create a new DecodeError
    pub fn decode_error(message: impl Into<String>) -> Self {
        DhtError::DecodeError {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new DecodeError with source
    pub fn decode_error_with_source(message: impl Into<String>, source: impl Into<String>) -> Self {
        DhtError::DecodeError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a new SignatureError
    pub fn signature_error(message: impl Into<String>) -> Self {
        DhtError::SignatureError {
            message: message.into(),
        }
    }

    /// Create a new KeyError
    pub fn key_error(message: impl Into<String>) -> Self {
        DhtError::KeyError {
            message: message.into(),
        }
    }

    /// Create a new PacketError
    pub fn packet_error(message: impl Into<String>) -> Self {
        DhtError::PacketError {
            message: message.into(),
            record: None,
        }
    }

    /// Create a new PacketError naming the offending record
    pub fn packet_error_with_record(message: impl Into<String>, record: impl Into<String>) -> Self {
        DhtError::PacketError {
            message: message.into(),
            record: Some(record.into()),
        }
    }

    /// Create a new SizeLimitError
    pub fn size_limit_error(message: impl Into<String>, size: usize, limit: usize) -> Self {
        DhtError::SizeLimitError {
            message: message.into(),
            size,
            limit,
        }
    }

    /// Create a new IdentifierError
    pub fn identifier_error(message: impl Into<String>) -> Self {
        DhtError::IdentifierError {
            message: message.into(),
            did: None,
        }
    }

    /// Create a new IdentifierError naming the identifier
    pub fn identifier_error_with_did(message: impl Into<String>, did: impl Into<String>) -> Self {
        DhtError::IdentifierError {
            message: message.into(),
            did: Some(did.into()),
        }
    }

    /// Create a new DocumentError
    pub fn document_error(message: impl Into<String>) -> Self {
        DhtError::DocumentError {
            message: message.into(),
            violations: Vec::new(),
        }
    }

    /// Create a new DocumentError carrying every violation found
    pub fn document_error_with_violations(
        message: impl Into<String>,
        violations: Vec<String>,
    ) -> Self {
        DhtError::DocumentError {
            message: message.into(),
            violations,
        }
    }

    /// Create a new TransportError
    pub fn transport_error(message: impl Into<String>) -> Self {
        DhtError::TransportError {
            message: message.into(),
            status: None,
            source: None,
        }
    }

    /// Create a new TransportError with HTTP status
    pub fn transport_error_with_status(message: impl Into<String>, status: u16) -> Self {
        DhtError::TransportError {
            message: message.into(),
            status: Some(status),
            source: None,
        }
    }

    /// Create a new TransportError with source
    pub fn transport_error_with_source(
        message: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        DhtError::TransportError {
            message: message.into(),
            status: None,
            source: Some(source.into()),
        }
    }

    /// Create a new TransportError with status and source
    pub fn transport_error_full(
        message: impl Into<String>,
        status: u16,
        source: impl Into<String>,
    ) -> Self {
        DhtError::TransportError {
            message: message.into(),
            status: Some(status),
            source: Some(source.into()),
        }
    }

    /// Create a new ConfigError
    pub fn config_error(message: impl Into<String>) -> Self {
        DhtError::ConfigError {
            message: message.into(),
            field: None,
        }
    }

    /// Create a new ConfigError with field
    pub fn config_error_with_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        DhtError::ConfigError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Add context to the error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        let ctx = context.into();
        match &mut self {
            DhtError::DecodeError { source, .. } => {
                *source = Some(source.as_ref().map_or_else(|| ctx.clone(), |s| format!("{}: {}", s, ctx)));
            }
            DhtError::TransportError { source, .. } => {
                *source = Some(source.as_ref().map_or_else(|| ctx.clone(), |s| format!("{}: {}", s, ctx)));
            }
            DhtError::PacketError { record, .. } => {
                *record = Some(record.as_ref().map_or_else(|| ctx.clone(), |r| format!("{}: {}", r, ctx)));
            }
            _ => {}
        }
        self
    }
}

impl fmt::Display for DhtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DhtError::DecodeError { message, source } => {
                if let Some(src) = source {
                    write!(f, "Decode error: {} (source: {})", message, src)
                } else {
                    write!(f, "Decode error: {}", message)
                }
            }
            DhtError::SignatureError { message } => {
                write!(f, "Signature error: {}", message)
            }
            DhtError::KeyError { message } => {
                write!(f, "Key error: {}", message)
            }
            DhtError::PacketError { message, record } => {
                if let Some(rec) = record {
                    write!(f, "Packet error: {} (record: {})", message, rec)
                } else {
                    write!(f, "Packet error: {}", message)
                }
            }
            DhtError::SizeLimitError { message, size, limit } => {
                write!(f, "Size limit error: {} ({} bytes, limit {})", message, size, limit)
            }
            DhtError::IdentifierError { message, did } => {
                if let Some(d) = did {
                    write!(f, "Identifier error: {} (did: {})", message, d)
                } else {
                    write!(f, "Identifier error: {}", message)
                }
            }
            DhtError::DocumentError { message, violations } => {
                if violations.is_empty() {
                    write!(f, "Document error: {}", message)
                } else {
                    write!(f, "Document error: {} ({})", message, violations.join("; "))
                }
            }
            DhtError::TransportError { message, status, source } => {
                match (status, source) {
                    (Some(st), Some(s)) => write!(f, "Transport error: {} (status: {}, source: {})", message, st, s),
                    (Some(st), None) => write!(f, "Transport error: {} (status: {})", message, st),
                    (None, Some(s)) => write!(f, "Transport error: {} (source: {})", message, s),
                    (None, None) => write!(f, "Transport error: {}", message),
                }
            }
            DhtError::ConfigError { message, field } => {
                if let Some(field_val) = field {
                    write!(f, "Config error: {} (field: {})", message, field_val)
                } else {
                    write!(f, "Config error: {}", message)
                }
            }
        }
    }
}

impl std::error::Error for DhtError {}

// Implement From traits for common error types

impl From<reqwest::Error> for DhtError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => {
                DhtError::transport_error_full("HTTP request failed", status.as_u16(), err.to_string())
            }
            None => DhtError::transport_error_with_source("HTTP request failed", err.to_string()),
        }
    }
}

impl From<ed25519_dalek::SignatureError> for DhtError {
    fn from(err: ed25519_dalek::SignatureError) -> Self {
        DhtError::signature_error(format!("Ed25519 rejected the input: {}", err))
    }
}

impl From<base64::DecodeError> for DhtError {
    fn from(err: base64::DecodeError) -> Self {
        DhtError::decode_error_with_source("Invalid base64url data", err.to_string())
    }
}

impl From<bs58::decode::Error> for DhtError {
    fn from(err: bs58::decode::Error) -> Self {
        DhtError::key_error(format!("Invalid base58 key encoding: {}", err))
    }
}
