//! did:dht identifier
//!
//! The method-specific identifier is the z-base-32 encoding of the 32-byte
//! Ed25519 identity public key; the two forms convert losslessly.

use tracing::trace;

use crate::error::DhtError;

/// URI prefix shared by every identifier of this method
pub const METHOD_PREFIX: &str = "did:dht:";

/// A parsed did:dht identifier
///
/// Carries both representations of the identity key so neither direction
/// ever needs to re-derive the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Did {
    suffix: String,
    public_key: [u8; 32],
}

impl Did {
    /// Derive the identifier owned by an identity public key
    pub fn from_public_key(public_key: [u8; 32]) -> Self {
        let suffix = base32::encode(base32::Alphabet::Z, &public_key);
        trace!("Derived identifier suffix {} from public key", suffix);
        Did { suffix, public_key }
    }

    /// Parse and validate a full `did:dht:<id>` URI
    pub fn parse(did: &str) -> Result<Did, DhtError> {
        let suffix = did.strip_prefix(METHOD_PREFIX).ok_or_else(|| {
            DhtError::identifier_error_with_did("Expected a did:dht identifier", did)
        })?;
        Self::from_suffix(suffix)
    }

    /// Parse and validate the method-specific identifier alone
    pub fn from_suffix(suffix: &str) -> Result<Did, DhtError> {
        let decoded = base32::decode(base32::Alphabet::Z, suffix).ok_or_else(|| {
            DhtError::identifier_error_with_did("Identifier is not valid z-base-32", suffix)
        })?;

        if decoded.len() != 32 {
            return Err(DhtError::identifier_error_with_did(
                format!("Identifier must decode to 32 bytes, got {}", decoded.len()),
                suffix,
            ));
        }

        let mut public_key = [0u8; 32];
        public_key.copy_from_slice(&decoded);
        Ok(Did {
            suffix: suffix.to_string(),
            public_key,
        })
    }

    /// The full `did:dht:<id>` URI
    pub fn uri(&self) -> String {
        format!("{}{}", METHOD_PREFIX, self.suffix)
    }

    /// The z-base-32 method-specific identifier
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// The 32-byte identity public key
    pub fn public_key(&self) -> &[u8; 32] {
        &self.public_key
    }
}

impl std::fmt::Display for Did {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", METHOD_PREFIX, self.suffix)
    }
}
