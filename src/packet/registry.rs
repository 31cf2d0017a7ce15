//! Wire registries
//!
//! Closed mappings between small wire indices and the key types and
//! discovery types a record family can carry. Unknown indices are decode
//! errors, never silently dropped.

use serde::{Deserialize, Serialize};

use crate::error::DhtError;

/// Verification method key types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    Ed25519,
    Secp256k1,
    P256,
}

impl KeyType {
    /// Wire index stored in `_k` records
    pub fn index(&self) -> u8 {
        match self {
            KeyType::Ed25519 => 0,
            KeyType::Secp256k1 => 1,
            KeyType::P256 => 2,
        }
    }

    pub fn from_index(index: u8) -> Result<KeyType, DhtError> {
        match index {
            0 => Ok(KeyType::Ed25519),
            1 => Ok(KeyType::Secp256k1),
            2 => Ok(KeyType::P256),
            other => Err(DhtError::decode_error(format!("Unknown key type index: {}", other))),
        }
    }

    /// Multicodec prefix used in `publicKeyMultibase`
    pub fn multicodec_prefix(&self) -> [u8; 2] {
        match self {
            KeyType::Ed25519 => [0xED, 0x01],
            KeyType::Secp256k1 => [0xE7, 0x01],
            KeyType::P256 => [0x80, 0x24],
        }
    }

    pub fn from_multicodec_prefix(prefix: [u8; 2]) -> Result<KeyType, DhtError> {
        match prefix {
            [0xED, 0x01] => Ok(KeyType::Ed25519),
            [0xE7, 0x01] => Ok(KeyType::Secp256k1),
            [0x80, 0x24] => Ok(KeyType::P256),
            other => Err(DhtError::key_error(format!(
                "Unknown multicodec prefix: {:02x}{:02x}",
                other[0], other[1]
            ))),
        }
    }
}

/// Registered discovery types
///
/// Attached to a published record purely for indexing; not part of the
/// document itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegisteredType {
    Organization,
    GovernmentOrganization,
    Corporation,
    LocalBusiness,
    SoftwarePackage,
    WebApp,
    FinancialInstitution,
}

impl RegisteredType {
    /// Wire index stored in the `_typ` record
    pub fn index(&self) -> u8 {
        match self {
            RegisteredType::Organization => 1,
            RegisteredType::GovernmentOrganization => 2,
            RegisteredType::Corporation => 3,
            RegisteredType::LocalBusiness => 4,
            RegisteredType::SoftwarePackage => 5,
            RegisteredType::WebApp => 6,
            RegisteredType::FinancialInstitution => 7,
        }
    }

    pub fn from_index(index: u8) -> Result<RegisteredType, DhtError> {
        match index {
            1 => Ok(RegisteredType::Organization),
            2 => Ok(RegisteredType::GovernmentOrganization),
            3 => Ok(RegisteredType::Corporation),
            4 => Ok(RegisteredType::LocalBusiness),
            5 => Ok(RegisteredType::SoftwarePackage),
            6 => Ok(RegisteredType::WebApp),
            7 => Ok(RegisteredType::FinancialInstitution),
            other => Err(DhtError::decode_error(format!(
                "Unknown registered type index: {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_type_indices_round_trip() {
        for key_type in [KeyType::Ed25519, KeyType::Secp256k1, KeyType::P256] {
            assert_eq!(KeyType::from_index(key_type.index()).unwrap(), key_type);
        }
    }

    #[test]
    fn test_key_type_prefixes_round_trip() {
        for key_type in [KeyType::Ed25519, KeyType::Secp256k1, KeyType::P256] {
            assert_eq!(
                KeyType::from_multicodec_prefix(key_type.multicodec_prefix()).unwrap(),
                key_type
            );
        }
    }

    #[test]
    fn test_unknown_key_type_index() {
        assert!(KeyType::from_index(3).is_err());
    }

    #[test]
    fn test_registered_type_indices_round_trip() {
        let all = [
            RegisteredType::Organization,
            RegisteredType::GovernmentOrganization,
            RegisteredType::Corporation,
            RegisteredType::LocalBusiness,
            RegisteredType::SoftwarePackage,
            RegisteredType::WebApp,
            RegisteredType::FinancialInstitution,
        ];
        for registered in all {
            assert_eq!(RegisteredType::from_index(registered.index()).unwrap(), registered);
        }
    }

    #[test]
    fn test_unknown_registered_type_index() {
        assert!(RegisteredType::from_index(0).is_err());
        assert!(RegisteredType::from_index(8).is_err());
    }

    #[test]
    fn test_registered_type_serializes_as_name() {
        let json = serde_json::to_string(&RegisteredType::SoftwarePackage).unwrap();
        assert_eq!(json, "\"SoftwarePackage\"");
    }
}
