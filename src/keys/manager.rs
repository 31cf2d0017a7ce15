//! Key manager abstraction and in-memory implementation
//!
//! The engine never touches private key bytes directly; it requests public
//! keys and signatures through the `KeyManager` trait.

use std::collections::HashMap;

use async_trait::async_trait;
use ed25519_dalek::Signer;
use rand::rngs::OsRng;
use tokio::sync::RwLock;
use tracing::{debug, trace};

use crate::error::DhtError;

/// Key algorithms the manager can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAlgorithm {
    Ed25519,
    Secp256k1,
}

/// Public key material handed back by a key manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedPublicKey {
    pub algorithm: KeyAlgorithm,
    /// Raw key bytes: 32 for Ed25519, 33 (compressed SEC1) for secp256k1
    pub bytes: Vec<u8>,
}

/// Abstract signing capability consumed by the engine
///
/// Aliases are stable handles chosen by the manager; this crate derives them
/// from the public key so the same key always maps to the same alias.
#[async_trait]
pub trait KeyManager: Send + Sync {
    /// Generate a fresh private key and return its alias
    async fn generate_private_key(&self, algorithm: KeyAlgorithm) -> Result<String, DhtError>;

    /// Look up the public key for a stored alias
    async fn get_public_key(&self, alias: &str) -> Result<ManagedPublicKey, DhtError>;

    /// Sign a payload with the key behind an alias
    async fn sign(&self, alias: &str, payload: &[u8]) -> Result<Vec<u8>, DhtError>;
}

enum PrivateKeyEntry {
    Ed25519(ed25519_dalek::SigningKey),
    Secp256k1(k256::ecdsa::SigningKey),
}

impl PrivateKeyEntry {
    fn public_key(&self) -> ManagedPublicKey {
        match self {
            PrivateKeyEntry::Ed25519(key) => ManagedPublicKey {
                algorithm: KeyAlgorithm::Ed25519,
                bytes: key.verifying_key().to_bytes().to_vec(),
            },
            PrivateKeyEntry::Secp256k1(key) => ManagedPublicKey {
                algorithm: KeyAlgorithm::Secp256k1,
                bytes: key.verifying_key().to_encoded_point(true).as_bytes().to_vec(),
            },
        }
    }
}

/// Key manager backed by a process-local map
///
/// Aliases are the lowercase hex of the public key bytes.
pub struct InMemoryKeyManager {
    keys: RwLock<HashMap<String, PrivateKeyEntry>>,
}

impl InMemoryKeyManager {
    pub fn new() -> Self {
        InMemoryKeyManager {
            keys: RwLock::new(HashMap::new()),
        }
    }

    /// Import an existing private key, returning its alias
    pub async fn import_private_key(
        &self,
        algorithm: KeyAlgorithm,
        bytes: &[u8],
    ) -> Result<String, DhtError> {
        let entry = match algorithm {
            KeyAlgorithm::Ed25519 => {
                let seed: [u8; 32] = bytes.try_into().map_err(|_| {
                    DhtError::key_error(format!(
                        "Ed25519 private keys are 32 bytes, got {}",
                        bytes.len()
                    ))
                })?;
                PrivateKeyEntry::Ed25519(ed25519_dalek::SigningKey::from_bytes(&seed))
            }
            KeyAlgorithm::Secp256k1 => {
                let key = k256::ecdsa::SigningKey::from_slice(bytes).map_err(|e| {
                    DhtError::key_error(format!("Invalid secp256k1 private key: {}", e))
                })?;
                PrivateKeyEntry::Secp256k1(key)
            }
        };

        let alias = hex::encode(&entry.public_key().bytes);
        debug!("Imported {:?} key with alias {}", algorithm, alias);
        self.keys.write().await.insert(alias.clone(), entry);
        Ok(alias)
    }
}

impl Default for InMemoryKeyManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KeyManager for InMemoryKeyManager {
    async fn generate_private_key(&self, algorithm: KeyAlgorithm) -> Result<String, DhtError> {
        let entry = match algorithm {
            KeyAlgorithm::Ed25519 => {
                PrivateKeyEntry::Ed25519(ed25519_dalek::SigningKey::generate(&mut OsRng))
            }
            KeyAlgorithm::Secp256k1 => {
                PrivateKeyEntry::Secp256k1(k256::ecdsa::SigningKey::random(&mut OsRng))
            }
        };

        let alias = hex::encode(&entry.public_key().bytes);
        debug!("Generated {:?} key with alias {}", algorithm, alias);
        self.keys.write().await.insert(alias.clone(), entry);
        Ok(alias)
    }

    async fn get_public_key(&self, alias: &str) -> Result<ManagedPublicKey, DhtError> {
        let keys = self.keys.read().await;
        let entry = keys
            .get(alias)
            .ok_or_else(|| DhtError::key_error(format!("Unknown key alias: {}", alias)))?;
        Ok(entry.public_key())
    }

    async fn sign(&self, alias: &str, payload: &[u8]) -> Result<Vec<u8>, DhtError> {
        let keys = self.keys.read().await;
        let entry = keys
            .get(alias)
            .ok_or_else(|| DhtError::key_error(format!("Unknown key alias: {}", alias)))?;

        trace!("Signing {} bytes with alias {}", payload.len(), alias);
        match entry {
            PrivateKeyEntry::Ed25519(key) => Ok(key.sign(payload).to_bytes().to_vec()),
            PrivateKeyEntry::Secp256k1(key) => {
                let signature: k256::ecdsa::Signature = key.sign(payload);
                Ok(signature.to_vec())
            }
        }
    }
}
