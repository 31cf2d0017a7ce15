//! BEP44 mutable item envelope
//!
//! Construction, signing, and verification of `{k, seq, v, sig}` records,
//! plus the fixed-offset body layout used by HTTP relays.

use bytes::{BufMut, BytesMut};
use tracing::{debug, trace};

use crate::bencode::{encode, BencodeValue};
use crate::error::DhtError;
use crate::keys::{KeyAlgorithm, KeyManager};

/// Maximum size of the mutable item value
pub const MAX_V_SIZE: usize = 1000;

const SIG_LEN: usize = 64;
const SEQ_LEN: usize = 8;

/// A BEP44 signed mutable item
///
/// Immutable once constructed. `sig` covers the canonical partial bencode of
/// `seq` and `v`; `k` identifies the record owner and doubles as the DHT
/// storage key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bep44Message {
    k: [u8; 32],
    seq: u64,
    v: Vec<u8>,
    sig: [u8; 64],
}

impl Bep44Message {
    /// Sign a payload into a fresh envelope
    ///
    /// The key behind `identity_key_alias` must be Ed25519; any other
    /// algorithm is rejected before any encoding or signing work happens.
    pub async fn sign(
        key_manager: &dyn KeyManager,
        identity_key_alias: &str,
        seq: u64,
        v: Vec<u8>,
    ) -> Result<Bep44Message, DhtError> {
        let public = key_manager.get_public_key(identity_key_alias).await?;
        if public.algorithm != KeyAlgorithm::Ed25519 {
            return Err(DhtError::key_error(format!(
                "BEP44 records require an Ed25519 identity key, got {:?}",
                public.algorithm
            )));
        }

        let k: [u8; 32] = public.bytes.as_slice().try_into().map_err(|_| {
            DhtError::key_error(format!(
                "Ed25519 public keys are 32 bytes, got {}",
                public.bytes.len()
            ))
        })?;

        if v.len() > MAX_V_SIZE {
            return Err(DhtError::size_limit_error(
                "Record value exceeds the mutable item cap",
                v.len(),
                MAX_V_SIZE,
            ));
        }

        let to_sign = signable_bytes(seq, &v)?;
        let sig_bytes = key_manager.sign(identity_key_alias, &to_sign).await?;
        let sig: [u8; 64] = sig_bytes.as_slice().try_into().map_err(|_| {
            DhtError::signature_error(format!(
                "Ed25519 signatures are 64 bytes, got {}",
                sig_bytes.len()
            ))
        })?;

        debug!("Signed mutable item: seq {}, {} byte value", seq, v.len());
        Ok(Bep44Message { k, seq, v, sig })
    }

    /// Check the envelope signature against its own key
    pub fn verify(&self) -> Result<(), DhtError> {
        let to_sign = signable_bytes(self.seq, &self.v)?;

        let verifying = ed25519_dalek::VerifyingKey::from_bytes(&self.k).map_err(|e| {
            DhtError::signature_error(format!("Record key is not a valid Ed25519 point: {}", e))
        })?;
        let sig = ed25519_dalek::Signature::from_bytes(&self.sig);

        verifying
            .verify_strict(&to_sign, &sig)
            .map_err(|e| DhtError::signature_error(format!("Mutable item signature rejected: {}", e)))?;

        trace!("Verified mutable item with seq {}", self.seq);
        Ok(())
    }

    /// Serialize for a relay PUT body: `sig || seq (big-endian) || v`
    ///
    /// The key is not part of the body; relays take it from the request path.
    pub fn to_relay_body(&self) -> Vec<u8> {
        let mut body = BytesMut::with_capacity(SIG_LEN + SEQ_LEN + self.v.len());
        body.put_slice(&self.sig);
        body.put_u64(self.seq);
        body.put_slice(&self.v);
        body.to_vec()
    }

    /// Rebuild an envelope from a relay GET body and the key from the path
    pub fn from_relay_body(k: [u8; 32], body: &[u8]) -> Result<Bep44Message, DhtError> {
        if body.len() < SIG_LEN + SEQ_LEN {
            return Err(DhtError::decode_error(format!(
                "Relay body too short: {} bytes, need at least {}",
                body.len(),
                SIG_LEN + SEQ_LEN
            )));
        }

        let v = body[SIG_LEN + SEQ_LEN..].to_vec();
        if v.len() > MAX_V_SIZE {
            return Err(DhtError::size_limit_error(
                "Relay body value exceeds the mutable item cap",
                v.len(),
                MAX_V_SIZE,
            ));
        }

        let mut sig = [0u8; 64];
        sig.copy_from_slice(&body[..SIG_LEN]);
        let mut seq_bytes = [0u8; 8];
        seq_bytes.copy_from_slice(&body[SIG_LEN..SIG_LEN + SEQ_LEN]);

        Ok(Bep44Message {
            k,
            seq: u64::from_be_bytes(seq_bytes),
            v,
            sig,
        })
    }

    pub fn k(&self) -> &[u8; 32] {
        &self.k
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn v(&self) -> &[u8] {
        &self.v
    }

    pub fn sig(&self) -> &[u8; 64] {
        &self.sig
    }
}

/// Canonical bytes covered by the signature
///
/// The partial dictionary `{"seq": seq, "v": v}` without the enclosing
/// `d`/`e` markers. "seq" sorts before "v", so emitting the pairs in that
/// order is already canonical.
pub fn signable_bytes(seq: u64, v: &[u8]) -> Result<Vec<u8>, DhtError> {
    let seq_int = i64::try_from(seq).map_err(|_| {
        DhtError::decode_error(format!("Sequence number {} exceeds the bencode integer range", seq))
    })?;

    let mut out = Vec::new();
    out.extend_from_slice(&encode(&BencodeValue::from("seq")));
    out.extend_from_slice(&encode(&BencodeValue::Int(seq_int)));
    out.extend_from_slice(&encode(&BencodeValue::from("v")));
    out.extend_from_slice(&encode(&BencodeValue::Bytes(v.to_vec())));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::InMemoryKeyManager;

    const VECTOR_PRIVATE_KEY: &str =
        "3077903f62fbcff4bdbae9b5129b01b78ab87f68b8b3e3d332f14ca13ad53464";
    const VECTOR_SIG: &str = "c1dc657a17f54ca51933b17b7370b87faae10c7edd560fd4baad543869e30e81\
                              54c510f4d0b0d94d1e683891b06a07cecd9f0be325fe8f8a0466fe38011b2d0a";

    async fn vector_key(manager: &InMemoryKeyManager) -> String {
        let seed = hex::decode(VECTOR_PRIVATE_KEY).unwrap();
        manager
            .import_private_key(KeyAlgorithm::Ed25519, &seed)
            .await
            .unwrap()
    }

    #[test]
    fn test_signable_bytes_layout() {
        let bytes = signable_bytes(1, b"Hello World!").unwrap();
        assert_eq!(bytes, b"3:seqi1e1:v12:Hello World!");
    }

    #[tokio::test]
    async fn test_known_vector() {
        let manager = InMemoryKeyManager::new();
        let alias = vector_key(&manager).await;

        let message = Bep44Message::sign(&manager, &alias, 1, b"Hello World!".to_vec())
            .await
            .unwrap();

        assert_eq!(hex::encode(message.v()), "48656c6c6f20576f726c6421");
        assert_eq!(hex::encode(message.sig()), VECTOR_SIG);
        message.verify().unwrap();
    }

    #[tokio::test]
    async fn test_sign_verify_round_trip() {
        let manager = InMemoryKeyManager::new();
        let alias = manager
            .generate_private_key(KeyAlgorithm::Ed25519)
            .await
            .unwrap();

        let message = Bep44Message::sign(&manager, &alias, 42, b"payload".to_vec())
            .await
            .unwrap();
        message.verify().unwrap();
    }

    #[tokio::test]
    async fn test_signatures_are_deterministic() {
        let manager = InMemoryKeyManager::new();
        let alias = vector_key(&manager).await;

        let a = Bep44Message::sign(&manager, &alias, 7, b"same".to_vec())
            .await
            .unwrap();
        let b = Bep44Message::sign(&manager, &alias, 7, b"same".to_vec())
            .await
            .unwrap();
        assert_eq!(a.sig(), b.sig());
    }

    #[tokio::test]
    async fn test_tampering_breaks_verification() {
        let manager = InMemoryKeyManager::new();
        let alias = vector_key(&manager).await;
        let message = Bep44Message::sign(&manager, &alias, 3, b"original".to_vec())
            .await
            .unwrap();
        let body = message.to_relay_body();

        // sig, seq, and v each live at a fixed offset in the relay body
        for &offset in &[0usize, 64, 72] {
            let mut corrupted = body.clone();
            corrupted[offset] ^= 0x01;
            let rebuilt = Bep44Message::from_relay_body(*message.k(), &corrupted).unwrap();
            assert!(rebuilt.verify().is_err(), "corruption at {} went undetected", offset);
        }

        let mut bad_k = *message.k();
        bad_k[0] ^= 0x01;
        let rebuilt = Bep44Message::from_relay_body(bad_k, &body).unwrap();
        assert!(rebuilt.verify().is_err());
    }

    #[tokio::test]
    async fn test_rejects_non_ed25519_key() {
        let manager = InMemoryKeyManager::new();
        let alias = manager
            .generate_private_key(KeyAlgorithm::Secp256k1)
            .await
            .unwrap();

        let result = Bep44Message::sign(&manager, &alias, 1, b"data".to_vec()).await;
        assert!(matches!(result, Err(DhtError::KeyError { .. })));
    }

    #[tokio::test]
    async fn test_rejects_oversized_value() {
        let manager = InMemoryKeyManager::new();
        let alias = vector_key(&manager).await;

        let result = Bep44Message::sign(&manager, &alias, 1, vec![0u8; MAX_V_SIZE + 1]).await;
        assert!(matches!(result, Err(DhtError::SizeLimitError { .. })));
    }

    #[tokio::test]
    async fn test_relay_body_round_trip() {
        let manager = InMemoryKeyManager::new();
        let alias = vector_key(&manager).await;
        let message = Bep44Message::sign(&manager, &alias, 9, b"round trip".to_vec())
            .await
            .unwrap();

        let body = message.to_relay_body();
        assert_eq!(body.len(), 64 + 8 + 10);
        let rebuilt = Bep44Message::from_relay_body(*message.k(), &body).unwrap();
        assert_eq!(rebuilt, message);
    }

    #[test]
    fn test_relay_body_too_short() {
        let result = Bep44Message::from_relay_body([0u8; 32], &[0u8; 71]);
        assert!(matches!(result, Err(DhtError::DecodeError { .. })));
    }

    #[test]
    fn test_seq_beyond_integer_range() {
        let result = signable_bytes(u64::MAX, b"v");
        assert!(matches!(result, Err(DhtError::DecodeError { .. })));
    }
}
