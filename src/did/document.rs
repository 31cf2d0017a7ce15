//! DID document model
//!
//! The document shape this method publishes and resolves, plus the builder
//! that validates a document before it goes anywhere near the wire.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::did::identifier::Did;
use crate::error::DhtError;
use crate::packet::registry::KeyType;

/// Verification method type used for multibase-encoded keys
pub const MULTIKEY_TYPE: &str = "Multikey";

/// A cryptographic key bound to a DID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationMethod {
    pub id: String,
    #[serde(rename = "type")]
    pub method_type: String,
    pub controller: String,
    pub public_key_multibase: String,
}

impl VerificationMethod {
    pub fn new(
        id: impl Into<String>,
        controller: impl Into<String>,
        key_type: KeyType,
        public_key: &[u8],
    ) -> Self {
        VerificationMethod {
            id: id.into(),
            method_type: MULTIKEY_TYPE.to_string(),
            controller: controller.into(),
            public_key_multibase: encode_multibase_key(key_type, public_key),
        }
    }

    /// Key type and raw bytes recovered from the multibase form
    pub fn public_key(&self) -> Result<(KeyType, Vec<u8>), DhtError> {
        decode_multibase_key(&self.public_key_multibase)
    }

    /// Fragment part of the id, if it has one
    pub fn fragment(&self) -> Option<&str> {
        self.id.rsplit_once('#').map(|(_, fragment)| fragment)
    }
}

/// A service endpoint advertised by a DID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    #[serde(rename = "type")]
    pub service_type: String,
    pub service_endpoint: Vec<String>,
}

impl Service {
    pub fn new(
        id: impl Into<String>,
        service_type: impl Into<String>,
        service_endpoint: Vec<String>,
    ) -> Self {
        Service {
            id: id.into(),
            service_type: service_type.into(),
            service_endpoint,
        }
    }

    pub fn fragment(&self) -> Option<&str> {
        self.id.rsplit_once('#').map(|(_, fragment)| fragment)
    }
}

/// A DID document
///
/// Relationship lists hold verification method ids, not copies of the
/// methods themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidDocument {
    pub id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub controller: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub also_known_as: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub verification_method: Vec<VerificationMethod>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authentication: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assertion_method: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_agreement: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capability_invocation: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capability_delegation: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub service: Vec<Service>,
}

impl DidDocument {
    /// The starter document every fresh identity publishes
    ///
    /// Verification method `#0` carries the identity key itself and is
    /// referenced by every relationship except key agreement, which an
    /// Ed25519 signing key cannot serve.
    pub fn for_identity_key(did: &Did) -> DidDocument {
        let vm_id = format!("{}#0", did.uri());
        let method = VerificationMethod::new(
            vm_id.clone(),
            did.uri(),
            KeyType::Ed25519,
            did.public_key(),
        );

        debug!("Built starter document for {}", did);
        DidDocument {
            id: did.uri(),
            controller: Vec::new(),
            also_known_as: Vec::new(),
            verification_method: vec![method],
            authentication: vec![vm_id.clone()],
            assertion_method: vec![vm_id.clone()],
            key_agreement: Vec::new(),
            capability_invocation: vec![vm_id.clone()],
            capability_delegation: vec![vm_id],
            service: Vec::new(),
        }
    }
}

/// Multibase-encode key bytes behind their multicodec prefix
pub fn encode_multibase_key(key_type: KeyType, public_key: &[u8]) -> String {
    let mut prefixed = Vec::with_capacity(2 + public_key.len());
    prefixed.extend_from_slice(&key_type.multicodec_prefix());
    prefixed.extend_from_slice(public_key);
    format!("z{}", bs58::encode(prefixed).into_string())
}

/// Recover the key type and raw bytes from a multibase string
pub fn decode_multibase_key(multibase: &str) -> Result<(KeyType, Vec<u8>), DhtError> {
    let encoded = multibase.strip_prefix('z').ok_or_else(|| {
        DhtError::key_error(format!("Unsupported multibase prefix in '{}'", multibase))
    })?;

    let decoded = bs58::decode(encoded).into_vec()?;
    if decoded.len() < 2 {
        return Err(DhtError::key_error("Multibase key shorter than a multicodec prefix"));
    }

    let key_type = KeyType::from_multicodec_prefix([decoded[0], decoded[1]])?;
    Ok((key_type, decoded[2..].to_vec()))
}

/// Accumulates document fields, then validates them all in one pass
///
/// `build` reports every violation it finds rather than stopping at the
/// first, so a caller can fix a whole document in one round.
#[derive(Debug, Default)]
pub struct DidDocumentBuilder {
    id: Option<String>,
    controller: Vec<String>,
    also_known_as: Vec<String>,
    verification_method: Vec<VerificationMethod>,
    authentication: Vec<String>,
    assertion_method: Vec<String>,
    key_agreement: Vec<String>,
    capability_invocation: Vec<String>,
    capability_delegation: Vec<String>,
    service: Vec<Service>,
}

impl DidDocumentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn controller(mut self, controller: impl Into<String>) -> Self {
        self.controller.push(controller.into());
        self
    }

    pub fn also_known_as(mut self, alias: impl Into<String>) -> Self {
        self.also_known_as.push(alias.into());
        self
    }

    pub fn verification_method(mut self, method: VerificationMethod) -> Self {
        self.verification_method.push(method);
        self
    }

    pub fn authentication(mut self, reference: impl Into<String>) -> Self {
        self.authentication.push(reference.into());
        self
    }

    pub fn assertion_method(mut self, reference: impl Into<String>) -> Self {
        self.assertion_method.push(reference.into());
        self
    }

    pub fn key_agreement(mut self, reference: impl Into<String>) -> Self {
        self.key_agreement.push(reference.into());
        self
    }

    pub fn capability_invocation(mut self, reference: impl Into<String>) -> Self {
        self.capability_invocation.push(reference.into());
        self
    }

    pub fn capability_delegation(mut self, reference: impl Into<String>) -> Self {
        self.capability_delegation.push(reference.into());
        self
    }

    pub fn service(mut self, service: Service) -> Self {
        self.service.push(service);
        self
    }

    /// Validate the accumulated fields and produce the document
    pub fn build(self) -> Result<DidDocument, DhtError> {
        let mut violations = Vec::new();

        let id = match &self.id {
            None => {
                violations.push("document id is required".to_string());
                String::new()
            }
            Some(id) => {
                if let Err(e) = Did::parse(id) {
                    violations.push(format!("document id is not a did:dht identifier: {}", e));
                }
                id.clone()
            }
        };

        if self.verification_method.is_empty() {
            violations.push("at least one verification method is required".to_string());
        }

        let mut seen_methods = HashSet::new();
        for method in &self.verification_method {
            if method.fragment().map_or(true, str::is_empty) {
                violations.push(format!("verification method id '{}' has no fragment", method.id));
            }
            if !seen_methods.insert(method.id.as_str()) {
                violations.push(format!("duplicate verification method id '{}'", method.id));
            }
        }

        let mut seen_services = HashSet::new();
        for service in &self.service {
            if service.fragment().map_or(true, str::is_empty) {
                violations.push(format!("service id '{}' has no fragment", service.id));
            }
            if !seen_services.insert(service.id.as_str()) {
                violations.push(format!("duplicate service id '{}'", service.id));
            }
            if service.service_endpoint.is_empty() {
                violations.push(format!("service '{}' has no endpoints", service.id));
            }
        }

        let known: HashSet<&str> = self
            .verification_method
            .iter()
            .map(|method| method.id.as_str())
            .collect();
        let relationships: [(&str, &Vec<String>); 5] = [
            ("authentication", &self.authentication),
            ("assertionMethod", &self.assertion_method),
            ("keyAgreement", &self.key_agreement),
            ("capabilityInvocation", &self.capability_invocation),
            ("capabilityDelegation", &self.capability_delegation),
        ];
        for (name, references) in relationships {
            for reference in references {
                if !known.contains(reference.as_str()) {
                    violations.push(format!(
                        "{} references unknown verification method '{}'",
                        name, reference
                    ));
                }
            }
        }

        if !violations.is_empty() {
            return Err(DhtError::document_error_with_violations(
                "Document validation failed",
                violations,
            ));
        }

        Ok(DidDocument {
            id,
            controller: self.controller,
            also_known_as: self.also_known_as,
            verification_method: self.verification_method,
            authentication: self.authentication,
            assertion_method: self.assertion_method,
            key_agreement: self.key_agreement,
            capability_invocation: self.capability_invocation,
            capability_delegation: self.capability_delegation,
            service: self.service,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_did() -> Did {
        Did::from_public_key([7u8; 32])
    }

    #[test]
    fn test_starter_document() {
        let did = sample_did();
        let document = DidDocument::for_identity_key(&did);

        assert_eq!(document.id, did.uri());
        assert_eq!(document.verification_method.len(), 1);

        let method = &document.verification_method[0];
        assert_eq!(method.id, format!("{}#0", did.uri()));
        assert_eq!(method.controller, did.uri());

        let (key_type, bytes) = method.public_key().unwrap();
        assert_eq!(key_type, KeyType::Ed25519);
        assert_eq!(bytes, did.public_key().to_vec());

        for list in [
            &document.authentication,
            &document.assertion_method,
            &document.capability_invocation,
            &document.capability_delegation,
        ] {
            assert_eq!(list, &vec![method.id.clone()]);
        }
        assert!(document.key_agreement.is_empty());
    }

    #[test]
    fn test_multibase_round_trip() {
        for (key_type, len) in [
            (KeyType::Ed25519, 32),
            (KeyType::Secp256k1, 33),
            (KeyType::P256, 33),
        ] {
            let bytes = vec![0xAB; len];
            let encoded = encode_multibase_key(key_type, &bytes);
            assert!(encoded.starts_with('z'));

            let (decoded_type, decoded_bytes) = decode_multibase_key(&encoded).unwrap();
            assert_eq!(decoded_type, key_type);
            assert_eq!(decoded_bytes, bytes);
        }
    }

    #[test]
    fn test_multibase_rejects_other_bases() {
        assert!(decode_multibase_key("mAQI").is_err());
        assert!(decode_multibase_key("z").is_err());
    }

    #[test]
    fn test_builder_valid_document() {
        let did = sample_did();
        let vm_id = format!("{}#key-1", did.uri());
        let document = DidDocumentBuilder::new()
            .id(did.uri())
            .verification_method(VerificationMethod::new(
                vm_id.clone(),
                did.uri(),
                KeyType::Ed25519,
                did.public_key(),
            ))
            .authentication(vm_id.clone())
            .service(Service::new(
                format!("{}#files", did.uri()),
                "FileServer",
                vec!["https://files.example.com".to_string()],
            ))
            .build()
            .unwrap();

        assert_eq!(document.authentication, vec![vm_id]);
        assert_eq!(document.service.len(), 1);
    }

    #[test]
    fn test_builder_reports_every_violation() {
        let did = sample_did();
        let fragmentless = VerificationMethod::new(
            "no-fragment",
            did.uri(),
            KeyType::Ed25519,
            did.public_key(),
        );

        let err = DidDocumentBuilder::new()
            .verification_method(fragmentless.clone())
            .verification_method(fragmentless)
            .authentication("did:dht:unknown#missing")
            .build()
            .unwrap_err();

        match err {
            DhtError::DocumentError { violations, .. } => {
                let joined = violations.join("\n");
                assert!(joined.contains("document id is required"));
                assert!(joined.contains("has no fragment"));
                assert!(joined.contains("duplicate verification method id"));
                assert!(joined.contains("references unknown verification method"));
                assert!(violations.len() >= 4);
            }
            other => panic!("expected a document error, got {:?}", other),
        }
    }

    #[test]
    fn test_document_json_shape() {
        let did = sample_did();
        let document = DidDocument::for_identity_key(&did);
        let json = serde_json::to_value(&document).unwrap();

        assert!(json.get("verificationMethod").is_some());
        assert!(json.get("authentication").is_some());
        // empty lists stay out of the serialized form
        assert!(json.get("keyAgreement").is_none());
        assert!(json.get("service").is_none());

        let method = &json["verificationMethod"][0];
        assert!(method.get("publicKeyMultibase").is_some());
        assert_eq!(method["type"], "Multikey");

        let back: DidDocument = serde_json::from_value(json).unwrap();
        assert_eq!(back, document);
    }
}
