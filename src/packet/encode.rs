//! Document to packet lowering
//!
//! Turns a DID document into its TXT record family, indexing verification
//! methods and services in document order.

use std::collections::HashMap;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use tracing::debug;

use crate::bep44::MAX_V_SIZE;
use crate::did::document::DidDocument;
use crate::did::identifier::Did;
use crate::dns::{DnsPacket, ResourceRecord};
use crate::error::DhtError;
use crate::packet::records::{RecordFields, RootRecord};
use crate::packet::registry::RegisteredType;

/// TTL stamped on every published record
pub const RECORD_TTL: u32 = 7200;

/// Lower a document, and optionally its registered types, into a DNS packet
///
/// Verification methods become `_k<i>` records and services `_s<i>`, both
/// zero-based in document order. The serialized packet must fit the record
/// value limit or the whole conversion fails. Record values are stored
/// unescaped, so ';' and ',' are reserved by the grammar; a document value
/// containing either is rejected rather than corrupted on the way back.
pub fn to_packet(
    document: &DidDocument,
    types: Option<&[RegisteredType]>,
) -> Result<DnsPacket, DhtError> {
    let did = Did::parse(&document.id)?;
    let origin = format!("_did.{}", did.suffix());

    let mut label_by_id: HashMap<&str, String> = HashMap::new();
    let mut method_labels = Vec::with_capacity(document.verification_method.len());
    let mut method_records = Vec::with_capacity(document.verification_method.len());
    for (index, method) in document.verification_method.iter().enumerate() {
        let label = format!("k{}", index);
        let name = format!("_{}.{}", label, origin);

        let fragment = scoped_fragment(&document.id, &method.id).ok_or_else(|| {
            DhtError::packet_error_with_record(
                format!(
                    "Verification method id '{}' is not scoped to the document",
                    method.id
                ),
                name.clone(),
            )
        })?;
        check_delimiters(fragment, &name)?;
        let (key_type, key_bytes) = method.public_key()?;

        let mut fields = RecordFields::new();
        fields.push("id", fragment);
        fields.push("t", key_type.index().to_string());
        fields.push("k", URL_SAFE_NO_PAD.encode(&key_bytes));
        if method.controller != document.id {
            check_delimiters(&method.controller, &name)?;
            fields.push("c", method.controller.clone());
        }

        method_records.push(ResourceRecord::txt(name, RECORD_TTL, fields.to_value().as_bytes()));
        label_by_id.insert(method.id.as_str(), label.clone());
        method_labels.push(label);
    }

    let mut service_labels = Vec::with_capacity(document.service.len());
    let mut service_records = Vec::with_capacity(document.service.len());
    for (index, service) in document.service.iter().enumerate() {
        let label = format!("s{}", index);
        let name = format!("_{}.{}", label, origin);

        let fragment = scoped_fragment(&document.id, &service.id).ok_or_else(|| {
            DhtError::packet_error_with_record(
                format!("Service id '{}' is not scoped to the document", service.id),
                name.clone(),
            )
        })?;
        check_delimiters(fragment, &name)?;
        check_delimiters(&service.service_type, &name)?;
        for endpoint in &service.service_endpoint {
            check_delimiters(endpoint, &name)?;
        }

        let mut fields = RecordFields::new();
        fields.push("id", fragment);
        fields.push("t", service.service_type.clone());
        fields.push("se", service.service_endpoint.join(","));

        service_records.push(ResourceRecord::txt(name, RECORD_TTL, fields.to_value().as_bytes()));
        service_labels.push(label);
    }

    let root = RootRecord {
        vm: method_labels,
        auth: relationship_labels("authentication", &document.authentication, &label_by_id)?,
        asm: relationship_labels("assertionMethod", &document.assertion_method, &label_by_id)?,
        agm: relationship_labels("keyAgreement", &document.key_agreement, &label_by_id)?,
        inv: relationship_labels(
            "capabilityInvocation",
            &document.capability_invocation,
            &label_by_id,
        )?,
        del: relationship_labels(
            "capabilityDelegation",
            &document.capability_delegation,
            &label_by_id,
        )?,
        svc: service_labels,
    };

    let mut records =
        Vec::with_capacity(method_records.len() + service_records.len() + 4);
    records.push(ResourceRecord::txt(
        origin.clone(),
        RECORD_TTL,
        root.to_txt_value().as_bytes(),
    ));
    records.extend(method_records);
    records.extend(service_records);

    if !document.controller.is_empty() {
        let name = format!("_cnt.{}", origin);
        for controller in &document.controller {
            check_delimiters(controller, &name)?;
        }
        records.push(ResourceRecord::txt(
            name,
            RECORD_TTL,
            document.controller.join(",").as_bytes(),
        ));
    }
    if !document.also_known_as.is_empty() {
        let name = format!("_aka.{}", origin);
        for alias in &document.also_known_as {
            check_delimiters(alias, &name)?;
        }
        records.push(ResourceRecord::txt(
            name,
            RECORD_TTL,
            document.also_known_as.join(",").as_bytes(),
        ));
    }
    if let Some(types) = types {
        if !types.is_empty() {
            let indices: Vec<String> =
                types.iter().map(|t| t.index().to_string()).collect();
            records.push(ResourceRecord::txt(
                format!("_typ.{}", origin),
                RECORD_TTL,
                format!("id={}", indices.join(",")).as_bytes(),
            ));
        }
    }

    let packet = DnsPacket::answer(records);
    let encoded = packet.serialize()?;
    if encoded.len() > MAX_V_SIZE {
        return Err(DhtError::size_limit_error(
            "Encoded document exceeds the record value limit",
            encoded.len(),
            MAX_V_SIZE,
        ));
    }

    debug!(
        "Lowered document {} into {} records, {} bytes",
        document.id,
        packet.answers.len(),
        encoded.len()
    );
    Ok(packet)
}

/// Fragment of an id that lives under the document id, if it does
fn scoped_fragment<'a>(document_id: &str, id: &'a str) -> Option<&'a str> {
    let (base, fragment) = id.rsplit_once('#')?;
    if base != document_id || fragment.is_empty() {
        return None;
    }
    Some(fragment)
}

/// Reject a value that collides with the record grammar
///
/// Values travel unescaped: ';' separates fields and ',' separates list
/// items, so a value carrying either would shear apart on decode.
fn check_delimiters(value: &str, record: &str) -> Result<(), DhtError> {
    if value.contains(';') || value.contains(',') {
        return Err(DhtError::packet_error_with_record(
            format!("Value '{}' contains a reserved delimiter", value),
            record.to_string(),
        ));
    }
    Ok(())
}

fn relationship_labels(
    relationship: &str,
    references: &[String],
    label_by_id: &HashMap<&str, String>,
) -> Result<Vec<String>, DhtError> {
    references
        .iter()
        .map(|reference| {
            label_by_id.get(reference.as_str()).cloned().ok_or_else(|| {
                DhtError::document_error(format!(
                    "{} references '{}', which is not a verification method in this document",
                    relationship, reference
                ))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::did::document::{DidDocumentBuilder, Service, VerificationMethod};
    use crate::packet::registry::KeyType;

    fn sample_did() -> Did {
        Did::from_public_key([0x42u8; 32])
    }

    #[test]
    fn test_record_names_and_root_value() {
        let did = sample_did();
        let document = DidDocument::for_identity_key(&did);

        let packet = to_packet(&document, None).unwrap();
        let origin = format!("_did.{}", did.suffix());

        assert_eq!(packet.answers[0].name, origin);
        assert_eq!(packet.answers[1].name, format!("_k0.{}", origin));
        assert_eq!(packet.answers.len(), 2);

        let root =
            RootRecord::parse(std::str::from_utf8(&packet.answers[0].txt_value().unwrap()).unwrap())
                .unwrap();
        assert_eq!(root.vm, vec!["k0"]);
        assert_eq!(root.auth, vec!["k0"]);
        assert_eq!(root.del, vec!["k0"]);
        assert!(root.agm.is_empty());
        assert!(root.svc.is_empty());

        for record in &packet.answers {
            assert_eq!(record.ttl, RECORD_TTL);
        }
    }

    #[test]
    fn test_controller_field_only_when_foreign() {
        let did = sample_did();
        let other = Did::from_public_key([0x43u8; 32]);

        let foreign_vm = VerificationMethod::new(
            format!("{}#delegate", did.uri()),
            other.uri(),
            KeyType::Secp256k1,
            &[0x02u8; 33],
        );
        let document = DidDocumentBuilder::new()
            .id(did.uri())
            .verification_method(VerificationMethod::new(
                format!("{}#0", did.uri()),
                did.uri(),
                KeyType::Ed25519,
                did.public_key(),
            ))
            .verification_method(foreign_vm)
            .build()
            .unwrap();

        let packet = to_packet(&document, None).unwrap();
        let own = String::from_utf8(packet.answers[1].txt_value().unwrap()).unwrap();
        let foreign = String::from_utf8(packet.answers[2].txt_value().unwrap()).unwrap();

        assert!(!own.contains(";c="));
        assert!(foreign.contains(&format!(";c={}", other.uri())));
        assert!(foreign.contains(";t=1;"));
    }

    #[test]
    fn test_optional_records() {
        let did = sample_did();
        let document = DidDocumentBuilder::new()
            .id(did.uri())
            .verification_method(VerificationMethod::new(
                format!("{}#0", did.uri()),
                did.uri(),
                KeyType::Ed25519,
                did.public_key(),
            ))
            .controller("did:dht:controller".to_string())
            .also_known_as("https://alice.example".to_string())
            .service(Service::new(
                format!("{}#files", did.uri()),
                "FileServer",
                vec!["https://a.example".to_string(), "https://b.example".to_string()],
            ))
            .build()
            .unwrap();

        let types = [RegisteredType::Corporation, RegisteredType::WebApp];
        let packet = to_packet(&document, Some(&types)).unwrap();
        let origin = format!("_did.{}", did.suffix());

        let names: Vec<&str> = packet.answers.iter().map(|r| r.name.as_str()).collect();
        assert!(names.contains(&format!("_s0.{}", origin).as_str()));
        assert!(names.contains(&format!("_cnt.{}", origin).as_str()));
        assert!(names.contains(&format!("_aka.{}", origin).as_str()));
        assert!(names.contains(&format!("_typ.{}", origin).as_str()));

        let typ = packet
            .answers
            .iter()
            .find(|r| r.name.starts_with("_typ."))
            .unwrap();
        assert_eq!(String::from_utf8(typ.txt_value().unwrap()).unwrap(), "id=3,6");

        let service = packet
            .answers
            .iter()
            .find(|r| r.name.starts_with("_s0."))
            .unwrap();
        let value = String::from_utf8(service.txt_value().unwrap()).unwrap();
        assert!(value.contains("se=https://a.example,https://b.example"));
    }

    #[test]
    fn test_empty_types_slice_adds_no_record() {
        let did = sample_did();
        let document = DidDocument::for_identity_key(&did);

        let packet = to_packet(&document, Some(&[])).unwrap();
        assert!(!packet.answers.iter().any(|r| r.name.starts_with("_typ.")));
    }

    #[test]
    fn test_foreign_method_id_rejected() {
        let did = sample_did();
        let mut document = DidDocument::for_identity_key(&did);
        document.verification_method[0].id = "did:dht:somewhereelse#0".to_string();

        let err = to_packet(&document, None).unwrap_err();
        assert!(matches!(err, DhtError::PacketError { .. }));
    }

    #[test]
    fn test_unknown_relationship_reference_rejected() {
        let did = sample_did();
        let mut document = DidDocument::for_identity_key(&did);
        document
            .authentication
            .push(format!("{}#missing", did.uri()));

        let err = to_packet(&document, None).unwrap_err();
        assert!(matches!(err, DhtError::DocumentError { .. }));
    }

    #[test]
    fn test_delimiter_bearing_endpoint_rejected() {
        // "https://a.example/p,q" is one legal URI; splitting the joined
        // list on decode would shear it into two endpoints
        let did = sample_did();
        let mut document = DidDocument::for_identity_key(&did);
        document.service.push(Service::new(
            format!("{}#files", did.uri()),
            "FileServer",
            vec!["https://a.example/p,q".to_string()],
        ));

        match to_packet(&document, None).unwrap_err() {
            DhtError::PacketError { record, .. } => {
                assert!(record.unwrap().starts_with("_s0."));
            }
            other => panic!("expected a packet error, got {:?}", other),
        }

        let mut document = DidDocument::for_identity_key(&did);
        document.service.push(Service::new(
            format!("{}#dwn", did.uri()),
            "Messaging",
            vec!["https://a.example/x;y".to_string()],
        ));
        let err = to_packet(&document, None).unwrap_err();
        assert!(matches!(err, DhtError::PacketError { .. }));
    }

    #[test]
    fn test_delimiter_bearing_list_entries_rejected() {
        let did = sample_did();

        let mut document = DidDocument::for_identity_key(&did);
        document
            .also_known_as
            .push("https://alice.example/a,b".to_string());
        let err = to_packet(&document, None).unwrap_err();
        assert!(matches!(err, DhtError::PacketError { .. }));

        let mut document = DidDocument::for_identity_key(&did);
        document
            .controller
            .push("did:dht:one,did:dht:two".to_string());
        let err = to_packet(&document, None).unwrap_err();
        assert!(matches!(err, DhtError::PacketError { .. }));
    }

    #[test]
    fn test_oversize_document_rejected() {
        let did = sample_did();
        let endpoint = format!("https://{}.example", "a".repeat(1100));
        let document = DidDocumentBuilder::new()
            .id(did.uri())
            .verification_method(VerificationMethod::new(
                format!("{}#0", did.uri()),
                did.uri(),
                KeyType::Ed25519,
                did.public_key(),
            ))
            .service(Service::new(format!("{}#big", did.uri()), "Big", vec![endpoint]))
            .build()
            .unwrap();

        match to_packet(&document, None).unwrap_err() {
            DhtError::SizeLimitError { size, limit, .. } => {
                assert!(size > limit);
                assert_eq!(limit, MAX_V_SIZE);
            }
            other => panic!("expected a size limit error, got {:?}", other),
        }
    }
}
