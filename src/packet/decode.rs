//! Packet to document rebuilding
//!
//! Walks the record family named by the root record and reassembles the
//! document through the builder, so a decoded document passes the same
//! validation as a locally built one. Ids are reconstructed from the
//! expected identifier, never trusted from the packet.

use std::collections::HashMap;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use tracing::{debug, trace};

use crate::did::document::{DidDocument, DidDocumentBuilder, Service, VerificationMethod};
use crate::did::identifier::Did;
use crate::dns::{DnsPacket, TYPE_TXT};
use crate::error::DhtError;
use crate::packet::records::{split_list, RecordFields, RootRecord};
use crate::packet::registry::{KeyType, RegisteredType};

/// Rebuild the document, and any registered types, a packet carries
pub fn from_packet(
    expected: &Did,
    packet: &DnsPacket,
) -> Result<(DidDocument, Option<Vec<RegisteredType>>), DhtError> {
    let origin = format!("_did.{}", expected.suffix());

    let mut values: HashMap<&str, String> = HashMap::new();
    for record in &packet.answers {
        if record.rtype != TYPE_TXT {
            trace!("Skipping non-TXT record '{}'", record.name);
            continue;
        }
        let bytes = record.txt_value()?;
        let value = String::from_utf8(bytes).map_err(|_| {
            DhtError::decode_error_with_source("TXT value is not UTF-8", record.name.clone())
        })?;
        values.insert(record.name.as_str(), value);
    }

    let root_value = values.get(origin.as_str()).ok_or_else(|| {
        DhtError::packet_error_with_record("Packet has no root record", origin.clone())
    })?;
    let root = RootRecord::parse(root_value)?;

    let mut builder = DidDocumentBuilder::new().id(expected.uri());
    let mut id_by_label: HashMap<&str, String> = HashMap::new();

    for label in &root.vm {
        let name = format!("_{}.{}", label, origin);
        let value = values.get(name.as_str()).ok_or_else(|| {
            DhtError::packet_error_with_record(
                format!("Root record lists '{}' but the packet has no such record", label),
                name.clone(),
            )
        })?;
        let fields = RecordFields::parse(value)?;

        let fragment = fields.require("id")?;
        let key_type = KeyType::from_index(parse_index(fields.require("t")?)?)?;
        let key_bytes = URL_SAFE_NO_PAD.decode(fields.require("k")?)?;
        let controller = fields
            .get("c")
            .map(str::to_string)
            .unwrap_or_else(|| expected.uri());

        let id = format!("{}#{}", expected.uri(), fragment);
        id_by_label.insert(label.as_str(), id.clone());
        builder = builder.verification_method(VerificationMethod::new(
            id, controller, key_type, &key_bytes,
        ));
    }

    for id in resolve_labels(&root.auth, &id_by_label, &origin)? {
        builder = builder.authentication(id);
    }
    for id in resolve_labels(&root.asm, &id_by_label, &origin)? {
        builder = builder.assertion_method(id);
    }
    for id in resolve_labels(&root.agm, &id_by_label, &origin)? {
        builder = builder.key_agreement(id);
    }
    for id in resolve_labels(&root.inv, &id_by_label, &origin)? {
        builder = builder.capability_invocation(id);
    }
    for id in resolve_labels(&root.del, &id_by_label, &origin)? {
        builder = builder.capability_delegation(id);
    }

    for label in &root.svc {
        let name = format!("_{}.{}", label, origin);
        let value = values.get(name.as_str()).ok_or_else(|| {
            DhtError::packet_error_with_record(
                format!("Root record lists '{}' but the packet has no such record", label),
                name.clone(),
            )
        })?;
        let fields = RecordFields::parse(value)?;

        builder = builder.service(Service::new(
            format!("{}#{}", expected.uri(), fields.require("id")?),
            fields.require("t")?,
            split_list(fields.require("se")?),
        ));
    }

    if let Some(value) = values.get(format!("_cnt.{}", origin).as_str()) {
        for controller in split_list(value) {
            builder = builder.controller(controller);
        }
    }
    if let Some(value) = values.get(format!("_aka.{}", origin).as_str()) {
        for alias in split_list(value) {
            builder = builder.also_known_as(alias);
        }
    }

    let types = match values.get(format!("_typ.{}", origin).as_str()) {
        None => None,
        Some(value) => {
            let fields = RecordFields::parse(value)?;
            let indices = split_list(fields.require("id")?);
            let mut registered = Vec::with_capacity(indices.len());
            for index in &indices {
                registered.push(RegisteredType::from_index(parse_index(index)?)?);
            }
            Some(registered)
        }
    };

    let document = builder.build()?;
    debug!(
        "Rebuilt document {} from {} records",
        document.id,
        packet.answers.len()
    );
    Ok((document, types))
}

fn parse_index(value: &str) -> Result<u8, DhtError> {
    value
        .parse::<u8>()
        .map_err(|_| DhtError::decode_error(format!("Index '{}' is not a small integer", value)))
}

fn resolve_labels(
    labels: &[String],
    id_by_label: &HashMap<&str, String>,
    origin: &str,
) -> Result<Vec<String>, DhtError> {
    labels
        .iter()
        .map(|label| {
            id_by_label.get(label.as_str()).cloned().ok_or_else(|| {
                DhtError::packet_error_with_record(
                    format!("Root record references unknown method label '{}'", label),
                    origin.to_string(),
                )
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::did::document::DidDocumentBuilder;
    use crate::dns::ResourceRecord;
    use crate::packet::encode::{to_packet, RECORD_TTL};

    fn sample_did() -> Did {
        Did::from_public_key([0xA1u8; 32])
    }

    fn minimal_records(did: &Did) -> Vec<ResourceRecord> {
        let origin = format!("_did.{}", did.suffix());
        let key = URL_SAFE_NO_PAD.encode(did.public_key());
        vec![
            ResourceRecord::txt(origin.clone(), RECORD_TTL, b"v=0;vm=k0;auth=k0"),
            ResourceRecord::txt(
                format!("_k0.{}", origin),
                RECORD_TTL,
                format!("id=0;t=0;k={}", key).as_bytes(),
            ),
        ]
    }

    #[test]
    fn test_full_round_trip() {
        let did = sample_did();
        let other = Did::from_public_key([0xB2u8; 32]);

        let document = DidDocumentBuilder::new()
            .id(did.uri())
            .controller(other.uri())
            .also_known_as("https://alice.example".to_string())
            .verification_method(VerificationMethod::new(
                format!("{}#0", did.uri()),
                did.uri(),
                KeyType::Ed25519,
                did.public_key(),
            ))
            .verification_method(VerificationMethod::new(
                format!("{}#sig", did.uri()),
                other.uri(),
                KeyType::Secp256k1,
                &[0x03u8; 33],
            ))
            .authentication(format!("{}#0", did.uri()))
            .assertion_method(format!("{}#0", did.uri()))
            .key_agreement(format!("{}#sig", did.uri()))
            .capability_invocation(format!("{}#0", did.uri()))
            .capability_delegation(format!("{}#0", did.uri()))
            .service(Service::new(
                format!("{}#files", did.uri()),
                "FileServer",
                vec!["https://a.example".to_string(), "https://b.example".to_string()],
            ))
            .build()
            .unwrap();
        let types = vec![RegisteredType::Corporation, RegisteredType::WebApp];

        let packet = to_packet(&document, Some(&types)).unwrap();
        let wire = packet.serialize().unwrap();
        let reparsed = DnsPacket::deserialize(&wire).unwrap();

        let (decoded, decoded_types) = from_packet(&did, &reparsed).unwrap();
        assert_eq!(decoded, document);
        assert_eq!(decoded_types, Some(types));
    }

    #[test]
    fn test_missing_root_record() {
        let did = sample_did();
        let packet = DnsPacket::answer(Vec::new());

        let err = from_packet(&did, &packet).unwrap_err();
        assert!(matches!(err, DhtError::PacketError { .. }));
    }

    #[test]
    fn test_dangling_method_record() {
        let did = sample_did();
        let mut records = minimal_records(&did);
        records.retain(|record| !record.name.starts_with("_k0."));

        let err = from_packet(&did, &DnsPacket::answer(records)).unwrap_err();
        match err {
            DhtError::PacketError { record, .. } => {
                assert!(record.unwrap().starts_with("_k0."));
            }
            other => panic!("expected a packet error, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_relationship_label() {
        let did = sample_did();
        let origin = format!("_did.{}", did.suffix());
        let mut records = minimal_records(&did);
        records[0] = ResourceRecord::txt(origin, RECORD_TTL, b"v=0;vm=k0;auth=k9");

        let err = from_packet(&did, &DnsPacket::answer(records)).unwrap_err();
        assert!(matches!(err, DhtError::PacketError { .. }));
    }

    #[test]
    fn test_unknown_type_index() {
        let did = sample_did();
        let origin = format!("_did.{}", did.suffix());
        let mut records = minimal_records(&did);
        records.push(ResourceRecord::txt(
            format!("_typ.{}", origin),
            RECORD_TTL,
            b"id=99",
        ));

        let err = from_packet(&did, &DnsPacket::answer(records)).unwrap_err();
        assert!(matches!(err, DhtError::DecodeError { .. }));
    }

    #[test]
    fn test_unsupported_root_version() {
        let did = sample_did();
        let origin = format!("_did.{}", did.suffix());
        let mut records = minimal_records(&did);
        records[0] = ResourceRecord::txt(origin, RECORD_TTL, b"v=1;vm=k0;auth=k0");

        let err = from_packet(&did, &DnsPacket::answer(records)).unwrap_err();
        assert!(matches!(err, DhtError::DecodeError { .. }));
    }

    #[test]
    fn test_unreferenced_records_ignored() {
        let did = sample_did();
        let origin = format!("_did.{}", did.suffix());
        let mut records = minimal_records(&did);
        records.push(ResourceRecord::txt(
            format!("_x.{}", origin),
            RECORD_TTL,
            b"whatever",
        ));
        records.push(ResourceRecord::txt(
            format!("_k7.{}", origin),
            RECORD_TTL,
            b"id=orphan;t=0;k=AAAA",
        ));

        let (document, types) = from_packet(&did, &DnsPacket::answer(records)).unwrap();
        assert_eq!(document.verification_method.len(), 1);
        assert!(types.is_none());
    }

    #[test]
    fn test_non_utf8_value_rejected() {
        let did = sample_did();
        let origin = format!("_did.{}", did.suffix());
        let records = vec![ResourceRecord::txt(origin, RECORD_TTL, &[0xFF, 0xFE, 0xFD])];

        let err = from_packet(&did, &DnsPacket::answer(records)).unwrap_err();
        assert!(matches!(err, DhtError::DecodeError { .. }));
    }

    #[test]
    fn test_decoded_document_passes_validation() {
        // the decoded side goes through the builder, so a family whose root
        // lists no verification methods comes back as a document error
        let did = sample_did();
        let origin = format!("_did.{}", did.suffix());
        let records = vec![ResourceRecord::txt(origin, RECORD_TTL, b"v=0")];

        let err = from_packet(&did, &DnsPacket::answer(records)).unwrap_err();
        assert!(matches!(err, DhtError::DocumentError { .. }));
    }
}
