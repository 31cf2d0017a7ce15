//! Offline pipeline walkthrough for did-dht
//!
//! This demo exercises the whole codec pipeline without any network:
//! - Generate an identity key and derive its DID
//! - Build the starter document and lower it into a DNS packet
//! - Wrap the packet bytes in a signed BEP44 record
//! - Verify the record and rebuild the document from the packet
//!
//! Run this demo with:
//! ```bash
//! cargo run --example offline_round_trip
//! ```

use did_dht::{
    from_packet, to_packet, Bep44Message, Did, DidDocument, DnsPacket, InMemoryKeyManager,
    KeyAlgorithm, KeyManager,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let key_manager = InMemoryKeyManager::new();
    let alias = key_manager
        .generate_private_key(KeyAlgorithm::Ed25519)
        .await?;
    let public = key_manager.get_public_key(&alias).await?;
    let identity: [u8; 32] = public.bytes.as_slice().try_into()?;
    let did = Did::from_public_key(identity);
    println!("Identity: {}", did);

    let document = DidDocument::for_identity_key(&did);
    println!("Document:\n{}", serde_json::to_string_pretty(&document)?);

    let packet = to_packet(&document, None)?;
    let v = packet.serialize()?;
    println!("Packet: {} records, {} bytes", packet.answers.len(), v.len());

    let message = Bep44Message::sign(&key_manager, &alias, 1, v).await?;
    message.verify()?;
    println!(
        "Signed record: seq {}, sig {}",
        message.seq(),
        hex::encode(message.sig())
    );

    // what a relay would hand back on GET
    let relay_body = message.to_relay_body();
    let received = Bep44Message::from_relay_body(*did.public_key(), &relay_body)?;
    received.verify()?;

    let reparsed = DnsPacket::deserialize(received.v())?;
    let (rebuilt, _types) = from_packet(&did, &reparsed)?;
    assert_eq!(rebuilt, document);
    println!("Round trip OK: rebuilt document matches the original");

    Ok(())
}
