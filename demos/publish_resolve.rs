//! Publish and resolve example for did-dht
//!
//! This demo publishes a fresh identity through a relay gateway and
//! resolves it back:
//! - Generate an Ed25519 identity key
//! - Publish the starter document
//! - Resolve the DID and print the resolution result
//!
//! Run this demo with:
//! ```bash
//! cargo run --example publish_resolve -- [gateway-url]
//! ```

use did_dht::{DhtClient, Did, DidDocument, InMemoryKeyManager, KeyAlgorithm, KeyManager};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let gateway = std::env::args().nth(1);
    let client = match gateway.as_deref() {
        Some(url) => DhtClient::with_gateway(url)?,
        None => DhtClient::new()?,
    };
    println!("Gateway: {}", client.gateway());

    let key_manager = InMemoryKeyManager::new();
    let alias = key_manager
        .generate_private_key(KeyAlgorithm::Ed25519)
        .await?;
    let public = key_manager.get_public_key(&alias).await?;
    let identity: [u8; 32] = public.bytes.as_slice().try_into()?;
    let did = Did::from_public_key(identity);
    println!("Publishing {}", did);

    let document = DidDocument::for_identity_key(&did);
    let message = client
        .publish(&key_manager, &alias, &document, None)
        .await?;
    println!("Published at seq {}", message.seq());

    let result = client.resolve(&did.uri()).await;
    println!(
        "Resolution result:\n{}",
        serde_json::to_string_pretty(&result)?
    );

    Ok(())
}
