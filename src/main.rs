//! did-dht - Main entry point
//!
//! Publish and resolve did:dht identities through a relay gateway.

use anyhow::{Context, Result};
use did_dht::{
    CliArgs, Command, Config, DhtClient, Did, DidDocument, InMemoryKeyManager, KeyAlgorithm,
    KeyManager, RegisteredType,
};
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use tracing::{debug, error, info};

/// Set up panic handler for unexpected errors
fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        let backtrace = std::backtrace::Backtrace::capture();
        let location = panic_info.location().unwrap();

        error!(
            "PANIC occurred at {}:{}:{}",
            location.file(),
            location.line(),
            location.column()
        );
        let payload = panic_info.payload();
        if let Some(s) = payload.downcast_ref::<&str>() {
            error!("Panic message: {}", s);
        } else if let Some(s) = payload.downcast_ref::<String>() {
            error!("Panic message: {}", s);
        } else {
            error!("Panic message: unknown");
        }
        error!("Backtrace:\n{:?}", backtrace);
    }));
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_panic_handler();

    let args = CliArgs::parse_args();
    init_logging(&args);

    info!("did-dht starting");
    debug!("CLI arguments: {:?}", args);

    let config = Config::from_args(&args);
    config.validate().context("Invalid configuration")?;

    let client = DhtClient::with_gateway_and_timeout(&config.gateway, config.timeout)
        .context("Failed to build relay client")?;
    debug!("Using gateway {}", config.gateway);

    match &args.command {
        Command::Generate { publish } => run_generate(&client, &config, *publish).await,
        Command::Publish { private_key, types } => run_publish(&client, private_key, types).await,
        Command::Resolve { did } => run_resolve(&client, did).await,
    }
}

/// Initialize logging based on verbosity settings
fn init_logging(args: &CliArgs) {
    let level = args.log_level();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if args.is_verbose() {
        subscriber.pretty().init();
    } else {
        subscriber.compact().init();
    }

    debug!("Logging initialized at level {:?}", level);
}

/// Generate a fresh identity key, print it, and optionally publish
async fn run_generate(client: &DhtClient, config: &Config, publish: bool) -> Result<()> {
    let signing_key = SigningKey::generate(&mut OsRng);
    let did = Did::from_public_key(signing_key.verifying_key().to_bytes());

    println!("DID:         {}", did);
    println!("Private key: {}", hex::encode(signing_key.to_bytes()));
    println!();

    if publish {
        let key_manager = InMemoryKeyManager::new();
        let alias = key_manager
            .import_private_key(KeyAlgorithm::Ed25519, &signing_key.to_bytes())
            .await
            .context("Failed to import the generated key")?;

        let document = DidDocument::for_identity_key(&did);
        let message = client
            .publish(&key_manager, &alias, &document, None)
            .await
            .context("Failed to publish the starter document")?;

        println!("Published to {} at seq {}", config.gateway, message.seq());
    } else {
        println!("Keep the private key safe; publish the identity later with:");
        println!("  did-dht publish --private-key <HEX>");
    }

    Ok(())
}

/// Publish the starter document for an identity key supplied as hex
async fn run_publish(client: &DhtClient, private_key: &str, type_indices: &[u8]) -> Result<()> {
    let key_bytes = hex::decode(private_key).context("Private key is not valid hex")?;

    let key_manager = InMemoryKeyManager::new();
    let alias = key_manager
        .import_private_key(KeyAlgorithm::Ed25519, &key_bytes)
        .await
        .context("Failed to import the private key")?;

    let public = key_manager.get_public_key(&alias).await?;
    let identity: [u8; 32] = public
        .bytes
        .as_slice()
        .try_into()
        .context("Identity key is not 32 bytes")?;
    let did = Did::from_public_key(identity);
    info!("Publishing starter document for {}", did);

    let types = type_indices
        .iter()
        .map(|&index| RegisteredType::from_index(index))
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("Unknown registered type index")?;

    let document = DidDocument::for_identity_key(&did);
    let message = client
        .publish(
            &key_manager,
            &alias,
            &document,
            if types.is_empty() { None } else { Some(&types) },
        )
        .await
        .context("Failed to publish")?;

    println!("{}", serde_json::to_string_pretty(&document)?);
    println!();
    println!("Published {} at seq {}", did, message.seq());
    Ok(())
}

/// Resolve an identifier and print the full resolution result
async fn run_resolve(client: &DhtClient, did: &str) -> Result<()> {
    info!("Resolving {}", did);
    let result = client.resolve(did).await;

    println!("{}", serde_json::to_string_pretty(&result)?);

    if let Some(code) = result.did_resolution_metadata.error {
        error!("Resolution of {} failed: {}", did, code);
        anyhow::bail!("Resolution failed: {}", code);
    }
    Ok(())
}
