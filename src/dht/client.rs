//! Relay client
//!
//! One HTTP round trip per operation: PUT a signed record to publish,
//! GET and verify to resolve. The gateway address is the only state.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::StatusCode;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::bep44::Bep44Message;
use crate::did::document::DidDocument;
use crate::did::identifier::{Did, METHOD_PREFIX};
use crate::did::resolution::{DidDocumentMetadata, DidResolutionResult, ResolutionError};
use crate::dns::DnsPacket;
use crate::error::DhtError;
use crate::keys::KeyManager;
use crate::packet::{from_packet, to_packet, RegisteredType};

/// Gateway most deployments publish through
pub const DEFAULT_GATEWAY: &str = "https://diddht.tbddev.org";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for a record relay
#[derive(Debug)]
pub struct DhtClient {
    gateway: Url,
    client: reqwest::Client,
}

impl DhtClient {
    /// Create a client against the default gateway
    pub fn new() -> Result<Self, DhtError> {
        Self::with_gateway(DEFAULT_GATEWAY)
    }

    /// Create a client against a specific relay gateway
    pub fn with_gateway(gateway: &str) -> Result<Self, DhtError> {
        Self::with_gateway_and_timeout(gateway, DEFAULT_TIMEOUT)
    }

    /// Create a client with an explicit request timeout
    pub fn with_gateway_and_timeout(gateway: &str, timeout: Duration) -> Result<Self, DhtError> {
        let gateway = Url::parse(gateway).map_err(|e| {
            DhtError::config_error_with_field(
                format!("Invalid gateway URL '{}': {}", gateway, e),
                "gateway",
            )
        })?;

        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| {
                DhtError::transport_error_with_source("Failed to build HTTP client", e.to_string())
            })?;

        Ok(DhtClient { gateway, client })
    }

    /// The gateway this client talks to
    pub fn gateway(&self) -> &str {
        self.gateway.as_str()
    }

    fn record_url(&self, did: &Did) -> String {
        format!("{}/{}", self.gateway.as_str().trim_end_matches('/'), did.suffix())
    }

    /// Publish a signed record for an identifier
    pub async fn put(&self, did: &Did, message: &Bep44Message) -> Result<(), DhtError> {
        let url = self.record_url(did);
        debug!("PUT {} ({} byte value, seq {})", url, message.v().len(), message.seq());

        let response = self
            .client
            .put(&url)
            .header("Content-Type", "application/octet-stream")
            .body(message.to_relay_body())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!("Gateway rejected record for {}: {} - {}", did, status, body);
            return Err(DhtError::transport_error_full(
                "Gateway rejected the record",
                status.as_u16(),
                body,
            ));
        }

        info!("Published record for {} at seq {}", did, message.seq());
        Ok(())
    }

    /// Fetch the current record for an identifier, if one is published
    ///
    /// A gateway 404 means the identifier has no record, which is a normal
    /// outcome, not a failure. The returned message is not yet verified.
    pub async fn get(&self, did: &Did) -> Result<Option<Bep44Message>, DhtError> {
        let url = self.record_url(did);
        debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            debug!("No record published for {}", did);
            return Ok(None);
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(DhtError::transport_error_full(
                "Gateway lookup failed",
                status.as_u16(),
                body,
            ));
        }

        let body = response.bytes().await?;
        let message = Bep44Message::from_relay_body(*did.public_key(), &body)?;
        Ok(Some(message))
    }

    /// Encode, sign, and publish a document in one round trip
    ///
    /// The sequence number is the wall-clock unix time, so a republish
    /// supersedes older records. Two publishers on the same identity key
    /// are not coordinated; the relay keeps the highest sequence it sees.
    pub async fn publish(
        &self,
        key_manager: &dyn KeyManager,
        identity_key_alias: &str,
        document: &DidDocument,
        types: Option<&[RegisteredType]>,
    ) -> Result<Bep44Message, DhtError> {
        let seq = unix_time_seq()?;
        self.publish_with_seq(key_manager, identity_key_alias, document, types, seq)
            .await
    }

    /// Publish with an explicit sequence number
    pub async fn publish_with_seq(
        &self,
        key_manager: &dyn KeyManager,
        identity_key_alias: &str,
        document: &DidDocument,
        types: Option<&[RegisteredType]>,
        seq: u64,
    ) -> Result<Bep44Message, DhtError> {
        let did = Did::parse(&document.id)?;

        let packet = to_packet(document, types)?;
        let v = packet.serialize()?;
        let message = Bep44Message::sign(key_manager, identity_key_alias, seq, v).await?;

        // the record key must be the key the identifier was derived from,
        // checked before anything leaves the process
        if message.k() != did.public_key() {
            return Err(DhtError::key_error(
                "Signing key does not match the document identifier",
            ));
        }

        self.put(&did, &message).await?;
        Ok(message)
    }

    /// Resolve an identifier to its document
    ///
    /// Never fails outright; every failure maps to a resolution error code
    /// in the returned result.
    pub async fn resolve(&self, did: &str) -> DidResolutionResult {
        let parsed = match Did::parse(did) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!("Refusing to resolve '{}': {}", did, e);
                return DidResolutionResult::error(identifier_code(did));
            }
        };

        let message = match self.get(&parsed).await {
            Ok(Some(message)) => message,
            Ok(None) => return DidResolutionResult::error(ResolutionError::NotFound),
            Err(e) => {
                error!("Lookup failed for {}: {}", parsed, e);
                return DidResolutionResult::error(resolution_code(&e));
            }
        };

        if let Err(e) = message.verify() {
            warn!("Record for {} failed verification: {}", parsed, e);
            return DidResolutionResult::error(ResolutionError::InvalidSignature);
        }

        let outcome = DnsPacket::deserialize(message.v())
            .and_then(|packet| from_packet(&parsed, &packet));
        match outcome {
            Ok((document, types)) => {
                info!("Resolved {} at seq {}", parsed, message.seq());
                DidResolutionResult::success(
                    document,
                    DidDocumentMetadata {
                        version_id: Some(message.seq().to_string()),
                        types,
                    },
                )
            }
            Err(e) => {
                warn!("Record for {} does not decode to a document: {}", parsed, e);
                DidResolutionResult::error(resolution_code(&e))
            }
        }
    }
}

/// Wall-clock sequence number for a fresh publish
fn unix_time_seq() -> Result<u64, DhtError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .map_err(|e| DhtError::config_error(format!("System clock is before the unix epoch: {}", e)))
}

/// Resolution code for an identifier that did not parse
fn identifier_code(did: &str) -> ResolutionError {
    if did.starts_with("did:") && !did.starts_with(METHOD_PREFIX) {
        ResolutionError::MethodNotSupported
    } else {
        ResolutionError::InvalidDid
    }
}

/// Uniform mapping from the error taxonomy to resolution codes
fn resolution_code(error: &DhtError) -> ResolutionError {
    match error {
        DhtError::SignatureError { .. } => ResolutionError::InvalidSignature,
        DhtError::IdentifierError { .. } => ResolutionError::InvalidDid,
        DhtError::DecodeError { .. }
        | DhtError::PacketError { .. }
        | DhtError::DocumentError { .. }
        | DhtError::SizeLimitError { .. } => ResolutionError::InvalidDidDocument,
        DhtError::KeyError { .. }
        | DhtError::TransportError { .. }
        | DhtError::ConfigError { .. } => ResolutionError::InternalError,
    }
}
