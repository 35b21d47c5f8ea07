use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use thiserror::Error;

/// Default endpoint of the network-origin lookup service
pub const DEFAULT_ORIGIN_ENDPOINT: &str = "https://api.ipify.org?format=json";

/// Errors that can occur while resolving the public network origin
#[derive(Debug, Error)]
pub enum OriginError {
    #[error("Origin lookup failed: {0}")]
    Lookup(#[from] reqwest::Error),

    #[error("Origin service returned an empty address")]
    EmptyAddress,
}

/// Resolves the caller's public network address
///
/// The ledger rate limits mining per network origin, so every mine attempt
/// resolves its origin first and aborts if the lookup fails. The service is
/// independent of the ledger.
#[async_trait]
pub trait OriginResolver: Send + Sync {
    async fn resolve(&self) -> Result<String, OriginError>;
}

#[derive(Debug, Deserialize)]
struct IpReply {
    ip: String,
}

/// `OriginResolver` backed by an ipify-style JSON endpoint
#[derive(Debug, Clone)]
pub struct IpifyOrigin {
    http: reqwest::Client,
    endpoint: String,
}

impl IpifyOrigin {
    /// Creates a resolver against the default public endpoint
    pub fn new() -> Self {
        Self::with_endpoint(DEFAULT_ORIGIN_ENDPOINT)
    }

    /// Creates a resolver against a custom endpoint
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        IpifyOrigin {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

impl Default for IpifyOrigin {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OriginResolver for IpifyOrigin {
    async fn resolve(&self) -> Result<String, OriginError> {
        debug!("resolving public origin via {}", self.endpoint);

        let reply: IpReply = self
            .http
            .get(&self.endpoint)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if reply.ip.is_empty() {
            return Err(OriginError::EmptyAddress);
        }

        Ok(reply.ip)
    }
}
