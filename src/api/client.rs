use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::ledger::{AccountSnapshot, TransactionRecord};

/// Default base URL of the ledger service
pub const DEFAULT_BASE_URL: &str = "https://api.funchatparty.online";

/// Default timeout applied to every ledger request
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the HTTP ledger client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the ledger service, without a trailing slash
    pub base_url: String,

    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Receipt returned by the ledger for an accepted mining claim
///
/// The reward amount is reported by the ledger, never computed locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MineReceipt {
    /// Coins credited by this claim, in CXAC
    pub mined_coins: f64,

    /// Balance after the claim, in CXAC
    pub total_coins: f64,

    /// When the next claim will be accepted
    pub next_mining_available_at: DateTime<Utc>,
}

/// A validated peer-to-peer transfer, ready for submission
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    /// The sender's address
    pub from_address: String,

    /// The recipient's address
    pub to_address: String,

    /// The amount to transfer, as a number
    pub amount: f64,
}

/// Read and write operations offered by the remote ledger
///
/// The ledger is the single source of truth; every method returns what the
/// ledger reported, and callers reconcile local state from it rather than
/// mutating balances optimistically.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Fetches the authoritative account snapshot for a user
    async fn get_account(&self, uid: &str) -> Result<AccountSnapshot, ApiError>;

    /// Fetches the shared transaction feed, in ledger order
    async fn list_transactions(&self) -> Result<Vec<TransactionRecord>, ApiError>;

    /// Fetches the transactions touching one address, in ledger order
    async fn list_transactions_for(
        &self,
        address: &str,
    ) -> Result<Vec<TransactionRecord>, ApiError>;

    /// Looks up a single transaction by its full hash
    async fn get_transaction(&self, hash: &str) -> Result<TransactionRecord, ApiError>;

    /// Claims the mining reward for a user
    ///
    /// `origin` is the caller's public network address; the ledger rate
    /// limits claims per origin. A claim inside the cooldown window fails
    /// with `ApiError::RateLimited`.
    async fn mine(&self, uid: &str, origin: &str) -> Result<MineReceipt, ApiError>;

    /// Submits a peer-to-peer transfer
    async fn transfer(&self, request: &TransferRequest) -> Result<(), ApiError>;
}

#[derive(Debug, Deserialize)]
struct AccountEnvelope {
    user: AccountSnapshot,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MineBody<'a> {
    user_id: &'a str,
    ipaddress: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CooldownReply {
    message: String,
    next_mining_available_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct ErrorReply {
    message: String,
}

/// HTTP implementation of the `Ledger` trait
///
/// Every request carries the session's bearer token.
#[derive(Debug, Clone)]
pub struct HttpLedger {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpLedger {
    /// Creates a client for one authenticated session
    ///
    /// # Arguments
    ///
    /// * `config` - Service location and timeouts
    /// * `token` - Bearer token issued by the login service
    ///
    /// # Returns
    ///
    /// A new HttpLedger instance
    pub fn new(config: ClientConfig, token: impl Into<String>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(HttpLedger {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> Result<Response, ApiError> {
        debug!("GET {}", path);
        let response = self
            .http
            .get(self.endpoint(path))
            .bearer_auth(&self.token)
            .send()
            .await?;

        reject_business_errors(response).await
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<Response, ApiError> {
        debug!("POST {}", path);
        let response = self
            .http
            .post(self.endpoint(path))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;

        reject_business_errors(response).await
    }
}

/// Maps non-success responses onto the error taxonomy
///
/// 429 carries the ledger's cooldown message and authoritative
/// next-available timestamp; every other failure status carries the
/// ledger's `message`, surfaced verbatim.
async fn reject_business_errors(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let reply: CooldownReply = response.json().await?;
        return Err(ApiError::RateLimited {
            message: reply.message,
            next_available: reply.next_mining_available_at,
        });
    }

    let message = match response.json::<ErrorReply>().await {
        Ok(reply) => reply.message,
        Err(_) => format!("Ledger request failed with status {}", status.as_u16()),
    };

    Err(ApiError::Rejected(message))
}

#[async_trait]
impl Ledger for HttpLedger {
    async fn get_account(&self, uid: &str) -> Result<AccountSnapshot, ApiError> {
        let envelope: AccountEnvelope = self
            .get(&format!("/api/getUserByUid/{}", uid))
            .await?
            .json()
            .await?;

        Ok(envelope.user)
    }

    async fn list_transactions(&self) -> Result<Vec<TransactionRecord>, ApiError> {
        Ok(self.get("/api/transactions").await?.json().await?)
    }

    async fn list_transactions_for(
        &self,
        address: &str,
    ) -> Result<Vec<TransactionRecord>, ApiError> {
        Ok(self
            .get(&format!("/api/transactions/ua/{}", address))
            .await?
            .json()
            .await?)
    }

    async fn get_transaction(&self, hash: &str) -> Result<TransactionRecord, ApiError> {
        Ok(self
            .get(&format!("/api/transactions/txh/{}", hash))
            .await?
            .json()
            .await?)
    }

    async fn mine(&self, uid: &str, origin: &str) -> Result<MineReceipt, ApiError> {
        let body = MineBody {
            user_id: uid,
            ipaddress: origin,
        };

        Ok(self.post("/api/mining/coin", &body).await?.json().await?)
    }

    async fn transfer(&self, request: &TransferRequest) -> Result<(), ApiError> {
        self.post("/api/transfer/coin", request).await?;
        Ok(())
    }
}
