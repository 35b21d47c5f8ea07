use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account state as reported by the ledger
///
/// Snapshots are authoritative and always replaced whole on refresh, never
/// patched field-by-field, so two fields can never come from two different
/// ledger observations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSnapshot {
    /// Identifier of the owning user
    pub uid: String,

    /// The account's ledger address
    pub address: String,

    /// Current balance, in CXAC
    pub total_coins: f64,

    /// Position on the ledger's leaderboard
    #[serde(rename = "ranks")]
    pub rank: u64,

    /// Whether the account passed verification
    #[serde(rename = "isVerification")]
    pub is_verified: bool,

    /// When the account last claimed a mining reward, if ever
    #[serde(default)]
    pub last_mining_time: Option<DateTime<Utc>>,
}
