use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sender value the ledger uses for reward-mint transactions
pub const SYSTEM_SENDER: &str = "SYSTEM";

/// Leading characters kept when redacting an address for display
const ADDRESS_LEAD: usize = 6;
/// Trailing characters kept when redacting an address for display
const ADDRESS_TAIL: usize = 4;
/// Leading characters kept when redacting a transaction hash for display
const HASH_LEAD: usize = 10;
/// Trailing characters kept when redacting a transaction hash for display
const HASH_TAIL: usize = 8;

/// A transaction as observed on the ledger
///
/// Records are immutable once observed. The ledger returns them ordered by
/// `created_at` descending and that order is preserved as-is; the client
/// never re-sorts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// Opaque fixed-length identifier of the transaction
    #[serde(rename = "transactionHash")]
    pub hash: String,

    /// Sender's address, or `"SYSTEM"` for a reward mint
    pub from: String,

    /// Recipient's address
    pub to: String,

    /// Amount transferred, in CXAC
    pub amount: f64,

    /// Fee paid to the ledger, in CXAC
    pub fee: f64,

    /// Block that included this transaction
    pub block_number: u64,

    /// Block preceding the including block
    pub previous_block: u64,

    /// Timestamp assigned by the ledger
    pub created_at: DateTime<Utc>,
}

impl TransactionRecord {
    /// Checks if the transaction is a reward mint rather than a transfer
    pub fn is_reward(&self) -> bool {
        self.from == SYSTEM_SENDER
    }

    /// Redacted hash for display (`first 10 ... last 8`)
    ///
    /// Display-only. Lookups and comparisons always use the full `hash`.
    pub fn short_hash(&self) -> String {
        redact(&self.hash, HASH_LEAD, HASH_TAIL)
    }

    /// Label for the other party of this transaction, from the point of view
    /// of `own_address`
    ///
    /// Outgoing transfers label the recipient, everything else labels the
    /// sender. The caller's own address renders as `"You"`.
    pub fn counterparty_label(&self, own_address: &str) -> String {
        let other = if self.from == own_address {
            &self.to
        } else {
            &self.from
        };

        if other == own_address {
            "You".to_string()
        } else {
            redact_address(other)
        }
    }

    /// Checks if this transaction left `own_address`
    pub fn is_outgoing(&self, own_address: &str) -> bool {
        self.from == own_address
    }
}

/// Redacted address for display (`first 6 ... last 4`)
///
/// `"SYSTEM"` is never redacted. Display-only; comparisons always use the
/// full value.
pub fn redact_address(address: &str) -> String {
    if address == SYSTEM_SENDER {
        return address.to_string();
    }
    redact(address, ADDRESS_LEAD, ADDRESS_TAIL)
}

/// Keeps the first `lead` and last `tail` characters of `value`
///
/// Values too short to lose anything are returned unchanged.
fn redact(value: &str, lead: usize, tail: usize) -> String {
    if value.chars().count() <= lead + tail {
        return value.to_string();
    }

    let head: String = value.chars().take(lead).collect();
    let rear: String = value
        .chars()
        .skip(value.chars().count() - tail)
        .collect();

    format!("{}...{}", head, rear)
}
