// API module
//
// This module contains the remote interfaces the client consumes:
// - The ledger service (accounts, transactions, mining, transfers)
// - The third-party network-origin lookup required before mining

pub mod client;
pub mod origin;

// Re-export main components for easier access
pub use client::{ClientConfig, HttpLedger, Ledger, MineReceipt, TransferRequest};
pub use origin::{IpifyOrigin, OriginError, OriginResolver};

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur while talking to the ledger
#[derive(Debug, Error)]
pub enum ApiError {
    /// The ledger could not be reached or returned an unreadable body.
    /// Polling consumers keep their last good snapshot and retry on the
    /// next tick.
    #[error("Ledger unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    /// A mining attempt landed inside the cooldown window. Carries the
    /// ledger's message and the authoritative next-available timestamp.
    #[error("{message}")]
    RateLimited {
        message: String,
        next_available: DateTime<Utc>,
    },

    /// The ledger refused the request for a business reason (insufficient
    /// balance, unknown address, ...). The message is surfaced verbatim and
    /// the attempt is terminal; retry is manual.
    #[error("{0}")]
    Rejected(String),
}

impl ApiError {
    /// Checks if this error should keep previously displayed state intact
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }
}
