// Ledger module
//
// This module contains the client-side view of the remote ledger:
// - Account snapshot structure
// - Transaction record structure and display redaction
// - Transaction feed with pagination, statistics and hash search
// - Free-text search query classification

pub mod account;
pub mod feed;
pub mod search;
pub mod transaction;

// Re-export main components for easier access
pub use account::AccountSnapshot;
pub use feed::{FeedError, FeedStats, Pager, TransactionFeed};
pub use search::{classify, SearchError, SearchTarget};
pub use transaction::{redact_address, TransactionRecord, SYSTEM_SENDER};
