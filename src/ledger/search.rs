use thiserror::Error;

/// Prefix every ledger address starts with
pub const ADDRESS_PREFIX: &str = "0x";
/// Total character length of a ledger address, prefix included
pub const ADDRESS_LENGTH: usize = 42;
/// Character length of a transaction hash
pub const TX_HASH_LENGTH: usize = 64;

/// Errors that can occur while classifying a search query
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SearchError {
    #[error("Invalid search query")]
    Unclassifiable,

    #[error("Empty search query")]
    Empty,
}

/// Where a free-text explorer query should be routed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchTarget {
    /// Query names an account address
    Address(String),

    /// Query names a transaction hash
    TxHash(String),

    /// Query names a block number
    Block(u64),
}

/// Classifies a free-text query into its detail-view target
///
/// Rules are applied to the trimmed input, in priority order: address shape
/// (`0x` prefix, 42 characters total), then transaction-hash length (64
/// characters), then a non-negative integer block number. Exactly one rule
/// fires. Classification is purely syntactic; an unclassifiable query is
/// rejected here and never reaches the ledger.
///
/// # Arguments
///
/// * `raw` - The query as typed by the user
///
/// # Returns
///
/// The matching target, or a `SearchError` for input that matches nothing
pub fn classify(raw: &str) -> Result<SearchTarget, SearchError> {
    let query = raw.trim();

    if query.is_empty() {
        return Err(SearchError::Empty);
    }

    if query.starts_with(ADDRESS_PREFIX) && query.len() == ADDRESS_LENGTH {
        return Ok(SearchTarget::Address(query.to_string()));
    }

    if query.len() == TX_HASH_LENGTH {
        return Ok(SearchTarget::TxHash(query.to_string()));
    }

    if let Ok(number) = query.parse::<u64>() {
        return Ok(SearchTarget::Block(number));
    }

    Err(SearchError::Unclassifiable)
}
