use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use super::transaction::TransactionRecord;

/// Page size used by the full explorer view
pub const EXPLORER_PAGE_SIZE: usize = 10;
/// Page size used by the compact transaction feed
pub const COMPACT_PAGE_SIZE: usize = 5;

/// Errors that can occur during feed operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FeedError {
    #[error("Page {requested} is out of range (1..={available})")]
    PageOutOfRange { requested: usize, available: usize },
}

/// Statistics derived from the full transaction list
#[derive(Debug, Clone, PartialEq)]
pub struct FeedStats {
    /// Number of transactions on the ledger
    pub total_transactions: usize,

    /// Highest block number seen in the list
    pub latest_block: u64,

    /// Most recent transaction by creation time
    pub last_transaction: Option<TransactionRecord>,

    /// Sum of amounts moved in the trailing 24 hours, in CXAC
    pub volume_24h: f64,

    /// Sum of amounts over the whole list, in CXAC
    pub total_volume: f64,

    /// Mean fee over the whole list, in CXAC
    pub average_fee: f64,
}

/// 1-based page cursor over a list of fixed page size
///
/// The pagination law is `total_pages = ceil(count / page_size)`; the cursor
/// is kept inside `[1, total_pages]` (page 1 when the list is empty) and
/// `next`/`prev` clamp at the edges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pager {
    page: usize,
    page_size: usize,
}

impl Pager {
    /// Creates a cursor at page 1
    ///
    /// A zero `page_size` is normalized to 1.
    pub fn new(page_size: usize) -> Self {
        Pager {
            page: 1,
            page_size: page_size.max(1),
        }
    }

    /// The current page index (1-based)
    pub fn page(&self) -> usize {
        self.page
    }

    /// The configured page size
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Number of pages needed for `count` items
    pub fn total_pages(&self, count: usize) -> usize {
        (count + self.page_size - 1) / self.page_size
    }

    /// Advances one page, clamped to the last page
    pub fn next(&mut self, count: usize) {
        self.page = (self.page + 1).min(self.total_pages(count).max(1));
    }

    /// Goes back one page, clamped to page 1
    pub fn prev(&mut self) {
        self.page = self.page.saturating_sub(1).max(1);
    }

    /// Jumps to an explicit page
    ///
    /// Requesting a page outside `[1, total_pages]` is a caller bug and is
    /// rejected rather than silently clamped.
    pub fn set_page(&mut self, page: usize, count: usize) -> Result<(), FeedError> {
        let available = self.total_pages(count).max(1);
        if page == 0 || page > available {
            return Err(FeedError::PageOutOfRange {
                requested: page,
                available,
            });
        }

        self.page = page;
        Ok(())
    }

    /// Pulls the cursor back into range after the list shrank
    pub fn clamp(&mut self, count: usize) {
        self.page = self.page.min(self.total_pages(count).max(1));
    }

    /// The slice of `items` visible on the current page
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = (self.page - 1) * self.page_size;
        if start >= items.len() {
            return &[];
        }
        let end = (start + self.page_size).min(items.len());
        &items[start..end]
    }
}

/// What the feed is currently showing
#[derive(Debug, Clone, PartialEq)]
enum DisplayMode {
    /// The paginated full list
    Full,
    /// A single record found by hash search
    Found(TransactionRecord),
    /// A hash search that matched nothing
    NotFound { hash: String },
}

/// The shared transaction feed: full list, derived statistics, pagination
/// and hash-exact search
///
/// The record list is replaced wholesale by every successful poll; an active
/// search keeps showing its result across refreshes until explicitly reset.
#[derive(Debug, Clone)]
pub struct TransactionFeed {
    records: Vec<TransactionRecord>,
    pager: Pager,
    display: DisplayMode,
}

impl TransactionFeed {
    /// Creates an empty feed
    ///
    /// # Arguments
    ///
    /// * `page_size` - Fixed number of records per page
    pub fn new(page_size: usize) -> Self {
        TransactionFeed {
            records: Vec::new(),
            pager: Pager::new(page_size),
            display: DisplayMode::Full,
        }
    }

    /// Replaces the full record list with a fresh ledger observation
    ///
    /// The page cursor is re-clamped in case the list shrank. An active
    /// search result stays on display.
    pub fn set_records(&mut self, records: Vec<TransactionRecord>) {
        self.records = records;
        self.pager.clamp(self.records.len());
    }

    /// The full un-paginated list, in ledger order
    pub fn records(&self) -> &[TransactionRecord] {
        &self.records
    }

    /// The records currently on display
    ///
    /// Either the current page of the full list, the single search match, or
    /// nothing while a not-found notice is active.
    pub fn visible(&self) -> &[TransactionRecord] {
        match &self.display {
            DisplayMode::Full => self.pager.slice(&self.records),
            DisplayMode::Found(record) => std::slice::from_ref(record),
            DisplayMode::NotFound { .. } => &[],
        }
    }

    /// Statistics over the full list, evaluated at `now`
    pub fn stats(&self, now: DateTime<Utc>) -> FeedStats {
        let window_start = now - Duration::hours(24);

        let volume_24h = self
            .records
            .iter()
            .filter(|tx| tx.created_at > window_start)
            .map(|tx| tx.amount)
            .sum();

        let total_volume: f64 = self.records.iter().map(|tx| tx.amount).sum();

        let average_fee = if self.records.is_empty() {
            0.0
        } else {
            self.records.iter().map(|tx| tx.fee).sum::<f64>() / self.records.len() as f64
        };

        FeedStats {
            total_transactions: self.records.len(),
            latest_block: self
                .records
                .iter()
                .map(|tx| tx.block_number)
                .max()
                .unwrap_or(0),
            last_transaction: self
                .records
                .iter()
                .max_by_key(|tx| tx.created_at)
                .cloned(),
            volume_24h,
            total_volume,
            average_fee,
        }
    }

    /// The current page index (1-based)
    pub fn page(&self) -> usize {
        self.pager.page()
    }

    /// Number of pages in the full list
    pub fn total_pages(&self) -> usize {
        self.pager.total_pages(self.records.len())
    }

    /// Moves to the next page, clamped to the last one
    pub fn next_page(&mut self) {
        self.pager.next(self.records.len());
    }

    /// Moves to the previous page, clamped to page 1
    pub fn prev_page(&mut self) {
        self.pager.prev();
    }

    /// Jumps to an explicit page of the full list
    pub fn set_page(&mut self, page: usize) -> Result<(), FeedError> {
        self.pager.set_page(page, self.records.len())
    }

    /// Puts a hash-search outcome on display
    ///
    /// The match (or a not-found notice for `hash`) replaces the visible
    /// list until `reset_search` is called. Comparisons upstream are on the
    /// full hash, never on a redacted form.
    pub fn apply_search(&mut self, hash: &str, outcome: Option<TransactionRecord>) {
        self.display = match outcome {
            Some(record) => DisplayMode::Found(record),
            None => DisplayMode::NotFound {
                hash: hash.to_string(),
            },
        };
    }

    /// Checks if a search result is currently replacing the full list
    pub fn search_active(&self) -> bool {
        !matches!(self.display, DisplayMode::Full)
    }

    /// Human-readable notice for a search that matched nothing
    pub fn search_notice(&self) -> Option<String> {
        match &self.display {
            DisplayMode::NotFound { hash } => {
                Some(format!("Transaction {} not found", hash))
            }
            _ => None,
        }
    }

    /// Returns to the paginated full list
    pub fn reset_search(&mut self) {
        self.display = DisplayMode::Full;
    }
}
