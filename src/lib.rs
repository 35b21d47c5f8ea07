//! Client-side synchronization and mining-cooldown engine for the CXAC
//! ledger.
//!
//! The remote ledger is the single source of truth. This crate keeps the
//! locally displayed balance, transaction feed and mining availability
//! consistent with it through periodic polling ([`sync::Poller`]), enforces
//! the 24-hour mining cooldown purely from timestamps
//! ([`wallet::MiningEngine`]), aggregates the shared transaction feed into
//! paginated, searchable views ([`ledger::TransactionFeed`]), and drives
//! address exchange and transfer submission ([`wallet::exchange`],
//! [`wallet::TransferPanel`]).
//!
//! A typical view wires the pieces together like this: resume the
//! [`wallet::Session`] from its [`wallet::SessionStore`], build an
//! [`api::HttpLedger`] from the session's bearer token, spawn one poller
//! per live view with the intervals in [`sync::intervals`], and drop the
//! pollers when the view goes away or the user logs out.

pub mod api;
pub mod ledger;
pub mod sync;
pub mod wallet;

pub use api::{ApiError, ClientConfig, HttpLedger, Ledger};
pub use ledger::{AccountSnapshot, TransactionFeed, TransactionRecord};
pub use sync::Poller;
pub use wallet::{MiningEngine, Session, SessionStore, TransferPanel};
