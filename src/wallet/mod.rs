// Wallet module
//
// This module contains the stateful client engine:
// - Session context (persisted identity)
// - Mining cooldown state machine
// - Transfer form and submission
// - Address exchange (QR encode and scan sessions)

pub mod exchange;
pub mod mining;
pub mod session;
pub mod transfer;

// Re-export main components for easier access
pub use exchange::{address_qr, ExchangeError, ScanError, ScanSession, ScanSource};
pub use mining::{
    availability, format_remaining, Countdown, MineOutcome, MiningEngine, MiningError,
    MiningState,
};
pub use session::{Identity, Session, SessionError, SessionStore};
pub use transfer::{TransferError, TransferForm, TransferPanel};
