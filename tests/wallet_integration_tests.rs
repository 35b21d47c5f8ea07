//! Wallet engine integration tests
//!
//! Exercises the client engine end to end against a scripted ledger:
//! mining exclusivity and cooldown transitions, transfer submission,
//! feed polling and search, and session teardown.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use futures::FutureExt;
use tempfile::tempdir;

use cxac_client::api::{ApiError, Ledger, MineReceipt, OriginError, OriginResolver, TransferRequest};
use cxac_client::ledger::{AccountSnapshot, TransactionFeed, TransactionRecord};
use cxac_client::sync::Poller;
use cxac_client::wallet::{
    availability, Countdown, Identity, MineOutcome, MiningEngine, MiningError, MiningState,
    Session, SessionStore, TransferError, TransferPanel,
};

const OWN_ADDRESS: &str = "0x1111111111111111111111111111111111111111";
const PEER_ADDRESS: &str = "0x2222222222222222222222222222222222222222";

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Clone)]
enum MineScript {
    Accept(MineReceipt),
    RateLimit {
        message: String,
        until: DateTime<Utc>,
    },
    Reject(String),
}

struct MockLedger {
    mine_calls: AtomicUsize,
    transfer_calls: AtomicUsize,
    list_calls: AtomicUsize,
    mine_script: Mutex<MineScript>,
    mine_delay: StdDuration,
    transfer_rejection: Mutex<Option<String>>,
    transactions: Mutex<Vec<TransactionRecord>>,
    account: Mutex<Option<AccountSnapshot>>,
}

impl MockLedger {
    fn new() -> Self {
        MockLedger {
            mine_calls: AtomicUsize::new(0),
            transfer_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
            mine_script: Mutex::new(MineScript::Reject("unscripted".to_string())),
            mine_delay: StdDuration::ZERO,
            transfer_rejection: Mutex::new(None),
            transactions: Mutex::new(Vec::new()),
            account: Mutex::new(None),
        }
    }

    fn with_mine_delay(mut self, delay: StdDuration) -> Self {
        self.mine_delay = delay;
        self
    }

    fn script_mine(&self, script: MineScript) {
        *self.mine_script.lock().unwrap() = script;
    }

    fn set_transactions(&self, records: Vec<TransactionRecord>) {
        *self.transactions.lock().unwrap() = records;
    }
}

#[async_trait]
impl Ledger for MockLedger {
    async fn get_account(&self, _uid: &str) -> Result<AccountSnapshot, ApiError> {
        self.account
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ApiError::Rejected("User not found".to_string()))
    }

    async fn list_transactions(&self) -> Result<Vec<TransactionRecord>, ApiError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.transactions.lock().unwrap().clone())
    }

    async fn list_transactions_for(
        &self,
        address: &str,
    ) -> Result<Vec<TransactionRecord>, ApiError> {
        Ok(self
            .transactions
            .lock()
            .unwrap()
            .iter()
            .filter(|tx| tx.from == address || tx.to == address)
            .cloned()
            .collect())
    }

    async fn get_transaction(&self, hash: &str) -> Result<TransactionRecord, ApiError> {
        self.transactions
            .lock()
            .unwrap()
            .iter()
            .find(|tx| tx.hash == hash)
            .cloned()
            .ok_or_else(|| ApiError::Rejected("Transaction not found".to_string()))
    }

    async fn mine(&self, _uid: &str, _origin: &str) -> Result<MineReceipt, ApiError> {
        self.mine_calls.fetch_add(1, Ordering::SeqCst);

        let script = self.mine_script.lock().unwrap().clone();
        if !self.mine_delay.is_zero() {
            tokio::time::sleep(self.mine_delay).await;
        }

        match script {
            MineScript::Accept(receipt) => Ok(receipt),
            MineScript::RateLimit { message, until } => Err(ApiError::RateLimited {
                message,
                next_available: until,
            }),
            MineScript::Reject(message) => Err(ApiError::Rejected(message)),
        }
    }

    async fn transfer(&self, _request: &TransferRequest) -> Result<(), ApiError> {
        self.transfer_calls.fetch_add(1, Ordering::SeqCst);

        match self.transfer_rejection.lock().unwrap().clone() {
            Some(message) => Err(ApiError::Rejected(message)),
            None => Ok(()),
        }
    }
}

struct MockOrigin {
    fail: bool,
}

#[async_trait]
impl OriginResolver for MockOrigin {
    async fn resolve(&self) -> Result<String, OriginError> {
        if self.fail {
            Err(OriginError::EmptyAddress)
        } else {
            Ok("203.0.113.9".to_string())
        }
    }
}

fn engine(ledger: Arc<MockLedger>, origin_fails: bool) -> MiningEngine {
    MiningEngine::new(ledger, Arc::new(MockOrigin { fail: origin_fails }))
}

fn snapshot(last_mining_time: Option<DateTime<Utc>>) -> AccountSnapshot {
    AccountSnapshot {
        uid: "u-1".to_string(),
        address: OWN_ADDRESS.to_string(),
        total_coins: 12.0,
        rank: 3,
        is_verified: true,
        last_mining_time,
    }
}

fn record(hash: &str, amount: f64, block: u64, created_at: DateTime<Utc>) -> TransactionRecord {
    TransactionRecord {
        hash: hash.to_string(),
        from: PEER_ADDRESS.to_string(),
        to: OWN_ADDRESS.to_string(),
        amount,
        fee: 0.1,
        block_number: block,
        previous_block: block.saturating_sub(1),
        created_at,
    }
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_mine_attempts_send_one_request() {
    init_logs();
    let ledger = Arc::new(MockLedger::new().with_mine_delay(StdDuration::from_millis(200)));
    ledger.script_mine(MineScript::Accept(MineReceipt {
        mined_coins: 2.0,
        total_coins: 14.0,
        next_mining_available_at: Utc::now() + Duration::hours(24),
    }));
    let engine = engine(ledger.clone(), false);

    let (first, second) = tokio::join!(engine.attempt_mine("u-1"), engine.attempt_mine("u-1"));

    // One claim went out; the overlapping call was a no-op
    assert_eq!(ledger.mine_calls.load(Ordering::SeqCst), 1);

    let outcomes = [first.unwrap(), second.unwrap()];
    assert!(outcomes
        .iter()
        .any(|o| matches!(o, MineOutcome::Mined { .. })));
    assert!(outcomes.iter().any(|o| matches!(o, MineOutcome::InFlight)));
}

#[tokio::test]
async fn test_successful_mine_enters_cooldown_with_server_window() {
    let until = Utc::now() + Duration::hours(24);
    let ledger = Arc::new(MockLedger::new());
    ledger.script_mine(MineScript::Accept(MineReceipt {
        mined_coins: 2.0,
        total_coins: 14.0,
        next_mining_available_at: until,
    }));
    let engine = engine(ledger.clone(), false);

    let outcome = engine.attempt_mine("u-1").await.unwrap();
    assert_eq!(
        outcome,
        MineOutcome::Mined {
            mined_coins: 2.0,
            total_coins: 14.0,
            next_available: until,
        }
    );
    assert_eq!(engine.state(), MiningState::Cooldown { until });
    assert_eq!(
        engine.message().unwrap(),
        "Successfully mined 2 CXAC!"
    );
}

#[tokio::test]
async fn test_rate_limited_mine_uses_server_window_verbatim() {
    let until = Utc::now() + Duration::hours(5);
    let ledger = Arc::new(MockLedger::new());
    ledger.script_mine(MineScript::RateLimit {
        message: "Mining cooldown period active".to_string(),
        until,
    });
    let engine = engine(ledger.clone(), false);

    let outcome = engine.attempt_mine("u-1").await.unwrap();
    assert_eq!(outcome, MineOutcome::CoolingDown { until });
    assert_eq!(engine.state(), MiningState::Cooldown { until });
    assert_eq!(
        engine.message().unwrap(),
        "Mining cooldown period active"
    );
}

#[tokio::test]
async fn test_mine_inside_window_makes_no_network_call() {
    let ledger = Arc::new(MockLedger::new());
    let engine = engine(ledger.clone(), false);

    // An hour-old claim closes the window for another 23 hours
    engine.apply_snapshot(&snapshot(Some(Utc::now() - Duration::hours(1))), Utc::now());

    let outcome = engine.attempt_mine("u-1").await.unwrap();
    assert!(matches!(outcome, MineOutcome::CoolingDown { .. }));
    assert_eq!(ledger.mine_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unresolved_origin_aborts_before_the_ledger() {
    let ledger = Arc::new(MockLedger::new());
    let engine = engine(ledger.clone(), true);

    let result = engine.attempt_mine("u-1").await;
    assert!(matches!(result, Err(MiningError::OriginUnavailable(_))));
    assert_eq!(ledger.mine_calls.load(Ordering::SeqCst), 0);
    assert_eq!(engine.state(), MiningState::Ready);
}

#[tokio::test]
async fn test_cooldown_expiry_returns_to_ready() {
    let until = Utc::now() + Duration::hours(2);
    let ledger = Arc::new(MockLedger::new());
    ledger.script_mine(MineScript::RateLimit {
        message: "Mining cooldown period active".to_string(),
        until,
    });
    let engine = engine(ledger.clone(), false);
    engine.attempt_mine("u-1").await.unwrap();

    // Ticks inside the window keep counting down
    assert_eq!(
        engine.tick(until - Duration::minutes(1)),
        MiningState::Cooldown { until }
    );
    assert!(engine.remaining(until - Duration::minutes(1)).is_some());

    // At the boundary the machine is ready again and the message is gone
    assert_eq!(engine.tick(until), MiningState::Ready);
    assert_eq!(engine.message(), None);
    assert_eq!(engine.remaining(until), None);
}

#[tokio::test]
async fn test_countdown_flips_to_ready_without_polling() {
    let until = Utc::now() + Duration::milliseconds(1200);
    let ledger = Arc::new(MockLedger::new());
    ledger.script_mine(MineScript::RateLimit {
        message: "Mining cooldown period active".to_string(),
        until,
    });
    let engine = Arc::new(engine(ledger.clone(), false));
    engine.attempt_mine("u-1").await.unwrap();
    assert!(matches!(engine.state(), MiningState::Cooldown { .. }));

    let _countdown = Countdown::spawn(engine.clone());

    // The per-second timer alone clears the window; no poll involved
    tokio::time::sleep(StdDuration::from_millis(2500)).await;
    assert_eq!(engine.state(), MiningState::Ready);
    assert_eq!(engine.message(), None);
}

#[tokio::test]
async fn test_server_window_outranks_derived_window() {
    let server_until = Utc::now() + Duration::hours(6);
    let ledger = Arc::new(MockLedger::new());
    ledger.script_mine(MineScript::RateLimit {
        message: "Mining cooldown period active".to_string(),
        until: server_until,
    });
    let engine = engine(ledger.clone(), false);
    engine.attempt_mine("u-1").await.unwrap();

    // A skewed snapshot would derive a different window end; the ledger's
    // value must win
    let skewed = snapshot(Some(Utc::now() - Duration::hours(1)));
    engine.apply_snapshot(&skewed, Utc::now());

    assert_eq!(
        engine.state(),
        MiningState::Cooldown {
            until: server_until
        }
    );
}

#[tokio::test]
async fn test_snapshot_drives_state_when_no_server_window() {
    let ledger = Arc::new(MockLedger::new());
    let engine = engine(ledger.clone(), false);
    let now = Utc::now();

    engine.apply_snapshot(&snapshot(Some(now - Duration::hours(25))), now);
    assert_eq!(engine.state(), MiningState::Ready);

    engine.apply_snapshot(&snapshot(Some(now - Duration::hours(1))), now);
    assert_eq!(
        engine.state(),
        availability(Some(now - Duration::hours(1)), now)
    );
}

#[tokio::test]
async fn test_transfer_validation_failure_stays_local() {
    let ledger = Arc::new(MockLedger::new());
    let mut panel = TransferPanel::new();
    panel.open();
    panel.form_mut().amount = "12".to_string();

    let result = panel.submit(ledger.as_ref(), OWN_ADDRESS).await;
    assert!(matches!(result, Err(TransferError::MissingFields)));
    assert_eq!(ledger.transfer_calls.load(Ordering::SeqCst), 0);
    assert!(panel.is_open());
}

#[tokio::test]
async fn test_transfer_success_clears_form_and_closes() {
    let ledger = Arc::new(MockLedger::new());
    let mut panel = TransferPanel::new();
    panel.open();
    panel.set_recipient(PEER_ADDRESS);
    panel.form_mut().amount = "12".to_string();

    panel.submit(ledger.as_ref(), OWN_ADDRESS).await.unwrap();

    // Exactly one request; no optimistic balance bookkeeping to clean up
    assert_eq!(ledger.transfer_calls.load(Ordering::SeqCst), 1);
    assert!(!panel.is_open());
    assert!(panel.form().recipient.is_empty());
    assert!(panel.form().amount.is_empty());
    assert!(panel.error().is_none());
}

#[tokio::test]
async fn test_transfer_rejection_keeps_form_for_correction() {
    let ledger = Arc::new(MockLedger::new());
    *ledger.transfer_rejection.lock().unwrap() =
        Some("Insufficient balance".to_string());

    let mut panel = TransferPanel::new();
    panel.open();
    panel.set_recipient(PEER_ADDRESS);
    panel.form_mut().amount = "9000".to_string();

    let result = panel.submit(ledger.as_ref(), OWN_ADDRESS).await;
    assert!(result.is_err());
    assert_eq!(panel.error(), Some("Insufficient balance"));
    assert!(panel.is_open());
    assert_eq!(panel.form().recipient, PEER_ADDRESS);
    assert_eq!(panel.form().amount, "9000");
}

#[tokio::test(start_paused = true)]
async fn test_feed_view_polls_aggregates_and_searches() {
    let ledger = Arc::new(MockLedger::new());
    let now = Utc::now();
    ledger.set_transactions(vec![
        record("needle", 5.0, 10, now - Duration::hours(1)),
        record("stale", 3.0, 9, now - Duration::hours(30)),
    ]);

    let mut poller = Poller::spawn(StdDuration::from_secs(10), {
        let ledger = ledger.clone();
        move || {
            let ledger = ledger.clone();
            async move { ledger.list_transactions().await }.boxed()
        }
    });

    let mut feed = TransactionFeed::new(10);
    feed.set_records(poller.changed().await.unwrap());

    let stats = feed.stats(now);
    assert_eq!(stats.total_transactions, 2);
    assert_eq!(stats.latest_block, 10);
    assert_eq!(stats.volume_24h, 5.0);

    // Exact-hash search replaces the visible list until reset
    let hit = ledger.get_transaction("needle").await.unwrap();
    feed.apply_search("needle", Some(hit));
    assert_eq!(feed.visible().len(), 1);
    assert_eq!(feed.visible()[0].hash, "needle");

    match ledger.get_transaction("no-such-hash").await {
        Ok(_) => panic!("hash should be unknown"),
        Err(ApiError::Rejected(message)) => {
            assert_eq!(message, "Transaction not found");
            feed.apply_search("no-such-hash", None);
        }
        Err(other) => panic!("unexpected error: {}", other),
    }
    assert!(feed.visible().is_empty());
    assert!(feed.search_notice().is_some());

    feed.reset_search();
    assert_eq!(feed.visible().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_logout_tears_down_polling() {
    init_logs();
    let dir = tempdir().unwrap();
    let store = SessionStore::new(dir.path()).unwrap();
    let session = Session::establish(
        &store,
        Identity {
            uid: "u-1".to_string(),
            address: OWN_ADDRESS.to_string(),
            token: "bearer".to_string(),
        },
    )
    .unwrap();

    let ledger = Arc::new(MockLedger::new());
    let poller = Poller::spawn(StdDuration::from_secs(1), {
        let ledger = ledger.clone();
        move || {
            let ledger = ledger.clone();
            async move { ledger.list_transactions().await }.boxed()
        }
    });

    tokio::time::sleep(StdDuration::from_millis(2500)).await;
    let polled = ledger.list_calls.load(Ordering::SeqCst);
    assert!(polled >= 2);

    // Logout: destroy the session and drop the view's poller
    session.end(&store).unwrap();
    drop(poller);

    tokio::time::sleep(StdDuration::from_secs(30)).await;
    assert_eq!(ledger.list_calls.load(Ordering::SeqCst), polled);
    assert!(Session::resume(&store).is_none());
}
