use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use log::{info, warn};
use thiserror::Error;

use crate::api::{ApiError, Ledger, OriginError, OriginResolver};
use crate::ledger::AccountSnapshot;

/// Length of the mining cooldown window, in hours
pub const COOLDOWN_HOURS: i64 = 24;

/// Errors that can occur during a mining attempt
#[derive(Debug, Error)]
pub enum MiningError {
    /// The public network address could not be resolved. Mining is rate
    /// limited per origin, so a claim with an unknown origin is never sent.
    #[error("Could not resolve the public network address: {0}")]
    OriginUnavailable(#[from] OriginError),

    #[error(transparent)]
    Api(ApiError),
}

/// Availability of the mining action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiningState {
    /// A claim would be accepted now
    Ready,

    /// A claim was sent this session and is still processing
    Active,

    /// The window is closed until the given instant
    Cooldown { until: DateTime<Utc> },
}

/// What an `attempt_mine` call amounted to
#[derive(Debug, Clone, PartialEq)]
pub enum MineOutcome {
    /// The ledger accepted the claim
    Mined {
        mined_coins: f64,
        total_coins: f64,
        next_available: DateTime<Utc>,
    },

    /// The attempt was refused, either locally while the window is still
    /// open or by the ledger with its authoritative timestamp
    CoolingDown { until: DateTime<Utc> },

    /// Another claim is already in flight; nothing was sent
    InFlight,
}

/// Derives mining availability from the last claim timestamp
///
/// Pure derivation: the timestamp is the only authoritative state and the
/// window is recomputed on every call, never stored. The boundary instant
/// `last + 24h` itself is `Ready`.
pub fn availability(last_mining_time: Option<DateTime<Utc>>, now: DateTime<Utc>) -> MiningState {
    match last_mining_time {
        None => MiningState::Ready,
        Some(last) => {
            let until = last + Duration::hours(COOLDOWN_HOURS);
            if now >= until {
                MiningState::Ready
            } else {
                MiningState::Cooldown { until }
            }
        }
    }
}

/// Renders a remaining cooldown as `"3h 24m"`
pub fn format_remaining(remaining: Duration) -> String {
    let minutes = remaining.num_minutes().max(0);
    format!("{}h {}m", minutes / 60, minutes % 60)
}

#[derive(Debug)]
struct MiningStatus {
    state: MiningState,

    /// Operator-facing message: the ledger's rejection verbatim, or the
    /// success notice
    message: Option<String>,

    /// Window end reported by the ledger; always outranks the value derived
    /// from `last_mining_time`, since client clock skew must not grant or
    /// deny a claim
    server_until: Option<DateTime<Utc>>,
}

/// Clears the in-flight flag when the attempt finishes or is dropped
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// The time-gated mining engine for one identity
///
/// Tracks the cooldown state machine
/// `Ready -> Active -> Cooldown -> Ready` and enforces that at most one
/// claim is in flight at a time.
pub struct MiningEngine {
    ledger: Arc<dyn Ledger>,
    origin: Arc<dyn OriginResolver>,
    status: Mutex<MiningStatus>,
    in_flight: AtomicBool,
}

impl MiningEngine {
    /// Creates an engine in the `Ready` state
    pub fn new(ledger: Arc<dyn Ledger>, origin: Arc<dyn OriginResolver>) -> Self {
        MiningEngine {
            ledger,
            origin,
            status: Mutex::new(MiningStatus {
                state: MiningState::Ready,
                message: None,
                server_until: None,
            }),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Reconciles the state machine from a polled account snapshot
    ///
    /// The derived window is only a provisional hint; a window end the
    /// ledger reported directly stays authoritative, and a claim in flight
    /// is never interrupted.
    pub fn apply_snapshot(&self, snapshot: &AccountSnapshot, now: DateTime<Utc>) {
        let mut status = self.status.lock().unwrap();

        if status.state == MiningState::Active {
            return;
        }

        if let Some(until) = status.server_until {
            if now < until {
                status.state = MiningState::Cooldown { until };
                return;
            }
            status.server_until = None;
        }

        status.state = availability(snapshot.last_mining_time, now);
    }

    /// Attempts to claim the mining reward
    ///
    /// No network traffic happens when the window is still open or another
    /// claim is already in flight. Otherwise the public origin address is
    /// resolved first and exactly one claim is sent.
    ///
    /// # Arguments
    ///
    /// * `uid` - The identity claiming the reward
    ///
    /// # Returns
    ///
    /// What the attempt amounted to, or an error for an unreachable origin
    /// service or a failed ledger call (terminal for this attempt; retry is
    /// manual)
    pub async fn attempt_mine(&self, uid: &str) -> Result<MineOutcome, MiningError> {
        let now = Utc::now();

        // Refused locally while the window is open: no network call
        if let MiningState::Cooldown { until } = self.state() {
            if now < until {
                return Ok(MineOutcome::CoolingDown { until });
            }
        }

        // Exactly one claim may be outstanding; a second call is a no-op
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(MineOutcome::InFlight);
        }
        let _guard = InFlightGuard(&self.in_flight);

        let origin = match self.origin.resolve().await {
            Ok(origin) => origin,
            Err(err) => {
                warn!("mining aborted, origin unresolved: {}", err);
                return Err(MiningError::OriginUnavailable(err));
            }
        };

        self.set_state(MiningState::Active);

        match self.ledger.mine(uid, &origin).await {
            Ok(receipt) => {
                info!(
                    "mined {} CXAC, next claim at {}",
                    receipt.mined_coins, receipt.next_mining_available_at
                );
                self.enter_cooldown(
                    receipt.next_mining_available_at,
                    Some(format!("Successfully mined {} CXAC!", receipt.mined_coins)),
                );

                Ok(MineOutcome::Mined {
                    mined_coins: receipt.mined_coins,
                    total_coins: receipt.total_coins,
                    next_available: receipt.next_mining_available_at,
                })
            }
            Err(ApiError::RateLimited {
                message,
                next_available,
            }) => {
                self.enter_cooldown(next_available, Some(message));
                Ok(MineOutcome::CoolingDown {
                    until: next_available,
                })
            }
            Err(err) => {
                self.set_state(MiningState::Ready);
                Err(MiningError::Api(err))
            }
        }
    }

    /// Recomputes the countdown; call once per second while cooling down
    ///
    /// Reaching the window end flips the machine back to `Ready` and clears
    /// the message.
    pub fn tick(&self, now: DateTime<Utc>) -> MiningState {
        let mut status = self.status.lock().unwrap();

        if let MiningState::Cooldown { until } = status.state {
            if now >= until {
                status.state = MiningState::Ready;
                status.message = None;
                status.server_until = None;
            }
        }

        status.state
    }

    /// The current state of the machine
    pub fn state(&self) -> MiningState {
        self.status.lock().unwrap().state
    }

    /// The current operator-facing message, if any
    pub fn message(&self) -> Option<String> {
        self.status.lock().unwrap().message.clone()
    }

    /// Time left in the window at `now`, if cooling down
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        match self.state() {
            MiningState::Cooldown { until } if until > now => Some(until - now),
            _ => None,
        }
    }

    fn set_state(&self, state: MiningState) {
        self.status.lock().unwrap().state = state;
    }

    fn enter_cooldown(&self, until: DateTime<Utc>, message: Option<String>) {
        let mut status = self.status.lock().unwrap();
        status.state = MiningState::Cooldown { until };
        status.message = message;
        status.server_until = Some(until);
    }
}

impl std::fmt::Debug for MiningEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiningEngine")
            .field("status", &self.status)
            .field("in_flight", &self.in_flight)
            .finish()
    }
}

/// Drives an engine's countdown at one tick per second
///
/// Runs independently of any network polling. One handle per mining view;
/// dropping it stops the timer immediately, not on its next tick.
#[derive(Debug)]
pub struct Countdown {
    task: tokio::task::JoinHandle<()>,
}

impl Countdown {
    /// Spawns the ticking task on the current tokio runtime
    pub fn spawn(engine: Arc<MiningEngine>) -> Self {
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(std::time::Duration::from_secs(1));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                engine.tick(Utc::now());
            }
        });

        Countdown { task }
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.task.abort();
    }
}
