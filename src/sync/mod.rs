// Sync module
//
// This module contains the generic periodic-refetch primitive every live
// view is built on. One poller per view; pollers are independent and are
// torn down with their owner.

use std::time::Duration;

use futures::future::BoxFuture;
use log::debug;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::api::ApiError;

/// Refresh intervals observed per view
pub mod intervals {
    use std::time::Duration;

    /// Balance/profile refresh
    pub const ACCOUNT_REFRESH: Duration = Duration::from_secs(60);

    /// Transaction feed refresh on the wallet detail view
    pub const WALLET_FEED_REFRESH: Duration = Duration::from_secs(1);

    /// Transaction feed refresh on the compact feed view
    pub const COMPACT_FEED_REFRESH: Duration = Duration::from_secs(2);

    /// Transaction feed refresh on the explorer list view
    pub const EXPLORER_REFRESH: Duration = Duration::from_secs(10);
}

/// Periodically refetches a snapshot and publishes the latest good one
///
/// The fetch operation runs once per tick, starting immediately on spawn.
/// A successful fetch replaces the held snapshot whole; a failed fetch is
/// logged and the previous snapshot stays available (stale but available),
/// with the next scheduled tick as the only retry. Ticks never overlap
/// because the fetch is awaited inside the timer loop.
///
/// The polling task is tied to this handle: dropping or stopping the poller
/// aborts the task at once, including any fetch still in flight, so no
/// timer outlives its owning view.
#[derive(Debug)]
pub struct Poller<T> {
    snapshot: watch::Receiver<Option<T>>,
    task: JoinHandle<()>,
}

impl<T: Clone + Send + Sync + 'static> Poller<T> {
    /// Spawns the polling loop on the current tokio runtime
    ///
    /// # Arguments
    ///
    /// * `interval` - Time between fetches; a per-consumer parameter, see
    ///   `sync::intervals` for the presets used by the stock views
    /// * `fetch` - The operation producing a fresh snapshot
    ///
    /// # Returns
    ///
    /// A handle owning the background task
    pub fn spawn<F>(interval: Duration, mut fetch: F) -> Self
    where
        F: FnMut() -> BoxFuture<'static, Result<T, ApiError>> + Send + 'static,
    {
        let (publisher, snapshot) = watch::channel(None);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                match fetch().await {
                    Ok(fresh) => {
                        if publisher.send(Some(fresh)).is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        // Keep the previous snapshot; the next tick retries
                        debug!("poll failed, keeping last snapshot: {}", err);
                    }
                }
            }
        });

        Poller { snapshot, task }
    }

    /// The most recent successful snapshot, if any fetch succeeded yet
    pub fn latest(&self) -> Option<T> {
        self.snapshot.borrow().clone()
    }

    /// Waits for the next successful fetch and returns its snapshot
    ///
    /// Returns `None` once the poller has been stopped.
    pub async fn changed(&mut self) -> Option<T> {
        self.snapshot.changed().await.ok()?;
        self.snapshot.borrow().clone()
    }

    /// A secondary receiver for consumers that outlive borrow scopes
    pub fn subscribe(&self) -> watch::Receiver<Option<T>> {
        self.snapshot.clone()
    }

    /// Stops polling immediately
    pub fn stop(self) {
        self.task.abort();
    }
}

impl<T> Drop for Poller<T> {
    fn drop(&mut self) {
        // Cancellation is tied to the owner's lifetime, not the next tick
        self.task.abort();
    }
}
