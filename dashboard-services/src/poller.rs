//! Fixed-interval refetch loop

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

/// Runs a fetch on every tick until dropped
///
/// Each tick's fetch is spawned as its own task, so a slow fetch never delays
/// the next tick. Fetches already running when the poller is dropped are left
/// to finish.
pub struct Poller {
    label: &'static str,
    ticker: JoinHandle<()>,
}

impl Poller {
    /// Start ticking one `period` from now
    pub fn spawn<F, Fut>(label: &'static str, period: Duration, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let ticker = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                debug!("[Poller] {} tick", label);
                tokio::spawn(fetch());
            }
        });

        Self { label, ticker }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        debug!("[Poller] Stopping {}", self.label);
        self.ticker.abort();
    }
}
