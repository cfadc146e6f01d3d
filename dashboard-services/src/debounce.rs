//! Quiescence-based debouncing of search input

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::debug;

/// Default quiet period before a search is issued
pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Forwards only the last value of a burst of input
///
/// A value settles once no newer value has arrived for the whole window; the
/// settle callback then runs as its own task. Dropping the debouncer stops the
/// worker and forgets any unsettled value.
pub struct SearchDebouncer {
    tx: mpsc::UnboundedSender<String>,
    worker: JoinHandle<()>,
}

impl SearchDebouncer {
    pub fn spawn<F, Fut>(window: Duration, on_settled: F) -> Self
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();

        let worker = tokio::spawn(async move {
            let mut pending: Option<String> = None;

            loop {
                let Some(query) = pending.take() else {
                    match rx.recv().await {
                        Some(query) => pending = Some(query),
                        None => break,
                    }
                    continue;
                };

                tokio::select! {
                    next = rx.recv() => match next {
                        Some(newer) => pending = Some(newer),
                        None => break,
                    },
                    _ = sleep(window) => {
                        debug!("Search input settled on {:?}", query);
                        tokio::spawn(on_settled(query));
                    }
                }
            }
        });

        Self { tx, worker }
    }

    /// Record a new input value, restarting the quiet period
    pub fn push(&self, query: impl Into<String>) {
        let _ = self.tx.send(query.into());
    }
}

impl Drop for SearchDebouncer {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn recording() -> (Arc<Mutex<Vec<String>>>, SearchDebouncer) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let debouncer = SearchDebouncer::spawn(DEFAULT_SEARCH_DEBOUNCE, move |query| {
            let sink = Arc::clone(&sink);
            async move {
                sink.lock().push(query);
            }
        });
        (seen, debouncer)
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_issues_one_search_for_last_value() {
        let (seen, debouncer) = recording();

        debouncer.push("a");
        sleep(Duration::from_millis(200)).await;
        debouncer.push("ap");
        sleep(Duration::from_millis(110)).await;
        debouncer.push("apple");
        sleep(Duration::from_secs(1)).await;

        assert_eq!(*seen.lock(), vec!["apple".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_pauses_settle_separately() {
        let (seen, debouncer) = recording();

        debouncer.push("btc");
        sleep(Duration::from_millis(400)).await;
        debouncer.push("eth");
        sleep(Duration::from_millis(400)).await;

        assert_eq!(*seen.lock(), vec!["btc".to_string(), "eth".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_forgets_pending_value() {
        let (seen, debouncer) = recording();

        debouncer.push("sol");
        sleep(Duration::from_millis(100)).await;
        drop(debouncer);
        sleep(Duration::from_secs(1)).await;

        assert!(seen.lock().is_empty());
    }
}
