//! Rate limiter for the stock provider
//!
//! The stock provider's free tier allows 5 requests per minute and gives no
//! burst capacity, so calls are spaced out by a fixed minimum interval.
//! The queue of reserved slots is bounded; callers beyond it are turned away.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashboard_core::{DashboardError, DashboardResult, Provider};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Minimum delay between stock provider requests (12s = 5 req/min)
pub const POLYGON_MIN_REQUEST_INTERVAL_MS: u64 = 12_000;

/// Requests allowed to wait for a slot at once
pub const DEFAULT_MAX_QUEUED: u32 = 10;

/// Enforces a minimum delay between requests
///
/// Each caller reserves the next free time slot while holding the lock and
/// then sleeps outside it, so concurrent callers never share a slot. A caller
/// whose slot would start more than `max_queued` intervals from now is
/// rejected without reserving one.
#[derive(Debug)]
pub struct RateLimiter {
    /// Earliest instant the next request may start; `None` until first use
    next_slot: Mutex<Option<Instant>>,
    min_interval: Duration,
    max_queued: u32,
    /// Name for logging purposes
    name: String,
    total_requests: AtomicU64,
    waited_requests: AtomicU64,
    rejected_requests: AtomicU64,
}

impl RateLimiter {
    /// Create a new rate limiter with the specified minimum interval between requests
    pub fn new(min_interval_ms: u64, name: &str) -> Self {
        Self {
            next_slot: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
            max_queued: DEFAULT_MAX_QUEUED,
            name: name.to_string(),
            total_requests: AtomicU64::new(0),
            waited_requests: AtomicU64::new(0),
            rejected_requests: AtomicU64::new(0),
        }
    }

    pub fn with_max_queued(mut self, max_queued: u32) -> Self {
        self.max_queued = max_queued.max(1);
        self
    }

    /// Limiter sized to the stock provider's published quota
    pub fn for_polygon() -> Arc<Self> {
        Arc::new(Self::new(POLYGON_MIN_REQUEST_INTERVAL_MS, "Polygon"))
    }

    /// Wait until a request may be made; fails when the queue is full
    pub async fn acquire(&self) -> DashboardResult<()> {
        let request_num = self.total_requests.fetch_add(1, Ordering::Relaxed) + 1;

        let slot = {
            let mut next_slot = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next_slot {
                Some(next) if next > now => next,
                _ => now,
            };
            if slot.saturating_duration_since(now) >= self.min_interval * self.max_queued {
                self.rejected_requests.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "[RATE_LIMITER:{}] #{} rejected, {} requests already queued",
                    self.name, request_num, self.max_queued
                );
                return Err(DashboardError::provider(
                    Provider::Polygon,
                    "Too many requests queued for the stock provider",
                ));
            }
            *next_slot = Some(slot + self.min_interval);
            slot
        };

        let wait = slot.saturating_duration_since(Instant::now());
        if !wait.is_zero() {
            self.waited_requests.fetch_add(1, Ordering::Relaxed);
            debug!(
                "[RATE_LIMITER:{}] #{} queued for {:?}",
                self.name, request_num, wait
            );
            tokio::time::sleep_until(slot).await;
        }
        Ok(())
    }

    /// Check if a request can be made immediately without waiting
    pub async fn can_acquire_immediately(&self) -> bool {
        let next_slot = self.next_slot.lock().await;
        next_slot.map(|next| next <= Instant::now()).unwrap_or(true)
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn stats(&self) -> RateLimiterStats {
        RateLimiterStats {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            waited_requests: self.waited_requests.load(Ordering::Relaxed),
            rejected_requests: self.rejected_requests.load(Ordering::Relaxed),
            min_interval_ms: self.min_interval.as_millis() as u64,
            name: self.name.clone(),
        }
    }
}

/// Statistics about rate limiter usage
#[derive(Debug, Clone)]
pub struct RateLimiterStats {
    pub total_requests: u64,
    pub waited_requests: u64,
    pub rejected_requests: u64,
    pub min_interval_ms: u64,
    pub name: String,
}
