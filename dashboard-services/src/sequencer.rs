//! Latest-wins sequencing for view slots
//!
//! Each slot (quote list, chart, search results, watchlist) hands out a
//! monotonically increasing ticket per outbound request. A completed request
//! may only write its slot while its ticket is still the newest one issued.
//! Refresh slots may instead accept any result newer than the last applied.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::debug;

/// Ticket taken by one outbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub seq: u64,
    /// Query the request was issued for (search slots only)
    pub query: Option<String>,
}

/// Issues tickets for one slot and judges whether results are still current
#[derive(Debug)]
pub struct RequestSequencer {
    slot: &'static str,
    issued: AtomicU64,
    applied: AtomicU64,
    latest_query: Mutex<Option<String>>,
}

impl RequestSequencer {
    pub fn new(slot: &'static str) -> Self {
        Self {
            slot,
            issued: AtomicU64::new(0),
            applied: AtomicU64::new(0),
            latest_query: Mutex::new(None),
        }
    }

    pub fn slot(&self) -> &'static str {
        self.slot
    }

    pub fn issue(&self) -> Ticket {
        let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        Ticket { seq, query: None }
    }

    /// Ticket tagged with the query it searches for
    pub fn issue_for(&self, query: &str) -> Ticket {
        let mut latest = self.latest_query.lock();
        let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        *latest = Some(query.to_string());
        Ticket {
            seq,
            query: Some(query.to_string()),
        }
    }

    /// Invalidate every outstanding ticket without issuing a request
    pub fn invalidate(&self) {
        let mut latest = self.latest_query.lock();
        self.issued.fetch_add(1, Ordering::SeqCst);
        *latest = None;
    }

    pub fn latest(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }

    /// Whether a result carrying `ticket` may still be applied
    pub fn is_current(&self, ticket: &Ticket) -> bool {
        let latest = self.latest_query.lock();
        let current = ticket.seq == self.issued.load(Ordering::SeqCst)
            && (ticket.query.is_none() || ticket.query == *latest);
        if !current {
            debug!(
                "Discarding stale {} result (ticket {}, latest {})",
                self.slot,
                ticket.seq,
                self.issued.load(Ordering::SeqCst)
            );
        }
        current
    }

    /// Record `ticket` as applied unless a newer one already was
    pub fn accept_newer(&self, ticket: &Ticket) -> bool {
        let previous = self.applied.fetch_max(ticket.seq, Ordering::SeqCst);
        if previous >= ticket.seq {
            debug!(
                "Discarding {} result older than the one shown (ticket {}, applied {})",
                self.slot, ticket.seq, previous
            );
            return false;
        }
        true
    }
}
