//! Stock provider integration for the Market Dashboard
//!
//! This crate provides a throttled client for the stock aggregates API:
//! previous-close quotes, ranged aggregates for charts, and ticker search.

pub mod client;
pub mod history;
pub mod rate_limiter;
pub mod types;

pub use client::{PolygonClient, PolygonConfig, StockHistoryRequest};
pub use history::StockHistory;
pub use rate_limiter::{RateLimiter, RateLimiterStats, DEFAULT_MAX_QUEUED, POLYGON_MIN_REQUEST_INTERVAL_MS};
