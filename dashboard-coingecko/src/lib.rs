//! Crypto market data integration for the Market Dashboard
//!
//! This crate provides a client for the CoinGecko-compatible public API:
//! top listings, market charts, search and the global market snapshot.
//! No authentication is required.

pub mod client;
pub mod types;

pub use client::{CoinGeckoClient, CoinGeckoConfig, COINGECKO_API_BASE, DEFAULT_TOP_LIMIT};
