//! Hosted backend integration for the Market Dashboard
//!
//! This crate talks to a Supabase-compatible project:
//! - GoTrue-style email/password auth (`SupabaseAuth`)
//! - PostgREST tables for watchlists and preferences
//! - the Phoenix realtime socket for live watchlist changes
//!
//! All three share one `SupabaseClient`, which also remembers the access
//! token of every user signed in through it so table calls run under that
//! user's row-level security.

pub mod auth;
pub mod client;
pub mod preferences;
pub mod realtime;
pub mod types;
pub mod watchlist;

pub use auth::SupabaseAuth;
pub use client::{SupabaseClient, SupabaseConfig};
pub use preferences::SupabasePreferencesStore;
pub use realtime::HEARTBEAT_INTERVAL;
pub use watchlist::SupabaseWatchlistStore;
