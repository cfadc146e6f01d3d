//! Server configuration from the environment

use std::str::FromStr;
use std::time::Duration;

use dashboard_coingecko::{COINGECKO_API_BASE, DEFAULT_TOP_LIMIT};
use dashboard_polygon::client::POLYGON_API_BASE;
use dashboard_polygon::POLYGON_MIN_REQUEST_INTERVAL_MS;
use dashboard_services::{ViewConfig, DEFAULT_SEARCH_DEBOUNCE};
use thiserror::Error;

const DEFAULT_PORT: u16 = 3001;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{var} has an invalid value: {value:?}")]
    Invalid { var: &'static str, value: String },

    #[error("{0} must be set together with {1}")]
    Incomplete(&'static str, &'static str),
}

/// Hosted backend credentials
#[derive(Clone)]
pub struct SupabaseSettings {
    pub url: String,
    pub anon_key: String,
}

impl std::fmt::Debug for SupabaseSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseSettings")
            .field("url", &self.url)
            .field("anon_key", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    /// Stock routes answer with a configuration error when absent
    pub polygon_api_key: Option<String>,
    pub polygon_base_url: String,
    pub polygon_min_interval_ms: u64,
    pub coingecko_base_url: String,
    pub coingecko_top_limit: u32,
    /// In-process stores and local sessions when absent
    pub supabase: Option<SupabaseSettings>,
    pub http_timeout: Duration,
    pub crypto_poll: Duration,
    pub stock_poll: Duration,
    pub watchlist_poll: Duration,
    pub search_debounce: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        let views = ViewConfig::default();
        Self {
            port: DEFAULT_PORT,
            polygon_api_key: None,
            polygon_base_url: POLYGON_API_BASE.to_string(),
            polygon_min_interval_ms: POLYGON_MIN_REQUEST_INTERVAL_MS,
            coingecko_base_url: COINGECKO_API_BASE.to_string(),
            coingecko_top_limit: DEFAULT_TOP_LIMIT,
            supabase: None,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            crypto_poll: views.crypto_poll,
            stock_poll: views.stock_poll,
            watchlist_poll: views.watchlist_poll,
            search_debounce: DEFAULT_SEARCH_DEBOUNCE,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source; blank values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let supabase = match (get("SUPABASE_URL"), get("SUPABASE_ANON_KEY")) {
            (Some(url), Some(anon_key)) => Some(SupabaseSettings { url, anon_key }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Incomplete("SUPABASE_URL", "SUPABASE_ANON_KEY")),
            (None, Some(_)) => return Err(ConfigError::Incomplete("SUPABASE_ANON_KEY", "SUPABASE_URL")),
        };

        Ok(Self {
            port: parse(&get, "SERVER_PORT", defaults.port)?,
            polygon_api_key: get("POLYGON_API_KEY"),
            polygon_base_url: get("POLYGON_BASE_URL").unwrap_or(defaults.polygon_base_url),
            polygon_min_interval_ms: parse(&get, "POLYGON_MIN_INTERVAL_MS", defaults.polygon_min_interval_ms)?,
            coingecko_base_url: get("COINGECKO_BASE_URL").unwrap_or(defaults.coingecko_base_url),
            coingecko_top_limit: parse(&get, "COINGECKO_TOP_LIMIT", defaults.coingecko_top_limit)?,
            supabase,
            http_timeout: secs(&get, "HTTP_TIMEOUT_SECS", defaults.http_timeout)?,
            crypto_poll: secs(&get, "CRYPTO_POLL_SECS", defaults.crypto_poll)?,
            stock_poll: secs(&get, "STOCK_POLL_SECS", defaults.stock_poll)?,
            watchlist_poll: secs(&get, "WATCHLIST_POLL_SECS", defaults.watchlist_poll)?,
            search_debounce: Duration::from_millis(parse(
                &get,
                "SEARCH_DEBOUNCE_MS",
                defaults.search_debounce.as_millis() as u64,
            )?),
        })
    }

    pub fn view_config(&self) -> ViewConfig {
        ViewConfig {
            crypto_poll: self.crypto_poll,
            stock_poll: self.stock_poll,
            watchlist_poll: self.watchlist_poll,
            search_debounce: self.search_debounce,
            ..ViewConfig::default()
        }
    }
}

fn parse<T: FromStr>(get: &impl Fn(&str) -> Option<String>, var: &'static str, default: T) -> Result<T, ConfigError> {
    match get(var) {
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid { var, value }),
        None => Ok(default),
    }
}

/// Whole seconds; zero is rejected
fn secs(get: &impl Fn(&str) -> Option<String>, var: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    let value: u64 = parse(get, var, default.as_secs())?;
    if value == 0 {
        return Err(ConfigError::Invalid {
            var,
            value: value.to_string(),
        });
    }
    Ok(Duration::from_secs(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = from(&[]).unwrap();
        assert_eq!(config.port, 3001);
        assert!(config.polygon_api_key.is_none());
        assert!(config.supabase.is_none());
        assert_eq!(config.polygon_min_interval_ms, 12_000);
        assert_eq!(config.coingecko_top_limit, 100);
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.stock_poll, Duration::from_secs(60));
        assert_eq!(config.search_debounce, Duration::from_millis(300));
    }

    #[test]
    fn test_overrides() {
        let config = from(&[
            ("SERVER_PORT", "8080"),
            ("POLYGON_API_KEY", "pk"),
            ("SUPABASE_URL", "https://proj.example.co"),
            ("SUPABASE_ANON_KEY", "anon"),
            ("CRYPTO_POLL_SECS", "5"),
            ("SEARCH_DEBOUNCE_MS", "150"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.polygon_api_key.as_deref(), Some("pk"));
        assert_eq!(config.supabase.unwrap().url, "https://proj.example.co");

        let views = from(&[("CRYPTO_POLL_SECS", "5"), ("SEARCH_DEBOUNCE_MS", "150")])
            .unwrap()
            .view_config();
        assert_eq!(views.crypto_poll, Duration::from_secs(5));
        assert_eq!(views.search_debounce, Duration::from_millis(150));
        assert_eq!(views.stock_poll, Duration::from_secs(60));
    }

    #[test]
    fn test_blank_key_counts_as_unset() {
        let config = from(&[("POLYGON_API_KEY", "  ")]).unwrap();
        assert!(config.polygon_api_key.is_none());
    }

    #[test]
    fn test_rejects_bad_values() {
        assert_eq!(
            from(&[("SERVER_PORT", "http")]).unwrap_err(),
            ConfigError::Invalid {
                var: "SERVER_PORT",
                value: "http".to_string()
            }
        );
        assert!(from(&[("STOCK_POLL_SECS", "0")]).is_err());
        assert_eq!(
            from(&[("SUPABASE_URL", "https://proj.example.co")]).unwrap_err(),
            ConfigError::Incomplete("SUPABASE_URL", "SUPABASE_ANON_KEY")
        );
    }
}
