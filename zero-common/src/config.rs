//! Configuration management for Zero services.
//!
//! The screener shares the unified configuration file at `~/.codecoder/config.json`.
//!
//! # Configuration Priority
//!
//! 1. Environment variables (ZERO_SCREENER_* prefix)
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `ZERO_SCREENER_HOST` → screener.host
//! - `ZERO_SCREENER_PORT` → screener.port
//! - `ZERO_SCREENER_LISTINGS` → screener.listings_path
//! - `ZERO_SCREENER_NUMEROLOGY` → screener.numerology_path
//! - `ZERO_SCREENER_CACHE_TTL` → screener.market.cache_ttl
//! - `ZERO_LOG_LEVEL` → observability.log_level
//! - `ZERO_LOG_FORMAT` → observability.log_format

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new()
        .map_or_else(
            || PathBuf::from(".codecoder"),
            |dirs| dirs.home_dir().join(".codecoder"),
        )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration for the screener service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Screener service configuration
    #[serde(default)]
    pub screener: ScreenerConfig,
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// A missing file is not an error; defaults are used instead.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration with environment variable fallbacks.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("ZERO_SCREENER_HOST") {
            self.screener.host = host;
        }
        if let Ok(port) = std::env::var("ZERO_SCREENER_PORT") {
            if let Ok(p) = port.parse() {
                self.screener.port = p;
            }
        }
        if let Ok(path) = std::env::var("ZERO_SCREENER_LISTINGS") {
            self.screener.listings_path = shellexpand::tilde(&path).into_owned();
        }
        if let Ok(path) = std::env::var("ZERO_SCREENER_NUMEROLOGY") {
            self.screener.numerology_path = shellexpand::tilde(&path).into_owned();
        }
        if let Ok(ttl) = std::env::var("ZERO_SCREENER_CACHE_TTL") {
            self.screener.market.cache_ttl = ttl;
        }
        if let Ok(level) = std::env::var("ZERO_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Ok(format) = std::env::var("ZERO_LOG_FORMAT") {
            self.observability.log_format = format;
        }
    }

    /// Address the screener HTTP service binds to.
    pub fn screener_addr(&self) -> String {
        format!("{}:{}", self.screener.host, self.screener.port)
    }
}

// ============================================================================
// Observability
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    /// Aliases: "level" for backward compatibility with existing config files
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    /// Aliases: "format" for backward compatibility with existing config files
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,

    /// Additional module targets to exclude from logging.
    ///
    /// These modules will be set to `warn` level to reduce noise.
    #[serde(default)]
    pub exclude_targets: Vec<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            exclude_targets: Vec::new(),
        }
    }
}

// ============================================================================
// Screener
// ============================================================================

/// Screener service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenerConfig {
    /// HTTP host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP port
    #[serde(default = "default_screener_port")]
    pub port: u16,

    /// Path to the company listing table (delimited text)
    #[serde(default = "default_listings_path")]
    pub listings_path: String,

    /// Path to the numerology table (delimited text)
    #[serde(default = "default_numerology_path")]
    pub numerology_path: String,

    /// Listing columns suppressed from displayed and exported tables
    #[serde(default = "default_excluded_columns")]
    pub excluded_columns: Vec<String>,

    /// Market bars fetcher configuration
    #[serde(default)]
    pub market: MarketConfig,
}

impl Default for ScreenerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_screener_port(),
            listings_path: default_listings_path(),
            numerology_path: default_numerology_path(),
            excluded_columns: default_excluded_columns(),
            market: MarketConfig::default(),
        }
    }
}

impl ScreenerConfig {
    /// Listing table path with `~` expanded
    pub fn listings_file(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.listings_path).into_owned())
    }

    /// Numerology table path with `~` expanded
    pub fn numerology_file(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.numerology_path).into_owned())
    }
}

/// Market data fetch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Chart API base URL
    #[serde(default = "default_market_base_url")]
    pub base_url: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_market_timeout")]
    pub timeout_secs: u64,

    /// How long fetched bars are reused (e.g. "30m", "1h")
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl: String,

    /// Known index symbols offered to the user
    #[serde(default = "default_index_symbols")]
    pub symbols: Vec<IndexSymbolConfig>,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            base_url: default_market_base_url(),
            timeout_secs: default_market_timeout(),
            cache_ttl: default_cache_ttl(),
            symbols: default_index_symbols(),
        }
    }
}

/// A known index symbol with its display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSymbolConfig {
    /// Provider symbol (e.g. "^NSEI")
    pub symbol: String,
    /// Display name (e.g. "NIFTY 50")
    pub name: String,
}

impl IndexSymbolConfig {
    pub fn new(symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            name: name.into(),
        }
    }
}

// ============================================================================
// Defaults
// ============================================================================

fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "pretty".into()
}
fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_screener_port() -> u16 {
    4440
}
fn default_listings_path() -> String {
    "doc.csv".into()
}
fn default_numerology_path() -> String {
    "numerology.csv".into()
}
fn default_excluded_columns() -> Vec<String> {
    ["Series", "Company Name", "ISIN Code", "IPO TIMING ON NSE"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_market_base_url() -> String {
    "https://query1.finance.yahoo.com".into()
}
fn default_market_timeout() -> u64 {
    30
}
fn default_cache_ttl() -> String {
    "1h".into()
}
fn default_index_symbols() -> Vec<IndexSymbolConfig> {
    vec![
        IndexSymbolConfig::new("^NSEI", "NIFTY 50"),
        IndexSymbolConfig::new("^BSESN", "SENSEX"),
        IndexSymbolConfig::new("^NSEBANK", "NIFTY BANK"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.observability.log_level, "info");
        assert_eq!(config.screener.port, 4440);
        assert_eq!(config.screener.market.cache_ttl, "1h");
        assert_eq!(config.screener.market.symbols.len(), 3);
        assert!(config
            .screener
            .excluded_columns
            .contains(&"ISIN Code".to_string()));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"screener": {{"port": 5000, "market": {{"cache_ttl": "30m"}}}}, "observability": {{"level": "debug"}}}}"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.screener.port, 5000);
        assert_eq!(config.screener.host, "127.0.0.1");
        assert_eq!(config.screener.market.cache_ttl, "30m");
        assert_eq!(config.screener.market.timeout_secs, 30);
        assert_eq!(config.observability.log_level, "debug");
        assert_eq!(config.observability.log_format, "pretty");
    }

    #[test]
    fn test_invalid_file_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(Config::load_from(file.path()).is_err());
    }

    #[test]
    fn test_screener_addr() {
        let config = Config::default();
        assert_eq!(config.screener_addr(), "127.0.0.1:4440");
    }
}
