//! Market bars service.
//!
//! Fronts a `BarsProvider` with the TTL cache. Fetch failures and empty
//! responses degrade to an empty bar set and are never cached, so the next
//! interaction tries again.

use std::sync::Arc;
use tracing::{debug, info, warn};
use zero_common::config::{IndexSymbolConfig, MarketConfig};
use zero_common::util::parse_duration_secs;

use super::cache::{BarCache, CacheStats};
use super::provider::BarsProvider;
use super::yahoo::YahooChartAdapter;
use super::OhlcBar;

/// Cached access to daily index bars.
pub struct MarketBars {
    provider: Arc<dyn BarsProvider>,
    cache: BarCache,
    symbols: Vec<IndexSymbolConfig>,
}

impl MarketBars {
    /// Create with an explicit provider (for testing)
    pub fn new(
        provider: Arc<dyn BarsProvider>,
        cache_ttl_secs: i64,
        symbols: Vec<IndexSymbolConfig>,
    ) -> Self {
        Self {
            provider,
            cache: BarCache::with_ttl(cache_ttl_secs),
            symbols,
        }
    }

    /// Create the chart API backed service from config
    pub fn from_config(config: &MarketConfig) -> Self {
        let ttl = parse_duration_secs(&config.cache_ttl).unwrap_or_else(|e| {
            warn!(cache_ttl = %config.cache_ttl, error = %e, "Invalid cache TTL, using 1h");
            3600
        });

        Self::new(
            Arc::new(YahooChartAdapter::from_config(config)),
            ttl as i64,
            config.symbols.clone(),
        )
    }

    /// Known index symbols offered to the user
    pub fn symbols(&self) -> &[IndexSymbolConfig] {
        &self.symbols
    }

    pub fn is_known(&self, symbol: &str) -> bool {
        self.symbols.iter().any(|s| s.symbol == symbol)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Full daily history for `symbol`, sorted by date.
    ///
    /// Returns an empty vector when the provider fails or has no data.
    pub async fn daily_bars(&self, symbol: &str) -> Vec<OhlcBar> {
        if let Some(bars) = self.cache.get(symbol) {
            debug!(symbol, source = "cache", bars = bars.len(), "Returning cached bars");
            return bars;
        }

        self.cache.clear_expired();

        if !self.is_known(symbol) {
            debug!(symbol, "Fetching bars for a symbol outside the known index list");
        }

        match self.provider.get_daily_bars(symbol).await {
            Ok(mut bars) if !bars.is_empty() => {
                bars.sort_by_key(|b| b.date);
                info!(
                    symbol,
                    source = self.provider.name(),
                    bars = bars.len(),
                    "Fetched daily bars"
                );
                self.cache.set(symbol, bars.clone());
                bars
            }
            Ok(_) => {
                info!(symbol, source = self.provider.name(), "Provider returned no bars");
                Vec::new()
            }
            Err(e) => {
                warn!(
                    symbol,
                    source = self.provider.name(),
                    error = %e,
                    transient = e.is_transient(),
                    "Bar fetch failed, returning empty set"
                );
                Vec::new()
            }
        }
    }

    /// Drop cached bars so the next request refetches.
    pub fn invalidate(&self, symbol: Option<&str>) {
        match symbol {
            Some(s) => self.cache.invalidate(s),
            None => self.cache.clear_all(),
        }
    }
}
