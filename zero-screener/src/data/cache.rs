//! Bar cache for market data.
//!
//! Provides in-memory caching with TTL for daily index bars so the
//! external chart API is hit at most once per symbol per window.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

use super::OhlcBar;

/// Default TTL: one hour
const DEFAULT_TTL_SECS: i64 = 3600;

/// Cache entry with TTL
#[derive(Debug, Clone)]
struct CacheEntry<T> {
    data: T,
    expires_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    fn new(data: T, ttl_secs: i64) -> Self {
        Self {
            data,
            expires_at: Utc::now() + Duration::seconds(ttl_secs),
        }
    }

    fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// Daily bar cache keyed by symbol
pub struct BarCache {
    bars: RwLock<HashMap<String, CacheEntry<Vec<OhlcBar>>>>,
    ttl_secs: i64,
}

impl BarCache {
    /// Create a new cache with the default one-hour TTL
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL_SECS)
    }

    /// Create with custom TTL
    pub fn with_ttl(ttl_secs: i64) -> Self {
        Self {
            bars: RwLock::new(HashMap::new()),
            ttl_secs,
        }
    }

    /// Get cached bars if not expired
    pub fn get(&self, symbol: &str) -> Option<Vec<OhlcBar>> {
        let cache = self.bars.read().ok()?;

        cache.get(symbol).and_then(|entry| {
            if entry.is_expired() {
                None
            } else {
                Some(entry.data.clone())
            }
        })
    }

    /// Cache bars for a symbol
    pub fn set(&self, symbol: &str, bars: Vec<OhlcBar>) {
        let entry = CacheEntry::new(bars, self.ttl_secs);

        if let Ok(mut cache) = self.bars.write() {
            cache.insert(symbol.to_string(), entry);
        }
    }

    /// Invalidate cached bars for a symbol
    pub fn invalidate(&self, symbol: &str) {
        if let Ok(mut cache) = self.bars.write() {
            cache.remove(symbol);
        }
    }

    /// Clear all expired entries
    pub fn clear_expired(&self) {
        if let Ok(mut cache) = self.bars.write() {
            cache.retain(|_, entry| !entry.is_expired());
        }
    }

    /// Clear all cache
    pub fn clear_all(&self) {
        if let Ok(mut cache) = self.bars.write() {
            cache.clear();
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let bars = self.bars.read().ok();
        let (total, expired) = bars
            .map(|c| {
                let total = c.len();
                let expired = c.values().filter(|e| e.is_expired()).count();
                (total, expired)
            })
            .unwrap_or((0, 0));

        CacheStats {
            total_entries: total,
            expired_entries: expired,
            active_entries: total - expired,
        }
    }
}

impl Default for BarCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub expired_entries: usize,
    pub active_entries: usize,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bar() -> OhlcBar {
        OhlcBar {
            date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            open: 21_700.0,
            high: 21_800.0,
            low: 21_600.0,
            close: 21_750.0,
        }
    }

    #[test]
    fn test_cache_set_get() {
        let cache = BarCache::new();
        cache.set("^NSEI", vec![make_bar()]);

        let cached = cache.get("^NSEI");
        assert!(cached.is_some());
        assert_eq!(cached.unwrap().len(), 1);
    }

    #[test]
    fn test_cache_miss() {
        let cache = BarCache::new();
        assert!(cache.get("^NSEI").is_none());
    }

    #[test]
    fn test_expired_entry_is_miss() {
        let cache = BarCache::with_ttl(-1);
        cache.set("^NSEI", vec![make_bar()]);

        assert!(cache.get("^NSEI").is_none());
        assert_eq!(cache.stats().expired_entries, 1);

        cache.clear_expired();
        assert_eq!(cache.stats().total_entries, 0);
    }

    #[test]
    fn test_cache_invalidate() {
        let cache = BarCache::new();
        cache.set("^NSEI", vec![make_bar()]);
        cache.set("^BSESN", vec![make_bar()]);
        cache.invalidate("^NSEI");

        assert!(cache.get("^NSEI").is_none());
        assert!(cache.get("^BSESN").is_some());
        assert_eq!(cache.stats().active_entries, 1);
    }
}
