//! Integration tests for the market bars pipeline.
//!
//! Failed or empty fetches must degrade to an empty result and must not be
//! cached; successful fetches are served from cache within the TTL.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;

use zero_common::IndexSymbolConfig;
use zero_screener::data::{BarsProvider, MarketBars, OhlcBar, ProviderError};
use zero_screener::screener::{
    derive_metrics, filter_metrics, MetricColumn, MetricFilter, Operator,
};

// ============================================================================
// Mock Provider
// ============================================================================

#[derive(Clone, Copy)]
enum Behavior {
    Succeed,
    Empty,
    Fail,
}

struct MockProvider {
    behavior: Behavior,
    calls: AtomicU32,
}

impl MockProvider {
    fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            calls: AtomicU32::new(0),
        }
    }

    fn call_count(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }
}

fn bar(day: u32, close: f64) -> OhlcBar {
    OhlcBar {
        date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
        open: close,
        high: close + 10.0,
        low: close - 10.0,
        close,
    }
}

#[async_trait]
impl BarsProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn get_daily_bars(&self, _symbol: &str) -> Result<Vec<OhlcBar>, ProviderError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        match self.behavior {
            // Out of order on purpose; the service sorts
            Behavior::Succeed => Ok(vec![bar(4, 120.0), bar(2, 100.0), bar(3, 110.0)]),
            Behavior::Empty => Ok(Vec::new()),
            Behavior::Fail => Err(ProviderError::Network("mock network failure".into())),
        }
    }
}

fn service(provider: Arc<MockProvider>, ttl_secs: i64) -> MarketBars {
    MarketBars::new(
        provider,
        ttl_secs,
        vec![IndexSymbolConfig::new("^NSEI", "NIFTY 50")],
    )
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_successful_fetch_is_sorted_and_cached() {
    let provider = Arc::new(MockProvider::new(Behavior::Succeed));
    let market = service(provider.clone(), 3600);

    let first = market.daily_bars("^NSEI").await;
    let second = market.daily_bars("^NSEI").await;

    assert_eq!(first.len(), 3);
    assert!(first.windows(2).all(|w| w[0].date < w[1].date));
    assert_eq!(first, second);
    assert_eq!(provider.call_count(), 1);
    assert_eq!(market.cache_stats().active_entries, 1);
}

#[tokio::test]
async fn test_failure_degrades_to_empty_and_is_not_cached() {
    let provider = Arc::new(MockProvider::new(Behavior::Fail));
    let market = service(provider.clone(), 3600);

    assert!(market.daily_bars("^NSEI").await.is_empty());
    assert!(market.daily_bars("^NSEI").await.is_empty());

    assert_eq!(provider.call_count(), 2);
    assert_eq!(market.cache_stats().total_entries, 0);
}

#[tokio::test]
async fn test_empty_response_is_not_cached() {
    let provider = Arc::new(MockProvider::new(Behavior::Empty));
    let market = service(provider.clone(), 3600);

    assert!(market.daily_bars("^UNKNOWN").await.is_empty());
    assert!(!market.is_known("^UNKNOWN"));
    assert_eq!(market.cache_stats().total_entries, 0);
}

#[tokio::test]
async fn test_expired_entries_refetch() {
    let provider = Arc::new(MockProvider::new(Behavior::Succeed));
    let market = service(provider.clone(), -1);

    market.daily_bars("^NSEI").await;
    market.daily_bars("^NSEI").await;

    assert_eq!(provider.call_count(), 2);
}

#[tokio::test]
async fn test_invalidate_forces_refetch() {
    let provider = Arc::new(MockProvider::new(Behavior::Succeed));
    let market = service(provider.clone(), 3600);

    market.daily_bars("^NSEI").await;
    market.invalidate(Some("^NSEI"));
    market.daily_bars("^NSEI").await;

    assert_eq!(provider.call_count(), 2);
}

#[tokio::test]
async fn test_metrics_over_empty_fetch_are_empty() {
    let provider = Arc::new(MockProvider::new(Behavior::Fail));
    let market = service(provider, 3600);

    let derived = derive_metrics(market.daily_bars("^NSEI").await);
    let filters = [
        MetricFilter::new(MetricColumn::VolatilityPercent, Operator::Lt, 50.0),
        MetricFilter::new(MetricColumn::ClosePercent, Operator::None, 0.0),
    ];

    assert!(filter_metrics(&derived, &filters).is_empty());
}
