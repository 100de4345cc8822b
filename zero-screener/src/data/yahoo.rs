//! Yahoo chart API adapter for index daily bars.
//!
//! # Endpoint
//! `GET {base}/v8/finance/chart/{symbol}?range=max&interval=1d`
//!
//! # Notes
//! - Timestamps are session opens in UTC; the exchange `gmtoffset` is
//!   applied before taking the calendar day
//! - Days with any null OHLC field are dropped
//! - Unknown symbols come back as a chart error, mapped to `DataNotAvailable`

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use zero_common::config::MarketConfig;
use zero_common::util::truncate_with_ellipsis;

use super::provider::{BarsProvider, ProviderError};
use super::OhlcBar;

// ============================================================================
// Constants
// ============================================================================

/// Chart endpoint path segments
const CHART_PATH: &[&str] = &["v8", "finance", "chart"];

/// Browser-like user agent; the API rejects bare clients
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) zero-screener";

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: Option<ChartMeta>,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteSeries>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteSeries {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
}

fn session_date(timestamp: i64, gmtoffset: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(timestamp + gmtoffset, 0).map(|dt| dt.date_naive())
}

fn parse_chart(symbol: &str, response: ChartResponse) -> Result<Vec<OhlcBar>, ProviderError> {
    if let Some(err) = response.chart.error {
        return Err(ProviderError::DataNotAvailable(format!(
            "{}: {} {}",
            symbol, err.code, err.description
        )));
    }

    let Some(result) = response.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };

    let gmtoffset = result.meta.map(|m| m.gmtoffset).unwrap_or(0);
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

    let bars = result
        .timestamp
        .iter()
        .enumerate()
        .filter_map(|(i, ts)| {
            let field = |series: &Vec<Option<f64>>| series.get(i).copied().flatten();
            Some(OhlcBar {
                date: session_date(*ts, gmtoffset)?,
                open: field(&quote.open)?,
                high: field(&quote.high)?,
                low: field(&quote.low)?,
                close: field(&quote.close)?,
            })
        })
        .collect();

    Ok(bars)
}

// ============================================================================
// Adapter
// ============================================================================

/// Chart API adapter for full daily index history.
pub struct YahooChartAdapter {
    base_url: String,
    client: reqwest::Client,
}

impl YahooChartAdapter {
    /// Create an adapter against `base_url` with a request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            base_url: base_url.into(),
            client,
        }
    }

    /// Create from config
    pub fn from_config(config: &MarketConfig) -> Self {
        Self::new(&config.base_url, Duration::from_secs(config.timeout_secs))
    }

    fn chart_url(&self, symbol: &str) -> Result<url::Url, ProviderError> {
        let mut url = url::Url::parse(&self.base_url)
            .map_err(|e| ProviderError::InvalidRequest(format!("bad base URL: {e}")))?;

        url.path_segments_mut()
            .map_err(|_| ProviderError::InvalidRequest("base URL cannot have a path".into()))?
            .pop_if_empty()
            .extend(CHART_PATH)
            .push(symbol);

        url.query_pairs_mut()
            .append_pair("range", "max")
            .append_pair("interval", "1d");

        Ok(url)
    }
}

#[async_trait]
impl BarsProvider for YahooChartAdapter {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    async fn get_daily_bars(&self, symbol: &str) -> Result<Vec<OhlcBar>, ProviderError> {
        if symbol.trim().is_empty() {
            return Err(ProviderError::InvalidRequest("empty symbol".into()));
        }

        let url = self.chart_url(symbol)?;
        debug!(symbol, url = %url, "Fetching daily bars");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        match serde_json::from_str::<ChartResponse>(&body) {
            Ok(chart) => parse_chart(symbol, chart),
            Err(_) if !status.is_success() => {
                Err(ProviderError::Network(format!("HTTP {} for {}", status, symbol)))
            }
            Err(e) => {
                debug!(symbol, body = %truncate_with_ellipsis(&body, 200), "Unreadable chart body");
                Err(ProviderError::Malformed(e.to_string()))
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
