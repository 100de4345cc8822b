//! Zero Screener Library
//!
//! Screens a table of listed companies by sector and symbol, matches their
//! listing and incorporation dates against a date-keyed numerology table,
//! and derives volatility and close-change metrics from index daily bars.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                   zero-screener (Rust Service)                      │
//! │                           :4440                                     │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────┐     │
//! │  │  Table Loaders  │  │  Screener       │  │  Market Bars    │     │
//! │  │  (csv)          │  │  filter / join  │  │  (TTL cache)    │     │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────┘     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modes
//!
//! - **Listings**: Symbol / SECTOR / SUB SECTOR inclusion filters
//! - **Lookup**: one company's NSE, BSE or incorporation date against the
//!   numerology table
//! - **Bulk join**: filtered numerology dates against all three listing
//!   dates, with per-column match flags
//! - **Market**: `VolatilityPercent` and `ClosePercent` comparison filters
//!   over an index's daily history

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod data;
pub mod routes;
pub mod screener;

pub use routes::build_router;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, info_span, Instrument};
use zero_common::config::Config;
use zero_common::logging::generate_interaction_id;

use crate::data::MarketBars;
use crate::screener::{ScreenRequest, ScreenResponse, Screener};

/// Screener service state
pub struct ScreenerState {
    /// Configuration
    pub config: Config,
    /// Loaded listing and numerology tables
    pub screener: Screener,
    /// Cached index bars
    pub market: MarketBars,
}

impl ScreenerState {
    /// Create state from already loaded parts
    pub fn new(config: Config, screener: Screener, market: MarketBars) -> Self {
        Self {
            config,
            screener,
            market,
        }
    }

    /// Load both tables named in the config and build the market service.
    pub fn load(config: Config) -> Result<Self> {
        let listings_path = config.screener.listings_file();
        let numerology_path = config.screener.numerology_file();

        let listings = data::load_listings(&listings_path)
            .with_context(|| format!("Failed to load listings from {}", listings_path.display()))?;
        let numerology = data::load_numerology(&numerology_path).with_context(|| {
            format!(
                "Failed to load numerology from {}",
                numerology_path.display()
            )
        })?;

        let screener = Screener::new(
            listings,
            numerology,
            config.screener.excluded_columns.clone(),
        );
        let market = MarketBars::from_config(&config.screener.market);

        info!(
            listings = screener.listings().len(),
            numerology = screener.numerology().len(),
            symbols = market.symbols().len(),
            "Screener state loaded"
        );

        Ok(Self::new(config, screener, market))
    }

    /// Run one screening request under its own interaction span.
    pub async fn handle(&self, request: ScreenRequest) -> zero_common::Result<ScreenResponse> {
        let span = info_span!("screen", interaction_id = %generate_interaction_id());
        self.screener.screen(request, &self.market).instrument(span).await
    }
}

/// Main screener service
pub struct ScreenerService {
    state: Arc<ScreenerState>,
}

impl ScreenerService {
    /// Create a new screener service, loading the input tables
    pub fn new(config: Config) -> Result<Self> {
        let state = Arc::new(ScreenerState::load(config)?);
        Ok(Self { state })
    }

    /// Start the HTTP server
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self.state.config.screener_addr().parse()?;
        let app = build_router(self.state.clone());

        info!(address = %addr, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
