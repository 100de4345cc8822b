//! Listing screener engine.
//!
//! Filters the listing and numerology tables, joins them on calendar date,
//! and derives volatility and close-change metrics from index bars.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │   Listings   │   │  Numerology  │   │  MarketBars  │
//! │   (Table)    │   │   (Table)    │   │ (TTL cache)  │
//! └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!        │                  │                  │
//!        ▼                  ▼                  ▼
//! ┌─────────────────────────────────┐   ┌──────────────┐
//! │ filter ──▶ join (lookup / bulk) │   │   metrics    │
//! └───────────────┬─────────────────┘   └──────┬───────┘
//!                 └──────────┬─────────────────┘
//!                            ▼
//!                 ScreenResponse ──▶ export (CSV)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use zero_screener::screener::{Screener, ScreenRequest};
//!
//! let screener = Screener::new(listings, numerology, excluded_columns);
//! let response = screener.screen(request, &market).await?;
//! let csv = response.to_csv(screener.numerology().columns())?;
//! ```

pub mod engine;
pub mod export;
pub mod filter;
pub mod join;
pub mod metrics;

pub use engine::{
    ListingOptions, Notice, NoticeKind, ScreenRequest, ScreenResponse, ScreenResult, Screener,
};
pub use filter::{filter_table, narrow, ColumnChoices, Constraint, NarrowedFilter, Selection};
pub use join::{
    bulk_join, lookup_numerology, numerology_dates, DateMatchFlags, JoinedCompany, JoinedTable,
    LookupOutcome,
};
pub use metrics::{derive_metrics, filter_metrics, DerivedBar, MetricColumn, MetricFilter, Operator};
