//! Screener engine.
//!
//! Holds the two loaded tables and answers one request at a time. Every
//! operation is a pure function of the tables and the request; nothing is
//! remembered between calls.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use zero_common::{Error, Result};

use super::export;
use super::filter::{filter_table, narrow, ColumnChoices, Constraint};
use super::join::{bulk_join, lookup_numerology, numerology_dates, JoinedTable, LookupOutcome};
use super::metrics::{derive_metrics, filter_metrics, DerivedBar, MetricFilter};
use crate::data::{
    dates::ISO_FORMAT, Cell, CompanyRecord, DateColumn, MarketBars, NumerologyRecord, OhlcBar,
    Table, SECTOR, SUB_SECTOR, SYMBOL,
};

// ============================================================================
// Notices
// ============================================================================

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Info,
    Warning,
}

/// Informational message attached to a result.
///
/// Empty results and unavailable data are reported here, never as errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Warning,
            message: message.into(),
        }
    }
}

fn count_notice(label: &str, count: usize) -> Notice {
    Notice::info(format!("{} ({} result(s))", label, count))
}

// ============================================================================
// Requests & Responses
// ============================================================================

/// One screening request.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ScreenRequest {
    /// Plain listing filter by symbol, sector and sub-sector
    Listings {
        #[serde(default)]
        symbols: Vec<String>,
        #[serde(default)]
        sectors: Vec<String>,
        #[serde(default)]
        sub_sectors: Vec<String>,
    },
    /// Numerology filter panel, applied column by column
    Numerology {
        #[serde(default)]
        constraints: Vec<Constraint>,
    },
    /// One company's date looked up in the numerology table
    Lookup {
        symbol: String,
        date_source: DateColumn,
    },
    /// Filtered numerology dates matched against every listing date
    BulkJoin {
        #[serde(default)]
        numerology: Vec<Constraint>,
        #[serde(default)]
        listings: Vec<Constraint>,
    },
    /// Daily bars of an index with derived metric filters
    Market {
        symbol: String,
        #[serde(default)]
        filters: Vec<MetricFilter>,
    },
}

/// Payload of a screening response.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ScreenResult {
    Listings {
        table: Table<CompanyRecord>,
    },
    Numerology {
        choices: Vec<ColumnChoices>,
        table: Table<NumerologyRecord>,
    },
    Lookup {
        symbol: String,
        date_source: DateColumn,
        outcome: LookupOutcome,
    },
    BulkJoin {
        date_count: usize,
        table: JoinedTable,
    },
    Market {
        symbol: String,
        bars: Vec<DerivedBar>,
    },
}

/// Result plus the notices to show with it.
#[derive(Debug, Clone, Serialize)]
pub struct ScreenResponse {
    #[serde(flatten)]
    pub result: ScreenResult,
    pub notices: Vec<Notice>,
}

impl ScreenResponse {
    fn new(result: ScreenResult, notices: Vec<Notice>) -> Self {
        Self { result, notices }
    }

    /// Suggested download file name.
    pub fn filename(&self) -> String {
        match &self.result {
            ScreenResult::Listings { .. } => "filtered_companies.csv".into(),
            ScreenResult::Numerology { .. } => "filtered_numerology.csv".into(),
            ScreenResult::Lookup { symbol, .. } => {
                format!("{}_numerology.csv", file_stem(symbol))
            }
            ScreenResult::BulkJoin { .. } => "matched_companies.csv".into(),
            ScreenResult::Market { symbol, .. } => format!("{}_bars.csv", file_stem(symbol)),
        }
    }

    /// CSV rendering of the displayed table.
    ///
    /// Informational lookup outcomes export an empty table with the
    /// numerology header.
    pub fn to_csv(&self, numerology_columns: &[String]) -> Result<Vec<u8>> {
        match &self.result {
            ScreenResult::Listings { table } => export::table_to_csv(table),
            ScreenResult::Numerology { table, .. } => export::table_to_csv(table),
            ScreenResult::Lookup { outcome, .. } => match outcome.rows() {
                Some(rows) => export::table_to_csv(rows),
                None => export::table_to_csv(&Table::<NumerologyRecord>::new(
                    numerology_columns.to_vec(),
                    Vec::new(),
                )),
            },
            ScreenResult::BulkJoin { table, .. } => export::joined_to_csv(table),
            ScreenResult::Market { bars, .. } => export::bars_to_csv(bars),
        }
    }
}

/// File-name-safe form of a symbol ("^NSEI" -> "NSEI").
fn file_stem(symbol: &str) -> String {
    let stem: String = symbol
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect();
    if stem.is_empty() {
        "export".into()
    } else {
        stem
    }
}

/// Distinct values for the listing filter panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingOptions {
    pub symbols: Vec<Cell>,
    pub sectors: Vec<Cell>,
    pub sub_sectors: Vec<Cell>,
}

// ============================================================================
// Screener
// ============================================================================

/// Stateless request handler over the loaded tables.
#[derive(Debug, Clone)]
pub struct Screener {
    listings: Arc<Table<CompanyRecord>>,
    numerology: Arc<Table<NumerologyRecord>>,
    excluded_columns: Vec<String>,
}

impl Screener {
    pub fn new(
        listings: Table<CompanyRecord>,
        numerology: Table<NumerologyRecord>,
        excluded_columns: Vec<String>,
    ) -> Self {
        Self {
            listings: Arc::new(listings),
            numerology: Arc::new(numerology),
            excluded_columns,
        }
    }

    pub fn listings(&self) -> &Table<CompanyRecord> {
        &self.listings
    }

    pub fn numerology(&self) -> &Table<NumerologyRecord> {
        &self.numerology
    }

    /// Listing columns suppressed from displayed and exported tables
    pub fn excluded_columns(&self) -> &[String] {
        &self.excluded_columns
    }

    /// Distinct Symbol, SECTOR and SUB SECTOR values in table order.
    pub fn listing_options(&self) -> ListingOptions {
        ListingOptions {
            symbols: self.listings.distinct(SYMBOL),
            sectors: self.listings.distinct(SECTOR),
            sub_sectors: self.listings.distinct(SUB_SECTOR),
        }
    }

    /// Plain listing filter; suppressed columns are dropped from the result.
    pub fn filter_listings(
        &self,
        symbols: &[String],
        sectors: &[String],
        sub_sectors: &[String],
    ) -> Table<CompanyRecord> {
        let constraints = [
            Constraint::any_of(SYMBOL, symbols.iter().cloned()),
            Constraint::any_of(SECTOR, sectors.iter().cloned()),
            Constraint::any_of(SUB_SECTOR, sub_sectors.iter().cloned()),
        ];
        filter_table(&self.listings, &constraints).without_columns(&self.excluded_columns)
    }

    /// Numerology panel: narrowed choices per column and the filtered table.
    pub fn filter_numerology(
        &self,
        constraints: &[Constraint],
    ) -> (Vec<ColumnChoices>, Table<NumerologyRecord>) {
        let narrowed = narrow(&self.numerology, constraints);
        (narrowed.choices, narrowed.table)
    }

    /// Look up the first listing row for `symbol` in the numerology table.
    pub fn lookup(&self, symbol: &str, date_source: DateColumn) -> Result<LookupOutcome> {
        let company = self
            .listings
            .iter()
            .find(|r| r.symbol.as_deref() == Some(symbol))
            .ok_or_else(|| Error::NotFound(format!("symbol '{}'", symbol)))?;

        Ok(lookup_numerology(company, date_source, &self.numerology))
    }

    /// Match the dates of the filtered numerology table against the
    /// filtered listings.
    pub fn bulk_join(
        &self,
        numerology: &[Constraint],
        listings: &[Constraint],
    ) -> (usize, JoinedTable) {
        let dates = numerology_dates(&filter_table(&self.numerology, numerology));
        let candidates = filter_table(&self.listings, listings);
        let joined = bulk_join(&candidates, &dates).without_columns(&self.excluded_columns);
        (dates.len(), joined)
    }

    /// Derived metrics of `bars` after the comparison filters.
    pub fn market_metrics(&self, bars: Vec<OhlcBar>, filters: &[MetricFilter]) -> Vec<DerivedBar> {
        filter_metrics(&derive_metrics(bars), filters)
    }

    /// Run one request end to end.
    pub async fn screen(
        &self,
        request: ScreenRequest,
        market: &MarketBars,
    ) -> Result<ScreenResponse> {
        let response = match request {
            ScreenRequest::Listings {
                symbols,
                sectors,
                sub_sectors,
            } => {
                let table = self.filter_listings(&symbols, &sectors, &sub_sectors);
                let notices = vec![count_notice("Filtered Companies", table.len())];
                ScreenResponse::new(ScreenResult::Listings { table }, notices)
            }

            ScreenRequest::Numerology { constraints } => {
                let (choices, table) = self.filter_numerology(&constraints);
                let mut notices = vec![count_notice("Filtered Numerology", table.len())];
                if table.is_empty() {
                    notices.push(Notice::info("No numerology rows match the selected filters"));
                }
                ScreenResponse::new(ScreenResult::Numerology { choices, table }, notices)
            }

            ScreenRequest::Lookup {
                symbol,
                date_source,
            } => {
                let outcome = self.lookup(&symbol, date_source)?;
                let notice = match &outcome {
                    LookupOutcome::DateUnavailable { column } => Notice::warning(format!(
                        "{} is not available for {}",
                        column, symbol
                    )),
                    LookupOutcome::NoMatch { date } => Notice::info(format!(
                        "No numerology data found for {}",
                        date.format(ISO_FORMAT)
                    )),
                    LookupOutcome::Matched { date, rows } => Notice::info(format!(
                        "{} numerology row(s) for {}",
                        rows.len(),
                        date.format(ISO_FORMAT)
                    )),
                };
                ScreenResponse::new(
                    ScreenResult::Lookup {
                        symbol,
                        date_source,
                        outcome,
                    },
                    vec![notice],
                )
            }

            ScreenRequest::BulkJoin {
                numerology,
                listings,
            } => {
                let (date_count, table) = self.bulk_join(&numerology, &listings);
                let mut notices = vec![count_notice("Matched Companies", table.len())];
                if date_count == 0 {
                    notices.push(Notice::info("No numerology dates selected"));
                } else if table.is_empty() {
                    notices.push(Notice::info("No companies match the selected dates"));
                }
                ScreenResponse::new(ScreenResult::BulkJoin { date_count, table }, notices)
            }

            ScreenRequest::Market { symbol, filters } => {
                let bars = market.daily_bars(&symbol).await;
                let mut notices = Vec::new();
                if bars.is_empty() {
                    notices.push(Notice::warning(format!(
                        "No market data available for {}",
                        symbol
                    )));
                }
                let bars = self.market_metrics(bars, &filters);
                notices.insert(0, count_notice("Daily Bars", bars.len()));
                ScreenResponse::new(ScreenResult::Market { symbol, bars }, notices)
            }
        };

        debug!(file = %response.filename(), notices = response.notices.len(), "Screen complete");
        Ok(response)
    }
}

// ============================================================================
// Tests
// ============================================================================
