//! Tabular data module for the listing screener.
//!
//! Holds the three record types the screener works on and the table
//! container they live in:
//! - **CompanyRecord**: one listed company with its three origin dates
//! - **NumerologyRecord**: one numerology row keyed by calendar date
//! - **OhlcBar**: one daily bar of an index
//!
//! Both spreadsheet tables are loaded once and shared read-only. The market
//! bars come from a provider behind a TTL cache.

mod cache;
pub mod dates;
pub mod loader;
mod market;
mod provider;
mod yahoo;

pub use cache::{BarCache, CacheStats};
pub use loader::{load_listings, load_numerology, read_listings, read_numerology};
pub use market::MarketBars;
pub use provider::{BarsProvider, ProviderError};
pub use yahoo::YahooChartAdapter;

use chrono::NaiveDate;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{HashMap, HashSet};
use std::fmt;

// ============================================================================
// Column Names
// ============================================================================

/// Listing table: company symbol
pub const SYMBOL: &str = "Symbol";
/// Listing table: sector classification
pub const SECTOR: &str = "SECTOR";
/// Listing table: sub-sector classification
pub const SUB_SECTOR: &str = "SUB SECTOR";
/// Listing table: NSE listing date
pub const NSE_LISTING_DATE: &str = "NSE LISTING DATE";
/// Listing table: BSE listing date
pub const BSE_LISTING_DATE: &str = "BSE LISTING DATE";
/// Listing table: date of incorporation
pub const DATE_OF_INCORPORATION: &str = "DATE OF INCORPORATION";

/// Numerology table: the calendar date key
pub const NUMEROLOGY_DATE: &str = "date";
pub const BN: &str = "BN";
pub const DN: &str = "DN";
pub const SN: &str = "SN";
pub const HP: &str = "HP";
pub const DAY_NUMBER: &str = "Day Number";

/// Columns every listing table must carry.
pub const LISTING_REQUIRED_COLUMNS: &[&str] = &[
    SYMBOL,
    SECTOR,
    SUB_SECTOR,
    NSE_LISTING_DATE,
    BSE_LISTING_DATE,
    DATE_OF_INCORPORATION,
];

/// Columns every numerology table must carry.
pub const NUMEROLOGY_REQUIRED_COLUMNS: &[&str] = &[NUMEROLOGY_DATE, BN, DN, SN, HP, DAY_NUMBER];

// ============================================================================
// Cell
// ============================================================================

/// A single table value.
///
/// `PartialEq` is structural (two `Missing` cells are equal as data).
/// Filtering and joining use [`Cell::matches`], under which `Missing`
/// never matches anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Missing,
    Number(f64),
    Date(NaiveDate),
    Text(String),
}

impl Cell {
    /// Text cell, or `Missing` for blank input.
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.trim().is_empty() {
            Self::Missing
        } else {
            Self::Text(value)
        }
    }

    /// Date cell, or `Missing` when the date is absent.
    pub fn date(value: Option<NaiveDate>) -> Self {
        value.map_or(Self::Missing, Self::Date)
    }

    /// Typed equality used by filters and joins.
    ///
    /// Text compared against a number or date cell is parsed first, so a
    /// selection of `"5"` matches `Number(5.0)` and `"2021-03-15"` matches
    /// the corresponding date.
    pub fn matches(&self, other: &Cell) -> bool {
        match (self, other) {
            (Self::Missing, _) | (_, Self::Missing) => false,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            (Self::Date(d), Self::Text(t)) | (Self::Text(t), Self::Date(d)) => {
                dates::parse_iso(t) == Some(*d)
            }
            (Self::Number(n), Self::Text(t)) | (Self::Text(t), Self::Number(n)) => {
                t.trim().parse::<f64>().map_or(false, |v| v == *n)
            }
            _ => false,
        }
    }

    /// Key identifying distinct non-missing values.
    fn distinct_key(&self) -> Option<(u8, String)> {
        match self {
            Self::Missing => None,
            Self::Number(n) => Some((0, n.to_bits().to_string())),
            Self::Date(d) => Some((1, d.to_string())),
            Self::Text(t) => Some((2, t.clone())),
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => Ok(()),
            Self::Number(n) => f.write_str(&render_number(*n)),
            Self::Date(d) => write!(f, "{}", d.format(dates::ISO_FORMAT)),
            Self::Text(t) => f.write_str(t),
        }
    }
}

/// Render a number the way it is displayed and exported.
///
/// Integral values drop the fractional part ("5" rather than "5.0").
pub fn render_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}

/// Distinct non-missing values in first-appearance order.
pub fn distinct_cells(cells: impl IntoIterator<Item = Cell>) -> Vec<Cell> {
    let mut seen = HashSet::new();
    cells
        .into_iter()
        .filter(|c| c.distinct_key().map_or(false, |k| seen.insert(k)))
        .collect()
}

// ============================================================================
// Record & Table
// ============================================================================

/// A row type that can be looked up by column name.
pub trait Record {
    /// Value in `column`, or `None` if this row has no such column.
    fn cell(&self, column: &str) -> Option<Cell>;
}

/// An ordered column schema plus ordered rows.
///
/// The schema order is the source order; serialization and export follow it.
#[derive(Debug, Clone, PartialEq)]
pub struct Table<R> {
    columns: Vec<String>,
    rows: Vec<R>,
}

impl<R> Table<R> {
    pub fn new(columns: Vec<String>, rows: Vec<R>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, R> {
        self.rows.iter()
    }

    pub fn into_rows(self) -> Vec<R> {
        self.rows
    }

    /// Same schema, different rows.
    pub fn with_rows(&self, rows: Vec<R>) -> Self {
        Self {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Drop the named columns from the schema; rows are kept as-is.
    pub fn without_columns(mut self, excluded: &[String]) -> Self {
        self.columns.retain(|c| !excluded.contains(c));
        self
    }
}

impl<R: Record> Table<R> {
    /// Cells of one row in schema order.
    pub fn row_cells(&self, row: &R) -> Vec<Cell> {
        self.columns
            .iter()
            .map(|c| row.cell(c).unwrap_or(Cell::Missing))
            .collect()
    }

    /// Distinct non-missing values of a column in first-appearance order.
    pub fn distinct(&self, column: &str) -> Vec<Cell> {
        distinct_cells(self.rows.iter().filter_map(|r| r.cell(column)))
    }
}

impl<R: Record> Serialize for Table<R> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let rows: Vec<Vec<Cell>> = self.rows.iter().map(|r| self.row_cells(r)).collect();
        let mut state = serializer.serialize_struct("Table", 3)?;
        state.serialize_field("columns", &self.columns)?;
        state.serialize_field("row_count", &rows.len())?;
        state.serialize_field("rows", &rows)?;
        state.end()
    }
}

// ============================================================================
// Company Records
// ============================================================================

/// Which of a company's three origin dates to use.
///
/// Deserializes from any label [`DateColumn::parse`] accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum DateColumn {
    NseListing,
    BseListing,
    Incorporation,
}

impl DateColumn {
    pub const ALL: [DateColumn; 3] = [Self::NseListing, Self::BseListing, Self::Incorporation];

    /// Source column name.
    pub fn column_name(&self) -> &'static str {
        match self {
            Self::NseListing => NSE_LISTING_DATE,
            Self::BseListing => BSE_LISTING_DATE,
            Self::Incorporation => DATE_OF_INCORPORATION,
        }
    }

    /// Parse from a short label or the source column name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "NSE" | "NSE_LISTING" | "NSE LISTING DATE" => Some(Self::NseListing),
            "BSE" | "BSE_LISTING" | "BSE LISTING DATE" => Some(Self::BseListing),
            "INC" | "INCORPORATION" | "DATE OF INCORPORATION" => Some(Self::Incorporation),
            _ => None,
        }
    }
}

impl TryFrom<String> for DateColumn {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("unknown date source '{}'", value))
    }
}

impl fmt::Display for DateColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// One listed company.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompanyRecord {
    pub symbol: Option<String>,
    pub sector: Option<String>,
    pub sub_sector: Option<String>,
    pub nse_listing_date: Option<NaiveDate>,
    pub bse_listing_date: Option<NaiveDate>,
    pub incorporation_date: Option<NaiveDate>,
    /// Pass-through columns keyed by source header
    pub extra: HashMap<String, Cell>,
}

impl CompanyRecord {
    pub fn date(&self, column: DateColumn) -> Option<NaiveDate> {
        match column {
            DateColumn::NseListing => self.nse_listing_date,
            DateColumn::BseListing => self.bse_listing_date,
            DateColumn::Incorporation => self.incorporation_date,
        }
    }
}

fn opt_text(value: &Option<String>) -> Cell {
    value.as_deref().map_or(Cell::Missing, Cell::text)
}

impl Record for CompanyRecord {
    fn cell(&self, column: &str) -> Option<Cell> {
        match column {
            SYMBOL => Some(opt_text(&self.symbol)),
            SECTOR => Some(opt_text(&self.sector)),
            SUB_SECTOR => Some(opt_text(&self.sub_sector)),
            NSE_LISTING_DATE => Some(Cell::date(self.nse_listing_date)),
            BSE_LISTING_DATE => Some(Cell::date(self.bse_listing_date)),
            DATE_OF_INCORPORATION => Some(Cell::date(self.incorporation_date)),
            other => self.extra.get(other).cloned(),
        }
    }
}

// ============================================================================
// Numerology Records
// ============================================================================

/// One numerology row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NumerologyRecord {
    pub date: Option<NaiveDate>,
    /// BN, DN, SN, HP, Day Number and any opaque columns
    pub fields: HashMap<String, Cell>,
}

impl NumerologyRecord {
    pub fn field(&self, name: &str) -> Cell {
        self.fields.get(name).cloned().unwrap_or(Cell::Missing)
    }
}

impl Record for NumerologyRecord {
    fn cell(&self, column: &str) -> Option<Cell> {
        if column == NUMEROLOGY_DATE {
            Some(Cell::date(self.date))
        } else {
            self.fields.get(column).cloned()
        }
    }
}

// ============================================================================
// Market Bars
// ============================================================================

/// One daily OHLC bar of an index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcBar {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Open")]
    pub open: f64,
    #[serde(rename = "High")]
    pub high: f64,
    #[serde(rename = "Low")]
    pub low: f64,
    #[serde(rename = "Close")]
    pub close: f64,
}

// ============================================================================
// Tests
// ============================================================================
