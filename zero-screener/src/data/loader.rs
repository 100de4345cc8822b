//! Table loaders for the listing and numerology inputs.
//!
//! Both inputs are spreadsheets exported as delimited text. Date columns
//! that fail to parse become missing values; they never fail the load.
//! A missing required column or an unreadable file does.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::{debug, info, warn};
use zero_common::util::truncate_with_ellipsis;
use zero_common::{Error, Result};

use super::dates::{parse_date, DateOrder};
use super::{
    Cell, CompanyRecord, NumerologyRecord, Table, BSE_LISTING_DATE, DATE_OF_INCORPORATION,
    LISTING_REQUIRED_COLUMNS, NSE_LISTING_DATE, NUMEROLOGY_DATE, NUMEROLOGY_REQUIRED_COLUMNS,
    SECTOR, SUB_SECTOR, SYMBOL,
};

/// Values treated as missing in addition to blank cells.
const NULL_MARKERS: &[&str] = &["nan", "NaN", "NA", "N/A", "n/a", "null", "NULL", "None", "-"];

/// Raw header plus rows as read from the delimited source.
struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    skipped: usize,
}

impl RawTable {
    fn index_of(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == column)
    }

    fn require(&self, columns: &[&str], table: &str) -> Result<()> {
        let missing: Vec<&str> = columns
            .iter()
            .copied()
            .filter(|c| self.index_of(c).is_none())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::InvalidInput(format!(
                "{} table is missing required column(s): {}",
                table,
                missing.join(", ")
            )))
        }
    }
}

fn read_raw<R: Read>(reader: R) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| Error::InvalidInput(format!("Failed to read headers: {e}")))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for (idx, result) in reader.records().enumerate() {
        match result {
            Ok(record) => {
                let mut row: Vec<String> = record.iter().map(str::to_string).collect();
                row.resize(headers.len(), String::new());
                rows.push(row);
            }
            Err(e) => {
                // +2: header is line 1, records are 1-based
                warn!(line = idx + 2, error = %e, "Skipping unreadable row");
                skipped += 1;
            }
        }
    }

    Ok(RawTable {
        headers,
        rows,
        skipped,
    })
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::NotFound(path.display().to_string())
        } else {
            Error::Io(e)
        }
    })
}

/// Convert a raw value into a cell: blank → missing, numeric → number, else text.
///
/// Zero-padded codes such as `007` stay text so they export unchanged.
pub fn parse_cell(raw: &str) -> Cell {
    let raw = raw.trim();
    if raw.is_empty() || NULL_MARKERS.contains(&raw) {
        return Cell::Missing;
    }
    if has_leading_zero(raw) {
        return Cell::Text(raw.to_string());
    }

    match raw.parse::<f64>() {
        Ok(n) if n.is_finite() => Cell::Number(n),
        _ => Cell::Text(raw.to_string()),
    }
}

fn has_leading_zero(raw: &str) -> bool {
    let digits = raw.strip_prefix(['+', '-']).unwrap_or(raw);
    let mut chars = digits.chars();
    chars.next() == Some('0') && chars.next().is_some_and(|c| c.is_ascii_digit())
}

fn parse_text(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || NULL_MARKERS.contains(&raw) {
        None
    } else {
        Some(raw.to_string())
    }
}

fn parse_date_field(
    raw: &str,
    order: DateOrder,
    column: &str,
    misses: &mut usize,
) -> Option<chrono::NaiveDate> {
    let parsed = parse_date(raw, order);
    if parsed.is_none() && parse_text(raw).is_some() {
        *misses += 1;
        debug!(
            column,
            value = %truncate_with_ellipsis(raw, 32),
            "Unparseable date treated as missing"
        );
    }
    parsed
}

// ============================================================================
// Listing Table
// ============================================================================

/// Load the company listing table from a file.
pub fn load_listings(path: &Path) -> Result<Table<CompanyRecord>> {
    let file = open(path)?;
    read_listings(file).map_err(|e| e.with_context(format!("loading {}", path.display())))
}

/// Read the company listing table from any delimited-text source.
pub fn read_listings<R: Read>(reader: R) -> Result<Table<CompanyRecord>> {
    let raw = read_raw(reader)?;
    raw.require(LISTING_REQUIRED_COLUMNS, "Listing")?;

    let mut date_misses = 0usize;
    let records: Vec<CompanyRecord> = raw
        .rows
        .iter()
        .map(|row| {
            let mut record = CompanyRecord::default();
            for (header, value) in raw.headers.iter().zip(row) {
                match header.as_str() {
                    SYMBOL => record.symbol = parse_text(value),
                    SECTOR => record.sector = parse_text(value),
                    SUB_SECTOR => record.sub_sector = parse_text(value),
                    NSE_LISTING_DATE => {
                        record.nse_listing_date =
                            parse_date_field(value, DateOrder::MonthFirst, header, &mut date_misses)
                    }
                    BSE_LISTING_DATE => {
                        record.bse_listing_date =
                            parse_date_field(value, DateOrder::MonthFirst, header, &mut date_misses)
                    }
                    DATE_OF_INCORPORATION => {
                        record.incorporation_date =
                            parse_date_field(value, DateOrder::MonthFirst, header, &mut date_misses)
                    }
                    other => {
                        record.extra.insert(other.to_string(), parse_cell(value));
                    }
                }
            }
            record
        })
        .collect();

    info!(
        rows = records.len(),
        columns = raw.headers.len(),
        skipped = raw.skipped,
        date_misses,
        "Loaded listing table"
    );

    Ok(Table::new(raw.headers, records))
}

// ============================================================================
// Numerology Table
// ============================================================================

/// Load the numerology table from a file.
pub fn load_numerology(path: &Path) -> Result<Table<NumerologyRecord>> {
    let file = open(path)?;
    read_numerology(file).map_err(|e| e.with_context(format!("loading {}", path.display())))
}

/// Read the numerology table from any delimited-text source.
///
/// The date header is matched case-insensitively and renamed to `date`.
/// Dates are read day-first.
pub fn read_numerology<R: Read>(reader: R) -> Result<Table<NumerologyRecord>> {
    let mut raw = read_raw(reader)?;
    for header in raw.headers.iter_mut() {
        if header.eq_ignore_ascii_case(NUMEROLOGY_DATE) {
            *header = NUMEROLOGY_DATE.to_string();
        }
    }
    raw.require(NUMEROLOGY_REQUIRED_COLUMNS, "Numerology")?;

    let mut date_misses = 0usize;
    let records: Vec<NumerologyRecord> = raw
        .rows
        .iter()
        .map(|row| {
            let mut fields = HashMap::new();
            let mut date = None;
            for (header, value) in raw.headers.iter().zip(row) {
                if header == NUMEROLOGY_DATE {
                    date = parse_date_field(value, DateOrder::DayFirst, header, &mut date_misses);
                } else {
                    fields.insert(header.clone(), parse_cell(value));
                }
            }
            NumerologyRecord { date, fields }
        })
        .collect();

    info!(
        rows = records.len(),
        columns = raw.headers.len(),
        skipped = raw.skipped,
        date_misses,
        "Loaded numerology table"
    );

    Ok(Table::new(raw.headers, records))
}

// ============================================================================
// Tests
// ============================================================================
