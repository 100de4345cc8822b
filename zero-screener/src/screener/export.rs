//! Delimited-text export of result tables.
//!
//! Output depends only on the table passed in: header from the schema,
//! then one record per row. Dates render as `%Y-%m-%d`, integral numbers
//! drop the fractional part, missing values are empty fields.

use csv::Writer;
use zero_common::{Error, Result};

use super::join::JoinedTable;
use super::metrics::DerivedBar;
use crate::data::{render_number, Cell, Record, Table};

/// Extra columns appended to joined rows.
pub const MATCH_COLUMNS: [&str; 3] = ["NSE_MATCH", "BSE_MATCH", "INC_MATCH"];

/// Column order for derived bars.
pub const BAR_COLUMNS: [&str; 7] = [
    "Date",
    "Open",
    "High",
    "Low",
    "Close",
    "VolatilityPercent",
    "ClosePercent",
];

fn csv_error(e: csv::Error) -> Error {
    Error::Internal(format!("CSV encoding failed: {e}"))
}

fn finish(writer: Writer<Vec<u8>>) -> Result<Vec<u8>> {
    writer
        .into_inner()
        .map_err(|e| Error::Internal(format!("CSV flush failed: {}", e.error())))
}

fn render(cell: &Cell) -> String {
    cell.to_string()
}

fn render_opt(value: Option<f64>) -> String {
    value.map(render_number).unwrap_or_default()
}

/// Export any table in schema order.
pub fn table_to_csv<R: Record>(table: &Table<R>) -> Result<Vec<u8>> {
    let mut writer = Writer::from_writer(Vec::new());
    writer.write_record(table.columns()).map_err(csv_error)?;

    for row in table.iter() {
        let fields: Vec<String> = table.row_cells(row).iter().map(render).collect();
        writer.write_record(&fields).map_err(csv_error)?;
    }

    finish(writer)
}

/// Export joined companies with their match flags.
pub fn joined_to_csv(joined: &JoinedTable) -> Result<Vec<u8>> {
    let table = &joined.table;
    let mut writer = Writer::from_writer(Vec::new());

    let mut header: Vec<&str> = table.columns().iter().map(String::as_str).collect();
    header.extend(MATCH_COLUMNS);
    writer.write_record(&header).map_err(csv_error)?;

    for row in table.iter() {
        let mut fields: Vec<String> = table.row_cells(row).iter().map(render).collect();
        fields.extend(
            [row.matches.nse, row.matches.bse, row.matches.incorporation]
                .iter()
                .map(|flag| flag.to_string()),
        );
        writer.write_record(&fields).map_err(csv_error)?;
    }

    finish(writer)
}

/// Export derived bars.
pub fn bars_to_csv(bars: &[DerivedBar]) -> Result<Vec<u8>> {
    let mut writer = Writer::from_writer(Vec::new());
    writer.write_record(BAR_COLUMNS).map_err(csv_error)?;

    for derived in bars {
        let bar = &derived.bar;
        writer
            .write_record([
                bar.date.format(crate::data::dates::ISO_FORMAT).to_string(),
                render_number(bar.open),
                render_number(bar.high),
                render_number(bar.low),
                render_number(bar.close),
                render_opt(derived.volatility_percent),
                render_opt(derived.close_percent),
            ])
            .map_err(csv_error)?;
    }

    finish(writer)
}

// ============================================================================
// Tests
// ============================================================================
