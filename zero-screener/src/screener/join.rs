//! Date join between listings and numerology.
//!
//! Two directions:
//! - **Single lookup**: one company, one of its date columns, all numerology
//!   rows on that exact day
//! - **Bulk join**: a set of numerology dates, every company with any of its
//!   three dates in the set, each row flagged per column
//!
//! Dates compare by calendar day. Missing dates never match.

use chrono::NaiveDate;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::collections::HashSet;
use tracing::debug;

use crate::data::{Cell, CompanyRecord, DateColumn, NumerologyRecord, Record, Table};

// ============================================================================
// Single Lookup
// ============================================================================

/// Outcome of looking up one company's date in the numerology table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LookupOutcome {
    /// The chosen date column is empty for this company
    DateUnavailable { column: DateColumn },
    /// The date is present but no numerology row has it
    NoMatch { date: NaiveDate },
    /// Every numerology row on the date, in table order
    Matched {
        date: NaiveDate,
        rows: Table<NumerologyRecord>,
    },
}

impl LookupOutcome {
    /// Matched rows, or none for the informational outcomes.
    pub fn rows(&self) -> Option<&Table<NumerologyRecord>> {
        match self {
            Self::Matched { rows, .. } => Some(rows),
            _ => None,
        }
    }
}

/// Find all numerology rows dated on `company`'s `column` date.
pub fn lookup_numerology(
    company: &CompanyRecord,
    column: DateColumn,
    numerology: &Table<NumerologyRecord>,
) -> LookupOutcome {
    let Some(date) = company.date(column) else {
        return LookupOutcome::DateUnavailable { column };
    };

    let rows: Vec<NumerologyRecord> = numerology
        .iter()
        .filter(|r| r.date == Some(date))
        .cloned()
        .collect();

    debug!(
        symbol = company.symbol.as_deref().unwrap_or(""),
        column = %column,
        %date,
        matched = rows.len(),
        "Numerology lookup"
    );

    if rows.is_empty() {
        LookupOutcome::NoMatch { date }
    } else {
        LookupOutcome::Matched {
            date,
            rows: numerology.with_rows(rows),
        }
    }
}

/// Non-missing dates of a numerology table.
pub fn numerology_dates(table: &Table<NumerologyRecord>) -> HashSet<NaiveDate> {
    table.iter().filter_map(|r| r.date).collect()
}

// ============================================================================
// Bulk Join
// ============================================================================

/// Which of a company's date columns fall in the joined date set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DateMatchFlags {
    pub nse: bool,
    pub bse: bool,
    pub incorporation: bool,
}

impl DateMatchFlags {
    /// Flag each column whose own value is in `dates`.
    pub fn compute(company: &CompanyRecord, dates: &HashSet<NaiveDate>) -> Self {
        let hit = |column| company.date(column).map_or(false, |d| dates.contains(&d));
        Self {
            nse: hit(DateColumn::NseListing),
            bse: hit(DateColumn::BseListing),
            incorporation: hit(DateColumn::Incorporation),
        }
    }

    pub fn any(&self) -> bool {
        self.nse || self.bse || self.incorporation
    }

    pub fn get(&self, column: DateColumn) -> bool {
        match column {
            DateColumn::NseListing => self.nse,
            DateColumn::BseListing => self.bse,
            DateColumn::Incorporation => self.incorporation,
        }
    }
}

/// A company row carrying its match flags.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedCompany {
    pub record: CompanyRecord,
    pub matches: DateMatchFlags,
}

impl Record for JoinedCompany {
    fn cell(&self, column: &str) -> Option<Cell> {
        self.record.cell(column)
    }
}

/// Result of a bulk join: listing schema plus flagged rows.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedTable {
    pub table: Table<JoinedCompany>,
}

impl JoinedTable {
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, JoinedCompany> {
        self.table.iter()
    }

    /// Drop columns from the schema; flags are unaffected.
    pub fn without_columns(self, excluded: &[String]) -> Self {
        Self {
            table: self.table.without_columns(excluded),
        }
    }
}

impl Serialize for JoinedTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let rows: Vec<Vec<Cell>> = self.table.iter().map(|r| self.table.row_cells(r)).collect();
        let flags: Vec<DateMatchFlags> = self.table.iter().map(|r| r.matches).collect();

        let mut state = serializer.serialize_struct("JoinedTable", 4)?;
        state.serialize_field("columns", self.table.columns())?;
        state.serialize_field("row_count", &rows.len())?;
        state.serialize_field("rows", &rows)?;
        state.serialize_field("matches", &flags)?;
        state.end()
    }
}

/// Companies with any of their three dates in `dates`, in listing order.
pub fn bulk_join(listings: &Table<CompanyRecord>, dates: &HashSet<NaiveDate>) -> JoinedTable {
    let rows: Vec<JoinedCompany> = listings
        .iter()
        .filter_map(|record| {
            let matches = DateMatchFlags::compute(record, dates);
            matches.any().then(|| JoinedCompany {
                record: record.clone(),
                matches,
            })
        })
        .collect();

    debug!(
        companies = listings.len(),
        dates = dates.len(),
        matched = rows.len(),
        "Bulk date join"
    );

    JoinedTable {
        table: Table::new(listings.columns().to_vec(), rows),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{BN, NUMEROLOGY_DATE, SYMBOL};
    use std::collections::HashMap;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn numerology_row(date: Option<NaiveDate>, bn: f64) -> NumerologyRecord {
        NumerologyRecord {
            date,
            fields: HashMap::from([(BN.to_string(), Cell::Number(bn))]),
        }
    }

    fn numerology(rows: Vec<NumerologyRecord>) -> Table<NumerologyRecord> {
        Table::new(vec![NUMEROLOGY_DATE.into(), BN.into()], rows)
    }

    fn company(symbol: &str) -> CompanyRecord {
        CompanyRecord {
            symbol: Some(symbol.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_lookup_date_unavailable() {
        let table = numerology(vec![numerology_row(Some(d(2021, 3, 15)), 5.0)]);
        let outcome = lookup_numerology(&company("X"), DateColumn::BseListing, &table);
        assert_eq!(
            outcome,
            LookupOutcome::DateUnavailable {
                column: DateColumn::BseListing
            }
        );
    }

    #[test]
    fn test_lookup_no_match() {
        let table = numerology(vec![numerology_row(Some(d(2021, 3, 16)), 5.0)]);
        let mut x = company("X");
        x.nse_listing_date = Some(d(2021, 3, 15));

        let outcome = lookup_numerology(&x, DateColumn::NseListing, &table);
        assert_eq!(outcome, LookupOutcome::NoMatch { date: d(2021, 3, 15) });
        assert!(outcome.rows().is_none());
    }

    #[test]
    fn test_lookup_keeps_duplicate_dates() {
        let table = numerology(vec![
            numerology_row(Some(d(2021, 3, 15)), 5.0),
            numerology_row(None, 1.0),
            numerology_row(Some(d(2021, 3, 15)), 7.0),
        ]);
        let mut x = company("X");
        x.incorporation_date = Some(d(2021, 3, 15));

        let outcome = lookup_numerology(&x, DateColumn::Incorporation, &table);
        let rows = outcome.rows().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows.rows()[1].field(BN), Cell::Number(7.0));
    }

    #[test]
    fn test_numerology_dates_skip_missing() {
        let table = numerology(vec![
            numerology_row(Some(d(2021, 3, 15)), 5.0),
            numerology_row(None, 1.0),
        ]);
        assert_eq!(numerology_dates(&table), HashSet::from([d(2021, 3, 15)]));
    }

    #[test]
    fn test_flags_are_per_column() {
        let mut x = company("X");
        x.nse_listing_date = Some(d(2021, 3, 15));
        x.bse_listing_date = Some(d(2021, 3, 16));

        let flags = DateMatchFlags::compute(&x, &HashSet::from([d(2021, 3, 15)]));
        assert!(flags.nse);
        assert!(!flags.bse);
        assert!(!flags.incorporation);
        assert!(flags.get(DateColumn::NseListing));
    }

    #[test]
    fn test_bulk_join_preserves_listing_order() {
        let mut a = company("A");
        a.incorporation_date = Some(d(1990, 1, 1));
        let b = company("B");
        let mut c = company("C");
        c.bse_listing_date = Some(d(1990, 1, 1));

        let listings = Table::new(vec![SYMBOL.into()], vec![a, b, c]);
        let joined = bulk_join(&listings, &HashSet::from([d(1990, 1, 1)]));

        let symbols: Vec<_> = joined
            .iter()
            .filter_map(|r| r.record.symbol.clone())
            .collect();
        assert_eq!(symbols, vec!["A", "C"]);

        let json = serde_json::to_value(&joined).unwrap();
        assert_eq!(json["matches"][1]["bse"], true);
        assert_eq!(json["rows"][0][0], "A");
    }

    #[test]
    fn test_bulk_join_empty_dates() {
        let mut a = company("A");
        a.nse_listing_date = Some(d(2000, 1, 1));
        let listings = Table::new(vec![SYMBOL.into()], vec![a]);

        assert!(bulk_join(&listings, &HashSet::new()).is_empty());
    }
}
