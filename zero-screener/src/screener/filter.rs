//! Equality/inclusion filtering over tables.
//!
//! A constraint names a column and the set of accepted values. Active
//! constraints combine with AND; an empty set or the `All` sentinel makes a
//! constraint vacuous. A constraint on a column the table does not have
//! matches no rows.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::data::{Cell, Record, Table};

/// Sentinel a single-valued select uses for "no constraint".
pub const ALL_SENTINEL: &str = "All";

// ============================================================================
// Selection
// ============================================================================

/// Accepted values for one column.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(from = "RawSelection")]
pub enum Selection {
    /// No constraint
    #[default]
    All,
    /// Value must match one of these
    OneOf(Vec<Cell>),
}

/// Wire shapes: `"All"`, `null`, a single value, or a list of values.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawSelection {
    Many(Vec<Cell>),
    One(Cell),
}

impl From<RawSelection> for Selection {
    fn from(raw: RawSelection) -> Self {
        match raw {
            RawSelection::Many(values) => Selection::one_of(values),
            RawSelection::One(Cell::Missing) => Selection::All,
            RawSelection::One(Cell::Text(t)) if t == ALL_SENTINEL => Selection::All,
            RawSelection::One(value) => Selection::OneOf(vec![value]),
        }
    }
}

impl Selection {
    /// Multi-valued select; an empty list means no constraint.
    pub fn one_of(values: Vec<Cell>) -> Self {
        if values.is_empty() {
            Self::All
        } else {
            Self::OneOf(values)
        }
    }

    /// Single-valued select; `"All"` means no constraint.
    pub fn single(value: Cell) -> Self {
        RawSelection::One(value).into()
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::OneOf(values) if !values.is_empty())
    }

    pub fn accepts(&self, cell: &Cell) -> bool {
        match self {
            Self::All => true,
            Self::OneOf(values) => values.is_empty() || values.iter().any(|v| cell.matches(v)),
        }
    }
}

// ============================================================================
// Constraint
// ============================================================================

/// One column predicate.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Constraint {
    pub column: String,
    #[serde(default, alias = "values", alias = "value")]
    pub selection: Selection,
}

impl Constraint {
    pub fn new(column: impl Into<String>, selection: Selection) -> Self {
        Self {
            column: column.into(),
            selection,
        }
    }

    /// Shorthand for a multi-valued text select.
    pub fn any_of<I, S>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            column,
            Selection::one_of(values.into_iter().map(|v| Cell::Text(v.into())).collect()),
        )
    }

    fn accepts<R: Record>(&self, row: &R) -> bool {
        row.cell(&self.column)
            .map_or(false, |cell| self.selection.accepts(&cell))
    }
}

// ============================================================================
// Filtering
// ============================================================================

/// Rows passing every active constraint, in their original order.
pub fn filter_table<R: Record + Clone>(table: &Table<R>, constraints: &[Constraint]) -> Table<R> {
    let active: Vec<&Constraint> = constraints.iter().filter(|c| c.selection.is_active()).collect();

    if active.is_empty() {
        return table.clone();
    }

    if let Some(unknown) = active.iter().find(|c| !table.has_column(&c.column)) {
        warn!(column = %unknown.column, "Constraint on unknown column matches no rows");
        return table.with_rows(Vec::new());
    }

    let rows: Vec<R> = table
        .iter()
        .filter(|row| active.iter().all(|c| c.accepts(*row)))
        .cloned()
        .collect();

    debug!(
        input = table.len(),
        passed = rows.len(),
        constraints = active.len(),
        "Filtered table"
    );

    table.with_rows(rows)
}

// ============================================================================
// Sequential Narrowing
// ============================================================================

/// Options offered for one column of a filter panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnChoices {
    pub column: String,
    pub options: Vec<Cell>,
}

/// Result of applying a filter panel column by column.
#[derive(Debug, Clone)]
pub struct NarrowedFilter<R> {
    /// Options for each constraint, computed from the rows that survived
    /// the constraints before it
    pub choices: Vec<ColumnChoices>,
    /// Final filtered table
    pub table: Table<R>,
}

/// Apply constraints in order, recording the choices each column would offer.
///
/// Each column's options are the distinct values remaining after the
/// previous constraints. The final table equals `filter_table` over all
/// constraints at once.
pub fn narrow<R: Record + Clone>(table: &Table<R>, constraints: &[Constraint]) -> NarrowedFilter<R> {
    let mut current = table.clone();
    let mut choices = Vec::with_capacity(constraints.len());

    for constraint in constraints {
        choices.push(ColumnChoices {
            column: constraint.column.clone(),
            options: current.distinct(&constraint.column),
        });
        current = filter_table(&current, std::slice::from_ref(constraint));
    }

    NarrowedFilter {
        choices,
        table: current,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{CompanyRecord, SECTOR, SUB_SECTOR, SYMBOL};

    fn company(symbol: &str, sector: &str, sub_sector: &str) -> CompanyRecord {
        CompanyRecord {
            symbol: Some(symbol.into()),
            sector: Some(sector.into()),
            sub_sector: Some(sub_sector.into()),
            ..Default::default()
        }
    }

    fn listings() -> Table<CompanyRecord> {
        Table::new(
            vec![SYMBOL.into(), SECTOR.into(), SUB_SECTOR.into()],
            vec![
                company("TCS", "IT", "Software"),
                company("HDFCBANK", "Financials", "Banks"),
                company("INFY", "IT", "Software"),
                company("ICICIBANK", "Financials", "Banks"),
                company("BAJFINANCE", "Financials", "NBFC"),
            ],
        )
    }

    fn symbols(table: &Table<CompanyRecord>) -> Vec<String> {
        table.iter().filter_map(|r| r.symbol.clone()).collect()
    }

    #[test]
    fn test_empty_constraints_return_table_unchanged() {
        let table = listings();
        assert_eq!(filter_table(&table, &[]), table);
        assert_eq!(
            filter_table(&table, &[Constraint::new(SECTOR, Selection::All)]),
            table
        );
        assert_eq!(
            filter_table(&table, &[Constraint::new(SECTOR, Selection::one_of(vec![]))]),
            table
        );
    }

    #[test]
    fn test_constraints_combine_with_and() {
        let table = listings();
        let filtered = filter_table(
            &table,
            &[
                Constraint::any_of(SECTOR, ["Financials"]),
                Constraint::any_of(SUB_SECTOR, ["Banks", "Software"]),
            ],
        );
        assert_eq!(symbols(&filtered), vec!["HDFCBANK", "ICICIBANK"]);
    }

    #[test]
    fn test_order_independent() {
        let table = listings();
        let a = Constraint::any_of(SECTOR, ["IT", "Financials"]);
        let b = Constraint::any_of(SYMBOL, ["INFY", "BAJFINANCE", "WIPRO"]);

        assert_eq!(
            filter_table(&table, &[a.clone(), b.clone()]),
            filter_table(&table, &[b, a])
        );
    }

    #[test]
    fn test_unknown_column_matches_nothing() {
        let table = listings();
        let filtered = filter_table(&table, &[Constraint::any_of("EXCHANGE", ["NSE"])]);
        assert!(filtered.is_empty());
        assert_eq!(filtered.columns(), table.columns());
    }

    #[test]
    fn test_missing_values_never_selected() {
        let mut table = listings().into_rows();
        table.push(CompanyRecord {
            symbol: Some("NOSECTOR".into()),
            ..Default::default()
        });
        let table = Table::new(vec![SYMBOL.into(), SECTOR.into()], table);

        let filtered = filter_table(
            &table,
            &[Constraint::new(SECTOR, Selection::OneOf(vec![Cell::Missing]))],
        );
        assert!(filtered.is_empty());
    }

    #[test]
    fn test_selection_wire_shapes() {
        let all: Selection = serde_json::from_str(r#""All""#).unwrap();
        assert_eq!(all, Selection::All);

        let none: Selection = serde_json::from_str("null").unwrap();
        assert_eq!(none, Selection::All);

        let empty: Selection = serde_json::from_str("[]").unwrap();
        assert_eq!(empty, Selection::All);

        let single: Selection = serde_json::from_str("5").unwrap();
        assert_eq!(single, Selection::OneOf(vec![Cell::Number(5.0)]));

        let many: Selection = serde_json::from_str(r#"["IT", "Financials"]"#).unwrap();
        assert!(many.is_active());

        let constraint: Constraint =
            serde_json::from_str(r#"{"column": "SECTOR", "values": ["IT"]}"#).unwrap();
        assert_eq!(constraint, Constraint::any_of(SECTOR, ["IT"]));
    }

    #[test]
    fn test_narrow_offers_remaining_values() {
        let table = listings();
        let constraints = vec![
            Constraint::any_of(SECTOR, ["Financials"]),
            Constraint::new(SUB_SECTOR, Selection::single(Cell::text("Banks"))),
        ];

        let narrowed = narrow(&table, &constraints);

        assert_eq!(narrowed.choices[0].options.len(), 2);
        assert_eq!(
            narrowed.choices[1].options,
            vec![Cell::text("Banks"), Cell::text("NBFC")]
        );
        assert_eq!(narrowed.table, filter_table(&table, &constraints));
    }
}
