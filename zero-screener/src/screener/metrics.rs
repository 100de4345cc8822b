//! Derived metrics over daily index bars.
//!
//! - `VolatilityPercent` = (high - low) / low * 100
//! - `ClosePercent` = close-to-close change against the previous bar
//!
//! Both are rounded to two decimals (ties to even). A metric that cannot be
//! computed is `None` and fails every comparison.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::OhlcBar;

// ============================================================================
// Derivation
// ============================================================================

/// A bar plus its derived metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedBar {
    #[serde(flatten)]
    pub bar: OhlcBar,
    #[serde(rename = "VolatilityPercent")]
    pub volatility_percent: Option<f64>,
    #[serde(rename = "ClosePercent")]
    pub close_percent: Option<f64>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// Volatility of one bar; `None` unless `low > 0`.
pub fn volatility_percent(bar: &OhlcBar) -> Option<f64> {
    if bar.low > 0.0 {
        finite(round2((bar.high - bar.low) / bar.low * 100.0))
    } else {
        None
    }
}

/// Close change from `previous` to `current`; `None` if `previous` is zero.
pub fn close_percent(previous: f64, current: f64) -> Option<f64> {
    if previous == 0.0 {
        None
    } else {
        finite(round2((current - previous) / previous * 100.0))
    }
}

/// Sort bars by date and attach derived metrics.
///
/// The first bar has no `ClosePercent`.
pub fn derive_metrics(mut bars: Vec<OhlcBar>) -> Vec<DerivedBar> {
    bars.sort_by_key(|b| b.date);

    let mut previous_close: Option<f64> = None;
    bars.into_iter()
        .map(|bar| {
            let derived = DerivedBar {
                volatility_percent: volatility_percent(&bar),
                close_percent: previous_close.and_then(|prev| close_percent(prev, bar.close)),
                bar,
            };
            previous_close = Some(derived.bar.close);
            derived
        })
        .collect()
}

// ============================================================================
// Comparison Filters
// ============================================================================

/// Derived column a metric filter applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetricColumn {
    #[serde(rename = "VolatilityPercent", alias = "volatility_percent")]
    VolatilityPercent,
    #[serde(rename = "ClosePercent", alias = "close_percent")]
    ClosePercent,
}

impl MetricColumn {
    pub fn value(&self, bar: &DerivedBar) -> Option<f64> {
        match self {
            Self::VolatilityPercent => bar.volatility_percent,
            Self::ClosePercent => bar.close_percent,
        }
    }
}

/// Comparison operator; `None` disables the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Operator {
    #[default]
    #[serde(rename = "None")]
    None,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "=", alias = "==")]
    Eq,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = ">")]
    Gt,
}

impl Operator {
    /// Whether `value op threshold` holds. Always true for `None`.
    pub fn compare(&self, value: f64, threshold: f64) -> bool {
        match self {
            Self::None => true,
            Self::Lt => value < threshold,
            Self::Le => value <= threshold,
            Self::Eq => value == threshold,
            Self::Ge => value >= threshold,
            Self::Gt => value > threshold,
        }
    }
}

/// One comparison filter on a derived column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricFilter {
    pub column: MetricColumn,
    #[serde(default)]
    pub operator: Operator,
    #[serde(default)]
    pub threshold: f64,
}

impl MetricFilter {
    pub fn new(column: MetricColumn, operator: Operator, threshold: f64) -> Self {
        Self {
            column,
            operator,
            threshold,
        }
    }

    pub fn is_active(&self) -> bool {
        self.operator != Operator::None
    }

    /// An undefined metric never satisfies an active filter.
    pub fn accepts(&self, bar: &DerivedBar) -> bool {
        if !self.is_active() {
            return true;
        }
        self.column
            .value(bar)
            .map_or(false, |v| self.operator.compare(v, self.threshold))
    }
}

/// Bars passing every active filter, in date order.
pub fn filter_metrics(bars: &[DerivedBar], filters: &[MetricFilter]) -> Vec<DerivedBar> {
    let result: Vec<DerivedBar> = bars
        .iter()
        .filter(|bar| filters.iter().all(|f| f.accepts(bar)))
        .cloned()
        .collect();

    debug!(
        input = bars.len(),
        passed = result.len(),
        active = filters.iter().filter(|f| f.is_active()).count(),
        "Filtered derived bars"
    );

    result
}

// ============================================================================
// Tests
// ============================================================================
