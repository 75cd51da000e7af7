pub mod accessor;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use accessor::{lookup_scalar, lookup_series};

/// One financial statement: line-item label -> values per period.
///
/// `periods` is ordered as the source supplies it (most recent first). Every
/// row is aligned to `periods`; `None` marks a missing cell. A default table
/// is the "statement not available" case and answers every lookup with nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementTable {
    #[serde(default)]
    pub periods: Vec<NaiveDate>,
    #[serde(default)]
    pub rows: BTreeMap<String, Vec<Option<Decimal>>>,
}

impl StatementTable {
    pub fn new(periods: Vec<NaiveDate>) -> Self {
        Self {
            periods,
            rows: BTreeMap::new(),
        }
    }

    /// Builder used by data adapters and tests.
    pub fn with_row(mut self, label: &str, values: Vec<Option<Decimal>>) -> Self {
        self.rows.insert(label.to_string(), values);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty() || self.rows.is_empty()
    }

    pub fn row(&self, label: &str) -> Option<&[Option<Decimal>]> {
        self.rows.get(label).map(Vec::as_slice)
    }

    /// Present (period, value) cells of one row, in source order.
    pub(crate) fn cells(&self, label: &str) -> Vec<(NaiveDate, Decimal)> {
        match self.row(label) {
            Some(values) => self
                .periods
                .iter()
                .zip(values.iter())
                .filter_map(|(period, value)| value.map(|v| (*period, v)))
                .collect(),
            None => Vec::new(),
        }
    }
}

/// The three statements of one company. Any of them may be empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialStatements {
    #[serde(default)]
    pub income_statement: StatementTable,
    #[serde(default)]
    pub balance_sheet: StatementTable,
    #[serde(default)]
    pub cash_flow: StatementTable,
}

/// A named, period-indexed sequence for one concept (revenue, EBIT, ...).
///
/// Only present values are stored; missing periods are dropped, never zeroed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialSeries {
    pub name: String,
    pub points: Vec<(NaiveDate, Decimal)>,
}

impl FinancialSeries {
    pub fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            points: Vec::new(),
        }
    }

    pub fn from_points(name: &str, points: Vec<(NaiveDate, Decimal)>) -> Self {
        Self {
            name: name.to_string(),
            points,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Same points, ordered oldest period first.
    pub fn oldest_first(&self) -> Self {
        let mut points = self.points.clone();
        points.sort_by_key(|(period, _)| *period);
        Self {
            name: self.name.clone(),
            points,
        }
    }

    pub fn values(&self) -> Vec<Decimal> {
        self.points.iter().map(|(_, v)| *v).collect()
    }

    /// Last point in the current ordering.
    pub fn last_value(&self) -> Option<Decimal> {
        self.points.last().map(|(_, v)| *v)
    }

    pub fn get(&self, period: NaiveDate) -> Option<Decimal> {
        self.points
            .iter()
            .find(|(p, _)| *p == period)
            .map(|(_, v)| *v)
    }

    /// Combine with `other` on the periods both carry, in `self`'s order.
    /// Periods where `f` yields `None` (e.g. a zero denominator) are dropped.
    pub fn zip_with<F>(&self, other: &FinancialSeries, name: &str, f: F) -> FinancialSeries
    where
        F: Fn(Decimal, Decimal) -> Option<Decimal>,
    {
        let points = self
            .points
            .iter()
            .filter_map(|(period, a)| {
                let b = other.get(*period)?;
                f(*a, b).map(|v| (*period, v))
            })
            .collect();
        FinancialSeries::from_points(name, points)
    }

    /// Element-wise quotient `self / denominator` on common periods.
    pub fn ratio_to(&self, denominator: &FinancialSeries, name: &str) -> FinancialSeries {
        self.zip_with(denominator, name, |num, den| num.checked_div(den))
    }
}
