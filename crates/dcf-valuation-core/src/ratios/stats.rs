use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::statements::FinancialSeries;

/// Number of most recent periods smoothed over.
pub const RECENT_WINDOW: usize = 5;

pub fn median(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort();
    let len = sorted.len();
    if len % 2 == 1 {
        Some(sorted[len / 2])
    } else {
        Some((sorted[len / 2 - 1] + sorted[len / 2]) / dec!(2))
    }
}

pub fn mean(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    let total: Decimal = values.iter().sum();
    Some(total / Decimal::from(values.len() as u64))
}

/// Median of the last `min(window, n)` points of an oldest-first series.
pub fn median_of_recent(series: &FinancialSeries, window: usize) -> Option<Decimal> {
    let values = series.values();
    let start = values.len().saturating_sub(window);
    median(&values[start..])
}

/// Period-over-period fractional changes of an oldest-first series.
/// A change off a zero base is undefined and skipped.
pub fn pct_changes(series: &FinancialSeries) -> Vec<Decimal> {
    series
        .values()
        .windows(2)
        .filter_map(|pair| pair[1].checked_div(pair[0]).map(|r| r - Decimal::ONE))
        .collect()
}
