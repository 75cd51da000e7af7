use rust_decimal::Decimal;

use super::{FinancialSeries, StatementTable};

/// Most recent present value under the first candidate label that has any.
///
/// Returns `None` when the table is empty or none of the labels carries data.
pub fn lookup_scalar(table: &StatementTable, candidate_labels: &[&str]) -> Option<Decimal> {
    if table.is_empty() {
        return None;
    }
    candidate_labels
        .iter()
        .find_map(|label| table.cells(label).first().map(|(_, v)| *v))
}

/// All present periods for exactly one label, in source order.
pub fn lookup_series(table: &StatementTable, label: &str) -> FinancialSeries {
    if table.is_empty() {
        return FinancialSeries::empty(label);
    }
    FinancialSeries::from_points(label, table.cells(label))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn d(y: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, 12, 31).unwrap()
    }

    fn balance_sheet() -> StatementTable {
        StatementTable::new(vec![d(2024), d(2023)])
            .with_row("Cash", vec![None, None])
            .with_row("Cash And Cash Equivalents", vec![None, Some(dec!(50))])
            .with_row("Total Debt", vec![Some(dec!(400)), Some(dec!(380))])
    }

    #[test]
    fn test_scalar_takes_most_recent_present_value() {
        let bs = balance_sheet();
        assert_eq!(lookup_scalar(&bs, &["Total Debt"]), Some(dec!(400)));
        // Most recent period missing: falls back to the older period of the same label
        assert_eq!(
            lookup_scalar(&bs, &["Cash And Cash Equivalents"]),
            Some(dec!(50))
        );
    }

    #[test]
    fn test_scalar_skips_labels_without_data() {
        let bs = balance_sheet();
        assert_eq!(
            lookup_scalar(&bs, &["Cash", "Cash And Cash Equivalents"]),
            Some(dec!(50))
        );
        assert_eq!(lookup_scalar(&bs, &["Goodwill", "Cash"]), None);
    }

    #[test]
    fn test_absent_table_degrades_gracefully() {
        let empty = StatementTable::default();
        assert_eq!(lookup_scalar(&empty, &["Total Debt"]), None);
        assert!(lookup_series(&empty, "Total Debt").is_empty());
    }

    #[test]
    fn test_series_has_no_fallback() {
        let bs = balance_sheet();
        assert!(lookup_series(&bs, "Long Term Debt").is_empty());
        assert_eq!(lookup_series(&bs, "Total Debt").len(), 2);
    }
}
