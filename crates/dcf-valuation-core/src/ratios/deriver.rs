use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ValuationInputs;
use crate::error::DcfError;
use crate::market::clamp;
use crate::statements::{
    lookup_scalar, lookup_series, FinancialSeries, FinancialStatements, StatementTable,
};
use crate::types::{Money, Rate};
use crate::DcfResult;

use super::fallback::{first_available, Extractor, Resolved};
use super::stats::{mean, median_of_recent, pct_changes, RECENT_WINDOW};

// ---------------------------------------------------------------------------
// Line-item labels, in priority order
// ---------------------------------------------------------------------------

pub const CASH_LABELS: &[&str] = &[
    "Cash And Cash Equivalents",
    "Cash",
    "Cash And Short Term Investments",
];
pub const TOTAL_DEBT_LABELS: &[&str] = &["Total Debt"];
pub const LONG_TERM_DEBT_LABELS: &[&str] = &[
    "Long Term Debt",
    "Long Term Debt And Capital Lease Obligation",
];
pub const SHORT_TERM_DEBT_LABELS: &[&str] =
    &["Short Long Term Debt", "Short Term Debt", "Current Debt"];
pub const INTEREST_EXPENSE_LABELS: &[&str] = &["Interest Expense", "InterestExpense"];
pub const TAX_EXPENSE_LABELS: &[&str] =
    &["Tax Provision", "Income Tax Expense", "IncomeTaxExpense"];
pub const PRETAX_INCOME_LABELS: &[&str] =
    &["Pretax Income", "Income Before Tax", "IncomeBeforeTax"];

pub const REVENUE_LABEL: &str = "Total Revenue";
pub const EBIT_LABEL: &str = "EBIT";
pub const OPERATING_INCOME_LABEL: &str = "Operating Income";
pub const RECONCILED_DEPRECIATION_LABEL: &str = "Reconciled Depreciation";
pub const DEPRECIATION_AMORTIZATION_LABEL: &str = "Depreciation And Amortization";
pub const WORKING_CAPITAL_LABEL: &str = "Working Capital";
pub const CURRENT_ASSETS_LABEL: &str = "Current Assets";
pub const CURRENT_LIABILITIES_LABEL: &str = "Current Liabilities";
pub const CAPEX_LABEL: &str = "Capital Expenditure";
pub const CAPEX_ALT_LABEL: &str = "CapitalExpenditures";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Clean scalars and ratios distilled from one company's statements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivedRatios {
    pub cash: Money,
    pub total_debt: Money,
    pub tax_rate: Rate,
    pub pretax_cost_of_debt: Rate,
    /// Revenue history, oldest first
    pub revenue: FinancialSeries,
    /// EBIT history, oldest first
    pub ebit: FinancialSeries,
    /// Mean period-over-period revenue growth
    pub base_avg_growth: Rate,
    pub ebit_margin_median: Rate,
    pub da_ratio_median: Rate,
    pub wc_ratio_median: Rate,
    /// `None` when no capex history exists; the forecast then uses the heuristic
    pub capex_ratio: Option<Rate>,
    /// Fallbacks and defaults taken while deriving
    pub notes: Vec<String>,
}

impl DerivedRatios {
    pub fn last_revenue(&self) -> Option<Money> {
        self.revenue.last_value()
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Derive every ratio the forecast and cost of capital need.
///
/// Degenerate ratios fall back to configured defaults and are noted. Only a
/// missing revenue/EBIT history is an error.
pub fn derive_ratios(
    statements: &FinancialStatements,
    inputs: &ValuationInputs,
) -> DcfResult<DerivedRatios> {
    let income = &statements.income_statement;
    let balance = &statements.balance_sheet;
    let mut notes: Vec<String> = Vec::new();

    let cash = match cash(balance) {
        Some(c) => c,
        None => {
            note(&mut notes, "cash not reported; using 0");
            Decimal::ZERO
        }
    };

    let total_debt = match total_debt(balance) {
        Some(Resolved { source, value }) => {
            if source != TOTAL_DEBT_LABELS[0] {
                note(&mut notes, &format!("total debt taken from {source}"));
            }
            value
        }
        None => {
            note(&mut notes, "debt not reported; using 0");
            Decimal::ZERO
        }
    };

    let raw_tax = effective_tax_rate(income);
    if raw_tax.is_none() {
        note(
            &mut notes,
            &format!(
                "effective tax rate undefined; using default {}",
                inputs.default_tax_rate
            ),
        );
    }
    let tax_rate = clamp(
        raw_tax,
        inputs.tax_rate_min,
        inputs.tax_rate_max,
        inputs.default_tax_rate,
    );

    let raw_cod = implied_cost_of_debt(income, total_debt);
    if raw_cod.is_none() {
        note(
            &mut notes,
            &format!(
                "cost of debt undefined; using default {}",
                inputs.default_cost_of_debt
            ),
        );
    }
    let pretax_cost_of_debt = clamp(
        raw_cod,
        inputs.cod_min,
        inputs.cod_max,
        inputs.default_cost_of_debt,
    );

    // --- Historical series ---
    let revenue = revenue_series(income);
    let ebit = match ebit_series(income) {
        Some(Resolved { source, value }) => {
            if source != EBIT_LABEL {
                note(&mut notes, &format!("EBIT taken from {source}"));
            }
            value
        }
        None => FinancialSeries::empty(EBIT_LABEL),
    };

    if revenue.is_empty() || ebit.is_empty() {
        return Err(DcfError::MissingFinancialHistory(
            "Missing revenue/EBIT series".into(),
        ));
    }
    if revenue.len() < 2 {
        return Err(DcfError::MissingFinancialHistory(format!(
            "Not enough revenue history ({} period)",
            revenue.len()
        )));
    }

    let base_avg_growth = match base_average_growth(&revenue) {
        Some(g) => g,
        None => {
            note(&mut notes, "revenue growth undefined (zero base); using 0");
            Decimal::ZERO
        }
    };

    let ebit_margin_median = ebit_margin_median(&ebit, &revenue).ok_or_else(|| {
        DcfError::MissingFinancialHistory("Cannot compute EBIT margin".into())
    })?;

    let da_ratio_median = match da_ratio(income, &revenue) {
        Some(r) => r,
        None => {
            note(
                &mut notes,
                &format!("no D&A history; using default ratio {}", inputs.default_da_ratio),
            );
            inputs.default_da_ratio
        }
    };

    let wc_ratio_median = match working_capital_ratio(balance, &revenue) {
        Some(r) => r,
        None => {
            note(&mut notes, "no working-capital history; using 0");
            Decimal::ZERO
        }
    };

    let capex_ratio = capex_ratio(&statements.cash_flow, &revenue);
    if capex_ratio.is_none() {
        note(
            &mut notes,
            "no capex history; forecast uses D&A plus extra fraction of revenue",
        );
    }

    Ok(DerivedRatios {
        cash,
        total_debt,
        tax_rate,
        pretax_cost_of_debt,
        revenue,
        ebit,
        base_avg_growth,
        ebit_margin_median,
        da_ratio_median,
        wc_ratio_median,
        capex_ratio,
        notes,
    })
}

/// Cash and equivalents, floored at zero.
pub fn cash(balance_sheet: &StatementTable) -> Option<Money> {
    lookup_scalar(balance_sheet, CASH_LABELS).map(|c| c.max(Decimal::ZERO))
}

/// Total debt: the reported total, else long-term plus short-term legs
/// (a missing leg counts as zero). Floored at zero.
pub fn total_debt(balance_sheet: &StatementTable) -> Option<Resolved<Money>> {
    let chain = [
        Extractor::new("Total Debt", || {
            lookup_scalar(balance_sheet, TOTAL_DEBT_LABELS)
        }),
        Extractor::new("long-term + short-term debt", || {
            let long_term = lookup_scalar(balance_sheet, LONG_TERM_DEBT_LABELS);
            let short_term = lookup_scalar(balance_sheet, SHORT_TERM_DEBT_LABELS);
            if long_term.is_none() && short_term.is_none() {
                return None;
            }
            Some(long_term.unwrap_or_default() + short_term.unwrap_or_default())
        }),
    ];
    first_available(&chain).map(|r| Resolved {
        source: r.source,
        value: r.value.max(Decimal::ZERO),
    })
}

/// |tax expense| / pre-tax income, defined only for positive pre-tax income.
pub fn effective_tax_rate(income_statement: &StatementTable) -> Option<Rate> {
    let tax = lookup_scalar(income_statement, TAX_EXPENSE_LABELS)?.abs();
    let pretax = lookup_scalar(income_statement, PRETAX_INCOME_LABELS)?;
    if pretax <= Decimal::ZERO {
        return None;
    }
    tax.checked_div(pretax)
}

/// |interest expense| / total debt, defined only for positive debt.
pub fn implied_cost_of_debt(
    income_statement: &StatementTable,
    total_debt: Money,
) -> Option<Rate> {
    if total_debt <= Decimal::ZERO {
        return None;
    }
    let interest = lookup_scalar(income_statement, INTEREST_EXPENSE_LABELS)?.abs();
    interest.checked_div(total_debt)
}

/// Revenue history, oldest first.
pub fn revenue_series(income_statement: &StatementTable) -> FinancialSeries {
    lookup_series(income_statement, REVENUE_LABEL).oldest_first()
}

/// EBIT history (oldest first), falling back to operating income.
pub fn ebit_series(income_statement: &StatementTable) -> Option<Resolved<FinancialSeries>> {
    let chain = [
        non_empty_series(income_statement, EBIT_LABEL),
        non_empty_series(income_statement, OPERATING_INCOME_LABEL),
    ];
    first_available(&chain)
}

/// Depreciation & amortisation history (oldest first).
pub fn da_series(income_statement: &StatementTable) -> Option<Resolved<FinancialSeries>> {
    let chain = [
        non_empty_series(income_statement, RECONCILED_DEPRECIATION_LABEL),
        non_empty_series(income_statement, DEPRECIATION_AMORTIZATION_LABEL),
    ];
    first_available(&chain)
}

/// Median of recent D&A / revenue; `None` when no period aligns.
pub fn da_ratio(income_statement: &StatementTable, revenue: &FinancialSeries) -> Option<Rate> {
    let da = da_series(income_statement)?.value;
    median_of_recent(&da.ratio_to(revenue, "da/revenue"), RECENT_WINDOW)
}

/// Working capital history (oldest first): the reported line, else current
/// assets minus current liabilities on the periods both carry.
pub fn working_capital_series(
    balance_sheet: &StatementTable,
) -> Option<Resolved<FinancialSeries>> {
    let chain = [
        non_empty_series(balance_sheet, WORKING_CAPITAL_LABEL),
        Extractor::new("Current Assets - Current Liabilities", move || {
            let assets = lookup_series(balance_sheet, CURRENT_ASSETS_LABEL).oldest_first();
            let liabilities =
                lookup_series(balance_sheet, CURRENT_LIABILITIES_LABEL).oldest_first();
            let wc = assets.zip_with(&liabilities, WORKING_CAPITAL_LABEL, |a, l| Some(a - l));
            (!wc.is_empty()).then_some(wc)
        }),
    ];
    first_available(&chain)
}

/// Median of recent WC / revenue on aligned periods; `None` when nothing aligns.
pub fn working_capital_ratio(
    balance_sheet: &StatementTable,
    revenue: &FinancialSeries,
) -> Option<Rate> {
    let wc = working_capital_series(balance_sheet)?.value;
    median_of_recent(&wc.ratio_to(revenue, "wc/revenue"), RECENT_WINDOW)
}

/// Median of recent |capex| / revenue; `None` when capex is undeterminable
/// and the caller must substitute a heuristic.
pub fn capex_ratio(cash_flow: &StatementTable, revenue: &FinancialSeries) -> Option<Rate> {
    let chain = [
        non_empty_series(cash_flow, CAPEX_LABEL),
        non_empty_series(cash_flow, CAPEX_ALT_LABEL),
    ];
    let capex = first_available(&chain)?.value;
    let ratio = capex.zip_with(revenue, "capex/revenue", |c, r| c.abs().checked_div(r));
    median_of_recent(&ratio, RECENT_WINDOW)
}

/// Mean period-over-period revenue growth of an oldest-first series.
pub fn base_average_growth(revenue: &FinancialSeries) -> Option<Rate> {
    mean(&pct_changes(revenue))
}

/// Median of recent EBIT / revenue; `None` when no period aligns.
pub fn ebit_margin_median(ebit: &FinancialSeries, revenue: &FinancialSeries) -> Option<Rate> {
    median_of_recent(&ebit.ratio_to(revenue, "ebit margin"), RECENT_WINDOW)
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn non_empty_series<'a>(
    table: &'a StatementTable,
    label: &'static str,
) -> Extractor<'a, FinancialSeries> {
    Extractor::new(label, move || {
        let series = lookup_series(table, label);
        (!series.is_empty()).then(|| series.oldest_first())
    })
}

fn note(notes: &mut Vec<String>, message: &str) {
    debug!(fallback = message, "ratio derivation fell back");
    notes.push(message.to_string());
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn periods() -> Vec<NaiveDate> {
        // Most recent first, as the source supplies them
        vec![
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
            NaiveDate::from_ymd_opt(2022, 12, 31).unwrap(),
        ]
    }

    fn income() -> StatementTable {
        StatementTable::new(periods())
            .with_row("Total Revenue", vec![Some(dec!(121)), Some(dec!(110)), Some(dec!(100))])
            .with_row("Operating Income", vec![Some(dec!(24.2)), Some(dec!(22)), Some(dec!(20))])
            .with_row("Tax Provision", vec![Some(dec!(-5)), Some(dec!(4)), None])
            .with_row("Pretax Income", vec![Some(dec!(20)), Some(dec!(18)), None])
            .with_row("Interest Expense", vec![Some(dec!(-8)), None, None])
            .with_row(
                "Depreciation And Amortization",
                vec![Some(dec!(6.05)), Some(dec!(5.5)), Some(dec!(5))],
            )
    }

    fn balance() -> StatementTable {
        StatementTable::new(periods())
            .with_row("Cash", vec![Some(dec!(-3)), None, None])
            .with_row("Long Term Debt", vec![Some(dec!(90)), None, None])
            .with_row("Current Debt", vec![None, Some(dec!(10)), None])
            .with_row("Current Assets", vec![Some(dec!(60)), Some(dec!(55)), None])
            .with_row("Current Liabilities", vec![Some(dec!(36.2)), Some(dec!(33)), Some(dec!(30))])
    }

    #[test]
    fn test_cash_negative_floored() {
        assert_eq!(cash(&balance()), Some(Decimal::ZERO));
        assert_eq!(cash(&StatementTable::default()), None);
    }

    #[test]
    fn test_total_debt_sums_legs_when_total_missing() {
        let debt = total_debt(&balance()).unwrap();
        assert_eq!(debt.source, "long-term + short-term debt");
        assert_eq!(debt.value, dec!(100));

        let reported = balance().with_row("Total Debt", vec![Some(dec!(250)), None, None]);
        assert_eq!(total_debt(&reported).unwrap().value, dec!(250));
    }

    #[test]
    fn test_effective_tax_uses_absolute_tax_and_positive_pretax() {
        assert_eq!(effective_tax_rate(&income()), Some(dec!(0.25)));
        let loss = income().with_row("Pretax Income", vec![Some(dec!(-20)), None, None]);
        assert_eq!(effective_tax_rate(&loss), None);
    }

    #[test]
    fn test_cost_of_debt_requires_debt() {
        assert_eq!(implied_cost_of_debt(&income(), dec!(100)), Some(dec!(0.08)));
        assert_eq!(implied_cost_of_debt(&income(), Decimal::ZERO), None);
    }

    #[test]
    fn test_ebit_falls_back_to_operating_income() {
        let ebit = ebit_series(&income()).unwrap();
        assert_eq!(ebit.source, OPERATING_INCOME_LABEL);
        assert_eq!(ebit.value.values(), vec![dec!(20), dec!(22), dec!(24.2)]);
    }

    #[test]
    fn test_working_capital_from_current_items() {
        let revenue = revenue_series(&income());
        let wc = working_capital_series(&balance()).unwrap();
        assert_eq!(wc.source, "Current Assets - Current Liabilities");
        // 2022 has no current assets, so only two periods align
        assert_eq!(wc.value.len(), 2);
        // 22/110 = 0.2 and 23.8/121 ~ 0.1967; median of the two
        let ratio = working_capital_ratio(&balance(), &revenue).unwrap();
        let expected = (dec!(22) / dec!(110) + dec!(23.8) / dec!(121)) / dec!(2);
        assert!((ratio - expected).abs() < dec!(0.0000001));
    }

    #[test]
    fn test_da_ratio_median() {
        let revenue = revenue_series(&income());
        assert_eq!(da_ratio(&income(), &revenue), Some(dec!(0.05)));
    }

    #[test]
    fn test_reconciled_depreciation_preferred() {
        let both = income().with_row(
            "Reconciled Depreciation",
            vec![Some(dec!(4.84)), Some(dec!(4.4)), Some(dec!(4))],
        );
        let da = da_series(&both).unwrap();
        assert_eq!(da.source, RECONCILED_DEPRECIATION_LABEL);
        let revenue = revenue_series(&both);
        assert_eq!(da_ratio(&both, &revenue), Some(dec!(0.04)));
    }

    #[test]
    fn test_missing_da_and_working_capital_use_defaults() {
        let statements = FinancialStatements {
            income_statement: StatementTable::new(periods())
                .with_row("Total Revenue", vec![Some(dec!(121)), Some(dec!(110)), Some(dec!(100))])
                .with_row("EBIT", vec![Some(dec!(24.2)), Some(dec!(22)), Some(dec!(20))]),
            ..Default::default()
        };
        let inputs = ValuationInputs::default();
        let ratios = derive_ratios(&statements, &inputs).unwrap();

        assert_eq!(ratios.da_ratio_median, dec!(0.03));
        assert_eq!(ratios.da_ratio_median, inputs.default_da_ratio);
        assert!(ratios.notes.iter().any(|n| n.contains("no D&A history")));
        assert_eq!(ratios.wc_ratio_median, Decimal::ZERO);
        assert!(ratios
            .notes
            .iter()
            .any(|n| n.contains("no working-capital history")));
    }

    #[test]
    fn test_unaligned_working_capital_uses_zero() {
        // WC only on a period with no revenue
        let balance = StatementTable::new(vec![NaiveDate::from_ymd_opt(2019, 12, 31).unwrap()])
            .with_row("Working Capital", vec![Some(dec!(15))]);
        let revenue = revenue_series(&income());
        assert_eq!(working_capital_ratio(&balance, &revenue), None);

        let statements = FinancialStatements {
            income_statement: income(),
            balance_sheet: balance,
            cash_flow: StatementTable::default(),
        };
        let ratios = derive_ratios(&statements, &ValuationInputs::default()).unwrap();
        assert_eq!(ratios.wc_ratio_median, Decimal::ZERO);
    }

    #[test]
    fn test_capex_missing_labels_is_undeterminable() {
        let revenue = revenue_series(&income());
        let cash_flow = StatementTable::new(periods())
            .with_row("Free Cash Flow", vec![Some(dec!(10)), None, None]);
        assert_eq!(capex_ratio(&cash_flow, &revenue), None);
    }

    #[test]
    fn test_capex_alt_label_absolute_value() {
        let revenue = revenue_series(&income());
        let cash_flow = StatementTable::new(periods()).with_row(
            "CapitalExpenditures",
            vec![Some(dec!(-12.1)), Some(dec!(-11)), Some(dec!(-10))],
        );
        assert_eq!(capex_ratio(&cash_flow, &revenue), Some(dec!(0.1)));
    }

    #[test]
    fn test_derive_ratios_end_to_end() {
        let statements = FinancialStatements {
            income_statement: income(),
            balance_sheet: balance(),
            cash_flow: StatementTable::default(),
        };
        let inputs = ValuationInputs::default();
        let ratios = derive_ratios(&statements, &inputs).unwrap();

        assert_eq!(ratios.base_avg_growth, dec!(0.1));
        assert_eq!(ratios.ebit_margin_median, dec!(0.2));
        assert_eq!(ratios.tax_rate, dec!(0.25));
        assert_eq!(ratios.pretax_cost_of_debt, dec!(0.08));
        assert_eq!(ratios.total_debt, dec!(100));
        assert_eq!(ratios.capex_ratio, None);
        assert_eq!(ratios.last_revenue(), Some(dec!(121)));
        assert!(ratios.notes.iter().any(|n| n.contains("capex")));
    }

    #[test]
    fn test_single_revenue_period_is_fatal() {
        let statements = FinancialStatements {
            income_statement: StatementTable::new(periods())
                .with_row("Total Revenue", vec![Some(dec!(121)), None, None])
                .with_row("EBIT", vec![Some(dec!(20)), None, None]),
            ..Default::default()
        };
        let err = derive_ratios(&statements, &ValuationInputs::default()).unwrap_err();
        assert!(matches!(err, DcfError::MissingFinancialHistory(_)));
    }

    #[test]
    fn test_missing_ebit_is_fatal() {
        let statements = FinancialStatements {
            income_statement: StatementTable::new(periods()).with_row(
                "Total Revenue",
                vec![Some(dec!(121)), Some(dec!(110)), Some(dec!(100))],
            ),
            ..Default::default()
        };
        assert!(derive_ratios(&statements, &ValuationInputs::default()).is_err());
    }

    #[test]
    fn test_unaligned_ebit_margin_is_fatal() {
        let statements = FinancialStatements {
            income_statement: StatementTable::new(periods())
                .with_row("Total Revenue", vec![None, Some(dec!(110)), Some(dec!(100))])
                .with_row("EBIT", vec![Some(dec!(20)), None, None]),
            ..Default::default()
        };
        match derive_ratios(&statements, &ValuationInputs::default()).unwrap_err() {
            DcfError::MissingFinancialHistory(msg) => assert!(msg.contains("EBIT margin")),
            e => panic!("Expected MissingFinancialHistory, got {e:?}"),
        }
    }
}
