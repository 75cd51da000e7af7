use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::ValuationInputs;
use crate::error::DcfError;
use crate::ratios::DerivedRatios;
use crate::types::{Money, Rate};
use crate::DcfResult;

use super::growth::build_path;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Point-in-time operating assumptions applied flat across the horizon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDrivers {
    /// Last historical revenue (year 0)
    pub last_revenue: Money,
    pub ebit_margin: Rate,
    pub da_ratio: Rate,
    pub tax_rate: Rate,
    /// Historical capex / revenue; `None` switches to the D&A-plus heuristic
    pub capex_ratio: Option<Rate>,
    /// Extra capex as a fraction of revenue under the heuristic
    pub capex_extra_pct: Rate,
    pub wc_ratio: Rate,
}

impl ForecastDrivers {
    pub fn from_ratios(ratios: &DerivedRatios, inputs: &ValuationInputs) -> DcfResult<Self> {
        let last_revenue = ratios.last_revenue().ok_or_else(|| {
            DcfError::MissingFinancialHistory("No historical revenue to project from".into())
        })?;
        Ok(Self {
            last_revenue,
            ebit_margin: ratios.ebit_margin_median,
            da_ratio: ratios.da_ratio_median,
            tax_rate: ratios.tax_rate,
            capex_ratio: ratios.capex_ratio,
            capex_extra_pct: inputs.fallback_capex_extra_pct_of_revenue,
            wc_ratio: ratios.wc_ratio_median,
        })
    }
}

/// Year-by-year operating flows for one (ticker, growth multiplier).
/// Index 0 is forecast year 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatingProjection {
    pub growth_path: Vec<Rate>,
    pub revenue: Vec<Money>,
    pub ebit: Vec<Money>,
    /// EBIT after tax
    pub ebiat: Vec<Money>,
    pub depreciation: Vec<Money>,
    pub capex: Vec<Money>,
    pub delta_working_capital: Vec<Money>,
    /// Unlevered free cash flow
    pub fcf: Vec<Money>,
}

impl OperatingProjection {
    pub fn years(&self) -> usize {
        self.fcf.len()
    }

    pub fn last_fcf(&self) -> Option<Money> {
        self.fcf.last().copied()
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Project operating flows along a growth path.
///
/// Revenue compounds from `last_revenue`; EBIT, D&A and capex scale with it;
/// the working-capital charge follows the revenue increment:
/// FCF = EBIT * (1 - t) + D&A - Capex - WC_ratio * (Rev_t - Rev_{t-1})
///
/// Every step is checked: a runaway growth rate from noisy history fails the
/// ticker with `NumericOverflow` instead of aborting the run.
pub fn project(drivers: &ForecastDrivers, growth_path: &[Rate]) -> DcfResult<OperatingProjection> {
    let n = growth_path.len();
    let mut revenue = Vec::with_capacity(n);
    let mut ebit = Vec::with_capacity(n);
    let mut ebiat = Vec::with_capacity(n);
    let mut depreciation = Vec::with_capacity(n);
    let mut capex = Vec::with_capacity(n);
    let mut delta_working_capital = Vec::with_capacity(n);
    let mut fcf = Vec::with_capacity(n);

    let after_tax_share = checked(
        Decimal::ONE.checked_sub(drivers.tax_rate),
        "after-tax share",
        0,
    )?;
    let mut prev_revenue = drivers.last_revenue;
    for (i, growth) in growth_path.iter().enumerate() {
        let year = i + 1;
        let factor = checked(Decimal::ONE.checked_add(*growth), "growth factor", year)?;
        let rev = checked(prev_revenue.checked_mul(factor), "revenue", year)?;
        let op_income = checked(rev.checked_mul(drivers.ebit_margin), "EBIT", year)?;
        let after_tax = checked(op_income.checked_mul(after_tax_share), "EBIAT", year)?;
        let da = checked(rev.checked_mul(drivers.da_ratio), "D&A", year)?;
        let cx = match drivers.capex_ratio {
            Some(ratio) => checked(rev.checked_mul(ratio), "capex", year)?,
            None => {
                let extra = checked(drivers.capex_extra_pct.checked_mul(rev), "capex", year)?;
                checked(da.checked_add(extra), "capex", year)?
            }
        };
        let increment = checked(rev.checked_sub(prev_revenue), "revenue increment", year)?;
        let dwc = checked(drivers.wc_ratio.checked_mul(increment), "working capital", year)?;
        let flow = after_tax
            .checked_add(da)
            .and_then(|v| v.checked_sub(cx))
            .and_then(|v| v.checked_sub(dwc));
        let flow = checked(flow, "free cash flow", year)?;

        revenue.push(rev);
        ebit.push(op_income);
        ebiat.push(after_tax);
        depreciation.push(da);
        capex.push(cx);
        delta_working_capital.push(dwc);
        fcf.push(flow);

        prev_revenue = rev;
    }

    Ok(OperatingProjection {
        growth_path: growth_path.to_vec(),
        revenue,
        ebit,
        ebiat,
        depreciation,
        capex,
        delta_working_capital,
        fcf,
    })
}

/// Build the faded growth path for a scenario multiplier and project it.
pub fn project_scenario(
    ratios: &DerivedRatios,
    inputs: &ValuationInputs,
    growth_multiplier: Rate,
) -> DcfResult<OperatingProjection> {
    let drivers = ForecastDrivers::from_ratios(ratios, inputs)?;
    let initial_growth = checked(
        ratios.base_avg_growth.checked_mul(growth_multiplier),
        "initial growth",
        0,
    )?;
    let path = build_path(
        initial_growth,
        inputs.forecast_years,
        inputs.terminal_growth,
        inputs.fade_start,
    );
    if path.is_empty() {
        return Err(DcfError::invalid(
            "forecast_years",
            "Forecast horizon must be at least one year",
        ));
    }
    project(&drivers, &path)
}

fn checked(value: Option<Decimal>, what: &str, year: usize) -> DcfResult<Decimal> {
    value.ok_or_else(|| DcfError::overflow(format!("forecast {what} (year {year})")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn drivers() -> ForecastDrivers {
        ForecastDrivers {
            last_revenue: dec!(1000),
            ebit_margin: dec!(0.20),
            da_ratio: dec!(0.05),
            tax_rate: dec!(0.30),
            capex_ratio: Some(dec!(0.06)),
            capex_extra_pct: dec!(0.005),
            wc_ratio: dec!(0.10),
        }
    }

    #[test]
    fn test_year_one_flows() {
        let p = project(&drivers(), &[dec!(0.10), dec!(0.10)]).unwrap();
        // Revenue = 1000 * 1.10 = 1100
        assert_eq!(p.revenue[0], dec!(1100));
        // EBIT = 220, EBIAT = 154
        assert_eq!(p.ebit[0], dec!(220));
        assert_eq!(p.ebiat[0], dec!(154));
        // D&A = 55, Capex = 66, dWC = 0.10 * 100 = 10
        assert_eq!(p.depreciation[0], dec!(55));
        assert_eq!(p.capex[0], dec!(66));
        assert_eq!(p.delta_working_capital[0], dec!(10));
        // FCF = 154 + 55 - 66 - 10 = 133
        assert_eq!(p.fcf[0], dec!(133));
        // Year 2 compounds: 1210, dWC = 0.10 * 110 = 11
        assert_eq!(p.revenue[1], dec!(1210));
        assert_eq!(p.delta_working_capital[1], dec!(11));
    }

    #[test]
    fn test_capex_heuristic_without_history() {
        let mut d = drivers();
        d.capex_ratio = None;
        let p = project(&d, &[dec!(0.10)]).unwrap();
        // D&A 55 + 0.005 * 1100 = 60.5
        assert_eq!(p.capex[0], dec!(60.5));
        assert_eq!(p.fcf[0], dec!(154) + dec!(55) - dec!(60.5) - dec!(10));
    }

    #[test]
    fn test_margin_is_flat_across_horizon() {
        let p = project(&drivers(), &[dec!(0.10), dec!(0.05), dec!(0.02)]).unwrap();
        for (rev, ebit) in p.revenue.iter().zip(&p.ebit) {
            assert_eq!(*ebit, *rev * dec!(0.20));
        }
        assert_eq!(p.years(), 3);
        assert_eq!(p.last_fcf(), p.fcf.last().copied());
    }

    #[test]
    fn test_runaway_growth_is_overflow_error() {
        // A misscaled period can put average growth near 1e6; ten years of
        // compounding leaves the Decimal range
        let err = project(&drivers(), &[dec!(999999); 10]).unwrap_err();
        assert!(matches!(err, DcfError::NumericOverflow { .. }));
        assert!(err.is_per_ticker());
    }
}
