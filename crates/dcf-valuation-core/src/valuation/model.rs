use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::config::ValuationInputs;
use crate::error::DcfError;
use crate::market::{estimate_cost_of_capital, CostOfCapital, YieldSource};
use crate::ratios::{derive_ratios, DerivedRatios};
use crate::snapshot::MarketSnapshot;
use crate::types::{with_metadata, ComputationOutput, GrowthScenario, Money, Rate};
use crate::DcfResult;

use super::discount::{value_per_share, EquityBridge};
use super::forecast::{project_scenario, OperatingProjection};

pub const METHODOLOGY: &str = "DCF (FCFF, faded growth path, Gordon growth terminal value)";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Everything derived once per ticker and shared by every scenario and grid cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivedInputs {
    pub ticker: String,
    pub name: String,
    pub current_price: Money,
    pub ratios: DerivedRatios,
    pub capital: CostOfCapital,
    pub bridge: EquityBridge,
}

/// Per-(ticker, scenario) valuation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationResult {
    pub ticker: String,
    pub name: String,
    pub scenario: GrowthScenario,
    pub current_price: Money,
    pub dcf_price: Money,
    pub wacc: Rate,
    pub risk_free_rate: Rate,
    pub market_premium: Rate,
    pub cost_of_equity: Rate,
    pub tax_rate: Rate,
    pub pretax_cost_of_debt: Rate,
    pub base_avg_growth: Rate,
    /// Base growth times the scenario multiplier
    pub initial_growth: Rate,
    pub ebit_margin_median: Rate,
    pub da_ratio_median: Rate,
    pub wc_ratio_median: Rate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capex_ratio: Option<Rate>,
    pub cash: Money,
    pub total_debt: Money,
    pub enterprise_value: Money,
    pub equity_value: Money,
    pub pv_explicit: Money,
    pub pv_terminal: Money,
    /// dcf_price / current_price - 1
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upside: Option<Rate>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Check the market data, derive ratios and build the cost of capital.
///
/// Market data is checked before statements so a ticker without a price fails
/// on the price, not on its history.
pub fn derive_inputs(
    snapshot: &MarketSnapshot,
    inputs: &ValuationInputs,
    source: &dyn YieldSource,
) -> DcfResult<DerivedInputs> {
    let current_price = snapshot.current_price()?;
    let shares = snapshot.shares_outstanding()?;
    let beta = snapshot.beta()?;
    let market_cap = snapshot.market_cap()?;

    let ratios = derive_ratios(&snapshot.statements, inputs)?;
    let capital = estimate_cost_of_capital(
        beta,
        market_cap,
        ratios.total_debt,
        ratios.pretax_cost_of_debt,
        ratios.tax_rate,
        inputs,
        source,
    );
    let bridge = EquityBridge {
        cash: ratios.cash,
        total_debt: ratios.total_debt,
        shares,
    };

    Ok(DerivedInputs {
        ticker: snapshot.ticker.clone(),
        name: snapshot.display_name(),
        current_price,
        ratios,
        capital,
        bridge,
    })
}

/// Discount an existing projection at the ticker's WACC and terminal growth.
pub fn price_scenario(
    derived: &DerivedInputs,
    inputs: &ValuationInputs,
    scenario: GrowthScenario,
    projection: &OperatingProjection,
    warnings: &mut Vec<String>,
) -> DcfResult<ValuationResult> {
    let wacc = derived.capital.wacc;
    let point = value_per_share(
        &projection.fcf,
        wacc,
        inputs.terminal_growth,
        inputs.terminal_year,
        &derived.bridge,
    )?;
    if point.terminal.guard_triggered {
        warnings.push(format!(
            "{} {scenario}: WACC {wacc} not above terminal growth {}; terminal rate set to {}",
            derived.ticker, inputs.terminal_growth, point.terminal.effective_rate
        ));
    }

    let ratios = &derived.ratios;
    let initial_growth = ratios
        .base_avg_growth
        .checked_mul(scenario.multiplier(inputs))
        .ok_or_else(|| DcfError::overflow("initial growth"))?;
    let upside = point
        .price
        .checked_div(derived.current_price)
        .and_then(|r| r.checked_sub(Decimal::ONE));

    Ok(ValuationResult {
        ticker: derived.ticker.clone(),
        name: derived.name.clone(),
        scenario,
        current_price: derived.current_price,
        dcf_price: point.price,
        wacc,
        risk_free_rate: derived.capital.risk_free_rate,
        market_premium: derived.capital.market_premium,
        cost_of_equity: derived.capital.cost_of_equity,
        tax_rate: ratios.tax_rate,
        pretax_cost_of_debt: ratios.pretax_cost_of_debt,
        base_avg_growth: ratios.base_avg_growth,
        initial_growth,
        ebit_margin_median: ratios.ebit_margin_median,
        da_ratio_median: ratios.da_ratio_median,
        wc_ratio_median: ratios.wc_ratio_median,
        capex_ratio: ratios.capex_ratio,
        cash: derived.bridge.cash,
        total_debt: derived.bridge.total_debt,
        enterprise_value: point.enterprise_value,
        equity_value: point.equity_value,
        pv_explicit: point.pv_explicit,
        pv_terminal: point.pv_terminal,
        upside,
    })
}

/// Value one ticker under one growth scenario.
pub fn value_scenario(
    snapshot: &MarketSnapshot,
    inputs: &ValuationInputs,
    scenario: GrowthScenario,
    source: &dyn YieldSource,
) -> DcfResult<ComputationOutput<ValuationResult>> {
    let start = Instant::now();
    inputs.validate()?;

    let derived = derive_inputs(snapshot, inputs, source)?;
    let mut warnings = derived.ratios.notes.clone();
    let projection = project_scenario(&derived.ratios, inputs, scenario.multiplier(inputs))?;
    let result = price_scenario(&derived, inputs, scenario, &projection, &mut warnings)?;

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(METHODOLOGY, inputs, warnings, elapsed, result))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::NoYieldSource;
    use crate::statements::{FinancialStatements, StatementTable};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn periods() -> Vec<NaiveDate> {
        [2024, 2023, 2022]
            .iter()
            .filter_map(|y| NaiveDate::from_ymd_opt(*y, 6, 30))
            .collect()
    }

    fn snapshot() -> MarketSnapshot {
        let income = StatementTable::new(periods())
            .with_row("Total Revenue", vec![Some(dec!(121)), Some(dec!(110)), Some(dec!(100))])
            .with_row("EBIT", vec![Some(dec!(24.2)), Some(dec!(22)), Some(dec!(20))]);
        let mut snap = MarketSnapshot::new("TEST.AX");
        snap.price_history = vec![Some(dec!(9.5)), Some(dec!(10))];
        snap.shares_outstanding = Some(dec!(100));
        snap.beta = Some(dec!(1.0));
        snap.market_cap = Some(dec!(1000));
        snap.statements = FinancialStatements {
            income_statement: income,
            ..FinancialStatements::default()
        };
        snap
    }

    #[test]
    fn test_value_scenario_base() {
        let out = value_scenario(
            &snapshot(),
            &ValuationInputs::default(),
            GrowthScenario::Base,
            &NoYieldSource,
        )
        .unwrap();
        let r = &out.result;
        assert_eq!(r.current_price, dec!(10));
        assert_eq!(r.base_avg_growth, dec!(0.1));
        assert_eq!(r.ebit_margin_median, dec!(0.2));
        // No debt: WACC = 0.04 + 1.0 * 0.06
        assert_eq!(r.wacc, dec!(0.10));
        assert!(r.dcf_price > Decimal::ZERO);
        assert_eq!(r.equity_value, r.enterprise_value);
        assert!(!out.warnings.is_empty());
    }

    #[test]
    fn test_scenarios_order_by_growth() {
        let inputs = ValuationInputs::default();
        let price = |s| {
            value_scenario(&snapshot(), &inputs, s, &NoYieldSource)
                .unwrap()
                .result
                .dcf_price
        };
        let c = price(GrowthScenario::Conservative);
        let b = price(GrowthScenario::Base);
        let o = price(GrowthScenario::Optimistic);
        assert!(c < b && b < o);
    }

    #[test]
    fn test_missing_price_checked_before_history() {
        let mut snap = snapshot();
        snap.price_history.clear();
        snap.statements = FinancialStatements::default();
        let err = value_scenario(
            &snap,
            &ValuationInputs::default(),
            GrowthScenario::Base,
            &NoYieldSource,
        )
        .unwrap_err();
        assert!(matches!(err, DcfError::MissingMarketDatum { .. }));
    }
}
