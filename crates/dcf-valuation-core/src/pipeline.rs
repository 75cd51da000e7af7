use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

use crate::config::ValuationInputs;
use crate::market::YieldSource;
use crate::sensitivity::{evaluate_grid, SensitivityRow};
use crate::snapshot::MarketSnapshot;
use crate::types::{with_metadata, ComputationOutput, GrowthScenario, Money};
use crate::valuation::{derive_inputs, price_scenario, project_scenario, ValuationResult};
use crate::DcfResult;

/// Complete output for one ticker: three scenarios plus the base-case grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerValuation {
    pub ticker: String,
    pub name: String,
    pub current_price: Money,
    /// Conservative, base, optimistic
    pub scenarios: Vec<ValuationResult>,
    pub sensitivity: Vec<SensitivityRow>,
}

impl TickerValuation {
    pub fn scenario(&self, scenario: GrowthScenario) -> Option<&ValuationResult> {
        self.scenarios.iter().find(|r| r.scenario == scenario)
    }
}

/// Run the full valuation for one ticker.
///
/// Ratios and cost of capital are derived once; each scenario is projected
/// once; the grid re-discounts the base projection.
pub fn value_ticker(
    snapshot: &MarketSnapshot,
    inputs: &ValuationInputs,
    source: &dyn YieldSource,
) -> DcfResult<ComputationOutput<TickerValuation>> {
    let start = Instant::now();
    inputs.validate()?;

    let derived = derive_inputs(snapshot, inputs, source)?;
    let mut warnings = derived.ratios.notes.clone();

    let mut scenarios = Vec::with_capacity(GrowthScenario::ALL.len());
    let mut sensitivity = Vec::new();
    for scenario in GrowthScenario::ALL {
        let projection = project_scenario(&derived.ratios, inputs, scenario.multiplier(inputs))?;
        scenarios.push(price_scenario(
            &derived,
            inputs,
            scenario,
            &projection,
            &mut warnings,
        )?);
        if scenario == GrowthScenario::Base {
            sensitivity = evaluate_grid(
                &derived.ticker,
                &projection,
                &derived.bridge,
                derived.capital.wacc,
                inputs,
                &mut warnings,
            );
        }
    }

    info!(
        ticker = %derived.ticker,
        wacc = %derived.capital.wacc,
        base_price = ?scenarios.iter().find(|r| r.scenario == GrowthScenario::Base).map(|r| r.dcf_price),
        "valued ticker"
    );

    let valuation = TickerValuation {
        ticker: derived.ticker,
        name: derived.name,
        current_price: derived.current_price,
        scenarios,
        sensitivity,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        crate::valuation::METHODOLOGY,
        inputs,
        warnings,
        elapsed,
        valuation,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DcfError;
    use crate::market::NoYieldSource;

    #[test]
    fn test_empty_snapshot_fails_on_price() {
        let snap = MarketSnapshot::new("NONE.AX");
        let err = value_ticker(&snap, &ValuationInputs::default(), &NoYieldSource).unwrap_err();
        assert!(err.is_per_ticker());
        assert!(matches!(err, DcfError::MissingMarketDatum { .. }));
    }

    #[test]
    fn test_invalid_inputs_rejected_before_data() {
        let inputs = ValuationInputs {
            forecast_years: 0,
            ..ValuationInputs::default()
        };
        let err = value_ticker(&MarketSnapshot::new("X"), &inputs, &NoYieldSource).unwrap_err();
        assert!(matches!(err, DcfError::InvalidInput { .. }));
    }
}
