use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::config::ValuationInputs;
use crate::ratios::DerivedRatios;
use crate::types::{with_metadata, ComputationOutput, GrowthScenario, Money, Rate};
use crate::valuation::{
    project_scenario, value_per_share, DerivedInputs, EquityBridge, OperatingProjection,
};
use crate::DcfResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One (WACC shift, terminal-growth shift) cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityRow {
    pub ticker: String,
    pub wacc_bps_shift: i32,
    pub terminal_g_bps_shift: i32,
    pub wacc: Rate,
    pub terminal_growth: Rate,
    /// `None` when discounting failed for this cell
    pub dcf_price: Option<Money>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityGrid {
    pub ticker: String,
    pub scenario: GrowthScenario,
    pub base_wacc: Rate,
    pub base_terminal_growth: Rate,
    /// WACC-major: every growth shift for the first WACC shift, then the next
    pub rows: Vec<SensitivityRow>,
}

impl SensitivityGrid {
    pub fn cell(&self, wacc_bps: i32, tg_bps: i32) -> Option<&SensitivityRow> {
        self.rows
            .iter()
            .find(|r| r.wacc_bps_shift == wacc_bps && r.terminal_g_bps_shift == tg_bps)
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Basis points to a decimal rate: 100 bps = 0.01.
pub fn bps_to_rate(bps: i32) -> Rate {
    Decimal::new(i64::from(bps), 4)
}

fn shifted(rate: Rate, bps: i32) -> Rate {
    if bps == 0 {
        rate
    } else {
        rate + bps_to_rate(bps)
    }
}

/// Re-discount a fixed projection over the configured bps grids.
///
/// Only discounting runs per cell. A cell that cannot be priced keeps its
/// row with no price and adds a warning.
pub fn evaluate_grid(
    ticker: &str,
    projection: &OperatingProjection,
    bridge: &EquityBridge,
    base_wacc: Rate,
    inputs: &ValuationInputs,
    warnings: &mut Vec<String>,
) -> Vec<SensitivityRow> {
    let mut rows = Vec::with_capacity(inputs.sens_wacc_bps.len() * inputs.sens_tg_bps.len());
    for &dw in &inputs.sens_wacc_bps {
        let wacc = shifted(base_wacc, dw);
        for &dg in &inputs.sens_tg_bps {
            let terminal_growth = shifted(inputs.terminal_growth, dg);
            let dcf_price = match value_per_share(
                &projection.fcf,
                wacc,
                terminal_growth,
                inputs.terminal_year,
                bridge,
            ) {
                Ok(point) => {
                    if point.terminal.guard_triggered {
                        debug!(ticker, dw, dg, "terminal guard fired in grid cell");
                    }
                    Some(point.price)
                }
                Err(e) => {
                    warnings.push(format!(
                        "{ticker}: sensitivity cell ({dw:+} bps, {dg:+} bps) failed: {e}"
                    ));
                    None
                }
            };
            rows.push(SensitivityRow {
                ticker: ticker.to_string(),
                wacc_bps_shift: dw,
                terminal_g_bps_shift: dg,
                wacc,
                terminal_growth,
                dcf_price,
            });
        }
    }
    rows
}

/// Build the grid around one scenario, projecting exactly once through `projector`.
pub fn sensitivity_grid_with<F>(
    derived: &DerivedInputs,
    inputs: &ValuationInputs,
    scenario: GrowthScenario,
    projector: F,
) -> DcfResult<ComputationOutput<SensitivityGrid>>
where
    F: FnOnce(&DerivedRatios, &ValuationInputs, Rate) -> DcfResult<OperatingProjection>,
{
    let start = Instant::now();
    inputs.validate()?;
    let mut warnings = derived.ratios.notes.clone();

    let projection = projector(&derived.ratios, inputs, scenario.multiplier(inputs))?;
    let base_wacc = derived.capital.wacc;
    let rows = evaluate_grid(
        &derived.ticker,
        &projection,
        &derived.bridge,
        base_wacc,
        inputs,
        &mut warnings,
    );

    let grid = SensitivityGrid {
        ticker: derived.ticker.clone(),
        scenario,
        base_wacc,
        base_terminal_growth: inputs.terminal_growth,
        rows,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "DCF sensitivity (WACC x terminal growth, fixed projection)",
        &serde_json::json!({
            "scenario": scenario,
            "wacc_bps": inputs.sens_wacc_bps,
            "terminal_growth_bps": inputs.sens_tg_bps,
            "terminal_year": inputs.terminal_year,
        }),
        warnings,
        elapsed,
        grid,
    ))
}

pub fn sensitivity_grid(
    derived: &DerivedInputs,
    inputs: &ValuationInputs,
    scenario: GrowthScenario,
) -> DcfResult<ComputationOutput<SensitivityGrid>> {
    sensitivity_grid_with(derived, inputs, scenario, project_scenario)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
