use clap::Args;
use serde_json::Value;

use dcf_valuation_core::config::ValuationInputs;
use dcf_valuation_core::sensitivity::sensitivity_grid;
use dcf_valuation_core::valuation::derive_inputs;
use dcf_valuation_core::GrowthScenario;

use super::{load_snapshot, yield_source};

/// Arguments for the WACC x terminal-growth grid
#[derive(Args)]
pub struct SensitivityArgs {
    /// Path to a market snapshot JSON file (reads stdin when omitted)
    #[arg(long)]
    pub snapshot: Option<String>,

    /// Path to a JSON array of recent 10-year yield closes, in percent
    #[arg(long)]
    pub yield_history: Option<String>,

    /// Growth scenario to project: conservative, base, optimistic
    #[arg(long, default_value = "base", value_parser = parse_scenario)]
    pub scenario: GrowthScenario,
}

fn parse_scenario(s: &str) -> Result<GrowthScenario, String> {
    GrowthScenario::ALL
        .into_iter()
        .find(|scenario| scenario.label().eq_ignore_ascii_case(s.trim()))
        .ok_or_else(|| format!("Unknown scenario '{s}' (expected conservative, base or optimistic)"))
}

pub fn run_sensitivity(
    args: SensitivityArgs,
    inputs: &ValuationInputs,
) -> Result<Value, Box<dyn std::error::Error>> {
    let snapshot = load_snapshot(args.snapshot.as_deref())?;
    let source = yield_source(args.yield_history.as_deref())?;
    let derived = derive_inputs(&snapshot, inputs, source.as_ref())?;
    let result = sensitivity_grid(&derived, inputs, args.scenario)?;
    Ok(serde_json::to_value(result)?)
}
