use clap::Args;
use colored::Colorize;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use dcf_valuation_core::config::ValuationInputs;
use dcf_valuation_core::pipeline::{value_ticker, TickerValuation};
use dcf_valuation_core::sensitivity::SensitivityRow;
use dcf_valuation_core::snapshot::MarketSnapshot;
use dcf_valuation_core::valuation::ValuationResult;
use dcf_valuation_core::GrowthScenario;

use super::yield_source;
use crate::input;

pub const SCENARIOS_WIDE_FILE: &str = "dcf_results_scenarios_wide.csv";
pub const SCENARIOS_LONG_FILE: &str = "dcf_results_scenarios_long.csv";
pub const BASE_DETAILS_FILE: &str = "dcf_results_base_details.csv";
pub const SENSITIVITY_LONG_FILE: &str = "dcf_results_sensitivity_long.csv";

/// Arguments for a multi-ticker batch run
#[derive(Args)]
pub struct BatchArgs {
    /// Market snapshot JSON files, one per ticker
    #[arg(long, num_args = 1.., required = true)]
    pub snapshots: Vec<String>,

    /// Directory for the result CSVs (created if missing)
    #[arg(long, default_value = "output")]
    pub out_dir: String,

    /// Path to a JSON array of recent 10-year yield closes, in percent
    #[arg(long)]
    pub yield_history: Option<String>,
}

// ---------------------------------------------------------------------------
// CSV rows
// ---------------------------------------------------------------------------

/// One ticker, one column per scenario price.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioWideRow {
    pub ticker: String,
    pub name: String,
    pub current_price: Decimal,
    pub conservative_price: Option<Decimal>,
    pub base_price: Option<Decimal>,
    pub optimistic_price: Option<Decimal>,
    pub wacc: Option<Decimal>,
    pub rf: Option<Decimal>,
    pub tax_rate: Option<Decimal>,
}

/// The wide table melted over the scenario axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioLongRow {
    pub ticker: String,
    pub name: String,
    pub current_price: Decimal,
    pub wacc: Option<Decimal>,
    pub rf: Option<Decimal>,
    pub tax_rate: Option<Decimal>,
    pub scenario: GrowthScenario,
    pub dcf_price: Option<Decimal>,
}

/// Flat base-scenario detail; every column always present.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaseDetailRow {
    pub ticker: String,
    pub name: String,
    pub current_price: Decimal,
    pub dcf_price: Decimal,
    pub upside: Option<Decimal>,
    pub wacc: Decimal,
    pub rf: Decimal,
    pub mrp: Decimal,
    pub cost_of_equity: Decimal,
    pub tax_rate: Decimal,
    pub pretax_cost_of_debt: Decimal,
    pub base_avg_growth: Decimal,
    pub initial_growth: Decimal,
    pub ebit_margin_median: Decimal,
    pub da_ratio_median: Decimal,
    pub wc_ratio_median: Decimal,
    pub capex_ratio: Option<Decimal>,
    pub cash: Decimal,
    pub total_debt: Decimal,
    pub enterprise_value: Decimal,
    pub equity_value: Decimal,
    pub pv_explicit: Decimal,
    pub pv_terminal: Decimal,
}

impl From<&ValuationResult> for BaseDetailRow {
    fn from(r: &ValuationResult) -> Self {
        Self {
            ticker: r.ticker.clone(),
            name: r.name.clone(),
            current_price: r.current_price,
            dcf_price: r.dcf_price,
            upside: r.upside,
            wacc: r.wacc,
            rf: r.risk_free_rate,
            mrp: r.market_premium,
            cost_of_equity: r.cost_of_equity,
            tax_rate: r.tax_rate,
            pretax_cost_of_debt: r.pretax_cost_of_debt,
            base_avg_growth: r.base_avg_growth,
            initial_growth: r.initial_growth,
            ebit_margin_median: r.ebit_margin_median,
            da_ratio_median: r.da_ratio_median,
            wc_ratio_median: r.wc_ratio_median,
            capex_ratio: r.capex_ratio,
            cash: r.cash,
            total_debt: r.total_debt,
            enterprise_value: r.enterprise_value,
            equity_value: r.equity_value,
            pv_explicit: r.pv_explicit,
            pv_terminal: r.pv_terminal,
        }
    }
}

pub fn wide_row(valuation: &TickerValuation) -> ScenarioWideRow {
    let price = |s| valuation.scenario(s).map(|r| r.dcf_price);
    let base = valuation.scenario(GrowthScenario::Base);
    ScenarioWideRow {
        ticker: valuation.ticker.clone(),
        name: valuation.name.clone(),
        current_price: valuation.current_price,
        conservative_price: price(GrowthScenario::Conservative),
        base_price: price(GrowthScenario::Base),
        optimistic_price: price(GrowthScenario::Optimistic),
        wacc: base.map(|r| r.wacc),
        rf: base.map(|r| r.risk_free_rate),
        tax_rate: base.map(|r| r.tax_rate),
    }
}

/// Melt wide rows: all conservative rows, then base, then optimistic.
pub fn to_long(wide: &[ScenarioWideRow]) -> Vec<ScenarioLongRow> {
    GrowthScenario::ALL
        .into_iter()
        .flat_map(|scenario| {
            wide.iter().map(move |w| ScenarioLongRow {
                ticker: w.ticker.clone(),
                name: w.name.clone(),
                current_price: w.current_price,
                wacc: w.wacc,
                rf: w.rf,
                tax_rate: w.tax_rate,
                scenario,
                dcf_price: match scenario {
                    GrowthScenario::Conservative => w.conservative_price,
                    GrowthScenario::Base => w.base_price,
                    GrowthScenario::Optimistic => w.optimistic_price,
                },
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

pub fn run_batch(
    args: BatchArgs,
    inputs: &ValuationInputs,
) -> Result<Value, Box<dyn std::error::Error>> {
    let source = yield_source(args.yield_history.as_deref())?;

    let mut valued: Vec<TickerValuation> = Vec::new();
    let mut failures: Vec<Value> = Vec::new();

    for path in &args.snapshots {
        let snapshot: MarketSnapshot = match input::file::read_json(path) {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to read {}: {}", path, e);
                failures.push(serde_json::json!({ "source": path, "error": e.to_string() }));
                continue;
            }
        };
        let ticker = snapshot.ticker.trim().to_string();
        if ticker.is_empty() {
            warn!("Skipping {}: snapshot has no ticker", path);
            continue;
        }

        match value_ticker(&snapshot, inputs, source.as_ref()) {
            Ok(out) => {
                for w in &out.warnings {
                    info!(ticker = %ticker, "{}", w);
                }
                info!("Done: {}", ticker);
                valued.push(out.result);
            }
            Err(e) => {
                warn!("Failed to value {}: {}", ticker, e);
                failures.push(serde_json::json!({ "source": ticker, "error": e.to_string() }));
            }
        }
    }

    let out_dir = PathBuf::from(&args.out_dir);
    fs::create_dir_all(&out_dir)
        .map_err(|e| format!("Failed to create '{}': {}", out_dir.display(), e))?;

    let wide: Vec<ScenarioWideRow> = valued.iter().map(wide_row).collect();
    let long = to_long(&wide);
    let details: Vec<BaseDetailRow> = valued
        .iter()
        .filter_map(|v| v.scenario(GrowthScenario::Base))
        .map(BaseDetailRow::from)
        .collect();
    let sensitivity: Vec<SensitivityRow> = valued
        .iter()
        .flat_map(|v| v.sensitivity.iter().cloned())
        .collect();

    let mut files = vec![
        write_csv(&out_dir.join(SCENARIOS_WIDE_FILE), &wide)?,
        write_csv(&out_dir.join(SCENARIOS_LONG_FILE), &long)?,
        write_csv(&out_dir.join(BASE_DETAILS_FILE), &details)?,
    ];
    if !sensitivity.is_empty() {
        files.push(write_csv(&out_dir.join(SENSITIVITY_LONG_FILE), &sensitivity)?);
    }

    info!(
        valued = valued.len(),
        failed = failures.len(),
        "batch complete"
    );
    if !failures.is_empty() {
        eprintln!(
            "{}: {} of {} snapshots failed",
            "warning".yellow().bold(),
            failures.len(),
            args.snapshots.len()
        );
    }

    Ok(serde_json::json!({
        "result": {
            "valued": valued.len(),
            "failed": failures.len(),
            "files": files,
            "failures": failures,
        }
    }))
}

fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<String, Box<dyn std::error::Error>> {
    let mut wtr = csv::Writer::from_path(path)
        .map_err(|e| format!("Failed to write '{}': {}", path.display(), e))?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(path.display().to_string())
}
