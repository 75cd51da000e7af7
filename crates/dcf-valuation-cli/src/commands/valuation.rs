use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;
use std::time::Instant;

use dcf_valuation_core::config::{Region, ValuationInputs};
use dcf_valuation_core::market::{
    calculate_wacc, cost_of_equity, market_premium, risk_free_rate, CostOfCapital, NoYieldSource,
};
use dcf_valuation_core::pipeline::value_ticker;
use dcf_valuation_core::types::with_metadata;
use dcf_valuation_core::valuation::build_path;

use super::{load_snapshot, yield_source};

/// Arguments for a full per-ticker valuation
#[derive(Args)]
pub struct ValueArgs {
    /// Path to a market snapshot JSON file (reads stdin when omitted)
    #[arg(long)]
    pub snapshot: Option<String>,

    /// Path to a JSON array of recent 10-year yield closes, in percent
    #[arg(long)]
    pub yield_history: Option<String>,
}

/// Arguments for the cost-of-capital build-up
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct WaccArgs {
    /// Total debt (book value)
    #[arg(long)]
    pub total_debt: Decimal,

    /// Equity market capitalisation
    #[arg(long)]
    pub market_cap: Decimal,

    /// Pre-tax cost of debt (e.g. 0.06 for 6%)
    #[arg(long)]
    pub cost_of_debt: Decimal,

    /// Levered beta
    #[arg(long)]
    pub beta: Decimal,

    /// Effective tax rate
    #[arg(long)]
    pub tax_rate: Decimal,

    /// Risk-free rate; defaults to the configured fallback
    #[arg(long)]
    pub risk_free_rate: Option<Decimal>,

    /// Region code (AU, US, ...); defaults to the configured region
    #[arg(long)]
    pub region: Option<String>,
}

/// Arguments for the faded growth path
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct GrowthPathArgs {
    /// Growth in years 1..=fade-start
    #[arg(long)]
    pub initial_growth: Decimal,

    /// Growth reached in the final forecast year
    #[arg(long)]
    pub terminal_growth: Option<Decimal>,

    /// Forecast horizon in years
    #[arg(long)]
    pub years: Option<u32>,

    /// Last year held at the initial growth
    #[arg(long)]
    pub fade_start: Option<u32>,
}

pub fn run_value(
    args: ValueArgs,
    inputs: &ValuationInputs,
) -> Result<Value, Box<dyn std::error::Error>> {
    let snapshot = load_snapshot(args.snapshot.as_deref())?;
    let source = yield_source(args.yield_history.as_deref())?;
    let result = value_ticker(&snapshot, inputs, source.as_ref())?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_wacc(
    args: WaccArgs,
    inputs: &ValuationInputs,
) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let region = args
        .region
        .as_deref()
        .map(Region::from)
        .unwrap_or_else(|| inputs.region.clone());

    let rf = match args.risk_free_rate {
        Some(rf) => rf,
        None => risk_free_rate(&region, inputs.fallback_risk_free_rate, &NoYieldSource),
    };
    let premium = market_premium(&region);
    let ke = cost_of_equity(args.beta, rf, premium);
    let wacc = calculate_wacc(
        args.total_debt,
        args.market_cap,
        args.cost_of_debt,
        ke,
        args.tax_rate,
    );

    let mut warnings = Vec::new();
    let debt_weight = if args.total_debt > Decimal::ZERO && args.market_cap > Decimal::ZERO {
        args.total_debt / (args.total_debt + args.market_cap)
    } else {
        warnings.push("Debt or market cap not positive; valued as all-equity".to_string());
        Decimal::ZERO
    };

    let result = CostOfCapital {
        risk_free_rate: rf,
        market_premium: premium,
        beta: args.beta,
        cost_of_equity: ke,
        pretax_cost_of_debt: args.cost_of_debt,
        tax_rate: args.tax_rate,
        debt_weight,
        wacc,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(serde_json::to_value(with_metadata(
        "WACC (CAPM cost of equity, market-value weights)",
        &serde_json::json!({
            "region": region,
            "total_debt": args.total_debt,
            "market_cap": args.market_cap,
        }),
        warnings,
        elapsed,
        result,
    ))?)
}

pub fn run_growth_path(
    args: GrowthPathArgs,
    inputs: &ValuationInputs,
) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let years = args.years.unwrap_or(inputs.forecast_years);
    let fade_start = args.fade_start.unwrap_or(inputs.fade_start);
    let terminal_growth = args.terminal_growth.unwrap_or(inputs.terminal_growth);
    if years == 0 {
        return Err("--years must be at least 1".into());
    }

    let path = build_path(args.initial_growth, years, terminal_growth, fade_start);
    let rows: Vec<Value> = path
        .iter()
        .enumerate()
        .map(|(i, g)| serde_json::json!({ "year": i + 1, "growth": g }))
        .collect();

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(serde_json::to_value(with_metadata(
        "Flat growth then linear fade to terminal growth",
        &serde_json::json!({
            "initial_growth": args.initial_growth,
            "terminal_growth": terminal_growth,
            "years": years,
            "fade_start": fade_start,
        }),
        Vec::new(),
        elapsed,
        serde_json::json!({ "path": rows }),
    ))?)
}
