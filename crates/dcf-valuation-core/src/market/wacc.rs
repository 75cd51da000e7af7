use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::ValuationInputs;
use crate::types::{Money, Rate};

use super::rates::{market_premium, risk_free_rate, YieldSource};

/// Cost-of-capital build-up for one ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostOfCapital {
    pub risk_free_rate: Rate,
    pub market_premium: Rate,
    pub beta: Decimal,
    pub cost_of_equity: Rate,
    pub pretax_cost_of_debt: Rate,
    pub tax_rate: Rate,
    /// D / (D + E); zero when the company is valued as all-equity
    pub debt_weight: Rate,
    pub wacc: Rate,
}

/// CAPM: Ke = Rf + Beta * premium
pub fn cost_of_equity(beta: Decimal, risk_free_rate: Rate, market_premium: Rate) -> Rate {
    risk_free_rate + beta * market_premium
}

/// Weighted average cost of capital on market-value weights.
///
/// Negative debt or market cap is treated as zero. With either at zero the
/// company is all-equity and WACC is the cost of equity.
///
/// WACC = (1 - Wd) * Ke + Wd * Kd * (1 - t), Wd = D / (D + E)
pub fn calculate_wacc(
    total_debt: Money,
    market_cap: Money,
    pretax_cost_of_debt: Rate,
    equity_cost: Rate,
    tax_rate: Rate,
) -> Rate {
    let debt = total_debt.max(Decimal::ZERO);
    let equity = market_cap.max(Decimal::ZERO);
    if debt <= Decimal::ZERO || equity <= Decimal::ZERO {
        return equity_cost;
    }
    let wd = debt / (debt + equity);
    (Decimal::ONE - wd) * equity_cost + wd * pretax_cost_of_debt * (Decimal::ONE - tax_rate)
}

/// `default` when `value` is missing, otherwise `value` clamped into [lo, hi].
pub fn clamp(value: Option<Decimal>, lo: Decimal, hi: Decimal, default: Decimal) -> Decimal {
    match value {
        Some(v) => v.max(lo).min(hi),
        None => default,
    }
}

/// `clamp` for raw floats: NaN and infinities count as missing.
pub fn clamp_f64(value: Option<f64>, lo: Decimal, hi: Decimal, default: Decimal) -> Decimal {
    clamp(value.and_then(Decimal::from_f64), lo, hi, default)
}

/// Full build-up: regional premium, risk-free rate, CAPM, then WACC.
pub fn estimate_cost_of_capital(
    beta: Decimal,
    market_cap: Money,
    total_debt: Money,
    pretax_cost_of_debt: Rate,
    tax_rate: Rate,
    inputs: &ValuationInputs,
    source: &dyn YieldSource,
) -> CostOfCapital {
    let rf = risk_free_rate(&inputs.region, inputs.fallback_risk_free_rate, source);
    let premium = market_premium(&inputs.region);
    let ke = cost_of_equity(beta, rf, premium);
    let wacc = calculate_wacc(total_debt, market_cap, pretax_cost_of_debt, ke, tax_rate);

    let debt_weight = if total_debt > Decimal::ZERO && market_cap > Decimal::ZERO {
        total_debt / (total_debt + market_cap)
    } else {
        Decimal::ZERO
    };

    CostOfCapital {
        risk_free_rate: rf,
        market_premium: premium,
        beta,
        cost_of_equity: ke,
        pretax_cost_of_debt,
        tax_rate,
        debt_weight,
        wacc,
    }
}
