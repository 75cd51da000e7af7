use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::DcfError;
use crate::types::{Money, Rate, Shares};
use crate::DcfResult;

/// Minimum spread kept between the discount rate and terminal growth.
pub const TERMINAL_SPREAD_FLOOR: Rate = dec!(0.01);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerminalValue {
    pub value: Money,
    /// Rate actually used in the Gordon denominator
    pub effective_rate: Rate,
    /// True when the rate did not exceed growth and was lifted to g + floor
    pub guard_triggered: bool,
}

/// Enterprise-to-equity bridge inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityBridge {
    pub cash: Money,
    pub total_debt: Money,
    pub shares: Shares,
}

/// One discounting pass over a fixed set of flows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub pv_explicit: Money,
    pub terminal: TerminalValue,
    pub pv_terminal: Money,
    pub enterprise_value: Money,
    pub equity_value: Money,
    pub price: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// flow_t / (1 + rate)^t with t starting at 1.
pub fn present_value(flows: &[Money], rate: Rate) -> DcfResult<Vec<Money>> {
    flows
        .iter()
        .enumerate()
        .map(|(i, flow)| discount(*flow, rate, i as u64 + 1))
        .collect()
}

/// Gordon growth on the final flow: TV = last * (1 + g) / (r - g).
///
/// When r <= g the rate is replaced by g + 0.01.
pub fn terminal_value(last_flow: Money, growth: Rate, rate: Rate) -> DcfResult<TerminalValue> {
    let guard_triggered = rate <= growth;
    let effective_rate = if guard_triggered {
        debug!(%rate, %growth, "discount rate at or below terminal growth; lifting spread");
        growth + TERMINAL_SPREAD_FLOOR
    } else {
        rate
    };
    let next_flow = Decimal::ONE
        .checked_add(growth)
        .and_then(|factor| last_flow.checked_mul(factor))
        .ok_or_else(|| DcfError::overflow("terminal flow"))?;
    let spread = effective_rate
        .checked_sub(growth)
        .ok_or_else(|| DcfError::overflow("terminal spread"))?;
    let value = next_flow
        .checked_div(spread)
        .ok_or_else(|| DcfError::DivisionByZero {
            context: "terminal value spread".into(),
        })?;
    Ok(TerminalValue {
        value,
        effective_rate,
        guard_triggered,
    })
}

/// Discount the explicit flows and the terminal value, then bridge to a per-share price.
///
/// EV = sum(PV) + TV / (1 + wacc)^terminal_year
/// Equity = EV + cash - debt
/// Price = Equity / shares
pub fn value_per_share(
    flows: &[Money],
    wacc: Rate,
    terminal_growth: Rate,
    terminal_year: u32,
    bridge: &EquityBridge,
) -> DcfResult<PricePoint> {
    if bridge.shares <= Decimal::ZERO {
        return Err(DcfError::missing_datum(
            "shares_outstanding",
            "Shares outstanding must be positive",
        ));
    }
    let last_flow = *flows
        .last()
        .ok_or_else(|| DcfError::invalid("flows", "At least one forecast flow is required"))?;

    let pv_explicit = present_value(flows, wacc)?
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, pv| acc.checked_add(pv))
        .ok_or_else(|| DcfError::overflow("sum of discounted flows"))?;
    let terminal = terminal_value(last_flow, terminal_growth, wacc)?;
    let pv_terminal = discount(terminal.value, wacc, u64::from(terminal_year))?;

    let enterprise_value = pv_explicit
        .checked_add(pv_terminal)
        .ok_or_else(|| DcfError::overflow("enterprise value"))?;
    let equity_value = enterprise_value
        .checked_add(bridge.cash)
        .and_then(|v| v.checked_sub(bridge.total_debt))
        .ok_or_else(|| DcfError::overflow("equity bridge"))?;
    let price = equity_value
        .checked_div(bridge.shares)
        .ok_or_else(|| DcfError::overflow("price per share"))?;

    Ok(PricePoint {
        pv_explicit,
        terminal,
        pv_terminal,
        enterprise_value,
        equity_value,
        price,
    })
}

fn discount(amount: Money, rate: Rate, periods: u64) -> DcfResult<Money> {
    let factor = Decimal::ONE
        .checked_add(rate)
        .and_then(|base| base.checked_powu(periods))
        .ok_or_else(|| DcfError::overflow(format!("discount factor at t={periods}")))?;
    amount
        .checked_div(factor)
        .ok_or_else(|| DcfError::DivisionByZero {
            context: format!("discount factor at t={periods}"),
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn bridge() -> EquityBridge {
        EquityBridge {
            cash: dec!(50),
            total_debt: dec!(150),
            shares: dec!(10),
        }
    }

    #[test]
    fn test_present_value_starts_at_year_one() {
        let pv = present_value(&[dec!(110), dec!(121)], dec!(0.10)).unwrap();
        assert_eq!(pv, vec![dec!(100), dec!(100)]);
    }

    #[test]
    fn test_terminal_value_gordon() {
        // 100 * 1.02 / 0.06 = 1700
        let tv = terminal_value(dec!(100), dec!(0.02), dec!(0.08)).unwrap();
        assert_eq!(tv.value, dec!(1700));
        assert!(!tv.guard_triggered);
        assert_eq!(tv.effective_rate, dec!(0.08));
    }

    #[test]
    fn test_terminal_guard_lifts_rate() {
        let tv = terminal_value(dec!(100), dec!(0.05), dec!(0.04)).unwrap();
        assert!(tv.guard_triggered);
        assert_eq!(tv.effective_rate, dec!(0.06));
        // 100 * 1.05 / 0.01 = 10500
        assert_eq!(tv.value, dec!(10500));

        let equal = terminal_value(dec!(100), dec!(0.05), dec!(0.05)).unwrap();
        assert!(equal.guard_triggered);
        assert_eq!(equal.value, dec!(10500));
    }

    #[test]
    fn test_value_per_share_bridge() {
        // Single flow of 110 at 10%: PV = 100
        // TV = 110 * 1.0 / 0.10 = 1100, discounted one year = 1000
        let point = value_per_share(&[dec!(110)], dec!(0.10), Decimal::ZERO, 1, &bridge()).unwrap();
        assert_eq!(point.pv_explicit, dec!(100));
        assert_eq!(point.terminal.value, dec!(1100));
        assert_eq!(point.pv_terminal, dec!(1000));
        assert_eq!(point.enterprise_value, dec!(1100));
        // 1100 + 50 - 150 = 1000; / 10 = 100
        assert_eq!(point.equity_value, dec!(1000));
        assert_eq!(point.price, dec!(100));
    }

    #[test]
    fn test_zero_shares_is_fatal() {
        let mut b = bridge();
        b.shares = Decimal::ZERO;
        let err = value_per_share(&[dec!(110)], dec!(0.10), Decimal::ZERO, 1, &b).unwrap_err();
        assert!(matches!(err, DcfError::MissingMarketDatum { .. }));
    }

    #[test]
    fn test_empty_flows_rejected() {
        let err = value_per_share(&[], dec!(0.10), Decimal::ZERO, 1, &bridge()).unwrap_err();
        assert!(matches!(err, DcfError::InvalidInput { .. }));
    }

    #[test]
    fn test_rate_of_minus_one_is_division_by_zero() {
        let err = present_value(&[dec!(10)], dec!(-1)).unwrap_err();
        assert!(matches!(err, DcfError::DivisionByZero { .. }));
    }

    #[test]
    fn test_oversized_flows_are_overflow_errors() {
        let huge = Decimal::MAX / dec!(2);
        let err = terminal_value(huge, dec!(0.02), dec!(0.08)).unwrap_err();
        assert!(matches!(err, DcfError::NumericOverflow { .. }));

        // Each flow discounts fine on its own; the sum does not fit
        let err = value_per_share(&[huge, huge, huge], Decimal::ZERO, dec!(-0.5), 3, &bridge())
            .unwrap_err();
        assert!(matches!(err, DcfError::NumericOverflow { .. }));
        assert!(err.is_per_ticker());
    }
}
