use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

use crate::config::Region;
use crate::error::DcfError;
use crate::types::Rate;
use crate::DcfResult;

/// Reference instrument quoting the US 10-year Treasury yield in percent.
pub const TEN_YEAR_YIELD_INSTRUMENT: &str = "^TNX";

/// Exclusive upper bound for an accepted risk-free yield.
const MAX_RISK_FREE_RATE: Decimal = dec!(0.20);

/// Recent daily closes of a quoted instrument, oldest first.
pub trait YieldSource {
    fn recent_closes(&self, instrument: &str) -> DcfResult<Vec<f64>>;
}

/// A source with no market access; every lookup fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoYieldSource;

impl YieldSource for NoYieldSource {
    fn recent_closes(&self, instrument: &str) -> DcfResult<Vec<f64>> {
        Err(DcfError::SourceUnavailable(format!(
            "no yield source configured for {instrument}"
        )))
    }
}

/// A fixed close history, served for any instrument.
#[derive(Debug, Clone, Default)]
pub struct StaticYieldSource {
    closes: Vec<f64>,
}

impl StaticYieldSource {
    pub fn new(closes: Vec<f64>) -> Self {
        Self { closes }
    }
}

impl YieldSource for StaticYieldSource {
    fn recent_closes(&self, _instrument: &str) -> DcfResult<Vec<f64>> {
        Ok(self.closes.clone())
    }
}

/// Equity market premium for a region.
pub fn market_premium(region: &Region) -> Rate {
    match region {
        Region::Au => dec!(0.06),
        Region::Us => dec!(0.055),
        Region::Other(_) => dec!(0.06),
    }
}

/// Local risk-free rate.
///
/// Only the US has a usable quoted yield: the latest close of the 10-year
/// reference, read as a percentage, accepted when strictly inside (0, 0.20).
/// Every other case returns `fallback`.
pub fn risk_free_rate(region: &Region, fallback: Rate, source: &dyn YieldSource) -> Rate {
    if *region != Region::Us {
        return fallback;
    }
    match quoted_yield(source) {
        Some(rf) => rf,
        None => {
            debug!(%fallback, "10-year yield unusable; using fallback risk-free rate");
            fallback
        }
    }
}

fn quoted_yield(source: &dyn YieldSource) -> Option<Rate> {
    let closes = source.recent_closes(TEN_YEAR_YIELD_INSTRUMENT).ok()?;
    let latest = closes.iter().rev().find(|c| !c.is_nan())?;
    let rf = Decimal::from_f64(*latest)? / dec!(100);
    (rf > Decimal::ZERO && rf < MAX_RISK_FREE_RATE).then_some(rf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_premium_by_region() {
        assert_eq!(market_premium(&Region::Au), dec!(0.06));
        assert_eq!(market_premium(&Region::Us), dec!(0.055));
        assert_eq!(market_premium(&Region::from("GB")), dec!(0.06));
    }

    #[test]
    fn test_us_yield_read_as_percentage() {
        let source = StaticYieldSource::new(vec![4.10, 4.25, f64::NAN]);
        assert_eq!(risk_free_rate(&Region::Us, dec!(0.04), &source), dec!(0.0425));
    }

    #[test]
    fn test_non_us_ignores_source() {
        let source = StaticYieldSource::new(vec![4.25]);
        assert_eq!(risk_free_rate(&Region::Au, dec!(0.04), &source), dec!(0.04));
    }

    #[test]
    fn test_out_of_range_or_failed_source_falls_back() {
        let too_high = StaticYieldSource::new(vec![25.0]);
        assert_eq!(risk_free_rate(&Region::Us, dec!(0.04), &too_high), dec!(0.04));
        let zero = StaticYieldSource::new(vec![0.0]);
        assert_eq!(risk_free_rate(&Region::Us, dec!(0.04), &zero), dec!(0.04));
        let infinite = StaticYieldSource::new(vec![f64::INFINITY]);
        assert_eq!(risk_free_rate(&Region::Us, dec!(0.04), &infinite), dec!(0.04));
        assert_eq!(risk_free_rate(&Region::Us, dec!(0.04), &NoYieldSource), dec!(0.04));
        let empty = StaticYieldSource::new(Vec::new());
        assert_eq!(risk_free_rate(&Region::Us, dec!(0.04), &empty), dec!(0.04));
    }
}
