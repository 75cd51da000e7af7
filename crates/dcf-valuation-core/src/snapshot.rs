use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::DcfError;
use crate::statements::FinancialStatements;
use crate::types::{Money, Shares};
use crate::DcfResult;

/// Everything the data-retrieval side supplies for one ticker.
///
/// Fields are optional because sources routinely omit them; the accessors
/// below decide which omissions are fatal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub ticker: String,
    /// Recent daily closes, oldest first. `None` marks a missing close.
    #[serde(default)]
    pub price_history: Vec<Option<Decimal>>,
    #[serde(default)]
    pub shares_outstanding: Option<Shares>,
    #[serde(default)]
    pub long_name: Option<String>,
    #[serde(default)]
    pub short_name: Option<String>,
    #[serde(default)]
    pub beta: Option<Decimal>,
    #[serde(default)]
    pub market_cap: Option<Money>,
    #[serde(default)]
    pub statements: FinancialStatements,
}

impl MarketSnapshot {
    pub fn new(ticker: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
            ..Self::default()
        }
    }

    /// Most recent close.
    pub fn current_price(&self) -> DcfResult<Money> {
        self.price_history
            .iter()
            .rev()
            .find_map(|close| *close)
            .ok_or_else(|| DcfError::missing_datum("price_history", "Missing price history"))
    }

    pub fn shares_outstanding(&self) -> DcfResult<Shares> {
        match self.shares_outstanding {
            Some(shares) if shares > Decimal::ZERO => Ok(shares),
            _ => Err(DcfError::missing_datum(
                "shares_outstanding",
                "Missing or zero sharesOutstanding",
            )),
        }
    }

    pub fn beta(&self) -> DcfResult<Decimal> {
        self.beta
            .ok_or_else(|| DcfError::missing_datum("beta", "Missing beta"))
    }

    pub fn market_cap(&self) -> DcfResult<Money> {
        match self.market_cap {
            Some(cap) if cap > Decimal::ZERO => Ok(cap),
            _ => Err(DcfError::missing_datum(
                "market_cap",
                "Missing or zero marketCap",
            )),
        }
    }

    /// Long name, else short name, else the ticker itself. Blank names count as missing.
    pub fn display_name(&self) -> String {
        [&self.long_name, &self.short_name]
            .into_iter()
            .flatten()
            .map(|name| name.trim())
            .find(|name| !name.is_empty())
            .unwrap_or(self.ticker.as_str())
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_current_price_is_last_present_close() {
        let mut snap = MarketSnapshot::new("BHP.AX");
        snap.price_history = vec![Some(dec!(44.1)), Some(dec!(44.9)), None];
        assert_eq!(snap.current_price().unwrap(), dec!(44.9));
    }

    #[test]
    fn test_empty_price_history_is_missing_datum() {
        let snap = MarketSnapshot::new("BHP.AX");
        match snap.current_price().unwrap_err() {
            DcfError::MissingMarketDatum { field, .. } => assert_eq!(field, "price_history"),
            e => panic!("Expected MissingMarketDatum, got {e:?}"),
        }
    }

    #[test]
    fn test_non_positive_shares_and_market_cap_rejected() {
        let mut snap = MarketSnapshot::new("X");
        snap.shares_outstanding = Some(Decimal::ZERO);
        snap.market_cap = Some(dec!(-1));
        assert!(snap.shares_outstanding().is_err());
        assert!(snap.market_cap().is_err());
        assert!(snap.beta().is_err());
    }

    #[test]
    fn test_display_name_fallback_chain() {
        let mut snap = MarketSnapshot::new("CBA.AX");
        assert_eq!(snap.display_name(), "CBA.AX");
        snap.short_name = Some("COMMONWEALTH BANK".into());
        assert_eq!(snap.display_name(), "COMMONWEALTH BANK");
        snap.long_name = Some("   ".into());
        assert_eq!(snap.display_name(), "COMMONWEALTH BANK");
        snap.long_name = Some("Commonwealth Bank of Australia".into());
        assert_eq!(snap.display_name(), "Commonwealth Bank of Australia");
    }
}
