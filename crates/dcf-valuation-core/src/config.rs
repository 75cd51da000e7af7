use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use crate::error::DcfError;
use crate::types::Rate;
use crate::DcfResult;

// ---------------------------------------------------------------------------
// Region
// ---------------------------------------------------------------------------

/// Market the company is valued against. Drives the equity premium and the
/// risk-free rate lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Region {
    #[default]
    Au,
    Us,
    Other(String),
}

impl Region {
    pub fn code(&self) -> &str {
        match self {
            Region::Au => "AU",
            Region::Us => "US",
            Region::Other(code) => code,
        }
    }
}

impl From<String> for Region {
    fn from(raw: String) -> Self {
        let code = raw.trim().to_ascii_uppercase();
        match code.as_str() {
            "AU" => Region::Au,
            "US" => Region::Us,
            _ => Region::Other(code),
        }
    }
}

impl From<&str> for Region {
    fn from(raw: &str) -> Self {
        Region::from(raw.to_string())
    }
}

impl From<Region> for String {
    fn from(region: Region) -> Self {
        region.code().to_string()
    }
}

impl FromStr for Region {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Region::from(s))
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ---------------------------------------------------------------------------
// ValuationInputs
// ---------------------------------------------------------------------------

/// Frozen assumptions for one valuation run, shared by every scenario of a
/// ticker. Fields missing from a config file take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValuationInputs {
    /// Explicit forecast horizon in years
    pub forecast_years: u32,
    /// Last year that uses the unfaded initial growth rate
    pub fade_start: u32,
    /// Perpetual growth rate after the horizon
    pub terminal_growth: Rate,
    /// Year the terminal value is discounted from
    pub terminal_year: u32,
    pub region: Region,

    pub default_tax_rate: Rate,
    pub tax_rate_min: Rate,
    pub tax_rate_max: Rate,

    pub default_cost_of_debt: Rate,
    pub cod_min: Rate,
    pub cod_max: Rate,

    /// Used whenever no usable local risk-free yield is available
    pub fallback_risk_free_rate: Rate,

    /// Capex heuristic when no history exists: D&A plus this fraction of revenue
    pub fallback_capex_extra_pct_of_revenue: Rate,
    /// D&A / revenue when the statements carry no depreciation line
    pub default_da_ratio: Rate,

    pub growth_mult_conservative: Rate,
    pub growth_mult_base: Rate,
    pub growth_mult_optimistic: Rate,

    /// Basis-point shifts applied to WACC in the sensitivity grid
    pub sens_wacc_bps: Vec<i32>,
    /// Basis-point shifts applied to terminal growth in the sensitivity grid
    pub sens_tg_bps: Vec<i32>,
}

impl Default for ValuationInputs {
    fn default() -> Self {
        Self {
            forecast_years: 10,
            fade_start: 5,
            terminal_growth: dec!(0.015),
            terminal_year: 10,
            region: Region::Au,
            default_tax_rate: dec!(0.30),
            tax_rate_min: dec!(0.05),
            tax_rate_max: dec!(0.35),
            default_cost_of_debt: dec!(0.06),
            cod_min: dec!(0.02),
            cod_max: dec!(0.12),
            fallback_risk_free_rate: dec!(0.04),
            fallback_capex_extra_pct_of_revenue: dec!(0.005),
            default_da_ratio: dec!(0.03),
            growth_mult_conservative: dec!(0.75),
            growth_mult_base: dec!(1.00),
            growth_mult_optimistic: dec!(1.25),
            sens_wacc_bps: vec![-200, -100, 0, 100, 200],
            sens_tg_bps: vec![-50, -25, 0, 25, 50],
        }
    }
}

impl ValuationInputs {
    /// Defaults, valued against `region`.
    pub fn for_region(region: impl Into<Region>) -> Self {
        Self {
            region: region.into(),
            ..Self::default()
        }
    }

    /// Check the configuration contract: every default lies inside its clamp
    /// band, the horizon is usable and both sensitivity axes are non-empty.
    pub fn validate(&self) -> DcfResult<()> {
        if self.forecast_years == 0 {
            return Err(DcfError::invalid(
                "forecast_years",
                "Forecast horizon must be at least one year",
            ));
        }
        if self.terminal_year == 0 {
            return Err(DcfError::invalid(
                "terminal_year",
                "Terminal year must be at least one",
            ));
        }
        check_band(
            "default_tax_rate",
            self.default_tax_rate,
            self.tax_rate_min,
            self.tax_rate_max,
        )?;
        check_band(
            "default_cost_of_debt",
            self.default_cost_of_debt,
            self.cod_min,
            self.cod_max,
        )?;
        if self.default_da_ratio < Decimal::ZERO {
            return Err(DcfError::invalid(
                "default_da_ratio",
                "Default D&A ratio cannot be negative",
            ));
        }
        if self.sens_wacc_bps.is_empty() {
            return Err(DcfError::invalid(
                "sens_wacc_bps",
                "At least one WACC shift is required",
            ));
        }
        if self.sens_tg_bps.is_empty() {
            return Err(DcfError::invalid(
                "sens_tg_bps",
                "At least one terminal-growth shift is required",
            ));
        }
        Ok(())
    }
}

fn check_band(field: &str, default: Rate, lo: Rate, hi: Rate) -> DcfResult<()> {
    if lo > hi {
        return Err(DcfError::invalid(
            field,
            format!("Lower bound {lo} exceeds upper bound {hi}"),
        ));
    }
    if default < lo || default > hi {
        return Err(DcfError::invalid(
            field,
            format!("Default {default} lies outside [{lo}, {hi}]"),
        ));
    }
    Ok(())
}
