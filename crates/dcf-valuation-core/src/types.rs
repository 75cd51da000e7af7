use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::ValuationInputs;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Share counts
pub type Shares = Decimal;

/// The fixed three-way scenario axis applied to historical revenue growth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrowthScenario {
    Conservative,
    Base,
    Optimistic,
}

impl GrowthScenario {
    pub const ALL: [GrowthScenario; 3] = [
        GrowthScenario::Conservative,
        GrowthScenario::Base,
        GrowthScenario::Optimistic,
    ];

    pub fn label(self) -> &'static str {
        match self {
            GrowthScenario::Conservative => "conservative",
            GrowthScenario::Base => "base",
            GrowthScenario::Optimistic => "optimistic",
        }
    }

    /// Multiplier on the historical average growth for this scenario.
    pub fn multiplier(self, inputs: &ValuationInputs) -> Rate {
        match self {
            GrowthScenario::Conservative => inputs.growth_mult_conservative,
            GrowthScenario::Base => inputs.growth_mult_base,
            GrowthScenario::Optimistic => inputs.growth_mult_optimistic,
        }
    }
}

impl fmt::Display for GrowthScenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
