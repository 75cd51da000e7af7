pub mod rates;
pub mod wacc;

pub use rates::{
    market_premium, risk_free_rate, NoYieldSource, StaticYieldSource, YieldSource,
    TEN_YEAR_YIELD_INSTRUMENT,
};
pub use wacc::{
    calculate_wacc, clamp, clamp_f64, cost_of_equity, estimate_cost_of_capital, CostOfCapital,
};
