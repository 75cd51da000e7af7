pub mod discount;
pub mod forecast;
pub mod growth;
pub mod model;

pub use discount::{
    present_value, terminal_value, value_per_share, EquityBridge, PricePoint, TerminalValue,
    TERMINAL_SPREAD_FLOOR,
};
pub use forecast::{project, project_scenario, ForecastDrivers, OperatingProjection};
pub use growth::build_path;
pub use model::{
    derive_inputs, price_scenario, value_scenario, DerivedInputs, ValuationResult, METHODOLOGY,
};
