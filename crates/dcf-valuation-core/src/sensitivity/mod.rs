pub mod grid;

pub use grid::{
    bps_to_rate, evaluate_grid, sensitivity_grid, sensitivity_grid_with, SensitivityGrid,
    SensitivityRow,
};
