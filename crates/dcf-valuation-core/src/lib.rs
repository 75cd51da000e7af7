pub mod config;
pub mod error;
pub mod market;
pub mod ratios;
pub mod snapshot;
pub mod statements;
pub mod types;

#[cfg(feature = "valuation")]
pub mod valuation;

#[cfg(feature = "sensitivity")]
pub mod sensitivity;

#[cfg(feature = "sensitivity")]
pub mod pipeline;

pub use error::DcfError;
pub use types::*;

/// Standard result type for all valuation operations
pub type DcfResult<T> = Result<T, DcfError>;
