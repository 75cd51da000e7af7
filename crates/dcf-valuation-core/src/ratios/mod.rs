pub mod deriver;
pub mod fallback;
pub mod stats;

pub use deriver::{derive_ratios, DerivedRatios};
pub use fallback::{first_available, Extractor, Resolved};
