pub mod batch;
pub mod sensitivity;
pub mod valuation;

use dcf_valuation_core::market::{NoYieldSource, StaticYieldSource, YieldSource};
use dcf_valuation_core::snapshot::MarketSnapshot;

use crate::input;

/// Snapshot from `--snapshot`, else from piped stdin.
pub(crate) fn load_snapshot(
    path: Option<&str>,
) -> Result<MarketSnapshot, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return input::file::read_json(path);
    }
    input::stdin::read_stdin()?
        .ok_or_else(|| "--snapshot is required (or pipe a snapshot on stdin)".into())
}

/// Ten-year yield closes from `--yield-history`: a JSON array of percentages,
/// `null` for a missing close. Without one, the fallback risk-free rate applies.
pub(crate) fn yield_source(
    path: Option<&str>,
) -> Result<Box<dyn YieldSource>, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            let closes: Vec<Option<f64>> = input::file::read_json(path)?;
            let closes = closes.into_iter().map(|c| c.unwrap_or(f64::NAN)).collect();
            Ok(Box::new(StaticYieldSource::new(closes)))
        }
        None => Ok(Box::new(NoYieldSource)),
    }
}
