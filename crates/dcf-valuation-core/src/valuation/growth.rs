use rust_decimal::Decimal;

use crate::types::Rate;

/// Per-year growth rates for an explicit forecast.
///
/// Years `1..=fade_start` hold `initial_growth`. Later years move linearly
/// toward `terminal_growth`, reaching it exactly in the final year:
/// g_y = g0 + (gT - g0) * (y - fade_start) / max(years - fade_start, 1)
pub fn build_path(
    initial_growth: Rate,
    years: u32,
    terminal_growth: Rate,
    fade_start: u32,
) -> Vec<Rate> {
    let fade_span = Decimal::from(years.saturating_sub(fade_start).max(1));
    (1..=years)
        .map(|year| {
            if year <= fade_start {
                initial_growth
            } else {
                let step = Decimal::from(year - fade_start);
                if step == fade_span {
                    terminal_growth
                } else {
                    initial_growth + (terminal_growth - initial_growth) * (step / fade_span)
                }
            }
        })
        .collect()
}
