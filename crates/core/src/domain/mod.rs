pub mod candidate;
pub mod lenient;
pub mod market;
pub mod performance;
pub mod report;

/// Daily change at or above which an instrument is treated as limit-up.
///
/// The exchange rule is ±10%; 9.9 absorbs rounding noise in upstream quotes.
pub const LIMIT_UP_PCT: f64 = 9.9;

/// Lower bound (inclusive) of the near-limit band `[7, 9.9)`.
pub const NEAR_LIMIT_PCT: f64 = 7.0;

pub(crate) fn round_dp(value: f64, dp: i32) -> f64 {
    let factor = 10f64.powi(dp);
    (value * factor).round() / factor
}
