use fixed::types::{I32F32, I64F64};

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
///
/// Used for probabilities (luck chance) where the value lives in [0, 1].
pub type Fixed64 = I32F32;

/// Q64.64 fixed-point for progress accumulation.
///
/// Progress is kept as effective milliseconds into the current cycle, not as
/// a percentage, so whole-millisecond frames at power-of-two speeds add up
/// exactly however they are split.
pub type Fixed128 = I64F64;

/// Milliseconds of simulated or wall-clock time.
pub type Millis = u64;

/// Convert an f64 to Fixed64. Use only for configuration, never in the tick loop.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::saturating_from_num(v)
}

/// Convert Fixed64 to f64. Use only for display.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Convert an f64 to Fixed128, saturating at the representable range.
/// NaN maps to zero.
#[inline]
pub fn f64_to_fixed128(v: f64) -> Fixed128 {
    if v.is_nan() {
        return Fixed128::ZERO;
    }
    Fixed128::saturating_from_num(v)
}

/// Convert Fixed128 to f64. Use only for display and snapshots.
#[inline]
pub fn fixed128_to_f64(v: Fixed128) -> f64 {
    v.to_num::<f64>()
}

/// Effective cycle time covered by `dt_ms` of elapsed time at `speed` times
/// base speed. Non-positive or NaN inputs yield zero.
pub fn elapsed_delta(dt_ms: f64, speed: f64) -> Fixed128 {
    if !(dt_ms > 0.0 && speed > 0.0) {
        return Fixed128::ZERO;
    }
    f64_to_fixed128(dt_ms).saturating_mul(f64_to_fixed128(speed))
}

/// `elapsed_ms` as a percentage of a `duration_ms` cycle. Display only.
pub fn percent_of(elapsed_ms: Fixed128, duration_ms: Millis) -> f64 {
    if duration_ms == 0 {
        return 0.0;
    }
    fixed128_to_f64(elapsed_ms) * 100.0 / duration_ms as f64
}
