//! Generic math helpers shared by the engine.
//!
//! Design goals:
//! - `no_std` ready (guarded by the crate feature `no-std`)
//! - Math backend selection that works in both `std` and `no_std` contexts
//! - Side-effect free helpers that are easy to test
//!
//! Sizing math (sample counts derived from seconds, milliseconds or tempo)
//! is done in `f64` so that round figures stay exact: 10 ms at 44.1 kHz is
//! exactly 441 samples, not 440.99997.

use cfg_if::cfg_if;

// ----------------------------- Math backend selection -----------------------------

cfg_if! {
    // micromath preferred if explicitly requested (works in no_std, f32 only)
    if #[cfg(feature = "micromath")] {
        use micromath::F32Ext as _;
        #[inline] fn m_round(x: f64) -> f64 { f64::from((x as f32).round()) }
    // libm (C math) in no_std
    } else if #[cfg(feature = "no-std")] {
        #[inline] fn m_round(x: f64) -> f64 { libm::round(x) }
    // std backend
    } else {
        #[inline] fn m_round(x: f64) -> f64 { x.round() }
    }
}

// --------------------------------- Utilities -------------------------------------

#[inline]
pub fn clamp(x: f32, lo: f32, hi: f32) -> f32 {
    if x < lo { lo } else if x > hi { hi } else { x }
}

/// Round a non-negative length to the nearest whole sample count.
/// Negative and non-finite inputs map to 0.
#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn round_to_usize(x: f64) -> usize {
    if !x.is_finite() || x <= 0.0 {
        return 0;
    }
    m_round(x) as usize
}

// --------------------------------- Time / samples --------------------------------

/// Length of `ms` milliseconds in (fractional) samples.
#[inline]
pub fn ms_to_samples(ms: f64, sr: f64) -> f64 {
    if ms <= 0.0 || sr <= 0.0 { 0.0 } else { ms * sr / 1000.0 }
}

/// Length of `seconds` in whole samples.
#[inline]
pub fn seconds_to_samples(seconds: f64, sr: f64) -> usize {
    round_to_usize(seconds * sr)
}

// --------------------------------- Tests (std only) ------------------------------
