//! Beat and loop sizing from tempo and meter.
//!
//! The loop buffer and the metronome period are fixed at initialization:
//!
//! ```text
//! samples_per_beat = sr * 60 / bpm
//! loop_length      = samples_per_beat * beats_per_bar * bars
//! ```

use crate::dsp::round_to_usize;

/// Time signature; only the numerator affects sizing, the denominator is
/// carried for hosts that display it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TimeSignature {
    pub beats_per_bar: u32,
    pub beat_unit: u32,
}

impl TimeSignature {
    #[inline]
    pub fn new(beats_per_bar: u32, beat_unit: u32) -> Self {
        Self { beats_per_bar, beat_unit }
    }

    /// 4/4
    #[inline]
    pub fn common() -> Self { Self::new(4, 4) }
}

impl Default for TimeSignature {
    fn default() -> Self { Self::common() }
}

/// Fractional number of samples in one beat. Returns 0 for a non-positive tempo.
#[inline]
pub fn samples_per_beat(sr: f64, bpm: f64) -> f64 {
    if bpm <= 0.0 || sr <= 0.0 || !bpm.is_finite() {
        return 0.0;
    }
    sr * 60.0 / bpm
}

/// Whole samples in a loop of `bars` bars.
#[inline]
pub fn loop_length_samples(sr: f64, bpm: f64, meter: TimeSignature, bars: u32) -> usize {
    round_to_usize(samples_per_beat(sr, bpm) * f64::from(meter.beats_per_bar) * f64::from(bars))
}
