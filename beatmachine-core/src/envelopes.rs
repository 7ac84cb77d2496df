//! Playback crossfade gain law.
//!
//! A voice restarting at frame 0 of a recording jumps from silence (or the
//! end of the previous pass) straight into the first recorded sample. The
//! linear fade-in below removes that discontinuity:
//!
//! ```text
//! gain(pos) = pos / crossfade_samples     for pos < crossfade_samples
//!           = 1                           otherwise
//! ```
//!
//! `FadePolicy::InOut` mirrors the ramp over the tail of the recording so a
//! looping voice also arrives at the wrap point near silence.
//!
//! Pure and `no_std` friendly: the gain is a function of the cursor, so the
//! slot does not carry any envelope state.

use core::fmt::Debug;

/// Which ends of a recording receive a linear ramp.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum FadePolicy {
    /// Fade in at the start of every playback pass.
    #[default]
    In,
    /// Fade in at the start and fade out over the last samples.
    InOut,
}

/// Linear crossfade over a (possibly fractional) number of samples.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Crossfade {
    samples: f32,
    policy: FadePolicy,
}

impl Crossfade {
    #[inline]
    pub fn new(samples: f32, policy: FadePolicy) -> Self {
        let samples = if samples.is_finite() { samples.max(0.0) } else { 0.0 };
        Self { samples, policy }
    }

    /// Crossfade length given in milliseconds at sample rate `sr`.
    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_ms(ms: f32, sr: f32, policy: FadePolicy) -> Self {
        Self::new(crate::dsp::ms_to_samples(f64::from(ms), f64::from(sr)) as f32, policy)
    }

    /// No ramp at all: every position plays at unity gain.
    #[inline]
    pub fn disabled() -> Self {
        Self { samples: 0.0, policy: FadePolicy::In }
    }

    #[inline] pub fn samples(&self) -> f32 { self.samples }
    #[inline] pub fn policy(&self) -> FadePolicy { self.policy }

    /// Gain at read position `pos` of a recording `len` samples long.
    #[inline]
    #[allow(clippy::cast_precision_loss)]
    pub fn gain(&self, pos: usize, len: usize) -> f32 {
        if self.samples <= 0.0 {
            return 1.0;
        }
        let mut g = 1.0;
        let p = pos as f32;
        if p < self.samples {
            g = p / self.samples;
        }
        if self.policy == FadePolicy::InOut && pos < len {
            let remaining = (len - 1 - pos) as f32;
            if remaining < self.samples {
                g = f32::min(g, remaining / self.samples);
            }
        }
        g
    }
}

impl Default for Crossfade {
    fn default() -> Self { Self::disabled() }
}

// ------------------------------------ Tests --------------------------------------
