#![cfg_attr(not(feature = "std"), no_std)]
//! BeatMachine Core: no_std-ready numeric primitives for the sampler engine.
//!
//! Features
//! - `std`       : (default) use the Rust standard library
//! - `no-std`    : build with `#![no_std]` and use `libm` for rounding
//! - `micromath` : use `micromath` instead of `libm` on small targets
//!
//! Modules
//! - [`dsp`]       : math backend, clamping, time/sample conversions
//! - [`envelopes`] : the playback crossfade gain law
//! - [`tempo`]     : beat and loop sizing from tempo and meter
//!
//! Nothing in this crate allocates; every function is safe to call from
//! a real-time render callback.

pub mod dsp;
pub mod envelopes;
pub mod tempo;

/// Commonly used types/functions for convenience:
pub mod prelude {
    pub use crate::dsp::{clamp, ms_to_samples, round_to_usize, seconds_to_samples};
    pub use crate::envelopes::{Crossfade, FadePolicy};
    pub use crate::tempo::{loop_length_samples, samples_per_beat, TimeSignature};
}
