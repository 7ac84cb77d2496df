//! Error types for the control plane.
//!
//! Nothing in here is ever produced by the render path: `process()` clamps,
//! defaults or skips instead of failing.

use crate::params::ParameterAddress;

/// Errors raised while configuring or initializing an engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid sample rate: {0}")]
    InvalidSampleRate(f64),

    #[error("Invalid channel count: {input} in / {output} out (1..={max} supported)")]
    InvalidChannelCount { input: usize, output: usize, max: usize },

    #[error("Invalid tempo: {0} bpm")]
    InvalidTempo(f32),

    #[error("Invalid meter: {beats_per_bar}/{beat_unit} x {bars} bars")]
    InvalidMeter { beats_per_bar: u32, beat_unit: u32, bars: u32 },

    #[error("Invalid slot length: {0} seconds")]
    InvalidSlotLength(f32),

    #[error("Invalid crossfade length: {0} ms")]
    InvalidCrossfade(f32),

    #[error("Invalid control notes: record={record} mute={mute}")]
    InvalidControlNotes { record: u8, mute: u8 },

    #[error("Invalid MIDI channel: {0}")]
    InvalidMidiChannel(u8),

    #[error("Config load/parse error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the address-keyed parameter protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ParamError {
    #[error("Unknown parameter address: {0}")]
    UnknownAddress(u64),

    #[error("No observer registered for parameter {0:?}")]
    MissingObserver(ParameterAddress),
}

/// Errors while reading the metronome click asset.
#[derive(Debug, thiserror::Error)]
pub enum ClickError {
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
