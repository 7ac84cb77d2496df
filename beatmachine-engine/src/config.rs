//! Engine configuration.
//!
//! Every buffer the engine owns is sized from these values once, at
//! `initialize`; none of them can change the size of anything afterwards.

use std::path::{Path, PathBuf};

use beatmachine_core::envelopes::FadePolicy;
use beatmachine_core::tempo::TimeSignature;
use serde::Deserialize;
use tracing::debug;

use crate::error::EngineError;
use crate::MAX_CHANNELS;

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Capacity of every per-note sample slot, in seconds.
    pub slot_seconds: f32,
    /// Length of the playback fade-in ramp, in milliseconds. 0 disables it.
    pub crossfade_ms: f32,
    /// Also ramp down over the tail of each recording.
    pub fade_out: bool,
    /// Loop tempo; fixes the loop length and the metronome period.
    pub tempo_bpm: f32,
    pub beats_per_bar: u32,
    pub beat_unit: u32,
    pub loop_bars: u32,
    /// Control note that toggles sampling mode while held.
    pub record_note: u8,
    /// Control note that mutes playback while held.
    pub mute_note: u8,
    /// Only accept note events on this channel (0-15). `None` listens to all.
    pub midi_channel: Option<u8>,
    pub default_gain: f32,
    pub max_frames: u32,
    /// Publish the last triggered/released note numbers to observers.
    pub publish_note_numbers: bool,
    /// Mono PCM WAV used as the metronome click.
    pub click_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            slot_seconds: 10.0,
            crossfade_ms: 10.0,
            fade_out: false,
            tempo_bpm: 120.0,
            beats_per_bar: 4,
            beat_unit: 4,
            loop_bars: 4,
            record_note: 0,
            mute_note: 1,
            midi_channel: None,
            default_gain: 1.0,
            max_frames: 1024,
            publish_note_numbers: true,
            click_path: None,
        }
    }
}

impl EngineConfig {
    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, EngineError> {
        let cfg: Self = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self, EngineError> {
        debug!(path = %path.display(), "Loading engine config.");
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.slot_seconds.is_finite() && self.slot_seconds > 0.0) {
            return Err(EngineError::InvalidSlotLength(self.slot_seconds));
        }
        if !(self.crossfade_ms.is_finite() && self.crossfade_ms >= 0.0) {
            return Err(EngineError::InvalidCrossfade(self.crossfade_ms));
        }
        if !(self.tempo_bpm.is_finite() && self.tempo_bpm > 0.0) {
            return Err(EngineError::InvalidTempo(self.tempo_bpm));
        }
        if self.beats_per_bar == 0 || self.beat_unit == 0 || self.loop_bars == 0 {
            return Err(EngineError::InvalidMeter {
                beats_per_bar: self.beats_per_bar,
                beat_unit: self.beat_unit,
                bars: self.loop_bars,
            });
        }
        if self.record_note > 127 || self.mute_note > 127 || self.record_note == self.mute_note {
            return Err(EngineError::InvalidControlNotes { record: self.record_note, mute: self.mute_note });
        }
        if let Some(ch) = self.midi_channel {
            if ch > 15 {
                return Err(EngineError::InvalidMidiChannel(ch));
            }
        }
        Ok(())
    }

    #[inline]
    pub fn fade_policy(&self) -> FadePolicy {
        if self.fade_out { FadePolicy::InOut } else { FadePolicy::In }
    }

    #[inline]
    pub fn time_signature(&self) -> TimeSignature {
        TimeSignature::new(self.beats_per_bar, self.beat_unit)
    }
}

/// Validate a host-requested channel layout.
pub(crate) fn check_channels(input: usize, output: usize) -> Result<(), EngineError> {
    if output == 0 || output > MAX_CHANNELS || input > MAX_CHANNELS {
        return Err(EngineError::InvalidChannelCount { input, output, max: MAX_CHANNELS });
    }
    Ok(())
}
