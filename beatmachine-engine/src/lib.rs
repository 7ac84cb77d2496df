//! BeatMachine Engine: MIDI-triggered polyphonic sampler and tempo-synced looper.
//!
//! Crate layout:
//! - [`engine`]    : `Engine`, the host-facing lifecycle and the per-frame render loop
//! - [`slot`]      : `SampleSlot`, one fixed-capacity recording per note
//! - [`voices`]    : `VoiceRegistry`, the set of triggered notes
//! - [`looper`]    : `LoopBuffer`, the tempo-sized loop ring
//! - [`metronome`] : beat click generator, fed by a [`click::ClickTrack`]
//! - [`midi`]      : MIDI 1.0 / UMP note decoding and the control-note interpreter
//! - [`params`]    : parameter addresses, ranges and observers
//! - [`events`]    : sample-offset events delivered with a render block
//! - [`config`]    : `EngineConfig`
//!
//! Every buffer is allocated in `Engine::initialize` and released in
//! `Engine::deinitialize`. Rendering and event handling never allocate,
//! lock, log or touch the filesystem.

pub mod click;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod looper;
pub mod metronome;
pub mod midi;
pub mod params;
pub mod slot;
pub mod voices;

/// Number of MIDI note numbers, and therefore sample slots.
pub const NOTE_COUNT: usize = 128;

/// Upper bound on input and output channels per engine.
pub const MAX_CHANNELS: usize = 8;

// Re-export some commonly used items to make downstream imports ergonomic.
pub use click::ClickTrack;
pub use config::EngineConfig;
pub use engine::{Engine, ModeFlags};
pub use error::{ClickError, EngineError, ParamError};
pub use events::{EventKind, MidiBytes, RenderEvent};
pub use midi::{ControlCommand, ControlNotes, MidiControlInterpreter, NoteEvent};
pub use params::{ParameterAddress, ParameterInfo, PARAMETER_COUNT};
