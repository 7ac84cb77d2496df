//! Address-keyed parameters and the observers that publish engine-side changes.
//!
//! The host owns the user-facing parameter tree; the engine only stores
//! values. When the engine itself changes a user-facing value (a control
//! note flips sampling mode, a note number changes) it publishes through the
//! observer the host registered for that address instead of writing host
//! memory directly.

use crate::error::ParamError;

/// Stable numeric parameter addresses.
#[repr(u64)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ParameterAddress {
    Gain = 0,
    SamplingMode = 1,
    MidiNote = 2,
    MidiNoteOff = 3,
    Muted = 4,
    LoopRecord = 5,
    LoopPlayback = 6,
}

pub const PARAMETER_COUNT: usize = 7;

impl ParameterAddress {
    pub const ALL: [ParameterAddress; PARAMETER_COUNT] = [
        ParameterAddress::Gain,
        ParameterAddress::SamplingMode,
        ParameterAddress::MidiNote,
        ParameterAddress::MidiNoteOff,
        ParameterAddress::Muted,
        ParameterAddress::LoopRecord,
        ParameterAddress::LoopPlayback,
    ];

    #[inline]
    pub fn from_raw(raw: u64) -> Option<Self> {
        Self::ALL.get(usize::try_from(raw).ok()?).copied()
    }

    #[inline]
    pub fn raw(self) -> u64 { self as u64 }

    #[inline]
    pub(crate) fn index(self) -> usize { self as usize }

    /// Parameters that only take the values 0 and 1.
    #[inline]
    pub fn is_toggle(self) -> bool {
        matches!(
            self,
            ParameterAddress::SamplingMode
                | ParameterAddress::Muted
                | ParameterAddress::LoopRecord
                | ParameterAddress::LoopPlayback
        )
    }

    pub fn info(self) -> ParameterInfo {
        let (identifier, name, min, max, default) = match self {
            ParameterAddress::Gain => ("gain", "Output Gain", 0.0, 1.0, 1.0),
            ParameterAddress::SamplingMode => ("isRecording", "Is Recording", 0.0, 1.0, 0.0),
            ParameterAddress::MidiNote => ("MIDINote", "MIDI Note", 0.0, 127.0, 0.0),
            ParameterAddress::MidiNoteOff => ("MIDINoteOff", "MIDI Note Off", 0.0, 127.0, 0.0),
            ParameterAddress::Muted => ("isMuted", "Muted", 0.0, 1.0, 0.0),
            ParameterAddress::LoopRecord => ("loopRecord", "Loop Record", 0.0, 1.0, 0.0),
            ParameterAddress::LoopPlayback => ("loopPlayback", "Loop Playback", 0.0, 1.0, 0.0),
        };
        ParameterInfo { address: self, identifier, name, min, max, default }
    }

    /// Clamp a host value into this parameter's range.
    #[inline]
    pub fn clamp(self, value: f32) -> f32 {
        let info = self.info();
        if value.is_nan() {
            return info.default;
        }
        beatmachine_core::dsp::clamp(value, info.min, info.max)
    }
}

/// Static description of one parameter, enough for a host to build its tree.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ParameterInfo {
    pub address: ParameterAddress,
    pub identifier: &'static str,
    pub name: &'static str,
    pub min: f32,
    pub max: f32,
    pub default: f32,
}

#[inline]
pub(crate) fn is_on(value: f32) -> bool { value >= 0.5 }

#[inline]
pub(crate) fn toggle_value(on: bool) -> f32 { if on { 1.0 } else { 0.0 } }

/// Callback through which the engine pushes a changed value to the host.
pub type Observer = Box<dyn FnMut(ParameterAddress, f32) + Send>;

/// Fixed per-address table of observers.
///
/// Registering allocates (boxing the callback) and therefore belongs to the
/// control plane; publishing only calls what is already there.
#[derive(Default)]
pub struct ObserverRegistry {
    slots: [Option<Observer>; PARAMETER_COUNT],
}

impl ObserverRegistry {
    pub fn new() -> Self { Self::default() }

    /// Install `observer` for `address`, returning the one it replaces.
    pub fn register(&mut self, address: ParameterAddress, observer: Observer) -> Option<Observer> {
        self.slots[address.index()].replace(observer)
    }

    pub fn unregister(&mut self, address: ParameterAddress) -> Option<Observer> {
        self.slots[address.index()].take()
    }

    #[inline]
    pub fn is_registered(&self, address: ParameterAddress) -> bool {
        self.slots[address.index()].is_some()
    }

    /// Push `value` to the observer for `address`.
    #[inline]
    pub fn publish(&mut self, address: ParameterAddress, value: f32) -> Result<(), ParamError> {
        match self.slots[address.index()].as_mut() {
            Some(observer) => {
                observer(address, value);
                Ok(())
            }
            None => Err(ParamError::MissingObserver(address)),
        }
    }
}

impl core::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let registered: Vec<ParameterAddress> = ParameterAddress::ALL
            .iter()
            .copied()
            .filter(|a| self.is_registered(*a))
            .collect();
        f.debug_struct("ObserverRegistry").field("registered", &registered).finish()
    }
}
