//! Time-stamped control events delivered alongside a render block.
//!
//! All variants are `Copy` and fixed-size so a host can keep them in a
//! preallocated list and hand the engine a slice per block.

use crate::params::ParameterAddress;

/// A MIDI 1.0 message of up to three bytes.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MidiBytes {
    bytes: [u8; 3],
    len: u8,
}

impl MidiBytes {
    /// Copy up to the first three bytes of `raw`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_slice(raw: &[u8]) -> Self {
        let n = raw.len().min(3);
        let mut bytes = [0u8; 3];
        bytes[..n].copy_from_slice(&raw[..n]);
        Self { bytes, len: n as u8 }
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] { &self.bytes[..usize::from(self.len)] }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum EventKind {
    Midi(MidiBytes),
    /// One Universal MIDI Packet; 32-bit packets leave the second word 0.
    Ump([u32; 2]),
    Parameter { address: u64, value: f32 },
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RenderEvent {
    /// Frame within the block at which the event takes effect.
    pub sample_offset: u32,
    pub kind: EventKind,
}

impl RenderEvent {
    pub fn midi(sample_offset: u32, raw: &[u8]) -> Self {
        Self { sample_offset, kind: EventKind::Midi(MidiBytes::from_slice(raw)) }
    }

    pub fn ump(sample_offset: u32, words: [u32; 2]) -> Self {
        Self { sample_offset, kind: EventKind::Ump(words) }
    }

    pub fn parameter(sample_offset: u32, address: ParameterAddress, value: f32) -> Self {
        Self { sample_offset, kind: EventKind::Parameter { address: address.raw(), value } }
    }

    pub fn note_on(sample_offset: u32, channel: u8, note: u8, velocity: u8) -> Self {
        Self::midi(sample_offset, &[0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F])
    }

    pub fn note_off(sample_offset: u32, channel: u8, note: u8) -> Self {
        Self::midi(sample_offset, &[0x80 | (channel & 0x0F), note & 0x7F, 0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn midi_bytes_truncate_to_three() {
        let m = MidiBytes::from_slice(&[0x90, 60, 100, 0xFF]);
        assert_eq!(m.as_slice(), &[0x90, 60, 100]);
        assert_eq!(MidiBytes::from_slice(&[0xF8]).as_slice(), &[0xF8]);
    }

    #[test]
    fn note_helpers_build_status_bytes() {
        let on = RenderEvent::note_on(5, 2, 60, 100);
        assert_eq!(on.sample_offset, 5);
        assert_eq!(on.kind, EventKind::Midi(MidiBytes::from_slice(&[0x92, 60, 100])));
        let off = RenderEvent::note_off(0, 0, 60);
        assert_eq!(off.kind, EventKind::Midi(MidiBytes::from_slice(&[0x80, 60, 0])));
    }
}
