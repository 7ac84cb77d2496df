//! MIDI note decoding and the control-note state machine.
//!
//! Hosts hand over either MIDI 1.0 byte messages or MIDI 2.0 Universal MIDI
//! Packets. Both reduce to a [`NoteEvent`]; everything that is not a note-on
//! or note-off is dropped. [`MidiControlInterpreter`] then maps note events
//! to engine commands:
//!
//! | event                 | command              |
//! |-----------------------|----------------------|
//! | note-on  RECORD_NOTE  | sampling mode on     |
//! | note-off RECORD_NOTE  | sampling mode off    |
//! | note-on  MUTE_NOTE    | mute on              |
//! | note-off MUTE_NOTE    | mute off             |
//! | note-on  N            | trigger voice N      |
//! | note-off N            | release voice N      |

use midly::live::LiveEvent;
use midly::MidiMessage;

/// A decoded note message. `channel` is 0-15, `note` and `velocity` 0-127.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NoteEvent {
    On { channel: u8, note: u8, velocity: u8 },
    Off { channel: u8, note: u8, velocity: u8 },
}

impl NoteEvent {
    #[inline]
    pub fn channel(&self) -> u8 {
        match *self {
            NoteEvent::On { channel, .. } | NoteEvent::Off { channel, .. } => channel,
        }
    }

    #[inline]
    pub fn note(&self) -> u8 {
        match *self {
            NoteEvent::On { note, .. } | NoteEvent::Off { note, .. } => note,
        }
    }
}

/// Decode one MIDI 1.0 message. A note-on with velocity 0 is a note-off.
pub fn decode_midi1(bytes: &[u8]) -> Option<NoteEvent> {
    let LiveEvent::Midi { channel, message } = LiveEvent::parse(bytes).ok()? else {
        return None;
    };
    let channel = channel.as_int();
    match message {
        MidiMessage::NoteOn { key, vel } if vel.as_int() == 0 => {
            Some(NoteEvent::Off { channel, note: key.as_int(), velocity: 0 })
        }
        MidiMessage::NoteOn { key, vel } => {
            Some(NoteEvent::On { channel, note: key.as_int(), velocity: vel.as_int() })
        }
        MidiMessage::NoteOff { key, vel } => {
            Some(NoteEvent::Off { channel, note: key.as_int(), velocity: vel.as_int() })
        }
        _ => None,
    }
}

const UMP_MIDI1_VOICE: u32 = 0x2;
const UMP_MIDI2_VOICE: u32 = 0x4;
const STATUS_NOTE_OFF: u32 = 0x8;
const STATUS_NOTE_ON: u32 = 0x9;

/// Decode one Universal MIDI Packet (MIDI 1.0 or MIDI 2.0 channel voice).
///
/// MIDI 2.0 note-ons keep their meaning at velocity 0; the 16-bit velocity
/// is reduced to 7 bits.
#[allow(clippy::cast_possible_truncation)]
pub fn decode_ump(words: &[u32]) -> Option<NoteEvent> {
    let w0 = *words.first()?;
    let message_type = w0 >> 28;
    let status = (w0 >> 20) & 0xF;
    let channel = ((w0 >> 16) & 0xF) as u8;
    let note = ((w0 >> 8) & 0x7F) as u8;

    match message_type {
        UMP_MIDI1_VOICE => {
            let velocity = (w0 & 0x7F) as u8;
            match status {
                STATUS_NOTE_ON if velocity == 0 => Some(NoteEvent::Off { channel, note, velocity }),
                STATUS_NOTE_ON => Some(NoteEvent::On { channel, note, velocity }),
                STATUS_NOTE_OFF => Some(NoteEvent::Off { channel, note, velocity }),
                _ => None,
            }
        }
        UMP_MIDI2_VOICE => {
            let w1 = *words.get(1)?;
            let velocity = (w1 >> 25) as u8;
            match status {
                STATUS_NOTE_ON => Some(NoteEvent::On { channel, note, velocity }),
                STATUS_NOTE_OFF => Some(NoteEvent::Off { channel, note, velocity }),
                _ => None,
            }
        }
        _ => None,
    }
}

/// The reserved notes that toggle mode flags instead of triggering voices.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ControlNotes {
    pub record: u8,
    pub mute: u8,
}

impl ControlNotes {
    #[inline]
    pub fn new(record: u8, mute: u8) -> Self { Self { record, mute } }

    #[inline]
    pub fn is_control(&self, note: u8) -> bool { note == self.record || note == self.mute }
}

/// What a note event asks the engine to do.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ControlCommand {
    SetSampling(bool),
    SetMuted(bool),
    Trigger(u8),
    Release(u8),
}

#[derive(Copy, Clone, Debug)]
pub struct MidiControlInterpreter {
    notes: ControlNotes,
    channel: Option<u8>,
}

impl MidiControlInterpreter {
    pub fn new(notes: ControlNotes, channel: Option<u8>) -> Self {
        Self { notes, channel }
    }

    #[inline] pub fn control_notes(&self) -> ControlNotes { self.notes }

    /// Map a note event to a command; events on a filtered-out channel map to nothing.
    #[inline]
    pub fn interpret(&self, event: NoteEvent) -> Option<ControlCommand> {
        if let Some(ch) = self.channel {
            if event.channel() != ch {
                return None;
            }
        }
        let note = event.note();
        let on = matches!(event, NoteEvent::On { .. });
        Some(if note == self.notes.record {
            ControlCommand::SetSampling(on)
        } else if note == self.notes.mute {
            ControlCommand::SetMuted(on)
        } else if on {
            ControlCommand::Trigger(note)
        } else {
            ControlCommand::Release(note)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_midi1_notes() {
        assert_eq!(
            decode_midi1(&[0x90, 60, 100]),
            Some(NoteEvent::On { channel: 0, note: 60, velocity: 100 })
        );
        assert_eq!(
            decode_midi1(&[0x83, 61, 40]),
            Some(NoteEvent::Off { channel: 3, note: 61, velocity: 40 })
        );
        assert_eq!(
            decode_midi1(&[0x95, 62, 0]),
            Some(NoteEvent::Off { channel: 5, note: 62, velocity: 0 })
        );
    }

    #[test]
    fn ignores_other_midi1_messages() {
        assert_eq!(decode_midi1(&[0xB0, 7, 100]), None); // control change
        assert_eq!(decode_midi1(&[0xE0, 0, 64]), None); // pitch bend
        assert_eq!(decode_midi1(&[0xF8]), None); // clock
        assert_eq!(decode_midi1(&[]), None);
        assert_eq!(decode_midi1(&[0x90]), None);
    }

    #[test]
    fn decodes_midi2_packets() {
        // type 4, group 0, note on, channel 2, note 64, velocity 0xFFFF
        let on = [0x4092_4000, 0xFFFF_0000];
        assert_eq!(decode_ump(&on), Some(NoteEvent::On { channel: 2, note: 64, velocity: 127 }));
        let off = [0x4082_4000, 0x0000_0000];
        assert_eq!(decode_ump(&off), Some(NoteEvent::Off { channel: 2, note: 64, velocity: 0 }));
        // velocity 0 note-on stays a note-on in MIDI 2.0
        let zero = [0x4092_4000, 0x0000_0000];
        assert!(matches!(decode_ump(&zero), Some(NoteEvent::On { .. })));
        // truncated packet
        assert_eq!(decode_ump(&[0x4092_4000]), None);
    }

    #[test]
    fn decodes_midi1_in_ump() {
        assert_eq!(
            decode_ump(&[0x2091_3C64]),
            Some(NoteEvent::On { channel: 1, note: 60, velocity: 100 })
        );
        assert_eq!(
            decode_ump(&[0x2091_3C00]),
            Some(NoteEvent::Off { channel: 1, note: 60, velocity: 0 })
        );
        assert_eq!(decode_ump(&[0x20B1_0700]), None);
        assert_eq!(decode_ump(&[0x1000_0000]), None);
    }

    #[test]
    fn control_notes_toggle_modes() {
        let i = MidiControlInterpreter::new(ControlNotes::new(0, 1), None);
        let on = |note| NoteEvent::On { channel: 0, note, velocity: 100 };
        let off = |note| NoteEvent::Off { channel: 0, note, velocity: 0 };
        assert_eq!(i.interpret(on(0)), Some(ControlCommand::SetSampling(true)));
        assert_eq!(i.interpret(off(0)), Some(ControlCommand::SetSampling(false)));
        assert_eq!(i.interpret(on(1)), Some(ControlCommand::SetMuted(true)));
        assert_eq!(i.interpret(off(1)), Some(ControlCommand::SetMuted(false)));
        assert_eq!(i.interpret(on(60)), Some(ControlCommand::Trigger(60)));
        assert_eq!(i.interpret(off(60)), Some(ControlCommand::Release(60)));
    }

    #[test]
    fn channel_filter_drops_other_channels() {
        let i = MidiControlInterpreter::new(ControlNotes::new(0, 1), Some(9));
        assert_eq!(i.interpret(NoteEvent::On { channel: 0, note: 60, velocity: 1 }), None);
        assert_eq!(
            i.interpret(NoteEvent::On { channel: 9, note: 60, velocity: 1 }),
            Some(ControlCommand::Trigger(60))
        );
    }
}
