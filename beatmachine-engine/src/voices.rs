//! Set of currently triggered notes.
//!
//! Fixed storage for all 128 note numbers: a membership table plus a sorted
//! list for iteration, so trigger/release/iterate are bounded and never
//! allocate. Control notes are refused at the door.

use crate::midi::ControlNotes;
use crate::NOTE_COUNT;

#[derive(Clone, Debug)]
pub struct VoiceRegistry {
    member: [bool; NOTE_COUNT],
    notes: [u8; NOTE_COUNT], // ascending, first `len` entries valid
    len: usize,
    control: ControlNotes,
}

impl VoiceRegistry {
    pub fn new(control: ControlNotes) -> Self {
        Self { member: [false; NOTE_COUNT], notes: [0; NOTE_COUNT], len: 0, control }
    }

    /// Add `note`. Returns `false` for control notes, out-of-range notes and
    /// notes that are already active.
    pub fn trigger(&mut self, note: u8) -> bool {
        let idx = usize::from(note);
        if idx >= NOTE_COUNT || self.control.is_control(note) || self.member[idx] {
            return false;
        }
        let at = self.notes[..self.len].partition_point(|&n| n < note);
        self.notes.copy_within(at..self.len, at + 1);
        self.notes[at] = note;
        self.len += 1;
        self.member[idx] = true;
        true
    }

    /// Remove `note`. Returns `false` if it was not active.
    pub fn release(&mut self, note: u8) -> bool {
        let idx = usize::from(note);
        if idx >= NOTE_COUNT || !self.member[idx] {
            return false;
        }
        if let Ok(at) = self.notes[..self.len].binary_search(&note) {
            self.notes.copy_within(at + 1..self.len, at);
            self.len -= 1;
        }
        self.member[idx] = false;
        true
    }

    #[inline]
    pub fn contains(&self, note: u8) -> bool {
        self.member.get(usize::from(note)).copied().unwrap_or(false)
    }

    /// Active notes in ascending order.
    #[inline]
    pub fn active_notes(&self) -> &[u8] { &self.notes[..self.len] }

    #[inline] pub fn len(&self) -> usize { self.len }
    #[inline] pub fn is_empty(&self) -> bool { self.len == 0 }

    pub fn clear(&mut self) {
        self.member = [false; NOTE_COUNT];
        self.len = 0;
    }
}
