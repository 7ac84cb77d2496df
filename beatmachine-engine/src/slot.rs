//! Fixed-capacity per-note sample storage.
//!
//! A slot is allocated once at initialization and never resized. Recording
//! appends at the write cursor until the slot is full, then silently stops.
//! Playback reads at the play cursor through the crossfade law and wraps at
//! the recorded length, so a held note loops its recording.

use beatmachine_core::envelopes::Crossfade;

#[derive(Clone, Debug)]
pub struct SampleSlot {
    data: Box<[f32]>,
    sample_index: usize, // write cursor
    play_index: usize,   // read cursor
    recorded_len: usize, // extent of the last recording; survives reset()
}

impl SampleSlot {
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0.0; capacity].into_boxed_slice(),
            sample_index: 0,
            play_index: 0,
            recorded_len: 0,
        }
    }

    /// Append one sample. Returns `false` (and writes nothing) once full.
    #[inline]
    pub fn record_sample(&mut self, x: f32) -> bool {
        let Some(cell) = self.data.get_mut(self.sample_index) else {
            return false;
        };
        *cell = x;
        self.sample_index += 1;
        // Recording from the top replaces the previous take.
        self.recorded_len = self.sample_index;
        true
    }

    /// Read one sample at the play cursor, apply the crossfade gain and
    /// advance. An empty slot plays silence without moving.
    #[inline]
    pub fn play_sample(&mut self, fade: &Crossfade) -> f32 {
        let len = self.recorded_len;
        if len == 0 {
            return 0.0;
        }
        if self.play_index >= len {
            self.play_index = 0;
        }
        let pos = self.play_index;
        let sample = self.data[pos] * fade.gain(pos, len);
        self.play_index += 1;
        if self.play_index >= len {
            self.play_index = 0;
        }
        sample
    }

    /// Rewind both cursors. Recorded content is kept and gets overwritten by
    /// the next recording.
    #[inline]
    pub fn reset(&mut self) {
        self.sample_index = 0;
        self.play_index = 0;
    }

    #[inline] pub fn capacity(&self) -> usize { self.data.len() }
    #[inline] pub fn sample_index(&self) -> usize { self.sample_index }
    #[inline] pub fn play_index(&self) -> usize { self.play_index }
    #[inline] pub fn recorded_len(&self) -> usize { self.recorded_len }
    #[inline] pub fn is_full(&self) -> bool { self.sample_index >= self.data.len() }

    /// The recorded take, in order.
    #[inline]
    pub fn recorded(&self) -> &[f32] { &self.data[..self.recorded_len] }
}
