//! Tempo-synced loop buffer.
//!
//! One ring sized from tempo, meter and bar count at initialization. While
//! loop recording is on, the engine writes one input sample per frame,
//! overwriting the previous pass once the ring wraps. A separate read
//! cursor replays whatever has been captured.

use beatmachine_core::tempo::{loop_length_samples, TimeSignature};

#[derive(Clone, Debug)]
pub struct LoopBuffer {
    data: Box<[f32]>,
    write_index: usize,
    read_index: usize,
    filled: usize, // samples captured so far, saturating at len
}

impl LoopBuffer {
    pub fn new(len: usize) -> Self {
        Self {
            data: vec![0.0; len].into_boxed_slice(),
            write_index: 0,
            read_index: 0,
            filled: 0,
        }
    }

    /// Ring sized for `bars` bars of `meter` at `bpm`.
    pub fn for_tempo(sr: f64, bpm: f64, meter: TimeSignature, bars: u32) -> Self {
        Self::new(loop_length_samples(sr, bpm, meter, bars))
    }

    #[inline]
    pub fn record(&mut self, x: f32) {
        let len = self.data.len();
        if len == 0 {
            return;
        }
        self.data[self.write_index] = x;
        self.write_index += 1;
        if self.write_index >= len {
            self.write_index = 0;
        }
        if self.filled < len {
            self.filled += 1;
        }
    }

    /// Next captured sample, wrapping over the captured extent.
    #[inline]
    pub fn play(&mut self) -> f32 {
        if self.filled == 0 {
            return 0.0;
        }
        if self.read_index >= self.filled {
            self.read_index = 0;
        }
        let s = self.data[self.read_index];
        self.read_index += 1;
        if self.read_index >= self.filled {
            self.read_index = 0;
        }
        s
    }

    /// Move both cursors back to the bar start. Content stays.
    #[inline]
    pub fn rewind(&mut self) {
        self.write_index = 0;
        self.read_index = 0;
    }

    #[inline] pub fn len(&self) -> usize { self.data.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.filled == 0 }
    #[inline] pub fn write_index(&self) -> usize { self.write_index }
    #[inline] pub fn read_index(&self) -> usize { self.read_index }
    #[inline] pub fn filled(&self) -> usize { self.filled }
}
