//! Beat click for loop recording.
//!
//! Replays the click waveform from the start of every beat; the rest of the
//! beat is silent. The period is fixed from tempo at initialization.

use beatmachine_core::dsp::round_to_usize;
use beatmachine_core::tempo::samples_per_beat;

use crate::click::ClickTrack;

#[derive(Clone, Debug)]
pub struct Metronome {
    click: ClickTrack,
    samples_per_beat: usize,
    index: usize,
}

impl Metronome {
    pub fn new(click: ClickTrack, samples_per_beat: usize) -> Self {
        Self { click, samples_per_beat: samples_per_beat.max(1), index: 0 }
    }

    pub fn for_tempo(click: ClickTrack, sr: f64, bpm: f64) -> Self {
        Self::new(click, round_to_usize(samples_per_beat(sr, bpm)))
    }

    /// Click sample for the current position, then advance one frame.
    #[inline]
    pub fn next_click_sample(&mut self) -> f32 {
        let s = self.click.get(self.index);
        self.index += 1;
        if self.index >= self.samples_per_beat {
            self.index = 0;
        }
        s
    }

    /// Restart at the top of a beat.
    #[inline]
    pub fn reset(&mut self) { self.index = 0; }

    #[inline] pub fn index(&self) -> usize { self.index }
    #[inline] pub fn samples_per_beat(&self) -> usize { self.samples_per_beat }
    #[inline] pub fn click(&self) -> &ClickTrack { &self.click }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn click_repeats_every_beat() {
        let mut m = Metronome::new(ClickTrack::from_samples(vec![1.0, 0.5]), 5);
        let out: Vec<f32> = (0..12).map(|_| m.next_click_sample()).collect();
        assert_eq!(
            out,
            vec![1.0, 0.5, 0.0, 0.0, 0.0, 1.0, 0.5, 0.0, 0.0, 0.0, 1.0, 0.5]
        );
    }

    #[test]
    fn click_longer_than_beat_is_cut() {
        let mut m = Metronome::new(ClickTrack::from_samples(vec![0.1, 0.2, 0.3, 0.4]), 2);
        let out: Vec<f32> = (0..4).map(|_| m.next_click_sample()).collect();
        assert_eq!(out, vec![0.1, 0.2, 0.1, 0.2]);
    }

    #[test]
    fn period_from_tempo() {
        let m = Metronome::for_tempo(ClickTrack::empty(), 44_100.0, 120.0);
        assert_eq!(m.samples_per_beat(), 22_050);
    }

    #[test]
    fn empty_click_is_silent_but_keeps_time() {
        let mut m = Metronome::new(ClickTrack::empty(), 3);
        for _ in 0..4 {
            assert_eq!(m.next_click_sample(), 0.0);
        }
        assert_eq!(m.index(), 1);
        m.reset();
        assert_eq!(m.index(), 0);
    }
}
