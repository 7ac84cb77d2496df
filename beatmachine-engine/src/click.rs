//! Metronome click asset.
//!
//! The click is a short PCM WAV read once at initialization. 16-bit samples
//! are normalized by 1/32768; other integer widths by their full scale and
//! float files pass through. Only the first channel is kept. A file that
//! cannot be read or parsed yields an empty track, and the metronome then
//! simply keeps time in silence.

use std::io::Read;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::ClickError;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClickTrack {
    samples: Box<[f32]>,
}

impl ClickTrack {
    pub fn empty() -> Self { Self::default() }

    pub fn from_samples(samples: Vec<f32>) -> Self {
        Self { samples: samples.into_boxed_slice() }
    }

    /// Load `path`, degrading to an empty track on any failure.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(track) => {
                info!(path = %path.display(), samples = track.len(), "Loaded metronome click.");
                track
            }
            Err(e) => {
                warn!(path = %path.display(), err = %e, "Unable to load metronome click, metronome will be silent.");
                Self::empty()
            }
        }
    }

    pub fn try_load(path: &Path) -> Result<Self, ClickError> {
        let reader = hound::WavReader::open(path)?;
        Self::from_wav(reader)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ClickError> {
        Self::from_wav(hound::WavReader::new(reader)?)
    }

    fn from_wav<R: Read>(mut reader: hound::WavReader<R>) -> Result<Self, ClickError> {
        let spec = reader.spec();
        let channels = usize::from(spec.channels.max(1));
        debug!(
            channels = spec.channels,
            sample_rate = spec.sample_rate,
            bits = spec.bits_per_sample,
            "Decoding click WAV."
        );

        let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
            (hound::SampleFormat::Int, 16) => reader
                .samples::<i16>()
                .map(|s| s.map(|x| f32::from(x) / 32768.0))
                .collect::<Result<_, _>>()?,
            (hound::SampleFormat::Int, bits) => {
                #[allow(clippy::cast_precision_loss)]
                let full_scale = (1i64 << (bits.clamp(1, 32) - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|x| x as f32 / full_scale))
                    .collect::<Result<_, _>>()?
            }
            (hound::SampleFormat::Float, _) => reader.samples::<f32>().collect::<Result<_, _>>()?,
        };

        let mono = interleaved.into_iter().step_by(channels).collect();
        Ok(Self::from_samples(mono))
    }

    /// Sample `i`, or silence past the end.
    #[inline]
    pub fn get(&self, i: usize) -> f32 { self.samples.get(i).copied().unwrap_or(0.0) }

    #[inline] pub fn len(&self) -> usize { self.samples.len() }
    #[inline] pub fn is_empty(&self) -> bool { self.samples.is_empty() }
    #[inline] pub fn samples(&self) -> &[f32] { &self.samples }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn spec(channels: u16) -> hound::WavSpec {
        hound::WavSpec {
            channels,
            sample_rate: 44_100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        }
    }

    fn wav_bytes(spec: hound::WavSpec, samples: &[i16]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut w = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for s in samples {
                w.write_sample(*s).unwrap();
            }
            w.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn sixteen_bit_is_normalized_by_32768() {
        let bytes = wav_bytes(spec(1), &[0, 16_384, -32_768, 32_767]);
        let click = ClickTrack::from_reader(Cursor::new(bytes)).unwrap();
        assert_eq!(click.samples(), &[0.0, 0.5, -1.0, 32_767.0 / 32_768.0]);
    }

    #[test]
    fn keeps_first_channel_only() {
        let bytes = wav_bytes(spec(2), &[16_384, -16_384, 8_192, -8_192]);
        let click = ClickTrack::from_reader(Cursor::new(bytes)).unwrap();
        assert_eq!(click.samples(), &[0.5, 0.25]);
    }

    #[test]
    fn missing_riff_tag_is_an_error() {
        let mut bytes = wav_bytes(spec(1), &[1, 2, 3]);
        bytes[..4].copy_from_slice(b"JUNK");
        assert!(ClickTrack::from_reader(Cursor::new(bytes)).is_err());
    }

    #[test]
    fn missing_wave_tag_is_an_error() {
        let mut bytes = wav_bytes(spec(1), &[1, 2, 3]);
        bytes[8..12].copy_from_slice(b"AVI ");
        assert!(ClickTrack::from_reader(Cursor::new(bytes)).is_err());
    }

    #[test]
    fn load_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.wav");
        std::fs::write(&bad, b"not a wav file at all").unwrap();
        assert!(ClickTrack::load(&bad).is_empty());
        assert!(ClickTrack::load(&dir.path().join("missing.wav")).is_empty());
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("click.wav");
        let mut w = hound::WavWriter::create(&path, spec(1)).unwrap();
        for s in [32_767i16, 0, -32_768] {
            w.write_sample(s).unwrap();
        }
        w.finalize().unwrap();

        let click = ClickTrack::load(&path);
        assert_eq!(click.len(), 3);
        assert_eq!(click.get(2), -1.0);
        assert_eq!(click.get(3), 0.0);
    }
}
