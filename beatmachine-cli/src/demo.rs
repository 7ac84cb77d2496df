//! Offline scripted session: record two notes, play them back, mute briefly,
//! then record and replay a loop over the click.

use std::f64::consts::TAU;
use std::path::Path;

use anyhow::{Context, Result};
use beatmachine_engine::{ClickTrack, Engine, EngineConfig, ParameterAddress, RenderEvent};
use tracing::info;

pub const DEMO_SECONDS: f64 = 8.5;
pub const OUTPUT_CHANNELS: usize = 2;

const LOW_NOTE: u8 = 60;
const HIGH_NOTE: u8 = 64;

/// Tone fed to the engine input: 220 Hz then 330 Hz while sampling, 440 Hz
/// while the loop records, silence otherwise.
fn demo_input(t: f64) -> f32 {
    let (freq, amp) = match t {
        t if t < 1.0 => (220.0, 0.5),
        t if t < 1.5 => (330.0, 0.4),
        t if (4.0..6.0).contains(&t) => (440.0, 0.2),
        _ => return 0.0,
    };
    (amp * (TAU * freq * t).sin()) as f32
}

/// 20 ms decaying 1 kHz blip.
fn synth_click(sample_rate: f64) -> ClickTrack {
    let len = (0.02 * sample_rate) as usize;
    let samples = (0..len)
        .map(|i| {
            let t = i as f64 / sample_rate;
            let env = 1.0 - i as f64 / len as f64;
            (0.6 * env * (TAU * 1_000.0 * t).sin()) as f32
        })
        .collect();
    ClickTrack::from_samples(samples)
}

/// `(seconds, event)` pairs; the event's own offset is replaced per block.
fn script(config: &EngineConfig) -> Vec<(f64, RenderEvent)> {
    let rec = config.record_note;
    let mute = config.mute_note;
    let ch = config.midi_channel.unwrap_or(0);
    vec![
        (0.0, RenderEvent::note_on(0, ch, rec, 100)),
        (0.0, RenderEvent::note_on(0, ch, LOW_NOTE, 100)),
        (1.0, RenderEvent::note_off(0, ch, LOW_NOTE)),
        (1.0, RenderEvent::note_on(0, ch, HIGH_NOTE, 100)),
        (1.5, RenderEvent::note_off(0, ch, HIGH_NOTE)),
        (1.5, RenderEvent::note_off(0, ch, rec)),
        (2.0, RenderEvent::note_on(0, ch, LOW_NOTE, 100)),
        (2.0, RenderEvent::note_on(0, ch, HIGH_NOTE, 100)),
        (3.0, RenderEvent::note_on(0, ch, mute, 100)),
        (3.25, RenderEvent::note_off(0, ch, mute)),
        (4.0, RenderEvent::note_off(0, ch, LOW_NOTE)),
        (4.0, RenderEvent::note_off(0, ch, HIGH_NOTE)),
        (4.0, RenderEvent::parameter(0, ParameterAddress::LoopRecord, 1.0)),
        (6.0, RenderEvent::parameter(0, ParameterAddress::LoopRecord, 0.0)),
        (6.0, RenderEvent::parameter(0, ParameterAddress::LoopPlayback, 1.0)),
    ]
}

/// Render the scripted session; returns one planar buffer per output channel.
pub fn render_demo(config: EngineConfig, sample_rate: f64) -> Result<Vec<Vec<f32>>> {
    let click = match config.click_path.as_deref() {
        Some(path) => ClickTrack::load(path),
        None => synth_click(sample_rate),
    };
    let cues: Vec<(usize, RenderEvent)> = script(&config)
        .into_iter()
        .map(|(t, ev)| ((t * sample_rate).round() as usize, ev))
        .collect();

    let mut engine = Engine::new(config).context("invalid engine configuration")?;
    engine
        .initialize_with_click(1, OUTPUT_CHANNELS, sample_rate, click)
        .context("engine initialization failed")?;

    let total = (DEMO_SECONDS * sample_rate) as usize;
    let block = (engine.maximum_frames_to_render() as usize).max(1);
    let input: Vec<f32> = (0..total).map(|i| demo_input(i as f64 / sample_rate)).collect();
    let mut left = vec![0.0f32; total];
    let mut right = vec![0.0f32; total];
    let mut events = Vec::with_capacity(cues.len());
    let mut next_cue = 0;

    let mut start = 0;
    while start < total {
        let end = (start + block).min(total);

        events.clear();
        while let Some(&(at, ev)) = cues.get(next_cue) {
            if at >= end {
                break;
            }
            events.push(RenderEvent { sample_offset: at.saturating_sub(start) as u32, ..ev });
            next_cue += 1;
        }

        let mut outs = [&mut left[start..end], &mut right[start..end]];
        engine.process_with_events(&[&input[start..end]], &mut outs, end - start, &events);
        start = end;
    }

    info!(frames = total, sample_rate, "Demo rendered.");
    Ok(vec![left, right])
}

/// Write planar channels as an interleaved 32-bit float WAV.
pub fn write_wav(path: &Path, planes: &[Vec<f32>], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: planes.len() as u16,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("could not create {}", path.display()))?;
    let frames = planes.first().map_or(0, Vec::len);
    for i in 0..frames {
        for plane in planes {
            writer.write_sample(plane[i])?;
        }
    }
    writer.finalize()?;
    Ok(())
}
