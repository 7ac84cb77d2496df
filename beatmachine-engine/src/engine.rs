//! Host-facing engine and realtime render loop.
//!
//! The host drives two kinds of calls on one `Engine`:
//! - control calls (`initialize`, parameter get/set, observer registration)
//! - render calls (`process`, `process_with_events`, MIDI handling), which
//!   must finish in bounded time without allocating
//!
//! The host guarantees that the two never run at the same instant, so the
//! engine keeps plain fields and no locks.
//!
//! Per processed frame, every active voice, the loop buffer and the
//! metronome advance by exactly one position:
//! - sampling mode: each input channel passes through at `gain`, and every
//!   active note records the mono input into its slot
//! - playback mode: active notes are summed (each at `gain`), muting zeroes
//!   the final mix without stopping the cursors
//! - loop record (either mode): the mono input goes into the loop buffer
//!   and the metronome click is added to the output

use beatmachine_core::dsp::seconds_to_samples;
use beatmachine_core::envelopes::Crossfade;
use tracing::{debug, info};

use crate::click::ClickTrack;
use crate::config::{check_channels, EngineConfig};
use crate::error::{EngineError, ParamError};
use crate::events::{EventKind, RenderEvent};
use crate::looper::LoopBuffer;
use crate::metronome::Metronome;
use crate::midi::{decode_midi1, decode_ump, ControlCommand, ControlNotes, MidiControlInterpreter, NoteEvent};
use crate::params::{is_on, toggle_value, Observer, ObserverRegistry, ParameterAddress};
use crate::slot::SampleSlot;
use crate::voices::VoiceRegistry;
use crate::NOTE_COUNT;

/// Control-plane mode switches read by the render loop every frame.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ModeFlags {
    pub sampling: bool,
    pub muted: bool,
    pub loop_record: bool,
    pub loop_playback: bool,
}

/// Buffers that only exist between `initialize` and `deinitialize`.
struct RenderResources {
    sample_rate: f64,
    input_channels: usize,
    output_channels: usize,
    slots: Box<[SampleSlot]>,
    looper: LoopBuffer,
    metronome: Metronome,
    crossfade: Crossfade,
}

pub struct Engine {
    config: EngineConfig,
    resources: Option<RenderResources>,
    voices: VoiceRegistry,
    interpreter: MidiControlInterpreter,
    flags: ModeFlags,
    gain: f32,
    last_note: f32,
    last_note_off: f32,
    observers: ObserverRegistry,
    bypassed: bool,
    max_frames: u32,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        let notes = ControlNotes::new(config.record_note, config.mute_note);
        debug!(?config, "Creating engine.");
        Ok(Self {
            voices: VoiceRegistry::new(notes),
            interpreter: MidiControlInterpreter::new(notes, config.midi_channel),
            flags: ModeFlags::default(),
            gain: ParameterAddress::Gain.clamp(config.default_gain),
            last_note: 0.0,
            last_note_off: 0.0,
            observers: ObserverRegistry::new(),
            bypassed: false,
            max_frames: config.max_frames,
            resources: None,
            config,
        })
    }

    #[inline] pub fn config(&self) -> &EngineConfig { &self.config }

    // --- Lifecycle ---------------------------------------------------------------

    /// Allocate every render buffer, loading the click from `click_path`.
    pub fn initialize(&mut self, input_channels: usize, output_channels: usize, sample_rate: f64) -> Result<(), EngineError> {
        let click = self
            .config
            .click_path
            .as_deref()
            .map(ClickTrack::load)
            .unwrap_or_default();
        self.initialize_with_click(input_channels, output_channels, sample_rate, click)
    }

    /// Allocate every render buffer with an already decoded click.
    #[allow(clippy::cast_possible_truncation)]
    pub fn initialize_with_click(
        &mut self,
        input_channels: usize,
        output_channels: usize,
        sample_rate: f64,
        click: ClickTrack,
    ) -> Result<(), EngineError> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(EngineError::InvalidSampleRate(sample_rate));
        }
        check_channels(input_channels, output_channels)?;

        let cfg = &self.config;
        let capacity = seconds_to_samples(f64::from(cfg.slot_seconds), sample_rate);
        let slots: Box<[SampleSlot]> = (0..NOTE_COUNT).map(|_| SampleSlot::new(capacity)).collect();
        let bpm = f64::from(cfg.tempo_bpm);
        let looper = LoopBuffer::for_tempo(sample_rate, bpm, cfg.time_signature(), cfg.loop_bars);
        let metronome = Metronome::for_tempo(click, sample_rate, bpm);
        let crossfade = Crossfade::from_ms(cfg.crossfade_ms, sample_rate as f32, cfg.fade_policy());

        info!(
            sample_rate,
            input_channels,
            output_channels,
            slot_capacity = capacity,
            loop_len = looper.len(),
            samples_per_beat = metronome.samples_per_beat(),
            click_len = metronome.click().len(),
            "Engine initialized."
        );

        self.voices.clear();
        self.resources = Some(RenderResources {
            sample_rate,
            input_channels,
            output_channels,
            slots,
            looper,
            metronome,
            crossfade,
        });
        Ok(())
    }

    /// Release every render buffer. Rendering afterwards produces silence.
    pub fn deinitialize(&mut self) {
        if self.resources.take().is_some() {
            info!("Engine deinitialized.");
        }
        self.voices.clear();
    }

    #[inline] pub fn is_initialized(&self) -> bool { self.resources.is_some() }

    #[inline]
    pub fn sample_rate(&self) -> Option<f64> { self.resources.as_ref().map(|r| r.sample_rate) }

    /// `(input, output)` channel counts negotiated at `initialize`.
    #[inline]
    pub fn channels(&self) -> Option<(usize, usize)> {
        self.resources.as_ref().map(|r| (r.input_channels, r.output_channels))
    }

    #[inline] pub fn is_bypassed(&self) -> bool { self.bypassed }
    #[inline] pub fn set_bypass(&mut self, bypass: bool) { self.bypassed = bypass; }

    #[inline] pub fn maximum_frames_to_render(&self) -> u32 { self.max_frames }
    #[inline] pub fn set_maximum_frames_to_render(&mut self, frames: u32) { self.max_frames = frames; }

    // --- Parameters --------------------------------------------------------------

    /// Current value at a raw address; unknown addresses read 0.
    #[inline]
    pub fn parameter(&self, address: u64) -> f32 {
        self.try_parameter(address).unwrap_or(0.0)
    }

    pub fn try_parameter(&self, address: u64) -> Result<f32, ParamError> {
        ParameterAddress::from_raw(address)
            .map(|a| self.param(a))
            .ok_or(ParamError::UnknownAddress(address))
    }

    pub fn param(&self, address: ParameterAddress) -> f32 {
        match address {
            ParameterAddress::Gain => self.gain,
            ParameterAddress::SamplingMode => toggle_value(self.flags.sampling),
            ParameterAddress::MidiNote => self.last_note,
            ParameterAddress::MidiNoteOff => self.last_note_off,
            ParameterAddress::Muted => toggle_value(self.flags.muted),
            ParameterAddress::LoopRecord => toggle_value(self.flags.loop_record),
            ParameterAddress::LoopPlayback => toggle_value(self.flags.loop_playback),
        }
    }

    /// Store a host value at a raw address; unknown addresses are ignored.
    #[inline]
    pub fn set_parameter(&mut self, address: u64, value: f32) {
        let _ = self.try_set_parameter(address, value);
    }

    pub fn try_set_parameter(&mut self, address: u64, value: f32) -> Result<(), ParamError> {
        let address = ParameterAddress::from_raw(address).ok_or(ParamError::UnknownAddress(address))?;
        self.set_param(address, value);
        Ok(())
    }

    /// Store a host value. Host writes are not echoed back to observers.
    pub fn set_param(&mut self, address: ParameterAddress, value: f32) {
        let value = address.clamp(value);
        match address {
            ParameterAddress::Gain => self.gain = value,
            ParameterAddress::SamplingMode => self.flags.sampling = is_on(value),
            ParameterAddress::MidiNote => self.last_note = value,
            ParameterAddress::MidiNoteOff => self.last_note_off = value,
            ParameterAddress::Muted => self.flags.muted = is_on(value),
            ParameterAddress::LoopRecord => self.set_loop_record(is_on(value)),
            ParameterAddress::LoopPlayback => self.flags.loop_playback = is_on(value),
        }
    }

    fn set_loop_record(&mut self, on: bool) {
        if on && !self.flags.loop_record {
            if let Some(res) = self.resources.as_mut() {
                res.looper.rewind();
                res.metronome.reset();
            }
        }
        self.flags.loop_record = on;
    }

    /// Install the host callback that receives engine-side changes to `address`.
    pub fn register_observer<F>(&mut self, address: ParameterAddress, observer: F) -> Option<Observer>
    where
        F: FnMut(ParameterAddress, f32) + Send + 'static,
    {
        debug!(?address, "Registering parameter observer.");
        self.observers.register(address, Box::new(observer))
    }

    pub fn unregister_observer(&mut self, address: ParameterAddress) -> Option<Observer> {
        self.observers.unregister(address)
    }

    /// Push an engine-side change; with no observer this is a local no-op.
    #[inline]
    fn publish(&mut self, address: ParameterAddress, value: f32) {
        let _ = self.observers.publish(address, value);
    }

    // --- MIDI / events -----------------------------------------------------------

    /// Handle a MIDI 1.0 message; anything but note-on/off is ignored.
    #[inline]
    pub fn handle_midi(&mut self, bytes: &[u8]) {
        if let Some(ev) = decode_midi1(bytes) {
            self.handle_note(ev);
        }
    }

    /// Handle a Universal MIDI Packet; anything but note-on/off is ignored.
    #[inline]
    pub fn handle_ump(&mut self, words: &[u32]) {
        if let Some(ev) = decode_ump(words) {
            self.handle_note(ev);
        }
    }

    #[inline]
    pub fn handle_note(&mut self, event: NoteEvent) {
        if let Some(cmd) = self.interpreter.interpret(event) {
            self.apply(cmd);
        }
    }

    pub fn apply(&mut self, cmd: ControlCommand) {
        match cmd {
            ControlCommand::SetSampling(on) => {
                self.flags.sampling = on;
                self.publish(ParameterAddress::SamplingMode, toggle_value(on));
            }
            ControlCommand::SetMuted(on) => {
                self.flags.muted = on;
                self.publish(ParameterAddress::Muted, toggle_value(on));
            }
            ControlCommand::Trigger(note) => {
                if self.voices.trigger(note) {
                    self.last_note = f32::from(note);
                    if self.config.publish_note_numbers {
                        self.publish(ParameterAddress::MidiNote, self.last_note);
                    }
                }
            }
            ControlCommand::Release(note) => {
                self.voices.release(note);
                // Next trigger records/plays from the top.
                if let Some(slot) = self.resources.as_mut().and_then(|r| r.slots.get_mut(usize::from(note))) {
                    slot.reset();
                }
                self.last_note_off = f32::from(note);
                if self.config.publish_note_numbers {
                    self.publish(ParameterAddress::MidiNoteOff, self.last_note_off);
                }
            }
        }
    }

    pub fn handle_event(&mut self, event: &RenderEvent) {
        match event.kind {
            EventKind::Midi(bytes) => self.handle_midi(bytes.as_slice()),
            EventKind::Ump(words) => self.handle_ump(&words),
            EventKind::Parameter { address, value } => self.set_parameter(address, value),
        }
    }

    // --- Rendering ---------------------------------------------------------------

    /// Render one block. Writes `min(frame_count, shortest output)` frames
    /// to every output channel; input reads outside a span read 0.
    pub fn process(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]], frame_count: usize) {
        let n = block_len(outputs, frame_count);
        self.render_span(inputs, outputs, 0, n);
    }

    /// Render one block, applying each event at its sample offset.
    ///
    /// `events` must be ordered by offset; offsets past the block apply at
    /// its end.
    pub fn process_with_events(
        &mut self,
        inputs: &[&[f32]],
        outputs: &mut [&mut [f32]],
        frame_count: usize,
        events: &[RenderEvent],
    ) {
        let n = block_len(outputs, frame_count);
        let mut cursor = 0;
        for event in events {
            let at = (event.sample_offset as usize).clamp(cursor, n);
            self.render_span(inputs, outputs, cursor, at);
            cursor = at;
            self.handle_event(event);
        }
        self.render_span(inputs, outputs, cursor, n);
    }

    fn render_span(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]], start: usize, end: usize) {
        if start >= end {
            return;
        }
        if self.bypassed {
            for (c, out) in outputs.iter_mut().enumerate() {
                for frame in start..end {
                    out[frame] = input_at(inputs, c, frame).unwrap_or(0.0);
                }
            }
            return;
        }
        let Some(res) = self.resources.as_mut() else {
            for out in outputs.iter_mut() {
                out[start..end].fill(0.0);
            }
            return;
        };

        let gain = self.gain;
        let flags = self.flags;
        let notes = self.voices.active_notes();

        for frame in start..end {
            let mono = mono_input(inputs, frame);

            let click = if flags.loop_record {
                res.looper.record(mono);
                res.metronome.next_click_sample()
            } else {
                0.0
            };

            if flags.sampling {
                // Every armed note captures the same input.
                for &note in notes {
                    res.slots[usize::from(note)].record_sample(mono);
                }
                for (c, out) in outputs.iter_mut().enumerate() {
                    let x = input_at(inputs, c, frame).unwrap_or(mono);
                    out[frame] = x * gain + click;
                }
            } else {
                let mut mix = 0.0;
                for &note in notes {
                    mix += res.slots[usize::from(note)].play_sample(&res.crossfade) * gain;
                }
                if flags.loop_playback && !flags.loop_record {
                    mix += res.looper.play() * gain;
                }
                mix += click;
                // Cursors above have already advanced; muting only silences.
                if flags.muted {
                    mix = 0.0;
                }
                for out in outputs.iter_mut() {
                    out[frame] = mix;
                }
            }
        }
    }

    // --- Inspection --------------------------------------------------------------

    #[inline] pub fn voices(&self) -> &VoiceRegistry { &self.voices }
    #[inline] pub fn flags(&self) -> ModeFlags { self.flags }
    #[inline] pub fn gain(&self) -> f32 { self.gain }

    #[inline]
    pub fn slot(&self, note: u8) -> Option<&SampleSlot> {
        self.resources.as_ref()?.slots.get(usize::from(note))
    }

    #[inline]
    pub fn loop_buffer(&self) -> Option<&LoopBuffer> { self.resources.as_ref().map(|r| &r.looper) }

    #[inline]
    pub fn metronome(&self) -> Option<&Metronome> { self.resources.as_ref().map(|r| &r.metronome) }

    #[inline]
    pub fn crossfade(&self) -> Option<Crossfade> { self.resources.as_ref().map(|r| r.crossfade) }
}

impl core::fmt::Debug for Engine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Engine")
            .field("sample_rate", &self.sample_rate())
            .field("flags", &self.flags)
            .field("gain", &self.gain)
            .field("active_notes", &self.voices.active_notes())
            .field("bypassed", &self.bypassed)
            .finish_non_exhaustive()
    }
}

#[inline]
fn block_len(outputs: &[&mut [f32]], frame_count: usize) -> usize {
    outputs.iter().map(|o| o.len()).fold(frame_count, usize::min)
}

#[inline]
fn input_at(inputs: &[&[f32]], channel: usize, frame: usize) -> Option<f32> {
    inputs.get(channel)?.get(frame).copied()
}

/// Average of the input channels at `frame`; channels too short read 0.
#[inline]
#[allow(clippy::cast_precision_loss)]
fn mono_input(inputs: &[&[f32]], frame: usize) -> f32 {
    match inputs {
        [] => 0.0,
        [only] => only.get(frame).copied().unwrap_or(0.0),
        many => {
            let sum: f32 = many.iter().map(|ch| ch.get(frame).copied().unwrap_or(0.0)).sum();
            sum / many.len() as f32
        }
    }
}

// ------------------------------------ Tests --------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    const NOTE_ON: u8 = 0x90;
    const NOTE_OFF: u8 = 0x80;

    fn small_config() -> EngineConfig {
        EngineConfig { slot_seconds: 1.0, ..EngineConfig::default() }
    }

    fn engine_at(sr: f64) -> Engine {
        let mut e = Engine::new(small_config()).unwrap();
        e.initialize(1, 1, sr).unwrap();
        e
    }

    fn run(e: &mut Engine, input: &[f32]) -> Vec<f32> {
        let mut out = vec![f32::NAN; input.len()];
        {
            let ins = [input];
            let mut outs = [&mut out[..]];
            e.process(&ins, &mut outs, input.len());
        }
        out
    }

    fn on(e: &mut Engine, note: u8) { e.handle_midi(&[NOTE_ON, note, 100]); }
    fn off(e: &mut Engine, note: u8) { e.handle_midi(&[NOTE_OFF, note, 0]); }

    #[test]
    fn engine_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Engine>();
    }

    #[test]
    fn note_on_activates_and_note_off_rewinds() {
        let mut e = engine_at(1000.0);
        e.set_param(ParameterAddress::SamplingMode, 1.0);
        on(&mut e, 60);
        assert!(e.voices().contains(60));
        run(&mut e, &[0.5; 20]);
        assert_eq!(e.slot(60).unwrap().sample_index(), 20);

        off(&mut e, 60);
        assert!(!e.voices().contains(60));
        let slot = e.slot(60).unwrap();
        assert_eq!((slot.sample_index(), slot.play_index()), (0, 0));
        assert_eq!(slot.recorded_len(), 20);
    }

    #[test]
    fn control_notes_switch_modes_not_voices() {
        let mut e = engine_at(1000.0);
        on(&mut e, 0);
        assert!(e.flags().sampling);
        on(&mut e, 1);
        assert!(e.flags().muted);
        assert!(e.voices().is_empty());
        off(&mut e, 0);
        off(&mut e, 1);
        assert_eq!(e.flags(), ModeFlags::default());
    }

    #[test]
    fn record_then_play_scenario() {
        let mut e = Engine::new(small_config()).unwrap();
        e.initialize(1, 1, 44_100.0).unwrap();

        on(&mut e, 60);
        e.set_param(ParameterAddress::SamplingMode, 1.0);
        let ones = vec![1.0f32; 44_100];
        for chunk in ones.chunks(512) {
            let out = run(&mut e, chunk);
            assert!(out.iter().all(|&x| x == 1.0), "sampling mode passes input through");
        }
        off(&mut e, 60);
        e.set_param(ParameterAddress::SamplingMode, 0.0);
        on(&mut e, 60);

        let out = run(&mut e, &vec![0.0; 4096]);
        for (i, &y) in out.iter().enumerate().take(441) {
            assert!((y - i as f32 / 441.0).abs() < 1e-6, "i={i} y={y}");
        }
        assert!(out[441..].iter().all(|&y| y == 1.0));
    }

    #[test]
    fn mute_silences_but_cursors_advance() {
        let mut e = engine_at(1000.0);
        e.set_param(ParameterAddress::SamplingMode, 1.0);
        on(&mut e, 60);
        on(&mut e, 64);
        run(&mut e, &[0.5; 100]);
        off(&mut e, 60);
        off(&mut e, 64);
        e.set_param(ParameterAddress::SamplingMode, 0.0);
        on(&mut e, 60);
        on(&mut e, 64);

        on(&mut e, 1); // mute
        let out = run(&mut e, &[0.9; 50]);
        assert!(out.iter().all(|&y| y == 0.0));
        assert_eq!(e.slot(60).unwrap().play_index(), 50);
        assert_eq!(e.slot(64).unwrap().play_index(), 50);

        off(&mut e, 1);
        let out = run(&mut e, &[0.0; 1]);
        assert_eq!(out[0], 1.0); // two voices at 0.5, past the fade-in
        assert_eq!(e.slot(60).unwrap().play_index(), 51);
    }

    #[test]
    fn recording_past_capacity_is_dropped() {
        let mut e = engine_at(1000.0);
        let capacity = e.slot(60).unwrap().capacity();
        assert_eq!(capacity, 1000);
        e.set_param(ParameterAddress::SamplingMode, 1.0);
        on(&mut e, 60);
        let input: Vec<f32> = (0..=capacity).map(|i| i as f32).collect();
        run(&mut e, &input);
        let slot = e.slot(60).unwrap();
        assert_eq!(slot.sample_index(), capacity);
        assert_eq!(slot.recorded().last(), Some(&((capacity - 1) as f32)));
        assert_eq!(e.slot(61).unwrap().recorded_len(), 0);
    }

    #[test]
    fn armed_notes_capture_identical_input() {
        let mut e = engine_at(1000.0);
        e.set_param(ParameterAddress::SamplingMode, 1.0);
        for n in [40, 60, 80] {
            on(&mut e, n);
        }
        let input: Vec<f32> = (0..64).map(|i| (i as f32 * 0.3).sin()).collect();
        run(&mut e, &input);
        for n in [40, 60, 80] {
            assert_eq!(e.slot(n).unwrap().recorded(), &input[..]);
        }
    }

    #[test]
    fn overlapping_voices_sum_without_clipping() {
        let mut e = engine_at(1000.0);
        e.set_param(ParameterAddress::SamplingMode, 1.0);
        for n in [60, 62, 64] {
            on(&mut e, n);
        }
        run(&mut e, &[0.8; 100]);
        for n in [60, 62, 64] {
            off(&mut e, n);
        }
        e.set_param(ParameterAddress::SamplingMode, 0.0);
        for n in [60, 62, 64] {
            on(&mut e, n);
        }
        let out = run(&mut e, &[0.0; 40]);
        assert!((out[30] - 2.4).abs() < 1e-5);
    }

    #[test]
    fn gain_scales_playback_and_passthrough() {
        let mut e = engine_at(1000.0);
        e.set_param(ParameterAddress::Gain, 0.5);
        e.set_param(ParameterAddress::SamplingMode, 1.0);
        on(&mut e, 60);
        let out = run(&mut e, &[1.0; 40]);
        assert!(out.iter().all(|&y| y == 0.5));
        off(&mut e, 60);
        e.set_param(ParameterAddress::SamplingMode, 0.0);
        on(&mut e, 60);
        let out = run(&mut e, &[0.0; 40]);
        assert_eq!(out[20], 0.5);
    }

    #[test]
    fn unknown_addresses_are_neutral() {
        let mut e = engine_at(1000.0);
        assert_eq!(e.parameter(99), 0.0);
        e.set_parameter(99, 1.0);
        assert_eq!(e.try_parameter(99), Err(ParamError::UnknownAddress(99)));
        assert_eq!(e.try_set_parameter(42, 1.0), Err(ParamError::UnknownAddress(42)));
        e.set_parameter(ParameterAddress::Gain.raw(), 0.25);
        assert_eq!(e.parameter(0), 0.25);
    }

    #[test]
    fn midi_changes_are_published_to_observers() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut e = engine_at(1000.0);
        for address in [ParameterAddress::SamplingMode, ParameterAddress::MidiNote, ParameterAddress::MidiNoteOff] {
            let sink = Arc::clone(&seen);
            e.register_observer(address, move |a, v| sink.lock().unwrap().push((a, v)));
        }

        on(&mut e, 0);
        on(&mut e, 60);
        off(&mut e, 60);
        off(&mut e, 0);
        on(&mut e, 1); // no observer for Muted: silently skipped
        e.set_param(ParameterAddress::SamplingMode, 1.0); // host write: no echo

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                (ParameterAddress::SamplingMode, 1.0),
                (ParameterAddress::MidiNote, 60.0),
                (ParameterAddress::MidiNoteOff, 60.0),
                (ParameterAddress::SamplingMode, 0.0),
            ]
        );
        assert!(e.flags().muted);
        assert_eq!(e.param(ParameterAddress::MidiNote), 60.0);
    }

    #[test]
    fn loop_record_overlays_click_and_captures_input() {
        let mut e = Engine::new(small_config()).unwrap();
        e.initialize_with_click(1, 1, 1000.0, ClickTrack::from_samples(vec![0.25, 0.125])).unwrap();
        assert_eq!(e.metronome().unwrap().samples_per_beat(), 500);
        assert_eq!(e.loop_buffer().unwrap().len(), 8000);

        e.set_param(ParameterAddress::LoopRecord, 1.0);
        let out = run(&mut e, &vec![0.1; 1000]);
        assert_eq!(&out[..3], &[0.25, 0.125, 0.0]);
        assert_eq!(&out[500..503], &[0.25, 0.125, 0.0]);
        assert_eq!(e.loop_buffer().unwrap().filled(), 1000);

        e.set_param(ParameterAddress::LoopRecord, 0.0);
        let out = run(&mut e, &[0.0; 10]);
        assert!(out.iter().all(|&y| y == 0.0), "no click or loop without the flags");

        e.set_param(ParameterAddress::LoopPlayback, 1.0);
        let out = run(&mut e, &[0.0; 10]);
        assert!(out.iter().all(|&y| (y - 0.1).abs() < 1e-7));
    }

    #[test]
    fn enabling_loop_record_rewinds_to_bar_start() {
        let mut e = engine_at(1000.0);
        e.set_param(ParameterAddress::LoopRecord, 1.0);
        run(&mut e, &[0.0; 123]);
        assert_eq!(e.metronome().unwrap().index(), 123);
        e.set_param(ParameterAddress::LoopRecord, 1.0); // already on: no rewind
        assert_eq!(e.loop_buffer().unwrap().write_index(), 123);
        e.set_param(ParameterAddress::LoopRecord, 0.0);
        e.set_param(ParameterAddress::LoopRecord, 1.0);
        assert_eq!(e.metronome().unwrap().index(), 0);
        assert_eq!(e.loop_buffer().unwrap().write_index(), 0);
    }

    #[test]
    fn mute_also_silences_the_click() {
        let mut e = Engine::new(small_config()).unwrap();
        e.initialize_with_click(1, 1, 1000.0, ClickTrack::from_samples(vec![1.0; 4])).unwrap();
        e.set_param(ParameterAddress::LoopRecord, 1.0);
        e.set_param(ParameterAddress::Muted, 1.0);
        let out = run(&mut e, &[0.0; 4]);
        assert!(out.iter().all(|&y| y == 0.0));
        assert_eq!(e.metronome().unwrap().index(), 4);
    }

    #[test]
    fn events_apply_at_their_offsets() {
        let mut e = engine_at(1000.0);
        e.set_param(ParameterAddress::SamplingMode, 1.0);
        let input: Vec<f32> = (1..=8).map(|i| i as f32).collect();
        let mut out = vec![0.0; 8];
        let events = [
            RenderEvent::note_on(3, 0, 60, 100),
            RenderEvent::parameter(5, ParameterAddress::Gain, 0.5),
        ];
        {
            let ins = [&input[..]];
            let mut outs = [&mut out[..]];
            e.process_with_events(&ins, &mut outs, 8, &events);
        }
        assert_eq!(e.slot(60).unwrap().recorded(), &input[3..]);
        assert_eq!(out, vec![1.0, 2.0, 3.0, 4.0, 5.0, 3.0, 3.5, 4.0]);
    }

    #[test]
    fn late_events_apply_at_block_end() {
        let mut e = engine_at(1000.0);
        let mut out = vec![0.0; 4];
        {
            let ins: [&[f32]; 0] = [];
            let mut outs = [&mut out[..]];
            e.process_with_events(&ins, &mut outs, 4, &[RenderEvent::ump(100, [0x2090_3C64, 0])]);
        }
        assert!(e.voices().contains(60));
    }

    #[test]
    fn stereo_passthrough_and_mono_capture() {
        let mut e = Engine::new(small_config()).unwrap();
        e.initialize(2, 2, 1000.0).unwrap();
        e.set_param(ParameterAddress::SamplingMode, 1.0);
        on(&mut e, 60);
        let left = [1.0f32; 4];
        let right = [0.0f32; 4];
        let mut out_l = [0.0f32; 4];
        let mut out_r = [0.0f32; 4];
        {
            let ins = [&left[..], &right[..]];
            let mut outs = [&mut out_l[..], &mut out_r[..]];
            e.process(&ins, &mut outs, 4);
        }
        assert_eq!(out_l, [1.0; 4]);
        assert_eq!(out_r, [0.0; 4]);
        assert_eq!(e.slot(60).unwrap().recorded(), &[0.5; 4]);
        // one frame advances the write cursor once, not once per channel
        assert_eq!(e.slot(60).unwrap().sample_index(), 4);
    }

    #[test]
    fn bypass_copies_input() {
        let mut e = engine_at(1000.0);
        e.set_bypass(true);
        assert!(e.is_bypassed());
        on(&mut e, 60);
        let out = run(&mut e, &[0.3, -0.3]);
        assert_eq!(out, vec![0.3, -0.3]);
    }

    #[test]
    fn uninitialized_engine_renders_silence() {
        let mut e = Engine::new(small_config()).unwrap();
        on(&mut e, 60);
        let out = run(&mut e, &[1.0; 8]);
        assert_eq!(out, vec![0.0; 8]);
        assert!(e.slot(60).is_none());

        e.initialize(1, 1, 1000.0).unwrap();
        assert!(e.voices().is_empty());
        e.deinitialize();
        assert!(!e.is_initialized());
        assert_eq!(run(&mut e, &[1.0; 2]), vec![0.0; 2]);
    }

    #[test]
    fn writes_stay_inside_output_spans() {
        let mut e = engine_at(1000.0);
        e.set_param(ParameterAddress::SamplingMode, 1.0);
        let input = [1.0f32; 2];
        let mut short = [9.0f32; 3];
        {
            let ins = [&input[..]];
            let mut outs = [&mut short[..]];
            e.process(&ins, &mut outs, 16);
        }
        // frames past the input span read as silence
        assert_eq!(short, [1.0, 1.0, 0.0]);
    }

    #[test]
    fn rejects_bad_layouts() {
        let mut e = Engine::new(small_config()).unwrap();
        assert!(matches!(e.initialize(1, 1, 0.0), Err(EngineError::InvalidSampleRate(_))));
        assert!(matches!(e.initialize(1, 1, f64::NAN), Err(EngineError::InvalidSampleRate(_))));
        assert!(matches!(e.initialize(1, 0, 44_100.0), Err(EngineError::InvalidChannelCount { .. })));
        assert!(!e.is_initialized());
    }

    #[test]
    fn max_frames_round_trip() {
        let mut e = Engine::new(small_config()).unwrap();
        assert_eq!(e.maximum_frames_to_render(), 1024);
        e.set_maximum_frames_to_render(512);
        assert_eq!(e.maximum_frames_to_render(), 512);
    }
}
