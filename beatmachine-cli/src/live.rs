//! Live session: device input and output streams, a MIDI input port, and a
//! control loop on the main thread.
//!
//! Only bounded channels cross threads. The output callback drains MIDI,
//! parameter writes and captured input at the start of every block and
//! otherwise touches nothing but the engine and its preallocated scratch.

use std::io::{self, BufRead};
use std::thread;

use anyhow::{anyhow, bail, Context, Result};
use beatmachine_engine::{Engine, MidiBytes, ParameterAddress, MAX_CHANNELS};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use crossbeam_channel::{bounded, select, Receiver, Sender};
use midir::{MidiInput, MidiInputConnection};
use tracing::{info, warn};

use crate::control::{self, ControlLine};

const CLIENT_NAME: &str = "beatmachine";

#[derive(Debug, Default)]
pub struct LiveOptions {
    pub output_device: Option<String>,
    pub input_device: Option<String>,
    pub midi_port: Option<String>,
}

/// Receivers owned by the output callback.
struct RenderQueues {
    midi: Receiver<MidiBytes>,
    params: Receiver<(ParameterAddress, f32)>,
    input: Receiver<f32>,
}

pub fn list_audio_devices() -> Result<(Vec<String>, Vec<String>)> {
    let host = cpal::default_host();
    let outputs = host.output_devices()?.filter_map(|d| d.name().ok()).collect();
    let inputs = host.input_devices()?.filter_map(|d| d.name().ok()).collect();
    Ok((outputs, inputs))
}

pub fn list_midi_ports() -> Result<Vec<String>> {
    let midi_in = MidiInput::new(CLIENT_NAME).map_err(|e| anyhow!("MIDI unavailable: {e}"))?;
    Ok(midi_in.ports().iter().filter_map(|p| midi_in.port_name(p).ok()).collect())
}

fn find_device(
    devices: impl Iterator<Item = cpal::Device>,
    name: &str,
) -> Result<cpal::Device> {
    for d in devices {
        if d.name().is_ok_and(|n| n == name) {
            return Ok(d);
        }
    }
    bail!("requested device not found: {name}")
}

pub fn run(mut engine: Engine, opts: &LiveOptions) -> Result<()> {
    let host = cpal::default_host();

    let output = match &opts.output_device {
        Some(name) => find_device(host.output_devices()?, name)?,
        None => host.default_output_device().context("no default output device")?,
    };
    let out_supported = output.default_output_config().context("no default output config")?;
    let sample_format = out_supported.sample_format();
    let out_config: cpal::StreamConfig = out_supported.config();
    let sample_rate = out_config.sample_rate;
    let engine_channels = usize::from(out_config.channels).min(MAX_CHANNELS);

    engine.initialize(1, engine_channels, f64::from(sample_rate.0))?;

    let (midi_tx, midi_rx) = bounded::<MidiBytes>(1024);
    let (param_tx, param_rx) = bounded::<(ParameterAddress, f32)>(64);
    let (input_tx, input_rx) = bounded::<f32>(sample_rate.0 as usize);
    let (change_tx, change_rx) = bounded::<(ParameterAddress, f32)>(256);

    for address in [
        ParameterAddress::SamplingMode,
        ParameterAddress::Muted,
        ParameterAddress::MidiNote,
        ParameterAddress::MidiNoteOff,
    ] {
        let tx = change_tx.clone();
        engine.register_observer(address, move |a, v| {
            let _ = tx.try_send((a, v));
        });
    }

    info!(
        device = %output.name().unwrap_or_default(),
        sample_rate = sample_rate.0,
        channels = out_config.channels,
        ?sample_format,
        "Opening output."
    );

    let queues = RenderQueues { midi: midi_rx, params: param_rx, input: input_rx };
    let output_stream = match sample_format {
        cpal::SampleFormat::F32 => build_output_stream::<f32>(&output, &out_config, engine, queues)?,
        cpal::SampleFormat::I16 => build_output_stream::<i16>(&output, &out_config, engine, queues)?,
        cpal::SampleFormat::U16 => build_output_stream::<u16>(&output, &out_config, engine, queues)?,
        other => bail!("unsupported device sample format: {other:?}"),
    };
    output_stream.play()?;

    // The session still runs without a microphone; input then reads silence.
    let _input_stream = match open_input(&host, opts.input_device.as_deref(), sample_rate, input_tx) {
        Ok(stream) => Some(stream),
        Err(e) => {
            warn!(err = %e, "Audio input disabled.");
            None
        }
    };
    let _midi_connection = match open_midi(opts.midi_port.as_deref(), midi_tx) {
        Ok(conn) => Some(conn),
        Err(e) => {
            warn!(err = %e, "MIDI input disabled.");
            None
        }
    };

    control_loop(&param_tx, &change_rx);
    info!("Session ended.");
    Ok(())
}

fn control_loop(params: &Sender<(ParameterAddress, f32)>, changes: &Receiver<(ParameterAddress, f32)>) {
    let (line_tx, line_rx) = bounded::<String>(16);
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line_tx.send(line).is_err() {
                break;
            }
        }
    });

    println!("{}", control::HELP);
    loop {
        select! {
            recv(line_rx) -> line => {
                // End of input ends the session.
                let Ok(line) = line else { return };
                match control::parse_line(&line) {
                    Ok(Some(ControlLine::Quit)) => return,
                    Ok(Some(cmd)) => {
                        if let Some((address, value)) = cmd.parameter() {
                            if params.try_send((address, value)).is_err() {
                                warn!("Render thread is not keeping up; command dropped.");
                            } else {
                                println!("{} = {value}", address.info().identifier);
                            }
                        }
                    }
                    Ok(None) => {}
                    Err(e) => println!("{e}\n{}", control::HELP),
                }
            }
            recv(changes) -> change => {
                if let Ok((address, value)) = change {
                    println!("[engine] {} = {value}", address.info().identifier);
                }
            }
        }
    }
}

fn build_output_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut engine: Engine,
    queues: RenderQueues,
) -> Result<cpal::Stream>
where
    T: SizedSample + FromSample<f32> + Send + 'static,
{
    let channels = usize::from(config.channels);
    let engine_channels = channels.min(MAX_CHANNELS);
    let block = (engine.maximum_frames_to_render() as usize).max(1);

    let mut input = vec![0.0f32; block];
    let mut planes = vec![vec![0.0f32; block]; engine_channels];

    let err_fn = |e: cpal::StreamError| warn!(err = %e, "Output stream error.");

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            while let Ok(midi) = queues.midi.try_recv() {
                engine.handle_midi(midi.as_slice());
            }
            while let Ok((address, value)) = queues.params.try_recv() {
                engine.set_param(address, value);
            }

            for chunk in data.chunks_mut(block * channels) {
                let frames = chunk.len() / channels;
                for x in &mut input[..frames] {
                    *x = queues.input.try_recv().unwrap_or(0.0);
                }

                let mut outs: [&mut [f32]; MAX_CHANNELS] = Default::default();
                for (slot, plane) in outs.iter_mut().zip(planes.iter_mut()) {
                    *slot = &mut plane[..frames];
                }
                engine.process(&[&input[..frames]], &mut outs[..engine_channels], frames);

                for (i, frame) in chunk.chunks_mut(channels).enumerate() {
                    for (c, s) in frame.iter_mut().enumerate() {
                        let x = planes.get(c).map_or(0.0, |p| p[i]);
                        *s = T::from_sample(x.clamp(-1.0, 1.0));
                    }
                }
            }
        },
        err_fn,
        None,
    )?;
    Ok(stream)
}

fn open_input(
    host: &cpal::Host,
    name: Option<&str>,
    sample_rate: cpal::SampleRate,
    tx: Sender<f32>,
) -> Result<cpal::Stream> {
    let device = match name {
        Some(name) => find_device(host.input_devices()?, name)?,
        None => host.default_input_device().context("no default input device")?,
    };
    let supported = device.default_input_config()?;
    let sample_format = supported.sample_format();
    let mut config: cpal::StreamConfig = supported.config();
    config.sample_rate = sample_rate;

    info!(device = %device.name().unwrap_or_default(), channels = config.channels, "Opening input.");

    let stream = match sample_format {
        cpal::SampleFormat::F32 => build_input_stream::<f32>(&device, &config, tx)?,
        cpal::SampleFormat::I16 => build_input_stream::<i16>(&device, &config, tx)?,
        cpal::SampleFormat::U16 => build_input_stream::<u16>(&device, &config, tx)?,
        other => bail!("unsupported input sample format: {other:?}"),
    };
    stream.play()?;
    Ok(stream)
}

fn build_input_stream<T>(device: &cpal::Device, config: &cpal::StreamConfig, tx: Sender<f32>) -> Result<cpal::Stream>
where
    T: SizedSample + Send + 'static,
    f32: FromSample<T>,
{
    let channels = usize::from(config.channels).max(1);
    let err_fn = |e: cpal::StreamError| warn!(err = %e, "Input stream error.");

    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            // Mixed to mono here; the engine records mono anyway.
            for frame in data.chunks(channels) {
                let sum: f32 = frame.iter().map(|&s| f32::from_sample(s)).sum();
                let _ = tx.try_send(sum / frame.len() as f32);
            }
        },
        err_fn,
        None,
    )?;
    Ok(stream)
}

fn open_midi(port_name: Option<&str>, tx: Sender<MidiBytes>) -> Result<MidiInputConnection<()>> {
    let midi_in = MidiInput::new(CLIENT_NAME).map_err(|e| anyhow!("MIDI unavailable: {e}"))?;
    let ports = midi_in.ports();
    let port = match port_name {
        Some(wanted) => ports
            .iter()
            .find(|p| midi_in.port_name(p).is_ok_and(|n| n.contains(wanted)))
            .with_context(|| format!("no MIDI input matching {wanted:?}"))?,
        None => ports.first().context("no MIDI input ports")?,
    };
    let name = midi_in.port_name(port).unwrap_or_default();
    info!(port = %name, "Connecting MIDI input.");

    midi_in
        .connect(
            port,
            "beatmachine-in",
            move |_stamp, message, _| {
                let _ = tx.try_send(MidiBytes::from_slice(message));
            },
            (),
        )
        .map_err(|e| anyhow!("could not connect to {name}: {e}"))
}
