//! beatmachine: live sampler/looper host and offline demo renderer.

mod control;
mod demo;
mod live;

use std::path::PathBuf;

use anyhow::{Context, Result};
use beatmachine_engine::{Engine, EngineConfig};
use clap::{crate_version, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(
    version = crate_version!(),
    about = "A MIDI-triggered sampler and looper."
)]
struct Cli {
    /// TOML engine configuration. Missing keys take their defaults.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Overrides `tempo_bpm` from the configuration.
    #[arg(long, global = true)]
    tempo: Option<f32>,

    /// Overrides `default_gain` from the configuration.
    #[arg(long, global = true)]
    gain: Option<f32>,

    /// Only listen on this MIDI channel (0-15).
    #[arg(long, global = true)]
    midi_channel: Option<u8>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lists the available audio output and input devices.
    Devices {},
    /// Lists the available MIDI input ports.
    MidiDevices {},
    /// Runs the engine live against the audio interface and a MIDI input.
    Run {
        /// Output device name. Defaults to the host's default output.
        #[arg(long)]
        output_device: Option<String>,
        /// Input device name. Defaults to the host's default input.
        #[arg(long)]
        input_device: Option<String>,
        /// Connect to the first MIDI input whose name contains this text.
        #[arg(short, long)]
        midi_port: Option<String>,
    },
    /// Renders a scripted record/playback/loop session to a WAV file.
    Demo {
        /// Destination WAV (32-bit float, stereo).
        #[arg(short, long)]
        out: PathBuf,
        #[arg(long, default_value_t = 44_100)]
        sample_rate: u32,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path).with_context(|| format!("loading {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

impl Cli {
    /// The file configuration with command-line flags laid over it.
    fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = load_config(self.config.as_ref())?;
        if let Some(bpm) = self.tempo {
            config.tempo_bpm = bpm;
        }
        if let Some(gain) = self.gain {
            config.default_gain = gain;
        }
        if self.midi_channel.is_some() {
            config.midi_channel = self.midi_channel;
        }
        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

fn print_list(title: &str, items: &[String]) {
    if items.is_empty() {
        println!("No {title} found.");
        return;
    }
    println!("{title}:");
    for item in items {
        println!("- {item}");
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Devices {} => {
            let (outputs, inputs) = live::list_audio_devices()?;
            print_list("output devices", &outputs);
            print_list("input devices", &inputs);
        }
        Commands::MidiDevices {} => {
            print_list("MIDI inputs", &live::list_midi_ports()?);
        }
        Commands::Run { output_device, input_device, midi_port } => {
            let engine = Engine::new(cli.engine_config()?)?;
            let opts = live::LiveOptions {
                output_device: output_device.clone(),
                input_device: input_device.clone(),
                midi_port: midi_port.clone(),
            };
            live::run(engine, &opts)?;
        }
        Commands::Demo { out, sample_rate } => {
            let planes = demo::render_demo(cli.engine_config()?, f64::from(*sample_rate))?;
            demo::write_wav(out, &planes, *sample_rate)?;
            info!(path = %out.display(), "Demo written.");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_demo_with_global_config() {
        let cli = Cli::try_parse_from(["beatmachine", "demo", "--out", "x.wav", "--config", "c.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("c.toml")));
        match cli.command {
            Commands::Demo { out, sample_rate } => {
                assert_eq!(out, PathBuf::from("x.wav"));
                assert_eq!(sample_rate, 44_100);
            }
            _ => panic!("expected demo"),
        }
    }

    #[test]
    fn config_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        std::fs::write(&path, "tempo_bpm = 100.0\nmute_note = 3\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.tempo_bpm, 100.0);
        assert_eq!(config.mute_note, 3);
        assert_eq!(config.record_note, 0);
        assert!(load_config(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn flags_overlay_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.toml");
        std::fs::write(&path, "tempo_bpm = 100.0\ndefault_gain = 0.5\n").unwrap();
        let path = path.to_str().unwrap();

        let cli = Cli::try_parse_from(["beatmachine", "--config", path, "--tempo", "90", "demo", "-o", "x.wav"]).unwrap();
        let config = cli.engine_config().unwrap();
        assert_eq!(config.tempo_bpm, 90.0);
        assert_eq!(config.default_gain, 0.5);

        let cli = Cli::try_parse_from(["beatmachine", "--midi-channel", "16", "demo", "-o", "x.wav"]).unwrap();
        assert!(cli.engine_config().is_err());
    }
}
