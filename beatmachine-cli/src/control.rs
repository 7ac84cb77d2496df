//! Line commands typed into the `run` session.

use anyhow::{anyhow, bail, Result};
use beatmachine_engine::ParameterAddress;

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ControlLine {
    Gain(f32),
    Loop(bool),
    PlayLoop(bool),
    Mute(bool),
    Quit,
}

impl ControlLine {
    /// The parameter write this command performs; `None` for `Quit`.
    pub fn parameter(self) -> Option<(ParameterAddress, f32)> {
        let toggle = |on: bool| if on { 1.0 } else { 0.0 };
        match self {
            ControlLine::Gain(v) => Some((ParameterAddress::Gain, v)),
            ControlLine::Loop(on) => Some((ParameterAddress::LoopRecord, toggle(on))),
            ControlLine::PlayLoop(on) => Some((ParameterAddress::LoopPlayback, toggle(on))),
            ControlLine::Mute(on) => Some((ParameterAddress::Muted, toggle(on))),
            ControlLine::Quit => None,
        }
    }
}

pub const HELP: &str = "commands: gain <0..1> | loop on|off | play-loop on|off | mute on|off | quit";

fn on_off(word: Option<&str>) -> Result<bool> {
    match word {
        Some("on") => Ok(true),
        Some("off") => Ok(false),
        Some(other) => bail!("expected on|off, got {other:?}"),
        None => bail!("expected on|off"),
    }
}

/// Parse one line; blank lines yield `None`.
pub fn parse_line(line: &str) -> Result<Option<ControlLine>> {
    let mut words = line.split_whitespace();
    let Some(cmd) = words.next() else { return Ok(None) };

    let parsed = match cmd.to_ascii_lowercase().as_str() {
        "gain" => {
            let raw = words.next().ok_or_else(|| anyhow!("gain needs a value"))?;
            let v: f32 = raw.parse().map_err(|_| anyhow!("invalid gain {raw:?}"))?;
            if !v.is_finite() {
                bail!("invalid gain {raw:?}");
            }
            ControlLine::Gain(v)
        }
        "loop" => ControlLine::Loop(on_off(words.next())?),
        "play-loop" => ControlLine::PlayLoop(on_off(words.next())?),
        "mute" => ControlLine::Mute(on_off(words.next())?),
        "quit" | "exit" | "q" => ControlLine::Quit,
        other => bail!("unknown command {other:?}"),
    };

    if let Some(extra) = words.next() {
        bail!("unexpected argument {extra:?}");
    }
    Ok(Some(parsed))
}
