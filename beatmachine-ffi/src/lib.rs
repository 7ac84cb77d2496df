//! C ABI wrapper for the beatmachine engine.
//!
//! ABI notes
//! - All functions are `extern "C"` and `#[no_mangle]`.
//! - Opaque handle type: `BeatMachine` (heap-allocated; destroy it with
//!   `beatmachine_destroy`).
//! - Audio is planar: one `float*` per channel, at most `BEATMACHINE_MAX_CHANNELS`.
//! - Functions that can fail return a status code: `BEATMACHINE_OK` (0) or a
//!   negative `BEATMACHINE_ERR_*`.
//!
//! Threading
//! - The handle is NOT thread-safe. Control calls and render calls must never
//!   overlap; observers fire on whichever thread delivered the MIDI.

use std::ffi::{c_char, c_void, CStr};
use std::ptr;

use beatmachine_engine::{Engine, EngineConfig, ParameterAddress, MAX_CHANNELS, PARAMETER_COUNT};
use tracing::warn;

pub const BEATMACHINE_OK: i32 = 0;
pub const BEATMACHINE_ERR_NULL: i32 = -1;
pub const BEATMACHINE_ERR_INVALID_ARGUMENT: i32 = -2;
pub const BEATMACHINE_ERR_UNKNOWN_PARAMETER: i32 = -3;
pub const BEATMACHINE_ERR_TOO_MANY_FRAMES: i32 = -4;

pub const BEATMACHINE_MAX_CHANNELS: u32 = MAX_CHANNELS as u32;

/// Opaque engine handle.
pub struct BeatMachine {
    inner: Engine,
}

/// Parameter description filled in by `beatmachine_parameter_info`.
#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct BeatMachineParameterInfo {
    pub address: u64,
    /// NUL-terminated, static lifetime.
    pub identifier: *const c_char,
    /// NUL-terminated, static lifetime.
    pub name: *const c_char,
    pub min: f32,
    pub max: f32,
    pub default_value: f32,
}

/// Observer callback: `(user_data, address, value)`.
pub type BeatMachineObserver = extern "C" fn(user_data: *mut c_void, address: u64, value: f32);

struct UserData(*mut c_void);

// The host owns `user_data` and promises it may be used from the render thread.
unsafe impl Send for UserData {}

fn c_strings(address: ParameterAddress) -> (&'static CStr, &'static CStr) {
    match address {
        ParameterAddress::Gain => (c"gain", c"Gain"),
        ParameterAddress::SamplingMode => (c"isRecording", c"Sampling"),
        ParameterAddress::MidiNote => (c"MIDINote", c"Last Note On"),
        ParameterAddress::MidiNoteOff => (c"MIDINoteOff", c"Last Note Off"),
        ParameterAddress::Muted => (c"isMuted", c"Muted"),
        ParameterAddress::LoopRecord => (c"loopRecord", c"Loop Record"),
        ParameterAddress::LoopPlayback => (c"loopPlayback", c"Loop Playback"),
    }
}

#[inline]
fn engine_mut<'a>(engine: *mut BeatMachine) -> Option<&'a mut Engine> {
    // SAFETY: non-null handles come from `beatmachine_create` and are not aliased.
    unsafe { engine.as_mut() }.map(|e| &mut e.inner)
}

#[inline]
fn engine_ref<'a>(engine: *const BeatMachine) -> Option<&'a Engine> {
    // SAFETY: as above.
    unsafe { engine.as_ref() }.map(|e| &e.inner)
}

// --- Creation / destruction -------------------------------------------------------

/// Create an engine. `config_toml` may be null for the default configuration.
/// Returns null when the configuration does not parse or validate.
#[no_mangle]
pub extern "C" fn beatmachine_create(config_toml: *const c_char) -> *mut BeatMachine {
    let config = if config_toml.is_null() {
        Ok(EngineConfig::default())
    } else {
        // SAFETY: caller passes a NUL-terminated string.
        let raw = unsafe { CStr::from_ptr(config_toml) };
        match raw.to_str() {
            Ok(s) => EngineConfig::from_toml_str(s),
            Err(e) => {
                warn!(err = %e, "Configuration is not UTF-8.");
                return ptr::null_mut();
            }
        }
    };
    match config.and_then(Engine::new) {
        Ok(inner) => Box::into_raw(Box::new(BeatMachine { inner })),
        Err(e) => {
            warn!(err = %e, "Could not create engine.");
            ptr::null_mut()
        }
    }
}

/// Destroy an engine previously returned by `beatmachine_create`. Null is a no-op.
#[no_mangle]
pub extern "C" fn beatmachine_destroy(engine: *mut BeatMachine) {
    if !engine.is_null() {
        // SAFETY: the pointer came from `Box::into_raw` in `beatmachine_create`.
        unsafe { drop(Box::from_raw(engine)) };
    }
}

// --- Lifecycle -------------------------------------------------------------------

/// Allocate render resources for the negotiated layout.
#[no_mangle]
pub extern "C" fn beatmachine_initialize(
    engine: *mut BeatMachine,
    input_channels: u32,
    output_channels: u32,
    sample_rate: f64,
) -> i32 {
    let Some(e) = engine_mut(engine) else { return BEATMACHINE_ERR_NULL };
    match e.initialize(input_channels as usize, output_channels as usize, sample_rate) {
        Ok(()) => BEATMACHINE_OK,
        Err(err) => {
            warn!(err = %err, "Initialize failed.");
            BEATMACHINE_ERR_INVALID_ARGUMENT
        }
    }
}

#[no_mangle]
pub extern "C" fn beatmachine_deinitialize(engine: *mut BeatMachine) {
    if let Some(e) = engine_mut(engine) {
        e.deinitialize();
    }
}

// --- Rendering -------------------------------------------------------------------

/// Render `frames` frames. `inputs` may be null when `input_channels` is 0;
/// a null input channel reads as silence. Every output channel must be
/// non-null and hold at least `frames` floats.
#[no_mangle]
pub extern "C" fn beatmachine_process(
    engine: *mut BeatMachine,
    inputs: *const *const f32,
    input_channels: u32,
    outputs: *const *mut f32,
    output_channels: u32,
    frames: u32,
) -> i32 {
    let Some(e) = engine_mut(engine) else { return BEATMACHINE_ERR_NULL };
    if outputs.is_null() || (inputs.is_null() && input_channels > 0) {
        return BEATMACHINE_ERR_NULL;
    }
    if input_channels > BEATMACHINE_MAX_CHANNELS || output_channels > BEATMACHINE_MAX_CHANNELS {
        return BEATMACHINE_ERR_INVALID_ARGUMENT;
    }
    if frames > e.maximum_frames_to_render() {
        return BEATMACHINE_ERR_TOO_MANY_FRAMES;
    }

    let n = frames as usize;
    let (ic, oc) = (input_channels as usize, output_channels as usize);

    // Stack-only views; the render thread must not allocate.
    let mut ins: [&[f32]; MAX_CHANNELS] = [&[][..]; MAX_CHANNELS];
    for (c, slot) in ins.iter_mut().enumerate().take(ic) {
        // SAFETY: `inputs` holds `input_channels` pointers, each to `frames` floats.
        let p = unsafe { *inputs.add(c) };
        if !p.is_null() {
            *slot = unsafe { std::slice::from_raw_parts(p, n) };
        }
    }
    let mut outs: [&mut [f32]; MAX_CHANNELS] = Default::default();
    for (c, slot) in outs.iter_mut().enumerate().take(oc) {
        // SAFETY: `outputs` holds `output_channels` pointers, each to `frames` floats.
        let p = unsafe { *outputs.add(c) };
        if p.is_null() {
            return BEATMACHINE_ERR_NULL;
        }
        *slot = unsafe { std::slice::from_raw_parts_mut(p, n) };
    }

    e.process(&ins[..ic], &mut outs[..oc], n);
    BEATMACHINE_OK
}

// --- MIDI ------------------------------------------------------------------------

/// Deliver one MIDI 1.0 message (`len` bytes).
#[no_mangle]
pub extern "C" fn beatmachine_handle_midi(engine: *mut BeatMachine, bytes: *const u8, len: usize) -> i32 {
    let Some(e) = engine_mut(engine) else { return BEATMACHINE_ERR_NULL };
    if bytes.is_null() {
        return BEATMACHINE_ERR_NULL;
    }
    // SAFETY: caller passes `len` readable bytes.
    e.handle_midi(unsafe { std::slice::from_raw_parts(bytes, len) });
    BEATMACHINE_OK
}

/// Deliver one Universal MIDI Packet (`len` 32-bit words).
#[no_mangle]
pub extern "C" fn beatmachine_handle_ump(engine: *mut BeatMachine, words: *const u32, len: usize) -> i32 {
    let Some(e) = engine_mut(engine) else { return BEATMACHINE_ERR_NULL };
    if words.is_null() {
        return BEATMACHINE_ERR_NULL;
    }
    // SAFETY: caller passes `len` readable words.
    e.handle_ump(unsafe { std::slice::from_raw_parts(words, len) });
    BEATMACHINE_OK
}

// --- Parameters ------------------------------------------------------------------

#[no_mangle]
pub extern "C" fn beatmachine_set_parameter(engine: *mut BeatMachine, address: u64, value: f32) -> i32 {
    let Some(e) = engine_mut(engine) else { return BEATMACHINE_ERR_NULL };
    match e.try_set_parameter(address, value) {
        Ok(()) => BEATMACHINE_OK,
        Err(_) => BEATMACHINE_ERR_UNKNOWN_PARAMETER,
    }
}

/// Current value at `address`; 0 for a null handle or an unknown address.
#[no_mangle]
pub extern "C" fn beatmachine_get_parameter(engine: *const BeatMachine, address: u64) -> f32 {
    engine_ref(engine).map_or(0.0, |e| e.parameter(address))
}

#[no_mangle]
pub extern "C" fn beatmachine_parameter_count() -> u32 {
    PARAMETER_COUNT as u32
}

/// Fill `out` with the description of parameter `index` (0-based).
#[no_mangle]
pub extern "C" fn beatmachine_parameter_info(index: u32, out: *mut BeatMachineParameterInfo) -> i32 {
    let Some(&address) = ParameterAddress::ALL.get(index as usize) else {
        return BEATMACHINE_ERR_UNKNOWN_PARAMETER;
    };
    // SAFETY: caller passes a writable struct or null.
    let Some(out) = (unsafe { out.as_mut() }) else { return BEATMACHINE_ERR_NULL };

    let info = address.info();
    let (identifier, name) = c_strings(address);
    *out = BeatMachineParameterInfo {
        address: address.raw(),
        identifier: identifier.as_ptr(),
        name: name.as_ptr(),
        min: info.min,
        max: info.max,
        default_value: info.default,
    };
    BEATMACHINE_OK
}

/// Install (or with a null `callback`, remove) the observer for `address`.
#[no_mangle]
pub extern "C" fn beatmachine_register_observer(
    engine: *mut BeatMachine,
    address: u64,
    callback: Option<BeatMachineObserver>,
    user_data: *mut c_void,
) -> i32 {
    let Some(e) = engine_mut(engine) else { return BEATMACHINE_ERR_NULL };
    let Some(address) = ParameterAddress::from_raw(address) else {
        return BEATMACHINE_ERR_UNKNOWN_PARAMETER;
    };
    match callback {
        Some(cb) => {
            let data = UserData(user_data);
            e.register_observer(address, move |a, v| {
                // Capture the Send wrapper, not its raw pointer field.
                let data = &data;
                cb(data.0, a.raw(), v);
            });
        }
        None => {
            e.unregister_observer(address);
        }
    }
    BEATMACHINE_OK
}

// --- Host controls ---------------------------------------------------------------

#[no_mangle]
pub extern "C" fn beatmachine_set_bypass(engine: *mut BeatMachine, bypass: bool) {
    if let Some(e) = engine_mut(engine) {
        e.set_bypass(bypass);
    }
}

#[no_mangle]
pub extern "C" fn beatmachine_is_bypassed(engine: *const BeatMachine) -> bool {
    engine_ref(engine).is_some_and(Engine::is_bypassed)
}

#[no_mangle]
pub extern "C" fn beatmachine_maximum_frames_to_render(engine: *const BeatMachine) -> u32 {
    engine_ref(engine).map_or(0, Engine::maximum_frames_to_render)
}

#[no_mangle]
pub extern "C" fn beatmachine_set_maximum_frames_to_render(engine: *mut BeatMachine, frames: u32) {
    if let Some(e) = engine_mut(engine) {
        e.set_maximum_frames_to_render(frames);
    }
}
