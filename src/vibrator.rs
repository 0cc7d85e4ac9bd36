//! Haptic effect sequencer
//!
//! Translates abstract effect identifiers into ordered writes against the
//! motor control registers, and drives the activate/deactivate pulse around
//! them. Pre-programmed effects play from the waveform library; continuous
//! vibration streams amplitude through the realtime-playback (rtp) channel.

use std::fmt;
use std::sync::{Arc, Mutex};

use crate::hwio::{motor, ControlBus, SysfsBus};

/// Shared vibrator for thread-safe access from D-Bus handlers.
///
/// The motor register set is a singleton resource; all callers serialize
/// through this mutex.
pub type SharedVibrator = Arc<Mutex<Vibrator<SysfsBus>>>;

/// Create a new shared vibrator over the sysfs bus.
pub fn new_shared_vibrator() -> SharedVibrator {
    Arc::new(Mutex::new(Vibrator::new(SysfsBus)))
}

// ============================================================================
// Constants
// ============================================================================

/// Realtime-playback input range.
const MAX_RTP_INPUT: u8 = 127;
const MIN_RTP_INPUT: u8 = 0;

/// Motor drive modes.
const RTP_MODE: &str = "rtp";
const WAVEFORM_MODE: &str = "waveform";
const SQUARE_WAVE: u8 = 0;
const SINE_WAVE: u8 = 1;

/// Fixed drive parameters for library effects.
const GAIN: u8 = 128;
const LOOP_MODE_OPEN: u8 = 1;
const VMAX: u8 = 9;

// ============================================================================
// Effects
// ============================================================================

/// Haptic effects supported by the waveform library. Identifiers follow the
/// platform vibrator HAL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Effect {
    Click = 0,
    DoubleClick = 1,
    Tick = 2,
    Thud = 3,
    Pop = 4,
    HeavyClick = 5,
}

impl Effect {
    /// Create from a raw effect identifier.
    pub fn from_id(id: u32) -> Option<Self> {
        match id {
            0 => Some(Self::Click),
            1 => Some(Self::DoubleClick),
            2 => Some(Self::Tick),
            3 => Some(Self::Thud),
            4 => Some(Self::Pop),
            5 => Some(Self::HeavyClick),
            _ => None,
        }
    }

    fn descriptor(self) -> &'static EffectDescriptor {
        match self {
            Self::Click => &CLICK_EFFECT,
            Self::DoubleClick => &DOUBLE_CLICK_EFFECT,
            Self::Tick => &TICK_EFFECT,
            Self::Thud => &THUD_EFFECT,
            Self::Pop => &POP_EFFECT,
            Self::HeavyClick => &HEAVY_CLICK_EFFECT,
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Click => write!(f, "click"),
            Self::DoubleClick => write!(f, "double_click"),
            Self::Tick => write!(f, "tick"),
            Self::Thud => write!(f, "thud"),
            Self::Pop => write!(f, "pop"),
            Self::HeavyClick => write!(f, "heavy_click"),
        }
    }
}

/// Effect strength levels, per the platform HAL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum EffectStrength {
    Light = 0,
    Medium = 1,
    Strong = 2,
}

impl EffectStrength {
    /// Create from a raw strength identifier.
    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            0 => Some(Self::Light),
            1 => Some(Self::Medium),
            2 => Some(Self::Strong),
            _ => None,
        }
    }
}

/// Strength to gain byte. A fixed step function, not linear: light runs the
/// motor at half scale, medium and strong both at full scale, and anything
/// unrecognized mutes the gain entirely.
fn strength_gain(strength: Option<EffectStrength>) -> u8 {
    match strength {
        Some(EffectStrength::Light) => 54,
        Some(EffectStrength::Medium) | Some(EffectStrength::Strong) => 107,
        None => 0,
    }
}

/// Static template describing the register writes and timing for one effect.
struct EffectDescriptor {
    /// Waveform-library sequence entries, written in order.
    sequences: &'static [&'static str],
    /// Control-loop entries, written in order.
    ctrl_loops: &'static [&'static str],
    /// Explicit duration register override, when the effect needs one.
    duration_override: Option<u32>,
    /// Nominal playback duration reported to the caller.
    duration_ms: u32,
}

// Effects #1-#4 in the waveform library.
const CLICK_EFFECT: EffectDescriptor = EffectDescriptor {
    sequences: &["0 1", "1 0"],
    ctrl_loops: &["0 0x0"],
    duration_override: None,
    duration_ms: 0,
};

const TICK_EFFECT: EffectDescriptor = EffectDescriptor {
    sequences: &["0 1", "1 0"],
    ctrl_loops: &["1 0x0"],
    duration_override: None,
    duration_ms: 0,
};

const DOUBLE_CLICK_EFFECT: EffectDescriptor = EffectDescriptor {
    sequences: &["0 1"],
    ctrl_loops: &["0 0x0", "1 0x0"],
    duration_override: None,
    duration_ms: 10,
};

const HEAVY_CLICK_EFFECT: EffectDescriptor = EffectDescriptor {
    sequences: &["0 0", "1 0"],
    ctrl_loops: &["1 0x1"],
    duration_override: None,
    duration_ms: 10,
};

// Pop and thud carry timing only; the motor plays its stored waveform.
const POP_EFFECT: EffectDescriptor = EffectDescriptor {
    sequences: &[],
    ctrl_loops: &[],
    duration_override: Some(0),
    duration_ms: 5,
};

const THUD_EFFECT: EffectDescriptor = EffectDescriptor {
    sequences: &[],
    ctrl_loops: &[],
    duration_override: Some(0),
    duration_ms: 10,
};

// ============================================================================
// Errors
// ============================================================================

/// Vibrator request errors. Hardware writes themselves never fail from the
/// caller's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VibratorError {
    /// The requested effect is not in the waveform library.
    UnsupportedEffect,
    /// Zero amplitude is not a valid continuous-drive level.
    InvalidAmplitude,
}

impl fmt::Display for VibratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VibratorError::UnsupportedEffect => write!(f, "Unsupported effect"),
            VibratorError::InvalidAmplitude => write!(f, "Invalid amplitude"),
        }
    }
}

impl std::error::Error for VibratorError {}

// ============================================================================
// Vibrator
// ============================================================================

/// Motor driver: effect sequencing plus the on/off actuation state machine.
pub struct Vibrator<B: ControlBus> {
    bus: B,
    /// Whether the most recent effect armed the brightness channel. Library
    /// effects drive the motor through the brightness register; plain timed
    /// vibration goes through the legacy activate register.
    use_brightness_channel: bool,
}

impl<B: ControlBus> Vibrator<B> {
    /// Open the driver. Arms the haptic-audio trigger so effect #1 can be
    /// played by the sensor coprocessor while the AP is suspended.
    pub fn new(bus: B) -> Self {
        bus.write(motor::LP_TRIGGER, 1);
        Self {
            bus,
            use_brightness_channel: false,
        }
    }

    /// Start a plain timed vibration in realtime-playback mode.
    pub fn on(&mut self, timeout_ms: u32) {
        self.use_brightness_channel = false;
        self.drive(timeout_ms, false);
    }

    /// Actuation start: program the drive mode and pulse whichever channel
    /// the current session uses.
    fn drive(&self, timeout_ms: u32, is_waveform: bool) {
        self.bus.write(motor::CTRL_LOOP, LOOP_MODE_OPEN);
        self.bus.write(motor::DURATION, timeout_ms);

        if is_waveform {
            self.bus.write_str(motor::MODE, WAVEFORM_MODE);
            self.bus.write(motor::WAVE_SHAPE, SINE_WAVE);
        } else {
            self.bus.write_str(motor::MODE, RTP_MODE);
            self.bus.write(motor::WAVE_SHAPE, SQUARE_WAVE);
        }

        if self.use_brightness_channel {
            self.bus.write(motor::BRIGHTNESS, 1);
        } else {
            self.bus.write(motor::BRIGHTNESS, 0);
            self.bus.write(motor::ACTIVATE, 1);
        }
    }

    /// Stop the motor. Clears both drive channels; idempotent.
    pub fn off(&self) {
        self.bus.write(motor::BRIGHTNESS, 0);
        self.bus.write(motor::ACTIVATE, 0);
    }

    /// Whether continuous amplitude control is available.
    pub fn supports_amplitude_control(&self) -> bool {
        true
    }

    /// Set the continuous-drive amplitude. Valid amplitudes (1-255) rescale
    /// onto the realtime-playback input range.
    pub fn set_amplitude(&self, amplitude: u8) -> Result<(), VibratorError> {
        if amplitude == 0 {
            return Err(VibratorError::InvalidAmplitude);
        }

        let value = ((amplitude - 1) as f64 / 254.0 * (MAX_RTP_INPUT - MIN_RTP_INPUT) as f64
            + MIN_RTP_INPUT as f64)
            .round() as i32;
        self.bus.write(motor::RTP_INPUT, value);

        Ok(())
    }

    /// Play a library effect at the given strength.
    ///
    /// Returns the nominal playback duration in milliseconds. An unrecognized
    /// effect produces no hardware writes at all.
    pub fn perform(
        &mut self,
        effect: Option<Effect>,
        strength: Option<EffectStrength>,
    ) -> Result<u32, VibratorError> {
        let Some(effect) = effect else {
            self.use_brightness_channel = false;
            return Err(VibratorError::UnsupportedEffect);
        };

        let gain = strength_gain(strength);
        let descriptor = effect.descriptor();

        tracing::debug!(effect = %effect, gain, "Sequencing haptic effect");

        self.bus.write(motor::ACTIVATE, 0);
        self.bus.write(motor::IGNORE_STORE, 0);

        if let Some(duration) = descriptor.duration_override {
            self.bus.write(motor::DURATION, duration);
        }

        self.bus.write(motor::VMAX, VMAX);
        self.bus.write(motor::GAIN, GAIN);

        for sequence in descriptor.sequences {
            self.bus.write_str(motor::SEQ, sequence);
        }
        for ctrl_loop in descriptor.ctrl_loops {
            self.bus.write_str(motor::CTRL_LOOP, ctrl_loop);
        }

        // All library effects pulse the motor through the brightness channel.
        self.use_brightness_channel = true;

        self.bus.write(motor::SCALE, gain);
        self.drive(descriptor.duration_ms, true);

        Ok(descriptor.duration_ms)
    }
}
