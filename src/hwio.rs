//! Hardware control endpoints
//!
//! Every hardware interaction in this daemon is a scalar read or write
//! against a fixed sysfs attribute. The `ControlBus` trait is the single
//! reusable primitive for that: open the endpoint, write the textual value,
//! close on all paths. Writes are fire-and-forget; a failed write is logged
//! and dropped, a failed read falls back to the caller's default.

use std::fs::OpenOptions;
use std::io::Write;

// ============================================================================
// Endpoint paths
// ============================================================================

/// Motor control endpoints exposed by the vibrator LED-class driver.
pub mod motor {
    pub const ACTIVATE: &str = "/sys/class/leds/vibrator/activate";
    pub const BRIGHTNESS: &str = "/sys/class/leds/vibrator/brightness";
    pub const CTRL_LOOP: &str = "/sys/class/leds/vibrator/loop";
    pub const DURATION: &str = "/sys/class/leds/vibrator/duration";
    pub const GAIN: &str = "/sys/class/leds/vibrator/gain";
    pub const IGNORE_STORE: &str = "/sys/class/leds/vibrator/ignore_store";
    pub const LP_TRIGGER: &str = "/sys/class/leds/vibrator/haptic_audio";
    pub const WAVE_SHAPE: &str = "/sys/class/leds/vibrator/lra_resistance";
    pub const MODE: &str = "/sys/class/leds/vibrator/activate_mode";
    pub const RTP_INPUT: &str = "/sys/class/leds/vibrator/rtp";
    pub const SEQ: &str = "/sys/class/leds/vibrator/seq";
    pub const VMAX: &str = "/sys/class/leds/vibrator/vmax";

    /// The scale channel is the same physical register as the gain channel.
    pub const SCALE: &str = GAIN;
}

/// Panel endpoints consumed by the FOD engine.
pub mod panel {
    pub const BRIGHTNESS: &str = "/sys/class/backlight/panel0-backlight/brightness";
    pub const HBM_MODE: &str = "/sys/class/drm/card0-DSI-1/hbm";
    pub const FOD_ILLUMINATION: &str = "/sys/class/drm/card0-DSI-1/op_friginer_print_hbm";
}

// ============================================================================
// Control bus
// ============================================================================

/// Scalar read/write access to hardware control endpoints.
///
/// Engines are generic over this trait so tests can observe the exact
/// sequence of register writes without touching sysfs.
pub trait ControlBus: Send + 'static {
    /// Write a textual value to an endpoint. Never fails from the caller's
    /// point of view; I/O errors are logged and swallowed.
    fn write_str(&self, path: &str, value: &str);

    /// Read an integer from an endpoint, falling back to `default` when the
    /// endpoint is missing, unreadable, or holds something unparsable.
    fn read_i32(&self, path: &str, default: i32) -> i32;

    /// Write any displayable value as its natural textual representation.
    fn write<T: std::fmt::Display>(&self, path: &str, value: T)
    where
        Self: Sized,
    {
        self.write_str(path, &value.to_string());
    }
}

/// Production bus backed by sysfs attributes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SysfsBus;

impl ControlBus for SysfsBus {
    fn write_str(&self, path: &str, value: &str) {
        match OpenOptions::new().write(true).open(path) {
            Ok(mut file) => {
                if let Err(e) = file.write_all(value.as_bytes()) {
                    tracing::warn!(path, value, error = %e, "Control endpoint write failed");
                }
            }
            Err(e) => {
                tracing::warn!(path, error = %e, "Unable to open control endpoint");
            }
        }
    }

    fn read_i32(&self, path: &str, default: i32) -> i32 {
        match std::fs::read_to_string(path) {
            Ok(contents) => contents.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(path, "Control endpoint held a non-numeric value");
                default
            }),
            Err(e) => {
                tracing::debug!(path, error = %e, "Control endpoint read failed, using default");
                default
            }
        }
    }
}

// ============================================================================
// Test support
// ============================================================================

#[cfg(test)]
pub(crate) mod testing {
    use super::ControlBus;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Records every endpoint write and serves canned reads.
    #[derive(Debug, Default)]
    pub struct RecordingBus {
        writes: Mutex<Vec<(String, String)>>,
        reads: Mutex<HashMap<String, i32>>,
    }

    impl RecordingBus {
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn set_read(&self, path: &str, value: i32) {
            self.reads.lock().unwrap().insert(path.to_string(), value);
        }

        pub fn writes(&self) -> Vec<(String, String)> {
            self.writes.lock().unwrap().clone()
        }

        pub fn clear(&self) {
            self.writes.lock().unwrap().clear();
        }
    }

    impl ControlBus for Arc<RecordingBus> {
        fn write_str(&self, path: &str, value: &str) {
            self.writes
                .lock()
                .unwrap()
                .push((path.to_string(), value.to_string()));
        }

        fn read_i32(&self, path: &str, default: i32) -> i32 {
            self.reads
                .lock()
                .unwrap()
                .get(path)
                .copied()
                .unwrap_or(default)
        }
    }
}
