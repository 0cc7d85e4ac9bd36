//! D-Bus IPC server for fodhapticd
//!
//! Exposes the two actuation engines to the system UI. The handlers here
//! are deliberately thin: adapt the wire request, take the engine lock,
//! call the engine, map the result.
//!
//! ## Interface: org.lineage.fodhapticd.Fingerprint
//!
//! Enroll/press/release choreography, acquired/error event classification,
//! dim-amount and sensor geometry queries, long-press toggle.
//! Signals `FingerDown` / `FingerUp` are emitted when the sensor reports a
//! finger while the FOD circle is visible.
//!
//! ## Interface: org.lineage.fodhapticd.Vibrator
//!
//! On/off/amplitude control plus waveform-library effect playback.

use zbus::{fdo, interface};

use crate::fod::SharedFodEngine;
use crate::vibrator::{Effect, EffectStrength, SharedVibrator, VibratorError};

/// D-Bus bus name
pub const DBUS_NAME: &str = "org.lineage.fodhapticd";

/// D-Bus object path
pub const DBUS_PATH: &str = "/org/lineage/fodhapticd";

/// Fingerprint interface name
pub const FINGERPRINT_INTERFACE: &str = "org.lineage.fodhapticd.Fingerprint";

/// Vibrator interface name
pub const VIBRATOR_INTERFACE: &str = "org.lineage.fodhapticd.Vibrator";

// ============================================================================
// Fingerprint service
// ============================================================================

/// FOD engine D-Bus adapter.
pub struct FingerprintService {
    engine: SharedFodEngine,
}

impl FingerprintService {
    pub fn new(engine: SharedFodEngine) -> Self {
        Self { engine }
    }

    fn with_engine<R>(
        &self,
        op: &str,
        f: impl FnOnce(&mut crate::fod::FodEngine<crate::hwio::SysfsBus>) -> R,
    ) -> fdo::Result<R> {
        match self.engine.lock() {
            Ok(mut engine) => Ok(f(&mut engine)),
            Err(e) => {
                tracing::error!(op, error = %e, "Failed to lock FOD engine");
                Err(fdo::Error::Failed(format!("Lock error: {}", e)))
            }
        }
    }
}

#[interface(name = "org.lineage.fodhapticd.Fingerprint")]
impl FingerprintService {
    /// Enrollment is starting.
    async fn on_start_enroll(&self) -> fdo::Result<()> {
        tracing::info!("OnStartEnroll called");
        self.with_engine("OnStartEnroll", |e| e.on_start_enroll())
    }

    /// Enrollment finished.
    async fn on_finish_enroll(&self) -> fdo::Result<()> {
        tracing::info!("OnFinishEnroll called");
        self.with_engine("OnFinishEnroll", |e| e.on_finish_enroll())
    }

    /// Finger pressed on the sensor area.
    async fn on_press(&self) -> fdo::Result<()> {
        tracing::debug!("OnPress called");
        self.with_engine("OnPress", |e| e.on_press())
    }

    /// Finger lifted from the sensor area.
    async fn on_release(&self) -> fdo::Result<()> {
        tracing::debug!("OnRelease called");
        self.with_engine("OnRelease", |e| e.on_release())
    }

    /// The system UI is showing the FOD circle.
    async fn on_show_fod_view(&self) -> fdo::Result<()> {
        tracing::debug!("OnShowFodView called");
        self.with_engine("OnShowFodView", |e| e.on_show_fod_view())
    }

    /// The system UI hid the FOD circle.
    async fn on_hide_fod_view(&self) -> fdo::Result<()> {
        tracing::debug!("OnHideFodView called");
        self.with_engine("OnHideFodView", |e| e.on_hide_fod_view())
    }

    /// Classify an acquired event from the fingerprint HAL.
    ///
    /// Returns true when the event was consumed as a finger down/up
    /// detection (and the matching signal will be emitted).
    async fn handle_acquired(&self, acquired_info: i32, vendor_code: i32) -> fdo::Result<bool> {
        self.with_engine("HandleAcquired", |e| {
            e.handle_acquired(acquired_info, vendor_code)
        })
    }

    /// Whether an error event belongs to the sensor's vendor channel.
    async fn handle_error(&self, error: i32, vendor_code: i32) -> fdo::Result<bool> {
        self.with_engine("HandleError", |e| e.handle_error(error, vendor_code))
    }

    /// Toggle long-press detection.
    async fn set_long_press_enabled(&self, enabled: bool) -> fdo::Result<()> {
        tracing::info!(enabled, "SetLongPressEnabled called");
        self.with_engine("SetLongPressEnabled", |e| e.set_long_press_enabled(enabled))
    }

    /// Dim alpha to composite over the screen right now.
    async fn get_dim_amount(&self) -> fdo::Result<i32> {
        self.with_engine("GetDimAmount", |e| e.dim_amount())
    }

    /// Whether the system UI must boost panel brightness for the sensor.
    async fn should_boost_brightness(&self) -> fdo::Result<bool> {
        self.with_engine("ShouldBoostBrightness", |e| e.should_boost_brightness())
    }

    /// Sensor center X on the panel, in pixels.
    async fn get_position_x(&self) -> fdo::Result<i32> {
        self.with_engine("GetPositionX", |e| e.position_x())
    }

    /// Sensor center Y on the panel, in pixels.
    async fn get_position_y(&self) -> fdo::Result<i32> {
        self.with_engine("GetPositionY", |e| e.position_y())
    }

    /// Sensor illumination circle diameter, in pixels.
    async fn get_size(&self) -> fdo::Result<i32> {
        self.with_engine("GetSize", |e| e.size())
    }
}

// ============================================================================
// Vibrator service
// ============================================================================

/// Vibrator engine D-Bus adapter.
pub struct VibratorService {
    engine: SharedVibrator,
}

impl VibratorService {
    pub fn new(engine: SharedVibrator) -> Self {
        Self { engine }
    }

    fn with_engine<R>(
        &self,
        op: &str,
        f: impl FnOnce(&mut crate::vibrator::Vibrator<crate::hwio::SysfsBus>) -> R,
    ) -> fdo::Result<R> {
        match self.engine.lock() {
            Ok(mut engine) => Ok(f(&mut engine)),
            Err(e) => {
                tracing::error!(op, error = %e, "Failed to lock vibrator");
                Err(fdo::Error::Failed(format!("Lock error: {}", e)))
            }
        }
    }
}

#[interface(name = "org.lineage.fodhapticd.Vibrator")]
impl VibratorService {
    /// Start a plain timed vibration.
    async fn on(&self, timeout_ms: u32) -> fdo::Result<()> {
        tracing::debug!(timeout_ms, "Vibrator On called");
        self.with_engine("On", |v| v.on(timeout_ms))
    }

    /// Stop the motor.
    async fn off(&self) -> fdo::Result<()> {
        tracing::debug!("Vibrator Off called");
        self.with_engine("Off", |v| v.off())
    }

    /// Whether continuous amplitude control is available.
    async fn supports_amplitude_control(&self) -> fdo::Result<bool> {
        self.with_engine("SupportsAmplitudeControl", |v| {
            v.supports_amplitude_control()
        })
    }

    /// Set the continuous-drive amplitude (1-255).
    async fn set_amplitude(&self, amplitude: u8) -> fdo::Result<()> {
        match self.with_engine("SetAmplitude", |v| v.set_amplitude(amplitude))? {
            Ok(()) => Ok(()),
            Err(e @ VibratorError::InvalidAmplitude) => {
                Err(fdo::Error::InvalidArgs(e.to_string()))
            }
            Err(e) => Err(fdo::Error::Failed(e.to_string())),
        }
    }

    /// Play a waveform-library effect; returns the nominal duration in ms.
    async fn perform(&self, effect: u32, strength: i32) -> fdo::Result<u32> {
        tracing::debug!(effect, strength, "Vibrator Perform called");
        let result = self.with_engine("Perform", |v| {
            v.perform(Effect::from_id(effect), EffectStrength::from_id(strength))
        })?;

        match result {
            Ok(duration_ms) => Ok(duration_ms),
            Err(e @ VibratorError::UnsupportedEffect) => {
                tracing::warn!(effect, "Unsupported effect requested");
                Err(fdo::Error::NotSupported(e.to_string()))
            }
            Err(e) => Err(fdo::Error::Failed(e.to_string())),
        }
    }
}

// ============================================================================
// Service registration and signals
// ============================================================================

/// Initialize and run the D-Bus service.
///
/// Connects to the bus, registers the service name, and exports both engine
/// interfaces at the object path. The returned connection must be kept
/// alive for the service to run.
pub async fn init_dbus_service(
    fod: SharedFodEngine,
    vibrator: SharedVibrator,
) -> zbus::Result<zbus::Connection> {
    let connection = zbus::connection::Builder::session()?
        .name(DBUS_NAME)?
        .serve_at(DBUS_PATH, FingerprintService::new(fod))?
        .serve_at(DBUS_PATH, VibratorService::new(vibrator))?
        .build()
        .await?;

    tracing::info!(
        name = DBUS_NAME,
        path = DBUS_PATH,
        "D-Bus service registered"
    );

    Ok(connection)
}

/// Emit the FingerDown signal.
pub async fn emit_finger_down(connection: &zbus::Connection) -> zbus::Result<()> {
    connection
        .emit_signal(
            None::<&str>, // broadcast
            DBUS_PATH,
            FINGERPRINT_INTERFACE,
            "FingerDown",
            &(),
        )
        .await
}

/// Emit the FingerUp signal.
pub async fn emit_finger_up(connection: &zbus::Connection) -> zbus::Result<()> {
    connection
        .emit_signal(
            None::<&str>, // broadcast
            DBUS_PATH,
            FINGERPRINT_INTERFACE,
            "FingerUp",
            &(),
        )
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FodConfig;
    use crate::fod::new_shared_fod_engine;

    #[test]
    fn test_dbus_constants() {
        assert_eq!(DBUS_NAME, "org.lineage.fodhapticd");
        assert_eq!(DBUS_PATH, "/org/lineage/fodhapticd");
        assert_eq!(FINGERPRINT_INTERFACE, "org.lineage.fodhapticd.Fingerprint");
        assert_eq!(VIBRATOR_INTERFACE, "org.lineage.fodhapticd.Vibrator");
    }

    #[test]
    fn test_fingerprint_service_geometry() {
        let service = FingerprintService::new(new_shared_fod_engine(FodConfig::default(), None));
        let x = service.with_engine("GetPositionX", |e| e.position_x()).unwrap();
        let size = service.with_engine("GetSize", |e| e.size()).unwrap();
        assert_eq!(x, 444);
        assert_eq!(size, 190);
    }
}
