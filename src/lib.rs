//! fodhapticd Library
//!
//! Public API for testing and integration.

pub mod config;
pub mod dbus;
pub mod dim;
pub mod fod;
pub mod hwio;
pub mod vendor;
pub mod vibrator;

/// Re-export commonly used types
pub use config::{Config, FodConfig, IlluminationDriver, DEFAULT_CONFIG_PATH};
pub use dbus::{init_dbus_service, FingerprintService, VibratorService, DBUS_NAME, DBUS_PATH};
pub use dim::{brightness_to_alpha, BrightnessAlpha, BRIGHTNESS_ALPHA_LUT};
pub use fod::{
    new_shared_fod_engine, ChannelCallback, FingerEvent, FodCallback, FodEngine, SharedFodEngine,
};
pub use hwio::{ControlBus, SysfsBus};
pub use vendor::VendorLink;
pub use vibrator::{
    new_shared_vibrator, Effect, EffectStrength, SharedVibrator, Vibrator, VibratorError,
};
