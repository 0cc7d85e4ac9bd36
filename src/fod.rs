//! FOD (fingerprint-on-display) engine
//!
//! Drives the illumination choreography around the under-display sensor:
//! enrollment status pushes, press/release dim-mode toggling against the
//! vendor display service, dim-alpha reporting from the live panel
//! brightness, and classification of acquired/error events into finger
//! down/up callbacks.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::config::{FodConfig, IlluminationDriver};
use crate::dim::brightness_to_alpha;
use crate::hwio::{panel, ControlBus, SysfsBus};
use crate::vendor::{display_op, fp_op, VendorLink};

/// Vendor acquired-info code carrying finger down/up detail.
const ACQUIRED_VENDOR: i32 = 6;

/// Vendor error code the sensor raises for its own events.
const ERROR_VENDOR: i32 = 8;

/// High-brightness-mode sentinel that forces the fixed dim alpha.
const HBM_DIM_SENTINEL: i32 = 5;

/// Dim alpha reported while the panel is in high-brightness mode.
const HBM_DIM_ALPHA: i32 = 42;

/// Shared FOD engine for thread-safe access from D-Bus handlers.
pub type SharedFodEngine = Arc<Mutex<FodEngine<SysfsBus>>>;

/// Create a new shared FOD engine over the sysfs bus.
pub fn new_shared_fod_engine(config: FodConfig, vendor: Option<VendorLink>) -> SharedFodEngine {
    Arc::new(Mutex::new(FodEngine::new(SysfsBus, config, vendor)))
}

// ============================================================================
// Callback
// ============================================================================

/// Receiver for finger down/up detections while the FOD circle is shown.
pub trait FodCallback: Send {
    fn on_finger_down(&self);
    fn on_finger_up(&self);
}

/// Finger events forwarded out of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FingerEvent {
    Down,
    Up,
}

/// Callback that forwards finger events onto a tokio channel, for the D-Bus
/// signal emission task.
pub struct ChannelCallback {
    tx: mpsc::Sender<FingerEvent>,
}

impl ChannelCallback {
    pub fn new(tx: mpsc::Sender<FingerEvent>) -> Self {
        Self { tx }
    }

    fn forward(&self, event: FingerEvent) {
        if let Err(e) = self.tx.try_send(event) {
            tracing::warn!(?event, error = %e, "Dropped finger event, channel unavailable");
        }
    }
}

impl FodCallback for ChannelCallback {
    fn on_finger_down(&self) {
        self.forward(FingerEvent::Down);
    }

    fn on_finger_up(&self) {
        self.forward(FingerEvent::Up);
    }
}

// ============================================================================
// Engine
// ============================================================================

/// FOD engine state. Single concurrent caller per device; the callback has
/// its own lock so registration and invocation never interleave.
pub struct FodEngine<B: ControlBus> {
    bus: B,
    config: FodConfig,
    vendor: Option<VendorLink>,
    /// Whether the FOD circle is currently shown by the system UI.
    circle_visible: bool,
    callback: Mutex<Option<Box<dyn FodCallback>>>,
}

impl<B: ControlBus> FodEngine<B> {
    pub fn new(bus: B, config: FodConfig, vendor: Option<VendorLink>) -> Self {
        Self {
            bus,
            config,
            vendor,
            circle_visible: false,
            callback: Mutex::new(None),
        }
    }

    fn update_status(&self, code: i32) {
        if let Some(vendor) = &self.vendor {
            vendor.update_status(code);
        }
    }

    fn set_display_mode(&self, feature: i32, value: i32) {
        if let Some(vendor) = &self.vendor {
            vendor.set_mode(feature, value);
        }
    }

    /// Enrollment is starting: drop long-press handling and resume enroll.
    pub fn on_start_enroll(&self) {
        self.update_status(fp_op::DISABLE_LONGPRESS);
        self.update_status(fp_op::RESUME_ENROLL);
    }

    /// Enrollment finished.
    pub fn on_finish_enroll(&self) {
        self.update_status(fp_op::FINISH_ENROLL);
    }

    /// Finger pressed on the sensor area: arm AOD/dim and illuminate.
    pub fn on_press(&self) {
        self.set_display_mode(display_op::AOD_MODE, 2);
        self.set_display_mode(display_op::SET_DIM, 1);
        if self.config.illumination == IlluminationDriver::Sysfs {
            self.bus.write(panel::FOD_ILLUMINATION, 1);
        }
        self.set_display_mode(display_op::NOTIFY_PRESS, 1);
    }

    /// Finger lifted: tear down everything `on_press` armed.
    pub fn on_release(&self) {
        self.set_display_mode(display_op::AOD_MODE, 0);
        self.set_display_mode(display_op::SET_DIM, 0);
        if self.config.illumination == IlluminationDriver::Sysfs {
            self.bus.write(panel::FOD_ILLUMINATION, 0);
        }
        self.set_display_mode(display_op::NOTIFY_PRESS, 0);
    }

    /// The system UI is showing the FOD circle.
    pub fn on_show_fod_view(&mut self) {
        self.circle_visible = true;
    }

    /// The FOD circle went away; release any press state still armed.
    pub fn on_hide_fod_view(&mut self) {
        self.circle_visible = false;
        self.on_release();
    }

    /// Classify an acquired event. Returns true when the event was consumed
    /// as a finger down/up detection.
    pub fn handle_acquired(&self, acquired_info: i32, vendor_code: i32) -> bool {
        let guard = match self.callback.lock() {
            Ok(guard) => guard,
            Err(e) => {
                tracing::error!(error = %e, "Callback lock poisoned");
                return false;
            }
        };
        let Some(callback) = guard.as_ref() else {
            return false;
        };

        if acquired_info == ACQUIRED_VENDOR {
            if self.circle_visible && vendor_code == 0 {
                callback.on_finger_down();
                return true;
            }
            if self.circle_visible && vendor_code == 1 {
                callback.on_finger_up();
                return true;
            }
        }

        false
    }

    /// Whether an error event belongs to the sensor's own vendor channel.
    pub fn handle_error(&self, error: i32, vendor_code: i32) -> bool {
        error == ERROR_VENDOR && vendor_code == 6
    }

    /// Toggle long-press detection in the vendor fingerprint service.
    pub fn set_long_press_enabled(&self, enabled: bool) {
        self.update_status(if enabled {
            fp_op::ENABLE_LONGPRESS
        } else {
            fp_op::DISABLE_LONGPRESS
        });
    }

    /// Dim alpha to composite over the screen right now.
    ///
    /// Derived from the live panel brightness, except in high-brightness
    /// mode where a fixed alpha applies unconditionally.
    pub fn dim_amount(&self) -> i32 {
        let brightness = self.bus.read_i32(panel::BRIGHTNESS, 0);
        let mut dim_amount = brightness_to_alpha(brightness);
        if self.bus.read_i32(panel::HBM_MODE, 0) == HBM_DIM_SENTINEL {
            dim_amount = HBM_DIM_ALPHA;
        }
        tracing::info!(dim_amount, "dimAmount");

        dim_amount
    }

    /// Whether the system UI must boost panel brightness for the sensor.
    /// True exactly when the panel lacks a sysfs illumination node.
    pub fn should_boost_brightness(&self) -> bool {
        self.config.illumination != IlluminationDriver::Sysfs
    }

    /// Register (or clear) the finger event callback. Registration is its
    /// own critical section; an in-flight invocation never observes a
    /// half-written reference.
    pub fn set_callback(&self, callback: Option<Box<dyn FodCallback>>) {
        match self.callback.lock() {
            Ok(mut guard) => *guard = callback,
            Err(e) => tracing::error!(error = %e, "Callback lock poisoned"),
        }
    }

    /// Sensor center X on the panel.
    pub fn position_x(&self) -> i32 {
        self.config.position_x
    }

    /// Sensor center Y on the panel.
    pub fn position_y(&self) -> i32 {
        self.config.position_y
    }

    /// Sensor illumination circle diameter.
    pub fn size(&self) -> i32 {
        self.config.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hwio::testing::RecordingBus;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingCallback {
        downs: Arc<AtomicUsize>,
        ups: Arc<AtomicUsize>,
    }

    impl FodCallback for CountingCallback {
        fn on_finger_down(&self) {
            self.downs.fetch_add(1, Ordering::SeqCst);
        }
        fn on_finger_up(&self) {
            self.ups.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn new_engine(config: FodConfig) -> (Arc<RecordingBus>, FodEngine<Arc<RecordingBus>>) {
        let bus = RecordingBus::new();
        let engine = FodEngine::new(bus.clone(), config, None);
        (bus, engine)
    }

    fn counting_engine() -> (
        FodEngine<Arc<RecordingBus>>,
        Arc<AtomicUsize>,
        Arc<AtomicUsize>,
    ) {
        let (_bus, engine) = new_engine(FodConfig::default());
        let downs = Arc::new(AtomicUsize::new(0));
        let ups = Arc::new(AtomicUsize::new(0));
        engine.set_callback(Some(Box::new(CountingCallback {
            downs: downs.clone(),
            ups: ups.clone(),
        })));
        (engine, downs, ups)
    }

    #[test]
    fn test_dim_amount_follows_brightness() {
        let (bus, engine) = new_engine(FodConfig::default());
        bus.set_read(panel::BRIGHTNESS, 100);
        assert_eq!(engine.dim_amount(), 0xb9);
    }

    #[test]
    fn test_dim_amount_defaults_to_floor_on_read_failure() {
        // No canned read: the bus falls back to 0, which clamps to 0xff.
        let (_bus, engine) = new_engine(FodConfig::default());
        assert_eq!(engine.dim_amount(), 0xff);
    }

    #[test]
    fn test_hbm_sentinel_overrides_dim_amount() {
        let (bus, engine) = new_engine(FodConfig::default());
        bus.set_read(panel::BRIGHTNESS, 100);
        bus.set_read(panel::HBM_MODE, 5);
        assert_eq!(engine.dim_amount(), 42);

        // Any other mode value leaves the curve result alone.
        bus.set_read(panel::HBM_MODE, 1);
        assert_eq!(engine.dim_amount(), 0xb9);
    }

    #[test]
    fn test_handle_error_classification() {
        let (_bus, engine) = new_engine(FodConfig::default());
        assert!(engine.handle_error(8, 6));
        assert!(!engine.handle_error(8, 0));
        assert!(!engine.handle_error(6, 6));
    }

    #[test]
    fn test_handle_acquired_without_callback() {
        let (_bus, mut engine) = new_engine(FodConfig::default());
        engine.on_show_fod_view();
        assert!(!engine.handle_acquired(6, 0));
    }

    #[test]
    fn test_handle_acquired_dispatch() {
        let (mut engine, downs, ups) = counting_engine();

        // Circle hidden: detections are not consumed.
        assert!(!engine.handle_acquired(6, 0));
        assert_eq!(downs.load(Ordering::SeqCst), 0);

        engine.on_show_fod_view();
        assert!(engine.handle_acquired(6, 0));
        assert!(engine.handle_acquired(6, 1));
        assert_eq!(downs.load(Ordering::SeqCst), 1);
        assert_eq!(ups.load(Ordering::SeqCst), 1);

        // Wrong acquired-info or vendor code: ignored.
        assert!(!engine.handle_acquired(5, 0));
        assert!(!engine.handle_acquired(6, 2));

        engine.on_hide_fod_view();
        assert!(!engine.handle_acquired(6, 0));
        assert_eq!(downs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cleared_callback_is_never_invoked() {
        let (mut engine, downs, _ups) = counting_engine();
        engine.on_show_fod_view();
        engine.set_callback(None);
        assert!(!engine.handle_acquired(6, 0));
        assert_eq!(downs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_press_release_illumination_sysfs_build() {
        let config = FodConfig {
            illumination: IlluminationDriver::Sysfs,
            ..FodConfig::default()
        };
        let (bus, engine) = new_engine(config);

        engine.on_press();
        assert_eq!(
            bus.writes(),
            vec![(panel::FOD_ILLUMINATION.to_string(), "1".to_string())]
        );

        bus.clear();
        engine.on_release();
        assert_eq!(
            bus.writes(),
            vec![(panel::FOD_ILLUMINATION.to_string(), "0".to_string())]
        );
    }

    #[test]
    fn test_press_boost_build_never_touches_sysfs() {
        let (bus, engine) = new_engine(FodConfig::default());
        engine.on_press();
        engine.on_release();
        assert!(bus.writes().is_empty());
    }

    #[test]
    fn test_should_boost_brightness_mirrors_driver_choice() {
        let (_bus, engine) = new_engine(FodConfig::default());
        assert!(engine.should_boost_brightness());

        let config = FodConfig {
            illumination: IlluminationDriver::Sysfs,
            ..FodConfig::default()
        };
        let (_bus, engine) = new_engine(config);
        assert!(!engine.should_boost_brightness());
    }

    #[test]
    fn test_position_and_size_come_from_config() {
        let (_bus, engine) = new_engine(FodConfig::default());
        assert_eq!(engine.position_x(), 444);
        assert_eq!(engine.position_y(), 1966);
        assert_eq!(engine.size(), 190);
    }

    #[tokio::test]
    async fn test_channel_callback_forwards_events() {
        let (tx, mut rx) = mpsc::channel(8);
        let (_bus, mut engine) = new_engine(FodConfig::default());
        engine.set_callback(Some(Box::new(ChannelCallback::new(tx))));
        engine.on_show_fod_view();

        assert!(engine.handle_acquired(6, 0));
        assert!(engine.handle_acquired(6, 1));

        assert_eq!(rx.recv().await, Some(FingerEvent::Down));
        assert_eq!(rx.recv().await, Some(FingerEvent::Up));
    }
}
