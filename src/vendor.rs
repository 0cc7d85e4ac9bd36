//! Vendor service proxies
//!
//! The FOD engine talks to two platform services owned by the vendor blob:
//! the fingerprint extension service (enrollment and long-press status
//! codes) and the display service (AOD/dim mode toggles on press). Both are
//! fire-and-forget from this daemon's point of view: calls block briefly and
//! failures are logged, never propagated.

use zbus::proxy;

/// Status codes accepted by the vendor fingerprint extension service.
pub mod fp_op {
    pub const ENABLE_LONGPRESS: i32 = 3;
    pub const DISABLE_LONGPRESS: i32 = 4;
    pub const RESUME_ENROLL: i32 = 8;
    pub const FINISH_ENROLL: i32 = 10;
}

/// Display features accepted by the vendor display service.
pub mod display_op {
    pub const AOD_MODE: i32 = 8;
    pub const NOTIFY_PRESS: i32 = 9;
    pub const SET_DIM: i32 = 10;
}

/// Vendor fingerprint extension service.
#[proxy(
    interface = "vendor.fingerprint.Extensions",
    default_service = "vendor.fingerprint",
    default_path = "/vendor/fingerprint"
)]
pub trait VendorFingerprint {
    /// Push a fingerprint status code. Fire-and-forget.
    fn update_status(&self, code: i32) -> zbus::Result<()>;
}

/// Vendor display mode service.
#[proxy(
    interface = "vendor.display.Panel",
    default_service = "vendor.display",
    default_path = "/vendor/display"
)]
pub trait VendorDisplay {
    /// Toggle a display feature. Fire-and-forget.
    fn set_mode(&self, feature: i32, value: i32) -> zbus::Result<()>;
}

/// Blocking handles to both vendor services.
///
/// Every remote call is expected to complete near-instantly; a failed call
/// is logged at warn and dropped, matching the hardware-write discipline.
pub struct VendorLink {
    fingerprint: VendorFingerprintProxyBlocking<'static>,
    display: VendorDisplayProxyBlocking<'static>,
}

impl VendorLink {
    /// Connect to both vendor services on the system bus.
    pub fn connect() -> zbus::Result<Self> {
        let connection = zbus::blocking::Connection::system()?;
        let fingerprint = VendorFingerprintProxyBlocking::new(&connection)?;
        let display = VendorDisplayProxyBlocking::new(&connection)?;
        Ok(Self {
            fingerprint,
            display,
        })
    }

    /// Push a fingerprint status code to the vendor service.
    pub fn update_status(&self, code: i32) {
        if let Err(e) = self.fingerprint.update_status(code) {
            tracing::warn!(code, error = %e, "Vendor fingerprint updateStatus failed");
        }
    }

    /// Toggle a vendor display feature.
    pub fn set_mode(&self, feature: i32, value: i32) {
        if let Err(e) = self.display.set_mode(feature, value) {
            tracing::warn!(feature, value, error = %e, "Vendor display setMode failed");
        }
    }
}
