//! Brightness to dim-alpha mapping
//!
//! The panel calibration is a sparse 21-entry lookup table; values between
//! entries are filled in by a blend that is deliberately *not* plain linear
//! interpolation. `interpolate` reproduces the legacy integer arithmetic
//! exactly, truncation order included, because the downstream display
//! calibration depends on its exact output. Do not "fix" it.

/// One calibration point: panel brightness and the dim-alpha to composite
/// over the screen at that brightness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrightnessAlpha {
    pub brightness: i32,
    pub alpha: i32,
}

const fn ba(brightness: i32, alpha: i32) -> BrightnessAlpha {
    BrightnessAlpha { brightness, alpha }
}

/// Panel calibration table. Strictly ascending brightness.
pub const BRIGHTNESS_ALPHA_LUT: [BrightnessAlpha; 21] = [
    ba(0, 0xff),
    ba(1, 0xf1),
    ba(2, 0xf0),
    ba(3, 0xee),
    ba(4, 0xec),
    ba(6, 0xeb),
    ba(10, 0xe7),
    ba(20, 0xdf),
    ba(30, 0xd8),
    ba(45, 0xd0),
    ba(70, 0xc5),
    ba(100, 0xb9),
    ba(150, 0xaf),
    ba(227, 0x99),
    ba(300, 0x88),
    ba(400, 0x76),
    ba(500, 0x66),
    ba(600, 0x59),
    ba(800, 0x42),
    ba(1023, 0x2a),
    ba(2000, 0x83),
];

/// Legacy blend between two calibration points.
///
/// `bf` carries twice the linear delta so the remainder bit (`plus`) can
/// nudge odd steps; `sub` adds a curvature correction. Both divisions in the
/// `sub` term truncate separately and must stay in this order.
fn interpolate(x: i32, xa: i32, xb: i32, ya: i32, yb: i32) -> i32 {
    let bf = 2 * (yb - ya) * (x - xa) / (xb - xa);
    let factor = bf / 2;
    let plus = bf % 2;
    let mut sub = 0;
    if (xa - xb) != 0 && (yb - ya) != 0 {
        sub = 2 * (x - xa) * (x - xb) / (yb - ya) / (xa - xb);
    }

    ya + factor + plus + sub
}

/// Map a brightness reading onto `table`, clamping below the first and at or
/// above the last entry.
pub fn alpha_from_table(table: &[BrightnessAlpha], brightness: i32) -> i32 {
    let level = table.len();
    let i = table
        .iter()
        .position(|entry| entry.brightness >= brightness)
        .unwrap_or(level);

    if level == 0 {
        return 0;
    }
    if i == 0 {
        return table[0].alpha;
    }
    if i == level {
        return table[level - 1].alpha;
    }

    interpolate(
        brightness,
        table[i - 1].brightness,
        table[i].brightness,
        table[i - 1].alpha,
        table[i].alpha,
    )
}

/// Map a panel brightness reading to its dim-alpha via the calibration table.
pub fn brightness_to_alpha(brightness: i32) -> i32 {
    alpha_from_table(&BRIGHTNESS_ALPHA_LUT, brightness)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_strictly_ascending() {
        for pair in BRIGHTNESS_ALPHA_LUT.windows(2) {
            assert!(pair[0].brightness < pair[1].brightness);
        }
    }

    #[test]
    fn test_floor_clamp() {
        assert_eq!(brightness_to_alpha(-5), 0xff);
        assert_eq!(brightness_to_alpha(0), 0xff);
    }

    #[test]
    fn test_ceiling_clamp() {
        // 2000 is the last table brightness: it still qualifies as its own
        // upper bound, so the scan interpolates with x == xb and lands
        // exactly on the last alpha.
        assert_eq!(brightness_to_alpha(2000), 0x83);
        assert_eq!(brightness_to_alpha(5000), 0x83);
    }

    #[test]
    fn test_exact_entry_via_scan() {
        // An exact table brightness is found as the upper bound and
        // interpolated from the previous entry; the blend must land on the
        // entry's own alpha.
        assert_eq!(brightness_to_alpha(100), 0xb9);
        assert_eq!(brightness_to_alpha(1023), 0x2a);
        assert_eq!(brightness_to_alpha(1), 0xf1);
    }

    #[test]
    fn test_interior_truncation_artifacts() {
        // brightness 5 sits between (4, 0xec) and (6, 0xeb): bf = -1 gives
        // factor 0, plus -1, and the curvature term contributes another -1.
        assert_eq!(brightness_to_alpha(5), 0xea);
        // brightness 50 between (45, 0xd0) and (70, 0xc5).
        assert_eq!(brightness_to_alpha(50), 0xce);
    }

    #[test]
    fn test_degenerate_tables() {
        assert_eq!(alpha_from_table(&[], 100), 0);
        let single = [ba(50, 0x42)];
        assert_eq!(alpha_from_table(&single, -10), 0x42);
        assert_eq!(alpha_from_table(&single, 50), 0x42);
        assert_eq!(alpha_from_table(&single, 5000), 0x42);
    }

    #[test]
    fn test_interpolate_zero_offset_returns_lower_alpha() {
        // t == 0 must collapse every term.
        assert_eq!(interpolate(45, 45, 70, 0xd0, 0xc5), 0xd0);
    }
}
