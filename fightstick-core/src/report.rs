//! HID report assembly.
//!
//! The pad speaks the Pokken Tournament Pro Pad wire format: a 16-bit button
//! mask, a HAT nibble, four 8-bit stick axes, and one vendor byte — 8 bytes
//! per report. Directions are reported on the left stick, not the HAT; the
//! HAT stays centered.

use crate::{Key, KeyFlags, Matrix};

/// Switch button masks, as the console expects them in the report's
/// button field.
pub mod buttons {
    pub const Y: u16 = 0x0001;
    pub const B: u16 = 0x0002;
    pub const A: u16 = 0x0004;
    pub const X: u16 = 0x0008;
    pub const L: u16 = 0x0010;
    pub const R: u16 = 0x0020;
    pub const ZL: u16 = 0x0040;
    pub const ZR: u16 = 0x0080;
    pub const MINUS: u16 = 0x0100;
    pub const PLUS: u16 = 0x0200;
    pub const LCLICK: u16 = 0x0400;
    pub const RCLICK: u16 = 0x0800;
    pub const HOME: u16 = 0x1000;
    pub const CAPTURE: u16 = 0x2000;
}

pub const STICK_MIN: u8 = 0x00;
pub const STICK_CENTER: u8 = 0x80;
pub const STICK_MAX: u8 = 0xFF;
/// HAT nibble meaning "no direction".
pub const HAT_CENTER: u8 = 0x08;

/// Size of the report on the wire.
pub const REPORT_LEN: usize = 8;

/// One input report in host byte order.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct PadReport {
    pub buttons: u16,
    pub hat: u8,
    pub lx: u8,
    pub ly: u8,
    pub rx: u8,
    pub ry: u8,
    pub vendor: u8,
}

impl PadReport {
    /// All sticks centered, HAT centered, no buttons.
    pub const fn neutral() -> Self {
        Self {
            buttons: 0,
            hat: HAT_CENTER,
            lx: STICK_CENTER,
            ly: STICK_CENTER,
            rx: STICK_CENTER,
            ry: STICK_CENTER,
            vendor: 0,
        }
    }

    /// Wire layout: buttons little-endian, then HAT, LX, LY, RX, RY, vendor.
    pub fn as_bytes(&self) -> [u8; REPORT_LEN] {
        let [b0, b1] = self.buttons.to_le_bytes();
        [b0, b1, self.hat, self.lx, self.ly, self.rx, self.ry, self.vendor]
    }

    pub fn from_bytes(bytes: &[u8; REPORT_LEN]) -> Self {
        Self {
            buttons: u16::from_le_bytes([bytes[0], bytes[1]]),
            hat: bytes[2],
            lx: bytes[3],
            ly: bytes[4],
            rx: bytes[5],
            ry: bytes[6],
            vendor: bytes[7],
        }
    }
}

impl Default for PadReport {
    fn default() -> Self {
        Self::neutral()
    }
}

/// Build a report from the stable matrix.
///
/// Flags are applied in [`Key::ALL`] order: buttons OR their mask into the
/// button field, directions overwrite a left-stick axis byte with an extreme.
/// Held opposite directions are not cancelled — the later flag wins.
pub fn build(stable: &Matrix) -> PadReport {
    let keys = KeyFlags::from_matrix(stable);
    let mut report = PadReport::neutral();

    for key in Key::ALL {
        if keys.pressed(key) {
            apply(key, &mut report);
        }
    }
    report
}

fn apply(key: Key, report: &mut PadReport) {
    match key {
        Key::Up => report.ly = STICK_MIN,
        Key::Down => report.ly = STICK_MAX,
        Key::Left => report.lx = STICK_MIN,
        Key::Right => report.lx = STICK_MAX,
        Key::X => report.buttons |= buttons::X,
        Key::B => report.buttons |= buttons::B,
        Key::Y => report.buttons |= buttons::Y,
        Key::A => report.buttons |= buttons::A,
        Key::R => report.buttons |= buttons::R,
        Key::L => report.buttons |= buttons::L,
        Key::Zr => report.buttons |= buttons::ZR,
        Key::Zl => report.buttons |= buttons::ZL,
        Key::Capture => report.buttons |= buttons::CAPTURE,
        Key::Home => report.buttons |= buttons::HOME,
        Key::Minus => report.buttons |= buttons::MINUS,
        Key::Plus => report.buttons |= buttons::PLUS,
    }
}

/// Button mask a key contributes, or 0 for the stick directions.
pub fn button_mask(key: Key) -> u16 {
    let mut probe = PadReport::neutral();
    apply(key, &mut probe);
    probe.buttons
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RowBits, MATRIX_ROWS};

    fn matrix_with_key(key: Key) -> Matrix {
        let (row, col) = key.position();
        let mut m = [RowBits::EMPTY; MATRIX_ROWS];
        m[row] = m[row].with(col);
        m
    }

    #[test]
    fn all_zero_matrix_builds_neutral_report() {
        let report = build(&[RowBits::EMPTY; MATRIX_ROWS]);
        assert_eq!(report, PadReport::neutral());
        assert_eq!(report.buttons, 0);
        assert_eq!(report.hat, HAT_CENTER);
        assert_eq!(report.lx, STICK_CENTER);
        assert_eq!(report.ly, STICK_CENTER);
        assert_eq!(report.rx, STICK_CENTER);
        assert_eq!(report.ry, STICK_CENTER);
    }

    #[test]
    fn each_button_maps_to_exactly_its_own_bit() {
        for key in Key::ALL {
            let mask = button_mask(key);
            if mask == 0 {
                continue; // stick direction, covered below
            }
            let report = build(&matrix_with_key(key));
            assert_eq!(report.buttons, mask, "cross-talk on {}", key.name());
            // Sticks stay untouched by plain buttons.
            assert_eq!(report.lx, STICK_CENTER);
            assert_eq!(report.ly, STICK_CENTER);
        }
    }

    #[test]
    fn directions_drive_left_stick_extremes() {
        let up = build(&matrix_with_key(Key::Up));
        assert_eq!((up.lx, up.ly), (STICK_CENTER, STICK_MIN));

        let down = build(&matrix_with_key(Key::Down));
        assert_eq!((down.lx, down.ly), (STICK_CENTER, STICK_MAX));

        let left = build(&matrix_with_key(Key::Left));
        assert_eq!((left.lx, left.ly), (STICK_MIN, STICK_CENTER));

        let right = build(&matrix_with_key(Key::Right));
        assert_eq!((right.lx, right.ly), (STICK_MAX, STICK_CENTER));

        // None of them touch buttons or the HAT.
        for r in [up, down, left, right] {
            assert_eq!(r.buttons, 0);
            assert_eq!(r.hat, HAT_CENTER);
        }
    }

    #[test]
    fn opposite_directions_resolve_by_evaluation_order() {
        // Up and Down held together: Down is applied later and wins. This is
        // the board's historical behavior, not a neutral-cancel.
        let mut m = matrix_with_key(Key::Up);
        let (row, col) = Key::Down.position();
        m[row] = m[row].with(col);
        assert_eq!(build(&m).ly, STICK_MAX);

        let mut m = matrix_with_key(Key::Left);
        let (row, col) = Key::Right.position();
        m[row] = m[row].with(col);
        assert_eq!(build(&m).lx, STICK_MAX);
    }

    #[test]
    fn chord_combines_masks_and_axes() {
        let mut m = matrix_with_key(Key::A);
        for key in [Key::Zr, Key::Up] {
            let (row, col) = key.position();
            m[row] = m[row].with(col);
        }
        let report = build(&m);
        assert_eq!(report.buttons, buttons::A | buttons::ZR);
        assert_eq!(report.ly, STICK_MIN);
    }

    #[test]
    fn wire_layout_is_buttons_le_then_hat_then_axes() {
        let report = PadReport {
            buttons: buttons::HOME | buttons::Y,
            hat: HAT_CENTER,
            lx: 0x11,
            ly: 0x22,
            rx: 0x33,
            ry: 0x44,
            vendor: 0,
        };
        let bytes = report.as_bytes();
        assert_eq!(bytes, [0x01, 0x10, 0x08, 0x11, 0x22, 0x33, 0x44, 0x00]);
        assert_eq!(PadReport::from_bytes(&bytes), report);
    }
}
