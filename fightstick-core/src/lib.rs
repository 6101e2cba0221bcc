//! Shared input-core logic for the Switch fightstick.
//!
//! This crate is `no_std`-compatible so it can be used by both the AVR
//! firmware and the native CLI tool. It holds everything that is pure state
//! and arithmetic: the matrix bit-set type, the debounce engine, the key
//! table, and the HID report builder. The hardware-facing halves (GPIO,
//! timer, USB) live in the firmware crate.

#![cfg_attr(not(test), no_std)]
#![allow(dead_code)]

pub mod debounce;
pub mod report;

pub use debounce::{BounceEvent, Debouncer};
pub use report::PadReport;

/// Number of rows in the switch matrix.
pub const MATRIX_ROWS: usize = 3;
/// Number of columns in the switch matrix.
pub const MATRIX_COLS: usize = 10;

/// One row of the matrix as a fixed-width bit-set: bit `c` set means the
/// switch at column `c` is closed. Only the low [`MATRIX_COLS`] bits are
/// meaningful; constructors mask the rest off.
#[derive(Copy, Clone, PartialEq, Eq, Default, Debug)]
pub struct RowBits(u16);

impl RowBits {
    pub const WIDTH: usize = MATRIX_COLS;
    const MASK: u16 = (1 << Self::WIDTH) - 1;

    pub const EMPTY: RowBits = RowBits(0);

    /// Build from raw column readings, discarding bits beyond the matrix width.
    pub const fn from_bits(bits: u16) -> Self {
        RowBits(bits & Self::MASK)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn get(self, col: usize) -> bool {
        self.0 & (1 << col) != 0
    }

    pub const fn with(self, col: usize) -> Self {
        RowBits::from_bits(self.0 | (1 << col))
    }

    /// Bits that differ between two readings of the same row.
    pub const fn delta(self, other: RowBits) -> RowBits {
        RowBits(self.0 ^ other.0)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// The committed, debounced matrix — one [`RowBits`] per row.
pub type Matrix = [RowBits; MATRIX_ROWS];

/// The sixteen logical controls of the pad, in report evaluation order.
///
/// Directions come first and map to stick-axis extremes, not the HAT; within
/// an axis the later entry wins when both directions are held (Down over Up,
/// Right over Left). That mirrors the original board's behavior and is kept
/// as-is rather than resolved to neutral.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    X,
    B,
    Y,
    A,
    R,
    L,
    Zr,
    Zl,
    Capture,
    Home,
    Minus,
    Plus,
}

pub const KEY_COUNT: usize = 16;

impl Key {
    pub const ALL: [Key; KEY_COUNT] = [
        Key::Up,
        Key::Down,
        Key::Left,
        Key::Right,
        Key::X,
        Key::B,
        Key::Y,
        Key::A,
        Key::R,
        Key::L,
        Key::Zr,
        Key::Zl,
        Key::Capture,
        Key::Home,
        Key::Minus,
        Key::Plus,
    ];

    /// Matrix coordinate `(row, col)` of this key's switch.
    ///
    /// This is the physical wiring of the stick's button board and is fixed;
    /// there is no remapping layer.
    pub const fn position(self) -> (usize, usize) {
        match self {
            Key::Up => (2, 2),
            Key::Down => (1, 2),
            Key::Left => (1, 1),
            Key::Right => (1, 3),
            Key::X => (2, 7),
            Key::B => (1, 6),
            Key::Y => (2, 6),
            Key::A => (1, 7),
            Key::R => (1, 8),
            Key::L => (2, 8),
            Key::Zr => (1, 9),
            Key::Zl => (2, 9),
            Key::Capture => (0, 4),
            Key::Home => (0, 5),
            Key::Minus => (1, 4),
            Key::Plus => (1, 5),
        }
    }

    const fn index(self) -> usize {
        self as usize
    }

    /// Display name for diagnostics and the CLI.
    pub fn name(self) -> &'static str {
        match self {
            Key::Up => "Up",
            Key::Down => "Down",
            Key::Left => "Left",
            Key::Right => "Right",
            Key::X => "X",
            Key::B => "B",
            Key::Y => "Y",
            Key::A => "A",
            Key::R => "R",
            Key::L => "L",
            Key::Zr => "ZR",
            Key::Zl => "ZL",
            Key::Capture => "Capture",
            Key::Home => "Home",
            Key::Minus => "Minus",
            Key::Plus => "Plus",
        }
    }
}

/// Per-key pressed flags, projected from a stable matrix each cycle and
/// discarded after the report is built.
#[derive(Copy, Clone, Default, Debug)]
pub struct KeyFlags(u16);

impl KeyFlags {
    pub fn from_matrix(matrix: &Matrix) -> Self {
        let mut flags = 0u16;
        for key in Key::ALL {
            let (row, col) = key.position();
            if matrix[row].get(col) {
                flags |= 1 << key.index();
            }
        }
        KeyFlags(flags)
    }

    pub fn pressed(self, key: Key) -> bool {
        self.0 & (1 << key.index()) != 0
    }

    pub fn any(self) -> bool {
        self.0 != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_bits_masks_out_of_width_bits() {
        let row = RowBits::from_bits(0xFFFF);
        assert_eq!(row.bits(), (1 << MATRIX_COLS) - 1);
        assert!(!RowBits::EMPTY.get(MATRIX_COLS - 1));
    }

    #[test]
    fn row_bits_delta_is_xor() {
        let a = RowBits::from_bits(0b0000_0110);
        let b = RowBits::from_bits(0b0000_0011);
        assert_eq!(a.delta(b).bits(), 0b0000_0101);
        assert!(a.delta(a).is_empty());
    }

    #[test]
    fn key_positions_are_unique_and_in_bounds() {
        for (i, a) in Key::ALL.iter().enumerate() {
            let (row, col) = a.position();
            assert!(row < MATRIX_ROWS, "{} row out of bounds", a.name());
            assert!(col < MATRIX_COLS, "{} col out of bounds", a.name());
            for b in &Key::ALL[i + 1..] {
                assert_ne!(a.position(), b.position(), "{} and {} collide", a.name(), b.name());
            }
        }
    }

    #[test]
    fn key_flags_project_single_switch() {
        for key in Key::ALL {
            let (row, col) = key.position();
            let mut matrix = [RowBits::EMPTY; MATRIX_ROWS];
            matrix[row] = matrix[row].with(col);

            let flags = KeyFlags::from_matrix(&matrix);
            for other in Key::ALL {
                assert_eq!(flags.pressed(other), other == key);
            }
        }
    }
}
