//! Switch matrix scanning.
//!
//! The button board is a 3×10 diode-less matrix wired straight to the Teensy:
//!
//!   Row selects (driven low to scan): PB3, PB1, PB6
//!   Column reads (input w/ pull-up):  PD3, PD2, PD1, PD0, PD4,
//!                                     PC6, PD7, PE6, PB4, PB5  → bits 0..9
//!
//! Columns are active low: a closed switch pulls the column to the selected
//! row's low level, so an electrically low read becomes a set bit.

use avr_device::atmega32u4::Peripherals;

use fightstick_core::{Matrix, RowBits, MATRIX_ROWS};

/// Row-select pins on PORTB (PB1, PB3, PB6).
const ROW_MASK_B: u8 = 0b0100_1010;

/// Configure the matrix pins: rows Hi-Z, columns input with pull-up.
pub fn init(dp: &Peripherals) {
    unselect_rows(dp);

    // PD0-PD4, PD7: input with pull-up
    dp.PORTD.ddrd.modify(|r, w| unsafe { w.bits(r.bits() & !0x9F) });
    dp.PORTD.portd.modify(|r, w| unsafe { w.bits(r.bits() | 0x9F) });
    // PC6: input with pull-up
    dp.PORTC.ddrc.modify(|r, w| unsafe { w.bits(r.bits() & !0x40) });
    dp.PORTC.portc.modify(|r, w| unsafe { w.bits(r.bits() | 0x40) });
    // PE6: input with pull-up
    dp.PORTE.ddre.modify(|r, w| unsafe { w.bits(r.bits() & !0x40) });
    dp.PORTE.porte.modify(|r, w| unsafe { w.bits(r.bits() | 0x40) });
    // PB4, PB5: input with pull-up
    dp.PORTB.ddrb.modify(|r, w| unsafe { w.bits(r.bits() & !0x30) });
    dp.PORTB.portb.modify(|r, w| unsafe { w.bits(r.bits() | 0x30) });
}

/// Scan the whole matrix once.
///
/// Selects each row in turn, lets the lines settle, samples the columns, and
/// deselects before moving on. All rows are back in Hi-Z when this returns.
/// No history is kept here; debouncing happens downstream.
pub fn scan(dp: &Peripherals) -> Matrix {
    let mut rows = [RowBits::EMPTY; MATRIX_ROWS];

    for (row, bits) in rows.iter_mut().enumerate() {
        select_row(dp, row);
        settle();
        *bits = read_cols(dp);
        unselect_rows(dp);
    }

    rows
}

/// Sample all ten column pins into one row value (active low → bit set).
fn read_cols(dp: &Peripherals) -> RowBits {
    let pinb = dp.PORTB.pinb.read().bits();
    let pinc = dp.PORTC.pinc.read().bits();
    let pind = dp.PORTD.pind.read().bits();
    let pine = dp.PORTE.pine.read().bits();

    let mut bits = 0u16;
    if pind & (1 << 3) == 0 {
        bits |= 1 << 0;
    }
    if pind & (1 << 2) == 0 {
        bits |= 1 << 1;
    }
    if pind & (1 << 1) == 0 {
        bits |= 1 << 2;
    }
    if pind & (1 << 0) == 0 {
        bits |= 1 << 3;
    }
    if pind & (1 << 4) == 0 {
        bits |= 1 << 4;
    }
    if pinc & (1 << 6) == 0 {
        bits |= 1 << 5;
    }
    if pind & (1 << 7) == 0 {
        bits |= 1 << 6;
    }
    if pine & (1 << 6) == 0 {
        bits |= 1 << 7;
    }
    if pinb & (1 << 4) == 0 {
        bits |= 1 << 8;
    }
    if pinb & (1 << 5) == 0 {
        bits |= 1 << 9;
    }

    RowBits::from_bits(bits)
}

/// Drive one row-select pin low (output). The other rows stay Hi-Z so a
/// second closed switch on the same column cannot short two driven rows.
fn select_row(dp: &Peripherals, row: usize) {
    let portb = &dp.PORTB;
    let mask: u8 = match row {
        0 => 1 << 3,
        1 => 1 << 1,
        2 => 1 << 6,
        _ => return,
    };
    portb.ddrb.modify(|r, w| unsafe { w.bits(r.bits() | mask) });
    portb.portb.modify(|r, w| unsafe { w.bits(r.bits() & !mask) });
}

/// Return every row-select pin to Hi-Z (input, no pull-up).
fn unselect_rows(dp: &Peripherals) {
    let portb = &dp.PORTB;
    portb.ddrb.modify(|r, w| unsafe { w.bits(r.bits() & !ROW_MASK_B) });
    portb.portb.modify(|r, w| unsafe { w.bits(r.bits() & !ROW_MASK_B) });
}

/// ~1 µs settle after selecting a row, comfortably above the matrix RC time.
#[inline(always)]
fn settle() {
    for _ in 0..16u8 {
        unsafe { core::arch::asm!("nop") };
    }
}
