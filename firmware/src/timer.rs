//! Free-running millisecond tick counter on Timer/Counter 0.
//!
//! TC0 runs in CTC mode with a 1 ms compare period; the ISR increments a
//! wrapping `u16`. The debouncer only needs monotonicity modulo wrap, so the
//! ~65 s rollover is harmless as long as elapsed times use wrapping
//! subtraction.

use core::cell::Cell;

use avr_device::atmega32u4::Peripherals;
use avr_device::interrupt::{self, Mutex};

static TICKS: Mutex<Cell<u16>> = Mutex::new(Cell::new(0));

/// Start the 1 ms tick. Enables global interrupts.
pub fn init(dp: &Peripherals) {
    let tc0 = &dp.TC0;

    // CTC mode, clk/64: 16 MHz / 64 / 250 = 1 kHz
    tc0.tccr0a.write(|w| w.wgm0().ctc());
    tc0.tccr0b.write(|w| w.cs0().prescale_64());
    tc0.ocr0a.write(|w| w.bits(249));
    tc0.timsk0.write(|w| w.ocie0a().set_bit());

    unsafe { interrupt::enable() };
}

/// Current tick count. Wraps every ~65 s.
pub fn now() -> u16 {
    interrupt::free(|cs| TICKS.borrow(cs).get())
}

#[avr_device::interrupt(atmega32u4)]
fn TIMER0_COMPA() {
    interrupt::free(|cs| {
        let ticks = TICKS.borrow(cs);
        ticks.set(ticks.get().wrapping_add(1));
    });
}
