//! Serial diagnostics over USART1 (feature `console`).
//!
//! Strictly observational: the only traffic is the bounce trace emitted by
//! the debounce filter, in the form `bounce: <elapsed> <row>@<delta>`.
//! Writes are blocking, which is fine at 115200 baud for a line every few
//! scans at worst.

use core::fmt::{self, Write};

use avr_device::atmega32u4::Peripherals;

use fightstick_core::BounceEvent;

/// Configure USART1 for 115200 8N1.
pub fn init(dp: &Peripherals) {
    let usart = &dp.USART1;

    // Double-speed mode: UBRR = 16 MHz / (8 * 115200) - 1 ≈ 16
    usart.ucsr1a.write(|w| w.u2x1().set_bit());
    usart.ubrr1.write(|w| unsafe { w.bits(16) });
    // TX only; 8 data bits, no parity, 1 stop bit
    usart.ucsr1b.write(|w| w.txen1().set_bit());
    usart.ucsr1c.write(|w| w.ucsz1().chr8());
}

/// Log one bounce event observed while a commit was pending.
pub fn bounce(dp: &Peripherals, event: &BounceEvent) {
    let mut tx = Tx { dp };
    let _ = writeln!(
        tx,
        "bounce: {} {}@{:03X}",
        event.elapsed,
        event.row,
        event.delta.bits()
    );
}

struct Tx<'a> {
    dp: &'a Peripherals,
}

impl fmt::Write for Tx<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let usart = &self.dp.USART1;
        for byte in s.bytes() {
            while usart.ucsr1a.read().udre1().bit_is_clear() {}
            usart.udr1.write(|w| w.bits(byte));
        }
        Ok(())
    }
}
