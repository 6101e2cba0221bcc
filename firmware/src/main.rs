//! Switch fightstick firmware for ATmega32U4 (Teensy 2.0).
//!
//! A 3×10 button matrix scanned and debounced into Pokken-pad HID reports:
//! - Row-select matrix scan with active-low column reads
//! - Global timer-based debounce (a bouncing contact holds the whole matrix)
//! - Fixed key-to-report mapping, no layers, no persistence
//! - USB HID gamepad reports over the chip's built-in controller
//!
//! Everything runs in one cooperative loop; the only interrupt is the
//! millisecond tick.

#![no_std]
#![no_main]
#![feature(abi_avr_interrupt)]
#![feature(asm_experimental_arch)]

#[cfg(feature = "console")]
mod console;
mod matrix;
mod timer;
mod usb;

use avr_device::atmega32u4::Peripherals;

use fightstick_core::report::{self, PadReport};
use fightstick_core::Debouncer;
use usb::UsbPad;

/// Times each built report is re-sent before a fresh one is assembled.
/// Kept at 0; the echo path exists for hosts that drop reports.
const ECHOES: u8 = 0;

/// Panic handler — on AVR we just loop forever.
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    loop {}
}

/// Main entry point.
#[no_mangle]
pub extern "C" fn main() -> ! {
    let dp = unsafe { Peripherals::steal() };

    // Disable the clock prescaler: full 16MHz from the Teensy crystal
    dp.CPU.clkpr.write(|w| w.clkpce().set_bit());
    dp.CPU.clkpr.write(|w| unsafe { w.bits(0) });

    matrix::init(&dp);
    timer::init(&dp);
    #[cfg(feature = "console")]
    console::init(&dp);

    let mut usb = UsbPad::new();
    usb.init(&dp);

    let mut debouncer = Debouncer::new();
    let mut last_report = PadReport::neutral();
    let mut echoes_left: u8 = 0;

    loop {
        // Handle enumeration and control requests
        usb.poll(&dp);

        // Scan and debounce; bounce events go to the serial console when built in
        let raw = matrix::scan(&dp);
        let now = timer::now();
        #[cfg(feature = "console")]
        debouncer.update_with(&raw, now, |event| console::bounce(&dp, &event));
        #[cfg(not(feature = "console"))]
        debouncer.update(&raw, now);

        // Assemble this cycle's report, or echo the previous one if an echo
        // budget is configured
        let report = if echoes_left > 0 {
            echoes_left -= 1;
            last_report
        } else {
            let fresh = report::build(debouncer.stable());
            last_report = fresh;
            echoes_left = ECHOES;
            fresh
        };

        // Non-blocking: a report the host isn't ready for is simply dropped,
        // a fresh one gets built next cycle
        usb.try_send_report(&dp, &report);
        usb.drain_out(&dp);
    }
}
