//! USB HID gamepad driver for the ATmega32U4's built-in controller.
//!
//! The device enumerates as a HORI Pokken Tournament Pro Pad, which the
//! Switch accepts as a Pro Controller since system 3.0.0. Reports go out on
//! an interrupt IN endpoint; the host's OUT traffic is drained and discarded
//! (the pad has no rumble or lights to drive). Direct register access via
//! avr-device, no USB stack.

use avr_device::atmega32u4::Peripherals;

use fightstick_core::report::{PadReport, REPORT_LEN};

/// Control endpoint size.
const EP0_SIZE: u8 = 64;

/// Interrupt IN endpoint carrying input reports.
const EP_IN: u8 = 1;
/// Interrupt OUT endpoint for host data (drained, unused).
const EP_OUT: u8 = 2;

/// HID report descriptor for the Pokken pad: 16 buttons, a 4-bit HAT,
/// four 8-bit axes, and one vendor byte in; 8 vendor bytes out.
static HID_REPORT_DESCRIPTOR: [u8; 86] = [
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x05, // Usage (Game Pad)
    0xA1, 0x01, // Collection (Application)
    // 16 buttons
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x35, 0x00, //   Physical Minimum (0)
    0x45, 0x01, //   Physical Maximum (1)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x10, //   Report Count (16)
    0x05, 0x09, //   Usage Page (Button)
    0x19, 0x01, //   Usage Minimum (1)
    0x29, 0x10, //   Usage Maximum (16)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    // HAT switch, 4 bits + 4 bits padding
    0x05, 0x01, //   Usage Page (Generic Desktop)
    0x25, 0x07, //   Logical Maximum (7)
    0x46, 0x3B, 0x01, // Physical Maximum (315)
    0x75, 0x04, //   Report Size (4)
    0x95, 0x01, //   Report Count (1)
    0x65, 0x14, //   Unit (Degrees)
    0x09, 0x39, //   Usage (Hat Switch)
    0x81, 0x42, //   Input (Data, Variable, Absolute, Null State)
    0x65, 0x00, //   Unit (None)
    0x95, 0x01, //   Report Count (1)
    0x81, 0x01, //   Input (Constant) — padding nibble
    // Four 8-bit axes: LX, LY, RX, RY
    0x26, 0xFF, 0x00, // Logical Maximum (255)
    0x46, 0xFF, 0x00, // Physical Maximum (255)
    0x09, 0x30, //   Usage (X)
    0x09, 0x31, //   Usage (Y)
    0x09, 0x32, //   Usage (Z)
    0x09, 0x35, //   Usage (Rz)
    0x75, 0x08, //   Report Size (8)
    0x95, 0x04, //   Report Count (4)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    // Vendor byte in, 8 vendor bytes out
    0x06, 0x00, 0xFF, // Usage Page (Vendor Defined)
    0x09, 0x20, //   Usage (0x20)
    0x95, 0x01, //   Report Count (1)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    0x0A, 0x21, 0x26, // Usage (0x2621)
    0x95, 0x08, //   Report Count (8)
    0x91, 0x02, //   Output (Data, Variable, Absolute)
    0xC0, // End Collection
];

/// Device descriptor: HORI Pokken Tournament Pro Pad.
static DEVICE_DESCRIPTOR: [u8; 18] = [
    18,   // bLength
    1,    // bDescriptorType (Device)
    0x00, 0x02, // bcdUSB (2.0)
    0,    // bDeviceClass (defined at interface level)
    0,    // bDeviceSubClass
    0,    // bDeviceProtocol
    EP0_SIZE, // bMaxPacketSize0
    0x0D, 0x0F, // idVendor (0x0F0D — HORI)
    0x92, 0x00, // idProduct (0x0092 — Pokken Tournament Pro Pad)
    0x00, 0x01, // bcdDevice (1.0)
    1,    // iManufacturer
    2,    // iProduct
    0,    // iSerialNumber
    1,    // bNumConfigurations
];

static CONFIG_DESCRIPTOR: [u8; 41] = [
    // Configuration descriptor
    9,    // bLength
    2,    // bDescriptorType (Configuration)
    41, 0, // wTotalLength
    1,    // bNumInterfaces
    1,    // bConfigurationValue
    0,    // iConfiguration
    0x80, // bmAttributes (bus powered)
    250,  // bMaxPower (500mA)
    // Interface descriptor
    9,    // bLength
    4,    // bDescriptorType (Interface)
    0,    // bInterfaceNumber
    0,    // bAlternateSetting
    2,    // bNumEndpoints
    3,    // bInterfaceClass (HID)
    0,    // bInterfaceSubClass (no boot protocol)
    0,    // bInterfaceProtocol
    0,    // iInterface
    // HID descriptor
    9,    // bLength
    0x21, // bDescriptorType (HID)
    0x11, 0x01, // bcdHID (1.11)
    0,    // bCountryCode
    1,    // bNumDescriptors
    0x22, // bDescriptorType (Report)
    HID_REPORT_DESCRIPTOR.len() as u8, 0, // wDescriptorLength
    // Endpoint descriptor (EP1 IN — interrupt)
    7,    // bLength
    5,    // bDescriptorType (Endpoint)
    0x80 | EP_IN, // bEndpointAddress
    0x03, // bmAttributes (Interrupt)
    64, 0, // wMaxPacketSize
    5,    // bInterval (5ms polling)
    // Endpoint descriptor (EP2 OUT — interrupt)
    7,    // bLength
    5,    // bDescriptorType (Endpoint)
    EP_OUT, // bEndpointAddress
    0x03, // bmAttributes (Interrupt)
    64, 0, // wMaxPacketSize
    5,    // bInterval (5ms polling)
];

/// String descriptor 0 (language ID): English (US).
static STRING_DESC_0: [u8; 4] = [4, 3, 0x09, 0x04];

/// String descriptor 1 (manufacturer): "HORI CO.,LTD."
static STRING_DESC_1: [u8; 28] = [
    28, 3, // bLength, bDescriptorType
    b'H', 0, b'O', 0, b'R', 0, b'I', 0, b' ', 0, b'C', 0, b'O', 0, b'.', 0,
    b',', 0, b'L', 0, b'T', 0, b'D', 0, b'.', 0,
];

/// String descriptor 2 (product): "POKKEN CONTROLLER"
static STRING_DESC_2: [u8; 36] = [
    36, 3, // bLength, bDescriptorType
    b'P', 0, b'O', 0, b'K', 0, b'K', 0, b'E', 0, b'N', 0, b' ', 0, b'C', 0,
    b'O', 0, b'N', 0, b'T', 0, b'R', 0, b'O', 0, b'L', 0, b'L', 0, b'E', 0,
    b'R', 0,
];

/// USB device state.
pub struct UsbPad {
    configured: bool,
}

impl UsbPad {
    pub const fn new() -> Self {
        Self { configured: false }
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Initialize the ATmega32U4 USB controller and attach to the bus.
    pub fn init(&mut self, dp: &Peripherals) {
        let usb = &dp.USB_DEVICE;

        // Enable USB pad regulator
        usb.uhwcon.write(|w| w.uvrege().set_bit());

        // Enable USB controller and VBUS pad
        usb.usbcon
            .write(|w| w.usbe().set_bit().otgpade().set_bit());

        // Configure PLL for 16MHz crystal -> 96MHz PLL -> 48MHz USB clock
        dp.PLL.pllcsr.write(|w| w.pindiv().set_bit().plle().set_bit());

        // Wait for PLL lock
        while dp.PLL.pllcsr.read().plock().bit_is_clear() {}

        // Enable USB clock
        usb.usbcon.modify(|_, w| w.frzclk().clear_bit());

        // Attach to bus (clear DETACH)
        usb.udcon.modify(|_, w| w.detach().clear_bit());

        // Enable End-Of-Reset interrupt flagging
        usb.udien.write(|w| w.eorste().set_bit());

        self.configured = false;
    }

    /// Handle pending bus events. Call once per loop iteration.
    pub fn poll(&mut self, dp: &Peripherals) {
        let usb = &dp.USB_DEVICE;

        // End of reset: host re-enumerates, start over with EP0
        if usb.udint.read().eorsti().bit_is_set() {
            usb.udint.modify(|_, w| w.eorsti().clear_bit());
            self.configure_ep0(dp);
            self.configured = false;
        }

        // SETUP packet on EP0
        self.select_endpoint(dp, 0);
        if usb.ueintx.read().rxstpi().bit_is_set() {
            self.handle_setup(dp);
        }
    }

    /// Offer a report to the IN endpoint. Non-blocking: if the bank is not
    /// free this cycle, the report is dropped and the caller builds a fresh
    /// one next cycle. Returns whether the report was queued.
    pub fn try_send_report(&mut self, dp: &Peripherals, report: &PadReport) -> bool {
        if !self.configured {
            return false;
        }

        let usb = &dp.USB_DEVICE;
        self.select_endpoint(dp, EP_IN);

        if usb.ueintx.read().rwal().bit_is_clear() {
            return false;
        }

        for byte in report.as_bytes() {
            usb.uedatx.write(|w| w.bits(byte));
        }

        // Clear FIFOCON and TXINI to hand the bank to the controller
        usb.ueintx
            .modify(|_, w| w.fifocon().clear_bit().txini().clear_bit());

        true
    }

    /// Discard anything the host sent on the OUT endpoint. The Switch never
    /// sends data the pad acts on, but the bank has to be released.
    pub fn drain_out(&mut self, dp: &Peripherals) {
        if !self.configured {
            return;
        }

        let usb = &dp.USB_DEVICE;
        self.select_endpoint(dp, EP_OUT);

        if usb.ueintx.read().rxouti().bit_is_set() {
            usb.ueintx.modify(|_, w| w.rxouti().clear_bit());
            while usb.ueintx.read().rwal().bit_is_set() {
                let _ = usb.uedatx.read().bits();
            }
            usb.ueintx.modify(|_, w| w.fifocon().clear_bit());
        }
    }

    fn configure_ep0(&self, dp: &Peripherals) {
        let usb = &dp.USB_DEVICE;

        self.select_endpoint(dp, 0);
        // Control endpoint, 64 bytes
        usb.ueconx.write(|w| w.epen().set_bit());
        usb.uecfg0x.write(|w| w.eptype().bits(0b00));
        usb.uecfg1x.write(|w| w.epsize().bits(0b011).alloc().set_bit());
    }

    fn configure_report_endpoints(&self, dp: &Peripherals) {
        let usb = &dp.USB_DEVICE;

        // EP1: interrupt IN, 64 bytes
        self.select_endpoint(dp, EP_IN);
        usb.ueconx.write(|w| w.epen().set_bit());
        usb.uecfg0x
            .write(|w| w.eptype().bits(0b11).epdir().set_bit());
        usb.uecfg1x.write(|w| w.epsize().bits(0b011).alloc().set_bit());

        // EP2: interrupt OUT, 64 bytes
        self.select_endpoint(dp, EP_OUT);
        usb.ueconx.write(|w| w.epen().set_bit());
        usb.uecfg0x.write(|w| w.eptype().bits(0b11));
        usb.uecfg1x.write(|w| w.epsize().bits(0b011).alloc().set_bit());
    }

    fn select_endpoint(&self, dp: &Peripherals, ep: u8) {
        dp.USB_DEVICE.uenum.write(|w| w.bits(ep & 0x07));
    }

    fn handle_setup(&mut self, dp: &Peripherals) {
        let usb = &dp.USB_DEVICE;

        // Read 8-byte SETUP packet
        let bm_request_type = usb.uedatx.read().bits();
        let b_request = usb.uedatx.read().bits();
        let w_value_l = usb.uedatx.read().bits();
        let w_value_h = usb.uedatx.read().bits();
        let _w_index_l = usb.uedatx.read().bits();
        let _w_index_h = usb.uedatx.read().bits();
        let w_length_l = usb.uedatx.read().bits();
        let w_length_h = usb.uedatx.read().bits();

        // Acknowledge SETUP
        usb.ueintx.modify(|_, w| w.rxstpi().clear_bit());

        let w_length = (w_length_h as u16) << 8 | w_length_l as u16;

        match (bm_request_type, b_request) {
            // GET_DESCRIPTOR
            (0x80, 0x06) => match w_value_h {
                1 => self.send_descriptor(dp, &DEVICE_DESCRIPTOR, w_length),
                2 => self.send_descriptor(dp, &CONFIG_DESCRIPTOR, w_length),
                3 => match w_value_l {
                    0 => self.send_descriptor(dp, &STRING_DESC_0, w_length),
                    1 => self.send_descriptor(dp, &STRING_DESC_1, w_length),
                    2 => self.send_descriptor(dp, &STRING_DESC_2, w_length),
                    _ => self.stall(dp),
                },
                _ => self.stall(dp),
            },

            // SET_ADDRESS
            (0x00, 0x05) => {
                // Send ZLP first, then latch the address
                usb.ueintx.modify(|_, w| w.txini().clear_bit());
                while usb.ueintx.read().txini().bit_is_clear() {}
                usb.udaddr
                    .write(|w| w.uadd().bits(w_value_l & 0x7F).adden().set_bit());
            }

            // SET_CONFIGURATION
            (0x00, 0x09) => {
                usb.ueintx.modify(|_, w| w.txini().clear_bit());
                self.configure_report_endpoints(dp);
                self.configured = true;
            }

            // GET_CONFIGURATION
            (0x80, 0x08) => {
                while usb.ueintx.read().txini().bit_is_clear() {}
                usb.uedatx
                    .write(|w| w.bits(if self.configured { 1 } else { 0 }));
                usb.ueintx.modify(|_, w| w.txini().clear_bit());
            }

            // HID GET_DESCRIPTOR (interface-level)
            (0x81, 0x06) => match w_value_h {
                0x22 => self.send_descriptor(dp, &HID_REPORT_DESCRIPTOR, w_length),
                _ => self.stall(dp),
            },

            // HID SET_IDLE — accepted, nothing to store
            (0x21, 0x0A) => {
                usb.ueintx.modify(|_, w| w.txini().clear_bit());
            }

            // HID SET_REPORT — host pushes 8 vendor bytes; read them off
            // EP0 and discard, then complete the status stage
            (0x21, 0x09) => {
                self.discard_data_stage(dp, w_length);
                usb.ueintx.modify(|_, w| w.txini().clear_bit());
            }

            // Vendor request: jump to the HalfKay bootloader (used by the CLI
            // to reflash without touching the reset button)
            (0x40, 0xFF) => {
                usb.ueintx.modify(|_, w| w.txini().clear_bit());
                jump_to_bootloader(dp);
            }

            _ => self.stall(dp),
        }
    }

    /// Receive and throw away the OUT data stage of a host-to-device control
    /// transfer. The status ZLP is left to the caller. Mirrors what
    /// [`drain_out`](Self::drain_out) does for the report OUT endpoint.
    fn discard_data_stage(&self, dp: &Peripherals, length: u16) {
        let usb = &dp.USB_DEVICE;
        let mut remaining = length;

        while remaining > 0 {
            while usb.ueintx.read().rxouti().bit_is_clear() {}

            let bank = core::cmp::min(remaining, EP0_SIZE as u16);
            for _ in 0..bank {
                let _ = usb.uedatx.read().bits();
            }
            remaining -= bank;

            usb.ueintx.modify(|_, w| w.rxouti().clear_bit());
        }
    }

    fn send_descriptor(&self, dp: &Peripherals, desc: &[u8], max_length: u16) {
        let usb = &dp.USB_DEVICE;
        let len = core::cmp::min(desc.len(), max_length as usize);
        let mut sent = 0;

        while sent < len {
            while usb.ueintx.read().txini().bit_is_clear() {}

            let chunk_end = core::cmp::min(sent + EP0_SIZE as usize, len);
            for &byte in &desc[sent..chunk_end] {
                usb.uedatx.write(|w| w.bits(byte));
            }

            usb.ueintx.modify(|_, w| w.txini().clear_bit());
            sent = chunk_end;
        }

        // Wait for status stage (host sends ZLP)
        while usb.ueintx.read().rxouti().bit_is_clear() {}
        usb.ueintx.modify(|_, w| w.rxouti().clear_bit());
    }

    fn stall(&self, dp: &Peripherals) {
        dp.USB_DEVICE.ueconx.modify(|_, w| w.stallrq().set_bit());
    }
}

/// Disable all peripherals and jump to the HalfKay bootloader at 0x7E00.
fn jump_to_bootloader(dp: &Peripherals) -> ! {
    avr_device::interrupt::disable();

    // Disconnect USB so the host notices before the bootloader enumerates
    dp.USB_DEVICE.udcon.write(|w| w.detach().set_bit());
    dp.USB_DEVICE.usbcon.write(|w| w.frzclk().set_bit());

    for _ in 0..20000u16 {
        unsafe { core::arch::asm!("nop") };
    }

    // Quiesce peripherals
    dp.EXINT.eimsk.write(|w| w.bits(0));
    dp.SPI.spcr.write(|w| unsafe { w.bits(0) });
    dp.AC.acsr.write(|w| unsafe { w.bits(0) });
    dp.EEPROM.eecr.write(|w| unsafe { w.bits(0) });
    dp.ADC.adcsra.write(|w| unsafe { w.bits(0) });
    dp.TC0.timsk0.write(|w| unsafe { w.bits(0) });
    dp.TC1.timsk1.write(|w| unsafe { w.bits(0) });
    dp.TC3.timsk3.write(|w| unsafe { w.bits(0) });
    dp.TC4.timsk4.write(|w| unsafe { w.bits(0) });
    dp.USART1.ucsr1b.write(|w| unsafe { w.bits(0) });
    dp.TWI.twcr.write(|w| unsafe { w.bits(0) });

    // Reset all port directions and values
    dp.PORTB.ddrb.write(|w| unsafe { w.bits(0) });
    dp.PORTB.portb.write(|w| unsafe { w.bits(0) });
    dp.PORTC.ddrc.write(|w| unsafe { w.bits(0) });
    dp.PORTC.portc.write(|w| unsafe { w.bits(0) });
    dp.PORTD.ddrd.write(|w| unsafe { w.bits(0) });
    dp.PORTD.portd.write(|w| unsafe { w.bits(0) });
    dp.PORTE.ddre.write(|w| unsafe { w.bits(0) });
    dp.PORTE.porte.write(|w| unsafe { w.bits(0) });
    dp.PORTF.ddrf.write(|w| unsafe { w.bits(0) });
    dp.PORTF.portf.write(|w| unsafe { w.bits(0) });

    unsafe { core::arch::asm!("jmp 0x7E00", options(noreturn)) }
}
