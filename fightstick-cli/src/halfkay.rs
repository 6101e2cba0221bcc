use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rusb::{DeviceHandle, GlobalContext};
use std::time::Duration;

/// Teensy 2.0 HalfKay bootloader USB identifiers.
const HALFKAY_VID: u16 = 0x16C0;
const HALFKAY_PID: u16 = 0x0478;

/// The running pad enumerates as a HORI Pokken Tournament Pro Pad.
const PAD_VID: u16 = 0x0F0D;
const PAD_PID: u16 = 0x0092;

/// ATmega32U4 flash page size in bytes.
const PAGE_SIZE: usize = 128;

/// Usable flash: 32KB minus the 512-byte bootloader section.
const FLASH_SIZE: usize = 32768 - 512;

/// USB control transfer timeout.
const USB_TIMEOUT: Duration = Duration::from_secs(2);

/// Delay after each page write to allow flash programming.
const PAGE_WRITE_DELAY: Duration = Duration::from_millis(5);

fn find_device(vid: u16, pid: u16) -> Result<Option<rusb::Device<GlobalContext>>> {
    let devices = rusb::devices().context("failed to enumerate USB devices")?;
    for device in devices.iter() {
        let desc = device
            .device_descriptor()
            .context("failed to read device descriptor")?;
        if desc.vendor_id() == vid && desc.product_id() == pid {
            return Ok(Some(device));
        }
    }
    Ok(None)
}

/// Detect whether a Teensy in HalfKay bootloader mode is connected.
pub fn detect() -> Result<bool> {
    Ok(find_device(HALFKAY_VID, HALFKAY_PID)?.is_some())
}

/// Ask a running pad to reboot into the bootloader via its vendor request.
/// Returns false if no pad is connected.
pub fn reboot_to_bootloader() -> Result<bool> {
    let Some(device) = find_device(PAD_VID, PAD_PID)? else {
        return Ok(false);
    };
    let handle = device
        .open()
        .context("failed to open the pad (may need root/sudo or udev rules)")?;
    // bmRequestType 0x40 (host-to-device, vendor), bRequest 0xFF.
    // The device detaches immediately, so a transfer error is expected.
    let _ = handle.write_control(0x40, 0xFF, 0, 0, &[], USB_TIMEOUT);
    Ok(true)
}

fn open_bootloader() -> Result<DeviceHandle<GlobalContext>> {
    let Some(device) = find_device(HALFKAY_VID, HALFKAY_PID)? else {
        bail!("Teensy bootloader not found. Press the reset button and try again.");
    };
    device
        .open()
        .context("failed to open Teensy bootloader (may need root/sudo or udev rules)")
}

/// Flash a firmware image to the Teensy via the HalfKay protocol.
///
/// `base_address` is where the image starts; `data` is split into 128-byte
/// pages, and all-0xFF pages are skipped since erased flash already reads
/// that way.
pub fn flash(base_address: u32, data: &[u8]) -> Result<()> {
    let handle = open_bootloader()?;

    let end_address = base_address as usize + data.len();
    if end_address > FLASH_SIZE {
        bail!(
            "firmware too large: {} bytes at offset 0x{:04X} exceeds the {} bytes available below the bootloader",
            data.len(),
            base_address,
            FLASH_SIZE
        );
    }

    let total_pages = data.len().div_ceil(PAGE_SIZE);
    let pb = ProgressBar::new(total_pages as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} [{bar:40.cyan/blue}] {pos}/{len} pages")
            .unwrap()
            .progress_chars("=> "),
    );
    pb.set_message("Flashing");

    for (page_idx, chunk) in data.chunks(PAGE_SIZE).enumerate() {
        let address = base_address as usize + page_idx * PAGE_SIZE;

        if chunk.iter().all(|&b| b == 0xFF) {
            pb.inc(1);
            continue;
        }

        write_page(&handle, address, chunk)
            .with_context(|| format!("failed to write page at address 0x{:04X}", address))?;

        std::thread::sleep(PAGE_WRITE_DELAY);
        pb.inc(1);
    }

    pb.finish_with_message("Flashed");

    reboot(&handle)?;
    println!("Teensy rebooted. The pad should enumerate shortly.");

    Ok(())
}

/// Write a single page via HalfKay's HID SET_REPORT control transfer.
/// Payload: 2-byte little-endian address followed by the page, padded to
/// PAGE_SIZE with 0xFF.
fn write_page(handle: &DeviceHandle<GlobalContext>, address: usize, chunk: &[u8]) -> Result<()> {
    let mut buf = vec![0xFFu8; 2 + PAGE_SIZE];
    buf[0] = (address & 0xFF) as u8;
    buf[1] = ((address >> 8) & 0xFF) as u8;
    buf[2..2 + chunk.len()].copy_from_slice(chunk);

    // bmRequestType 0x21, bRequest 0x09 (SET_REPORT), wValue 0x0200
    handle
        .write_control(0x21, 0x09, 0x0200, 0, &buf, USB_TIMEOUT)
        .context("USB control transfer failed")?;
    Ok(())
}

/// Send the HalfKay reboot command (a write to address 0xFFFF).
fn reboot(handle: &DeviceHandle<GlobalContext>) -> Result<()> {
    let mut buf = vec![0u8; 2 + PAGE_SIZE];
    buf[0] = 0xFF;
    buf[1] = 0xFF;
    // The device disconnects immediately, so ignore transfer errors
    let _ = handle.write_control(0x21, 0x09, 0x0200, 0, &buf, USB_TIMEOUT);
    Ok(())
}
