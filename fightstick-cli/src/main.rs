mod decode;
mod halfkay;
mod hex;
mod layout;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs;

#[derive(Parser)]
#[command(name = "fightstick-cli")]
#[command(about = "Switch fightstick firmware flasher and report inspector")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Flash a .hex firmware file to the Teensy via the HalfKay bootloader
    Flash {
        /// Path to the Intel HEX firmware file
        firmware: String,
    },
    /// Detect whether a Teensy is connected in bootloader mode
    Detect,
    /// Decode an 8-byte HID report dump (hex bytes, spaces optional)
    Decode {
        /// Report bytes, e.g. "04 00 08 80 80 80 80 00"
        bytes: String,
    },
    /// Print the matrix-to-control table
    Layout,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Flash { firmware } => {
            let contents =
                fs::read_to_string(&firmware).with_context(|| format!("reading {}", firmware))?;

            let segments = hex::parse_hex(&contents).context("parsing Intel HEX file")?;
            let (base_address, data) =
                hex::flatten_segments(&segments).context("flattening HEX segments")?;

            println!(
                "Firmware: {} bytes at base address 0x{:04X}",
                data.len(),
                base_address
            );

            if !halfkay::detect()? {
                // Ask a running pad to drop into the bootloader
                if halfkay::reboot_to_bootloader()? {
                    println!("Rebooting pad into bootloader...");
                    let mut found = false;
                    for _ in 0..50 {
                        std::thread::sleep(std::time::Duration::from_millis(100));
                        if halfkay::detect()? {
                            found = true;
                            break;
                        }
                    }
                    if !found {
                        eprintln!("Teensy bootloader not detected after reboot.");
                        eprintln!("Press the reset button on the Teensy and try again.");
                        std::process::exit(1);
                    }
                } else {
                    eprintln!("Teensy bootloader not detected and no pad found.");
                    eprintln!("Press the reset button on the Teensy and try again.");
                    std::process::exit(1);
                }
            }

            halfkay::flash(base_address, &data)?;
        }
        Command::Detect => {
            if halfkay::detect()? {
                println!("Teensy bootloader detected (HalfKay mode).");
            } else {
                println!("Teensy bootloader not detected.");
                println!("Press the reset button on the Teensy to enter bootloader mode.");
            }
        }
        Command::Decode { bytes } => {
            let report = decode::parse_report(&bytes)?;
            decode::print_report(&report);
        }
        Command::Layout => layout::print_layout(),
    }

    Ok(())
}
