use anyhow::{bail, Context, Result};
use fightstick_core::report::{self, PadReport, HAT_CENTER, REPORT_LEN, STICK_CENTER};
use fightstick_core::Key;

/// Parse a report dump as produced by e.g. `usbhid-dump` — eight hex bytes,
/// whitespace between bytes optional.
pub fn parse_report(input: &str) -> Result<PadReport> {
    let compact: String = input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .collect();

    let bytes = crate::hex::decode_hex_bytes(&compact).context("parsing report bytes")?;
    if bytes.len() != REPORT_LEN {
        bail!("expected {} report bytes, got {}", REPORT_LEN, bytes.len());
    }

    let mut raw = [0u8; REPORT_LEN];
    raw.copy_from_slice(&bytes);
    Ok(PadReport::from_bytes(&raw))
}

/// Pretty-print a decoded report.
pub fn print_report(report: &PadReport) {
    let mut pressed: Vec<&str> = Vec::new();
    for key in Key::ALL {
        let mask = report::button_mask(key);
        if mask != 0 && report.buttons & mask != 0 {
            pressed.push(key.name());
        }
    }

    println!("buttons: 0x{:04X} [{}]", report.buttons, pressed.join(", "));
    println!(
        "hat:     0x{:02X}{}",
        report.hat,
        if report.hat == HAT_CENTER { " (centered)" } else { "" }
    );
    println!("left:    ({}, {}){}", report.lx, report.ly, stick_note(report.lx, report.ly));
    println!("right:   ({}, {}){}", report.rx, report.ry, stick_note(report.rx, report.ry));
}

fn stick_note(x: u8, y: u8) -> &'static str {
    if x == STICK_CENTER && y == STICK_CENTER {
        " (centered)"
    } else {
        ""
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fightstick_core::report::buttons;

    #[test]
    fn parses_spaced_hex_dump() {
        let report = parse_report("04 00 08 80 00 80 80 00").unwrap();
        assert_eq!(report.buttons, buttons::A);
        assert_eq!(report.hat, HAT_CENTER);
        assert_eq!(report.ly, 0x00);
    }

    #[test]
    fn parses_compact_hex() {
        let report = parse_report("0010088080808000").unwrap();
        assert_eq!(report.buttons, buttons::HOME);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(parse_report("04 00 08").is_err());
        assert!(parse_report("").is_err());
    }

    #[test]
    fn rejects_junk() {
        assert!(parse_report("zz 00 08 80 80 80 80 00").is_err());
    }
}
