use anyhow::{bail, Context, Result};

/// A run of contiguous data at a fixed address, merged from Intel HEX records.
#[derive(Debug, Clone)]
pub struct Segment {
    pub address: u32,
    pub data: Vec<u8>,
}

/// Parse an Intel HEX image into address-sorted segments.
///
/// Record types handled:
/// - 00: data
/// - 01: end of file
/// - 02: extended segment address
/// - 03: start segment address (ignored — irrelevant on AVR)
pub fn parse_hex(input: &str) -> Result<Vec<Segment>> {
    let mut segments: Vec<Segment> = Vec::new();
    let mut base: u32 = 0;

    for (idx, raw_line) in input.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }

        let record = parse_record(line).with_context(|| format!("line {}", idx + 1))?;

        match record.kind {
            0x00 => {
                let address = base + record.address as u32;
                append_data(&mut segments, address, &record.data);
            }
            0x01 => break,
            0x02 => {
                if record.data.len() != 2 {
                    bail!("line {}: malformed extended segment address", idx + 1);
                }
                base = u32::from(u16::from_be_bytes([record.data[0], record.data[1]])) << 4;
            }
            0x03 => {} // start address record, nothing to place in flash
            other => bail!("line {}: unsupported record type 0x{:02X}", idx + 1, other),
        }
    }

    segments.sort_by_key(|s| s.address);
    Ok(segments)
}

struct Record {
    address: u16,
    kind: u8,
    data: Vec<u8>,
}

fn parse_record(line: &str) -> Result<Record> {
    let Some(body) = line.strip_prefix(':') else {
        bail!("missing start code ':'");
    };

    let bytes = decode_hex_bytes(body).context("invalid hex data")?;
    if bytes.len() < 5 {
        bail!("record too short");
    }

    let count = bytes[0] as usize;
    if bytes.len() != 5 + count {
        bail!("expected {} data bytes, got {}", count, bytes.len() - 5);
    }

    // Sum over the whole record including the checksum byte must be 0 mod 256
    let sum: u8 = bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    if sum != 0 {
        bail!("checksum mismatch");
    }

    Ok(Record {
        address: u16::from_be_bytes([bytes[1], bytes[2]]),
        kind: bytes[3],
        data: bytes[4..4 + count].to_vec(),
    })
}

/// Extend the last segment when the new data is contiguous with it,
/// otherwise open a new segment.
fn append_data(segments: &mut Vec<Segment>, address: u32, data: &[u8]) {
    if let Some(last) = segments.last_mut() {
        if last.address + last.data.len() as u32 == address {
            last.data.extend_from_slice(data);
            return;
        }
    }
    segments.push(Segment {
        address,
        data: data.to_vec(),
    });
}

/// Collapse segments into one flat image starting at the lowest address.
/// Gaps are filled with 0xFF, which the flasher skips as erased flash.
pub fn flatten_segments(segments: &[Segment]) -> Result<(u32, Vec<u8>)> {
    let Some(first) = segments.first() else {
        bail!("no data records in HEX file");
    };
    let base = first.address;

    let end = segments
        .iter()
        .map(|s| s.address as usize + s.data.len())
        .max()
        .unwrap_or(base as usize);

    let mut image = vec![0xFFu8; end - base as usize];
    for segment in segments {
        if segment.address < base {
            bail!("segments out of order");
        }
        let offset = (segment.address - base) as usize;
        image[offset..offset + segment.data.len()].copy_from_slice(&segment.data);
    }

    Ok((base, image))
}

pub fn decode_hex_bytes(s: &str) -> Result<Vec<u8>> {
    if s.len() % 2 != 0 {
        bail!("odd number of hex digits");
    }
    s.as_bytes()
        .chunks(2)
        .map(|pair| {
            let text = std::str::from_utf8(pair).context("non-ASCII hex digit")?;
            u8::from_str_radix(text, 16).with_context(|| format!("bad hex byte {:?}", text))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_data_record() {
        let hex = ":0400000001020304F2\n:00000001FF\n";
        let segments = parse_hex(hex).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].address, 0);
        assert_eq!(segments[0].data, vec![0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn rejects_checksum_mismatch() {
        let hex = ":10000000000102030405060708090A0B0C0D0E0F00\n\
                   :00000001FF\n";
        assert!(parse_hex(hex).is_err());
    }

    #[test]
    fn rejects_missing_start_code() {
        assert!(parse_hex("0400000001020304F2\n").is_err());
    }

    #[test]
    fn merges_contiguous_records() {
        let hex = ":04000000AABBCCDDEE\n\
                   :04000400112233444E\n\
                   :00000001FF\n";
        let segments = parse_hex(hex).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(
            segments[0].data,
            vec![0xAA, 0xBB, 0xCC, 0xDD, 0x11, 0x22, 0x33, 0x44]
        );
    }

    #[test]
    fn flatten_fills_gaps_with_erased_flash() {
        let segments = vec![
            Segment {
                address: 0x100,
                data: vec![0xAA, 0xBB],
            },
            Segment {
                address: 0x110,
                data: vec![0xCC, 0xDD],
            },
        ];
        let (base, image) = flatten_segments(&segments).unwrap();
        assert_eq!(base, 0x100);
        assert_eq!(image.len(), 0x12);
        assert_eq!(&image[..2], &[0xAA, 0xBB]);
        assert!(image[2..0x10].iter().all(|&b| b == 0xFF));
        assert_eq!(&image[0x10..], &[0xCC, 0xDD]);
    }

    #[test]
    fn ignores_start_segment_address_record() {
        let hex = ":0400000301020304EF\n\
                   :0200000055AAFF\n\
                   :00000001FF\n";
        let segments = parse_hex(hex).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].data, vec![0x55, 0xAA]);
    }
}
