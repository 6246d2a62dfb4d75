//! Intel HEX image parser.
//!
//! Parses `:LLAAAATT[DD...]CC` records into a flat image buffer. Record
//! addresses are offsets into that buffer, so a ROM assembled at 0x0000 and
//! installed at its descriptor's start address lands where expected. Supports
//! record types 00 (data), 01 (EOF), 02 (extended segment address) and 04
//! (extended linear address); 03 and 05 (start address) are ignored.

use crate::{CoreError, Result};

/// Parse Intel HEX text into `image`.
///
/// Data outside `image` is dropped. Returns the highest offset written plus
/// one.
pub fn parse_hex(hex: &str, image: &mut [u8]) -> Result<usize> {
    let mut max_addr = 0usize;
    let mut base_addr: u32 = 0;

    for (idx, line) in hex.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some(body) = line.strip_prefix(':') else {
            continue; // comments, banners
        };

        let bytes =
            hex_line_to_bytes(body).map_err(|reason| CoreError::Hex { line: line_no, reason })?;
        if bytes.len() < 5 {
            return Err(CoreError::Hex { line: line_no, reason: "record too short".into() });
        }
        let byte_count = bytes[0] as usize;
        if bytes.len() != byte_count + 5 {
            return Err(CoreError::Hex {
                line: line_no,
                reason: format!(
                    "length byte says {} but record holds {}",
                    byte_count,
                    bytes.len() - 5
                ),
            });
        }
        let addr = ((bytes[1] as u16) << 8) | bytes[2] as u16;
        let record_type = bytes[3];

        let sum = bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
        if sum != 0 {
            return Err(CoreError::Hex {
                line: line_no,
                reason: format!("checksum error: sum={:02X}", sum),
            });
        }

        match record_type {
            0x00 => {
                let full_addr = base_addr + addr as u32;
                for (i, &b) in bytes[4..4 + byte_count].iter().enumerate() {
                    let target = full_addr as usize + i;
                    if target < image.len() {
                        image[target] = b;
                        max_addr = max_addr.max(target + 1);
                    }
                }
            }
            0x01 => break,
            0x02 if byte_count >= 2 => {
                base_addr = (((bytes[4] as u32) << 8) | bytes[5] as u32) << 4;
            }
            0x04 if byte_count >= 2 => {
                base_addr = (((bytes[4] as u32) << 8) | bytes[5] as u32) << 16;
            }
            _ => {}
        }
    }

    Ok(max_addr)
}

fn hex_line_to_bytes(s: &str) -> std::result::Result<Vec<u8>, String> {
    if s.len() % 2 != 0 {
        return Err("odd number of hex digits".into());
    }
    s.as_bytes()
        .chunks(2)
        .map(|pair| -> std::result::Result<u8, String> {
            Ok((hex_digit(pair[0])? << 4) | hex_digit(pair[1])?)
        })
        .collect()
}

fn hex_digit(c: u8) -> std::result::Result<u8, String> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        _ => Err(format!("invalid hex character {:?}", c as char)),
    }
}
