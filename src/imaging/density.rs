//! Minimal pixel-density reader for JPEG and PNG bytes.
//!
//! Extracts the declared DPI from:
//! - JPEG: the JFIF APP0 segment (units byte + X/Y density)
//! - PNG: the `pHYs` chunk (pixels per metre)
//!
//! Also patches the JFIF density field in place, which is how the
//! `set-dpi` tool rewrites a JPEG's declared resolution without
//! re-encoding pixels.
//!
//! Zero external dependencies — pure byte walking.

/// Declared pixel density of an image, in dots per inch.
///
/// Many files declare no density at all (JFIF units byte 0 means "aspect
/// ratio only"); those sniff as `None` and the caller falls back to the
/// configured default.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Density {
    pub x_dpi: f64,
    pub y_dpi: f64,
}

const DOTS_PER_METRE_PER_INCH: f64 = 39.370_078_740_157_48; // 1 / 0.0254

/// Sniff the declared density from raw image bytes.
///
/// Returns `None` for formats without a density declaration, for files
/// that declare "no unit", and on any structural mismatch — a missing
/// density is never an error.
pub fn sniff_density(bytes: &[u8]) -> Option<Density> {
    if bytes.starts_with(&[0xFF, 0xD8]) {
        return jfif_density(bytes);
    }
    if bytes.starts_with(PNG_SIGNATURE) {
        return phys_density(bytes);
    }
    None
}

// ---------------------------------------------------------------------------
// JPEG: JFIF APP0
// ---------------------------------------------------------------------------

/// JFIF APP0 payload layout (after the 2-byte segment length):
///   Bytes 0-4:  "JFIF\0"
///   Bytes 5-6:  version major/minor
///   Byte  7:    density units (0 = none, 1 = dots/inch, 2 = dots/cm)
///   Bytes 8-9:  X density (big-endian u16)
///   Bytes 10-11: Y density (big-endian u16)
const JFIF_IDENTIFIER: &[u8] = b"JFIF\0";
const JFIF_UNITS_OFFSET: usize = 7;

fn jfif_density(data: &[u8]) -> Option<Density> {
    let start = find_jfif_app0(data)?;
    let payload = &data[start..];
    let units = payload[JFIF_UNITS_OFFSET];
    let x = u16::from_be_bytes([payload[8], payload[9]]) as f64;
    let y = u16::from_be_bytes([payload[10], payload[11]]) as f64;
    match units {
        1 if x > 0.0 && y > 0.0 => Some(Density { x_dpi: x, y_dpi: y }),
        2 if x > 0.0 && y > 0.0 => Some(Density {
            x_dpi: x * 2.54,
            y_dpi: y * 2.54,
        }),
        _ => None,
    }
}

/// Locate the JFIF APP0 payload, walking segments from SOI. Returns the
/// byte offset where the payload starts.
///
/// APP0 must be the first segment after SOI per the JFIF spec, but files
/// in the wild sometimes lead with other APPn markers, so walk until a
/// non-APPn segment is reached.
fn find_jfif_app0(data: &[u8]) -> Option<usize> {
    let mut pos = 2; // past SOI
    while pos + 4 <= data.len() {
        if data[pos] != 0xFF {
            return None;
        }
        let marker = data[pos + 1];
        // Stop at SOS or anything that is not an APPn segment
        if !(0xE0..=0xEF).contains(&marker) {
            return None;
        }
        let seg_len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        if seg_len < 2 || pos + 2 + seg_len > data.len() {
            return None;
        }
        let payload = &data[pos + 4..pos + 2 + seg_len];
        if marker == 0xE0 && payload.len() >= 12 && payload.starts_with(JFIF_IDENTIFIER) {
            return Some(pos + 4);
        }
        pos += 2 + seg_len;
    }
    None
}

/// Rewrite the declared density of a JPEG in place.
///
/// Patches the JFIF APP0 units/density fields without touching any encoded
/// pixel data. Returns false when the bytes carry no JFIF APP0 segment to
/// patch (nothing is modified in that case).
pub fn set_jfif_density(bytes: &mut [u8], dpi: u16) -> bool {
    let Some(units_at) = find_jfif_app0(bytes).map(|start| start + JFIF_UNITS_OFFSET) else {
        return false;
    };
    bytes[units_at] = 1; // dots per inch
    bytes[units_at + 1..units_at + 3].copy_from_slice(&dpi.to_be_bytes());
    bytes[units_at + 3..units_at + 5].copy_from_slice(&dpi.to_be_bytes());
    true
}

// ---------------------------------------------------------------------------
// PNG: pHYs chunk
// ---------------------------------------------------------------------------

const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Walk PNG chunks looking for `pHYs` (9-byte payload: X ppu, Y ppu, unit).
/// Unit 1 means pixels per metre; unit 0 declares only an aspect ratio.
fn phys_density(data: &[u8]) -> Option<Density> {
    let mut pos = PNG_SIGNATURE.len();
    while pos + 8 <= data.len() {
        let length =
            u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]]) as usize;
        let chunk_type = &data[pos + 4..pos + 8];
        let payload_start = pos + 8;
        if payload_start + length + 4 > data.len() {
            return None;
        }
        if chunk_type == b"pHYs" && length == 9 {
            let payload = &data[payload_start..payload_start + 9];
            let x_ppm = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]);
            let y_ppm = u32::from_be_bytes([payload[4], payload[5], payload[6], payload[7]]);
            if payload[8] == 1 && x_ppm > 0 && y_ppm > 0 {
                return Some(Density {
                    x_dpi: x_ppm as f64 / DOTS_PER_METRE_PER_INCH,
                    y_dpi: y_ppm as f64 / DOTS_PER_METRE_PER_INCH,
                });
            }
            return None;
        }
        if chunk_type == b"IDAT" || chunk_type == b"IEND" {
            // pHYs must precede IDAT; stop scanning compressed data
            return None;
        }
        pos = payload_start + length + 4; // skip payload + CRC
    }
    None
}
