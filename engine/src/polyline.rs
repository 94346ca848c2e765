//! Encoded polyline codec (5-bit chunks, 1e5 precision, zig-zag deltas).

use crate::models::GeoPoint;

const PRECISION: f64 = 1e5;
const CHUNK_BITS: u32 = 5;
const CHUNK_MASK: i64 = 0x1f;
const CONTINUATION: i64 = 0x20;
const ALPHABET_OFFSET: u8 = 63;
/// Largest byte a well-formed path can contain (`0x3f | 0x20` shifted by the offset).
const ALPHABET_MAX: u8 = ALPHABET_OFFSET + 0x3f;
/// An i64 accumulator overflows after 13 chunks.
const MAX_SHIFT: u32 = 60;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolylineError {
    #[error("malformed path: input ended inside the value starting at byte {offset}")]
    Malformed { offset: usize },
    #[error("malformed path: byte {byte:#04x} at offset {offset} is outside the path alphabet")]
    InvalidCharacter { offset: usize, byte: u8 },
    #[error("malformed path: value starting at byte {offset} does not fit in 64 bits")]
    Overflow { offset: usize },
}

/// Decode a provider path string into points, in input order.
///
/// Empty input yields an empty path. Truncated input is an error rather than
/// a shortened path: a dangling latitude with no longitude counts as truncated.
pub fn decode(encoded: &str) -> Result<Vec<GeoPoint>, PolylineError> {
    let bytes = encoded.as_bytes();
    // Every point needs at least two bytes.
    let mut points = Vec::with_capacity(bytes.len() / 2);
    let mut index = 0;
    let mut lat = 0i64;
    let mut lng = 0i64;

    while index < bytes.len() {
        lat = accumulate(lat, bytes, &mut index)?;
        lng = accumulate(lng, bytes, &mut index)?;
        points.push(GeoPoint {
            latitude: lat as f64 / PRECISION,
            longitude: lng as f64 / PRECISION,
        });
    }

    Ok(points)
}

/// Inverse of [`decode`]. Coordinates are rounded to 5 decimal places.
pub fn encode(points: &[GeoPoint]) -> String {
    let mut out = String::with_capacity(points.len() * 8);
    let mut prev_lat = 0i64;
    let mut prev_lng = 0i64;

    for point in points {
        let lat = (point.latitude * PRECISION).round() as i64;
        let lng = (point.longitude * PRECISION).round() as i64;
        push_value(lat - prev_lat, &mut out);
        push_value(lng - prev_lng, &mut out);
        prev_lat = lat;
        prev_lng = lng;
    }

    out
}

/// Apply the next delta to `total`, rejecting sums that leave the i64 range.
fn accumulate(total: i64, bytes: &[u8], index: &mut usize) -> Result<i64, PolylineError> {
    let offset = *index;
    let delta = next_value(bytes, index)?;
    total
        .checked_add(delta)
        .ok_or(PolylineError::Overflow { offset })
}

fn next_value(bytes: &[u8], index: &mut usize) -> Result<i64, PolylineError> {
    let start = *index;
    let mut result = 0i64;
    let mut shift = 0u32;

    loop {
        let Some(&byte) = bytes.get(*index) else {
            return Err(PolylineError::Malformed { offset: start });
        };
        if !(ALPHABET_OFFSET..=ALPHABET_MAX).contains(&byte) {
            return Err(PolylineError::InvalidCharacter {
                offset: *index,
                byte,
            });
        }
        if shift > MAX_SHIFT {
            return Err(PolylineError::Overflow { offset: start });
        }

        let chunk = i64::from(byte - ALPHABET_OFFSET);
        *index += 1;
        result |= (chunk & CHUNK_MASK) << shift;
        shift += CHUNK_BITS;

        if chunk & CONTINUATION == 0 {
            break;
        }
    }

    Ok(if result & 1 == 1 {
        !(result >> 1)
    } else {
        result >> 1
    })
}

fn push_value(value: i64, out: &mut String) {
    let mut zigzag = if value < 0 { !(value << 1) } else { value << 1 };
    while zigzag >= CONTINUATION {
        out.push(char::from(
            ((CONTINUATION | (zigzag & CHUNK_MASK)) as u8) + ALPHABET_OFFSET,
        ));
        zigzag >>= CHUNK_BITS;
    }
    out.push(char::from(zigzag as u8 + ALPHABET_OFFSET));
}
