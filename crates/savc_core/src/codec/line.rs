//! One-line obfuscation.
//!
//! A line is converted to UTF-8, optionally gzipped, wrapped in 2-4 layers of
//! standard base64 and then every byte is shifted by a generator draw. The
//! layer count is always the first draw of a line, followed by one draw per
//! output byte, so encoder and decoder stay in lock-step as long as they
//! share a generator seed and process records in the same order.

use base64::{engine::general_purpose, Engine as _};

use super::compress::{compress, decompress};
use super::encoding::TextEncoding;
use crate::error::Result;
use crate::rng::LineRng;

/// Record terminator.
pub const TERMINATOR: u8 = b'\n';

/// Buffers longer than this are rejected by the header guard.
pub const MAX_HEADER_FIELD_LEN: usize = 100;

const LAYERS_LOW: i32 = 2;
const LAYERS_HIGH: i32 = 5;
const SHIFT_LOW: i32 = -32;
const SHIFT_HIGH: i32 = 134;

pub fn encode_line(
    text: &str,
    rng: &mut LineRng,
    encoding: TextEncoding,
    compressed: bool,
) -> Result<Vec<u8>> {
    let layers = rng.next(LAYERS_LOW, LAYERS_HIGH);

    let mut buffer = encoding.encode_utf8(text)?;
    if compressed {
        buffer = compress(&buffer)?;
    }

    let mut record = shift_bytes(wrap_layers(buffer, layers), rng);
    record.push(TERMINATOR);
    Ok(record)
}

/// Inverts [`encode_line`].
///
/// With `too_long` set, a buffer longer than [`MAX_HEADER_FIELD_LEN`] before
/// any base64 pass returns `too_long` instead of decoding further. Header
/// records use this to reject records encoded under another seed.
pub fn decode_line(
    record: &[u8],
    rng: &mut LineRng,
    encoding: TextEncoding,
    decompressed: bool,
    too_long: Option<&str>,
) -> Result<String> {
    let layers = rng.next(LAYERS_LOW, LAYERS_HIGH);

    let payload: Vec<u8> = record.iter().copied().filter(|&b| b != TERMINATOR).collect();
    let limit = too_long.map(|_| MAX_HEADER_FIELD_LEN);

    let Some(mut buffer) = unwrap_layers(unshift_bytes(payload, rng), layers, limit)? else {
        return Ok(too_long.unwrap_or_default().to_string());
    };
    if decompressed {
        buffer = decompress(&buffer)?;
    }
    encoding.decode_utf8(buffer)
}

/// Applies standard base64 `layers` times.
pub fn wrap_layers(bytes: Vec<u8>, layers: i32) -> Vec<u8> {
    (0..layers).fold(bytes, |acc, _| general_purpose::STANDARD.encode(acc).into_bytes())
}

/// Removes `layers` base64 layers. Returns `None` when `limit` is set and the
/// buffer exceeds it before a pass.
pub fn unwrap_layers(bytes: Vec<u8>, layers: i32, limit: Option<usize>) -> Result<Option<Vec<u8>>> {
    let mut buffer = bytes;
    for _ in 0..layers {
        if limit.is_some_and(|max| buffer.len() > max) {
            return Ok(None);
        }
        buffer = general_purpose::STANDARD.decode(&buffer)?;
    }
    Ok(Some(buffer))
}

pub fn shift_bytes(bytes: Vec<u8>, rng: &mut LineRng) -> Vec<u8> {
    bytes
        .into_iter()
        .map(|b| shift(b, rng.next(SHIFT_LOW, SHIFT_HIGH)))
        .collect()
}

pub fn unshift_bytes(bytes: Vec<u8>, rng: &mut LineRng) -> Vec<u8> {
    bytes
        .into_iter()
        .map(|b| shift(b, -rng.next(SHIFT_LOW, SHIFT_HIGH)))
        .collect()
}

fn shift(byte: u8, delta: i32) -> u8 {
    (i32::from(byte) + delta).rem_euclid(256) as u8
}
