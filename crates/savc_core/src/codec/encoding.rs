use serde::{Deserialize, Serialize};

use crate::error::{CodecError, Result};

const REPLACEMENT: u8 = b'?';

/// Text encoding a line passes through before it is stored as UTF-8.
///
/// Characters the encoding cannot represent are replaced with `?`, so the
/// round trip is only lossless for text the encoding can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextEncoding {
    #[default]
    Utf8,
    Utf16Le,
    Utf16Be,
    Latin1,
    Ascii,
}

impl TextEncoding {
    /// Text as bytes in this encoding.
    pub fn encode(self, text: &str) -> Vec<u8> {
        match self {
            TextEncoding::Utf8 => text.as_bytes().to_vec(),
            TextEncoding::Utf16Le => text.encode_utf16().flat_map(u16::to_le_bytes).collect(),
            TextEncoding::Utf16Be => text.encode_utf16().flat_map(u16::to_be_bytes).collect(),
            TextEncoding::Latin1 => text
                .chars()
                .map(|c| u8::try_from(u32::from(c)).unwrap_or(REPLACEMENT))
                .collect(),
            TextEncoding::Ascii => text
                .chars()
                .map(|c| if c.is_ascii() { c as u8 } else { REPLACEMENT })
                .collect(),
        }
    }

    /// Bytes in this encoding back to text.
    pub fn decode(self, bytes: &[u8]) -> Result<String> {
        match self {
            TextEncoding::Utf8 => String::from_utf8(bytes.to_vec())
                .map_err(|e| CodecError::Encoding(format!("invalid utf-8: {e}"))),
            TextEncoding::Utf16Le => decode_utf16(bytes, u16::from_le_bytes),
            TextEncoding::Utf16Be => decode_utf16(bytes, u16::from_be_bytes),
            TextEncoding::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
            TextEncoding::Ascii => Ok(bytes
                .iter()
                .map(|&b| if b.is_ascii() { char::from(b) } else { '?' })
                .collect()),
        }
    }

    /// Text pushed through this encoding and re-expressed as UTF-8 bytes.
    pub fn encode_utf8(self, text: &str) -> Result<Vec<u8>> {
        match self {
            TextEncoding::Utf8 => Ok(text.as_bytes().to_vec()),
            _ => Ok(self.decode(&self.encode(text))?.into_bytes()),
        }
    }

    /// UTF-8 bytes read back through this encoding.
    pub fn decode_utf8(self, bytes: Vec<u8>) -> Result<String> {
        let text = String::from_utf8(bytes)
            .map_err(|e| CodecError::Encoding(format!("invalid utf-8: {e}")))?;
        match self {
            TextEncoding::Utf8 => Ok(text),
            _ => self.decode(&self.encode(&text)),
        }
    }
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> Result<String> {
    if bytes.len() % 2 != 0 {
        return Err(CodecError::Encoding(format!(
            "odd utf-16 byte length {}",
            bytes.len()
        )));
    }
    let units = bytes.chunks_exact(2).map(|pair| unit([pair[0], pair[1]]));
    Ok(char::decode_utf16(units)
        .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect())
}
