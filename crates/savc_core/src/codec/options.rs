use serde::{Deserialize, Serialize};

use super::encoding::TextEncoding;
use crate::error::Result;
use crate::seed::FormatVersion;

/// File codec settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecOptions {
    /// File extension without the dot (default: `savc`)
    pub extension: String,
    /// Seed derivation scheme for newly written files (default: 2)
    pub version: FormatVersion,
    /// Encoding lines pass through before storage (default: utf8)
    pub encoding: TextEncoding,
    /// Gzip each payload line before base64 layering (default: true)
    pub compress: bool,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            extension: crate::DEFAULT_EXTENSION.to_string(),
            version: FormatVersion::Timed,
            encoding: TextEncoding::Utf8,
            compress: true,
        }
    }
}

impl CodecOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Plain base-seed files without compression.
    pub fn legacy() -> Self {
        Self { version: FormatVersion::Legacy, compress: false, ..Self::default() }
    }

    /// Files that only decode at their own path on the day they were written.
    pub fn expiring() -> Self {
        Self { version: FormatVersion::Expiring, ..Self::default() }
    }

    pub fn with_version(mut self, version: FormatVersion) -> Self {
        self.version = version;
        self
    }

    pub fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }
}
