use serde::{Deserialize, Serialize};
use std::fmt;

/// Seed derivation scheme written into the first header record.
///
/// - `Legacy` (1): payload seed is the base seed, header stores `-1`
/// - `Timed` (2): payload seed depends on the encode-time timestamp
/// - `PathBound` (3): additionally bound to the absolute file path
/// - `Expiring` (4): path bound and only decodable on the encode date
/// - `Unknown`: any other tag, treated like the base seed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum FormatVersion {
    Legacy,
    Timed,
    PathBound,
    Expiring,
    Unknown(i32),
}

impl FormatVersion {
    pub fn tag(self) -> i32 {
        match self {
            FormatVersion::Legacy => 1,
            FormatVersion::Timed => 2,
            FormatVersion::PathBound => 3,
            FormatVersion::Expiring => 4,
            FormatVersion::Unknown(tag) => tag,
        }
    }

    /// Whether the stored header seed is used as-is on decode. Other
    /// versions discard it and fall back to the base seed.
    pub fn stores_payload_seed(self) -> bool {
        matches!(
            self,
            FormatVersion::Timed | FormatVersion::PathBound | FormatVersion::Expiring
        )
    }

    /// Whether the payload generator is bound to the absolute file path.
    pub fn is_path_bound(self) -> bool {
        matches!(self, FormatVersion::PathBound | FormatVersion::Expiring)
    }
}

impl Default for FormatVersion {
    fn default() -> Self {
        FormatVersion::Timed
    }
}

impl From<i32> for FormatVersion {
    fn from(tag: i32) -> Self {
        match tag {
            1 => FormatVersion::Legacy,
            2 => FormatVersion::Timed,
            3 => FormatVersion::PathBound,
            4 => FormatVersion::Expiring,
            other => FormatVersion::Unknown(other),
        }
    }
}

impl From<FormatVersion> for i32 {
    fn from(version: FormatVersion) -> Self {
        version.tag()
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}
