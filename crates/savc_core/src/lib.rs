//! # savc_core - Seed-Keyed Save File Codec
//!
//! Turns text lines into an obfuscated byte file and back, driven by a user
//! seed and a format version. This is obfuscation, not encryption.
//!
//! ## Format versions
//! - 1: payload keyed by the seed alone
//! - 2: payload seed mixed with the encode timestamp and stored in the header
//! - 3: additionally bound to the absolute path of the file
//! - 4: like 3, and only decodable on the calendar day it was written
//!
//! ## Usage
//! ```rust
//! use savc_core::{CodecOptions, FileCodec};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let codec = FileCodec::new(CodecOptions::default());
//! codec.encode_file(&["hp=10", "gold=3"], 7, dir.path().join("file*")).unwrap();
//!
//! let lines = codec.decode_file(7, dir.path().join("file*"), None).unwrap();
//! assert_eq!(lines, ["hp=10", "gold=3"]);
//! ```

pub mod codec;
pub mod error;
pub mod math;
pub mod rng;
pub mod seed;
pub mod slots;

pub use codec::{CodecOptions, DecodedFile, FileCodec, FileHeader, TextEncoding};
pub use error::{CodecError, Result};
pub use rng::LineRng;
pub use seed::{Clock, FixedClock, FormatVersion, SystemClock};
pub use slots::{next_free_slot, resolve_name, slot_range, SlotDirectory, SlotEntry};

pub const DEFAULT_SEED: i64 = 1;
pub const DEFAULT_EXTENSION: &str = "savc";
pub const DEFAULT_PATTERN: &str = "file*";
/// Stands for the seed or slot number in file name patterns.
pub const SEED_PLACEHOLDER: char = '*';
