//! Line and file encoding.

pub mod compress;
pub mod encoding;
pub mod file;
pub mod line;
pub mod options;

pub use encoding::TextEncoding;
pub use file::{decode_records, encode_records, split_records, DecodedFile, FileCodec, FileHeader};
pub use line::{decode_line, encode_line, MAX_HEADER_FIELD_LEN, TERMINATOR};
pub use options::CodecOptions;
