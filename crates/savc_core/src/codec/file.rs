use std::ffi::OsString;
use std::fs::{self, rename, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use num_bigint::BigInt;

use super::encoding::TextEncoding;
use super::line::{decode_line, encode_line, TERMINATOR};
use super::options::CodecOptions;
use crate::error::{CodecError, Result};
use crate::rng::LineRng;
use crate::seed::{
    derive_base_seed, derive_payload_seed, generator_seed, Clock, FormatVersion, SystemClock,
};
use crate::slots::resolve_name;
use crate::SEED_PLACEHOLDER;

/// Value returned by guarded header records that could not be read.
const UNREADABLE_FIELD: &str = "-1";

/// Header fields recovered from the first records of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    pub version: FormatVersion,
    /// Seed text from the second record; `-1` for version 1 files
    pub payload_seed: BigInt,
    pub compressed: bool,
    /// False for legacy files written before the compress flag existed
    pub has_compress_flag: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFile {
    pub header: FileHeader,
    pub lines: Vec<String>,
}

/// Newline-terminated records, terminator included. Trailing bytes after
/// the last terminator are not a record.
pub fn split_records(bytes: &[u8]) -> Vec<&[u8]> {
    let mut records = Vec::new();
    let mut start = 0;
    for (i, &byte) in bytes.iter().enumerate() {
        if byte == TERMINATOR {
            records.push(&bytes[start..=i]);
            start = i + 1;
        }
    }
    records
}

/// Encodes `lines` into the full file image for a file stored at `file_path`.
pub fn encode_records<S: AsRef<str>>(
    lines: &[S],
    seed: i64,
    file_path: &Path,
    options: &CodecOptions,
    clock: &dyn Clock,
) -> Result<Vec<u8>> {
    let now = clock.now();
    let version = options.version;
    let encoding = options.encoding;

    let mut header_rng = LineRng::from_seed(&derive_base_seed(seed)?);
    let payload_seed = derive_payload_seed(seed, version, file_path, now)?;
    let stored_seed = match version {
        FormatVersion::Legacy => UNREADABLE_FIELD.to_string(),
        _ => payload_seed.to_string(),
    };
    let flag = if options.compress { "1" } else { "0" };

    let mut out = Vec::new();
    for field in [version.tag().to_string(), stored_seed, flag.to_string()] {
        out.extend(encode_line(&field, &mut header_rng, encoding, false)?);
    }

    let mut payload_rng = LineRng::from_seed(&generator_seed(version, payload_seed, file_path, now)?);
    for line in lines {
        out.extend(encode_line(line.as_ref(), &mut payload_rng, encoding, options.compress)?);
    }

    log::debug!(
        "Encoded {} lines as version {} ({} bytes, compress={})",
        lines.len(),
        version,
        out.len(),
        options.compress
    );
    Ok(out)
}

/// Decodes a file image read from `file_path`.
///
/// `decode_until` limits the number of payload lines; `Some(0)` reads the
/// header only.
pub fn decode_records(
    bytes: &[u8],
    seed: i64,
    file_path: &Path,
    decode_until: Option<usize>,
    encoding: TextEncoding,
    clock: &dyn Clock,
) -> Result<DecodedFile> {
    let records = split_records(bytes);
    if bytes.is_empty() || records.is_empty() {
        return Err(CodecError::format("The file is empty."));
    }
    if bytes.last() != Some(&TERMINATOR) {
        return Err(CodecError::format("The file is truncated: last record has no terminator."));
    }

    let mut header_rng = LineRng::from_seed(&derive_base_seed(seed)?);

    let version_text =
        decode_line(records[0], &mut header_rng, encoding, false, Some(UNREADABLE_FIELD))?;
    let version_tag: i32 = version_text
        .trim()
        .parse()
        .map_err(|_| CodecError::format(format!("Invalid version record '{version_text}'")))?;

    let seed_record = records
        .get(1)
        .ok_or_else(|| CodecError::format("The file has no seed record."))?;
    let seed_text = decode_line(seed_record, &mut header_rng, encoding, false, None)?;
    let stored_seed: BigInt = seed_text
        .trim()
        .parse()
        .map_err(|_| CodecError::format("Invalid seed record"))?;

    let (has_compress_flag, compressed) = match records.get(2) {
        Some(record) => read_compress_flag(record, &mut header_rng, encoding),
        None => (false, false),
    };

    if version_tag == -1 {
        return Err(CodecError::format("The seed of the file cannot be decoded."));
    }

    let version = FormatVersion::from(version_tag);
    let payload_seed = if version.stores_payload_seed() {
        stored_seed.clone()
    } else {
        derive_base_seed(seed)?
    };
    let now = clock.now();
    let mut payload_rng = LineRng::from_seed(&generator_seed(version, payload_seed, file_path, now)?);

    let first_payload = if has_compress_flag { 3 } else { 2 };
    let lines = records
        .iter()
        .skip(first_payload)
        .take(decode_until.unwrap_or(usize::MAX))
        .map(|record| decode_line(record, &mut payload_rng, encoding, compressed, None))
        .collect::<Result<Vec<_>>>()?;

    Ok(DecodedFile {
        header: FileHeader { version, payload_seed: stored_seed, compressed, has_compress_flag },
        lines,
    })
}

/// `(has_flag, compressed)`. A garbled third record means the file predates
/// the flag and the record is payload.
fn read_compress_flag(record: &[u8], rng: &mut LineRng, encoding: TextEncoding) -> (bool, bool) {
    let text = match decode_line(record, rng, encoding, false, Some(UNREADABLE_FIELD)) {
        Ok(text) => text,
        Err(e) => {
            log::warn!("Compress flag record unreadable, assuming legacy layout: {}", e);
            return (false, false);
        }
    };
    match text.trim().parse::<i32>() {
        Ok(-1) => {
            log::warn!("No compress flag record, assuming legacy layout");
            (false, false)
        }
        Ok(flag) => (true, flag == 1),
        Err(_) => {
            log::warn!("Compress flag record is not a number, assuming legacy layout");
            (false, false)
        }
    }
}

/// Reads and writes encoded files on disk.
pub struct FileCodec {
    options: CodecOptions,
    clock: Box<dyn Clock>,
}

impl FileCodec {
    pub fn new(options: CodecOptions) -> Self {
        Self { options, clock: Box::new(SystemClock) }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn options(&self) -> &CodecOptions {
        &self.options
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    /// `<base>.<ext>`
    pub fn file_path(&self, base: impl AsRef<Path>) -> PathBuf {
        let mut name = OsString::from(base.as_ref().as_os_str());
        name.push(".");
        name.push(&self.options.extension);
        PathBuf::from(name)
    }

    /// File path for `base` with every `*` replaced by `seed`.
    pub fn seeded_path(&self, base: impl AsRef<Path>, seed: i64) -> PathBuf {
        let base = base.as_ref();
        match base.to_str() {
            Some(text) if text.contains(SEED_PLACEHOLDER) => {
                self.file_path(resolve_name(text, seed))
            }
            _ => self.file_path(base),
        }
    }

    /// Encodes `lines` into the file for `base` and returns its path.
    ///
    /// The image is written to a sibling `.tmp` file first and renamed over
    /// the target once it is synced.
    pub fn encode_file<S: AsRef<str>>(
        &self,
        lines: &[S],
        seed: i64,
        base: impl AsRef<Path>,
    ) -> Result<PathBuf> {
        let path = self.seeded_path(base, seed);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let data = encode_records(lines, seed, &path, &self.options, self.clock.as_ref())?;

        let temp_path = temp_path_for(&path);
        if let Err(e) = write_synced(&temp_path, &data).and_then(|()| rename(&temp_path, &path)) {
            if temp_path.is_file() {
                let _ = fs::remove_file(&temp_path);
            }
            return Err(e.into());
        }

        log::info!("Encoded {} lines to {:?} (version {})", lines.len(), path, self.options.version);
        Ok(path)
    }

    pub fn decode_file(
        &self,
        seed: i64,
        base: impl AsRef<Path>,
        decode_until: Option<usize>,
    ) -> Result<Vec<String>> {
        Ok(self.read_file(seed, base, decode_until)?.lines)
    }

    pub fn read_file(
        &self,
        seed: i64,
        base: impl AsRef<Path>,
        decode_until: Option<usize>,
    ) -> Result<DecodedFile> {
        let path = self.seeded_path(base, seed);
        self.read_path(&path, seed, decode_until)
    }

    /// Decodes the file at `path` exactly, without extension or placeholder handling.
    pub fn read_path(
        &self,
        path: &Path,
        seed: i64,
        decode_until: Option<usize>,
    ) -> Result<DecodedFile> {
        let data = fs::read(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => CodecError::FileNotFound { path: path.display().to_string() },
            _ => CodecError::Io(e),
        })?;

        let decoded = decode_records(
            &data,
            seed,
            path,
            decode_until,
            self.options.encoding,
            self.clock.as_ref(),
        )?;
        log::debug!("Decoded {} lines from {:?} ({} bytes)", decoded.lines.len(), path, data.len());
        Ok(decoded)
    }
}

impl Default for FileCodec {
    fn default() -> Self {
        Self::new(CodecOptions::default())
    }
}

fn write_synced(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(data)?;
    file.flush()?;
    file.sync_all()
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::FixedClock;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn instant(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, s).unwrap()
    }

    fn noon() -> NaiveDateTime {
        instant(2026, 10, 18, 12, 0, 0)
    }

    fn codec(options: CodecOptions, now: NaiveDateTime) -> FileCodec {
        FileCodec::new(options).with_clock(FixedClock(now))
    }

    fn sample_lines() -> Vec<String> {
        vec![
            "player=Ari".to_string(),
            "gold=1200".to_string(),
            String::new(),
            "inventory=sword,shield,potion x3".to_string(),
            "note=caf\u{00e9} \u{4e16}\u{754c}".to_string(),
        ]
    }

    #[test]
    fn test_hello_legacy_roundtrip() {
        let dir = TempDir::new().unwrap();
        let codec = codec(CodecOptions::legacy(), noon());

        let path = codec.encode_file(&["hello"], 1, dir.path().join("file1")).unwrap();
        assert_eq!(path, dir.path().join("file1.savc"));

        let decoded = codec.read_file(1, dir.path().join("file1"), None).unwrap();
        assert_eq!(decoded.lines, vec!["hello"]);
        assert_eq!(decoded.header.version, FormatVersion::Legacy);
        assert_eq!(decoded.header.payload_seed, BigInt::from(-1));
        assert!(decoded.header.has_compress_flag);
        assert!(!decoded.header.compressed);
    }

    #[test]
    fn test_roundtrip_all_versions() {
        let dir = TempDir::new().unwrap();
        let lines = sample_lines();
        let versions = [
            FormatVersion::Legacy,
            FormatVersion::Timed,
            FormatVersion::PathBound,
            FormatVersion::Expiring,
            FormatVersion::Unknown(9),
        ];
        for version in versions {
            for compress in [false, true] {
                let options = CodecOptions::default().with_version(version).with_compress(compress);
                let codec = codec(options, noon());
                let base = dir.path().join(format!("v{}_{}", version, compress));

                codec.encode_file(&lines, 7, &base).unwrap();
                let decoded = codec.read_file(7, &base, None).unwrap();
                assert_eq!(decoded.lines, lines, "version {version} compress {compress}");
                assert_eq!(decoded.header.version, version);
                assert_eq!(decoded.header.compressed, compress);
            }
        }
    }

    #[test]
    fn test_placeholder_is_replaced_by_seed() {
        let dir = TempDir::new().unwrap();
        let codec = codec(CodecOptions::default(), noon());
        let path = codec.encode_file(&["x"], 12, dir.path().join("slot*")).unwrap();
        assert_eq!(path, dir.path().join("slot12.savc"));
        assert_eq!(codec.decode_file(12, dir.path().join("slot*"), None).unwrap(), vec!["x"]);
    }

    #[test]
    fn test_timed_files_store_different_seeds() {
        let dir = TempDir::new().unwrap();
        let lines = sample_lines();
        let first = codec(CodecOptions::default(), instant(2026, 10, 18, 12, 0, 0));
        let second = codec(CodecOptions::default(), instant(2026, 10, 19, 12, 0, 0));

        first.encode_file(&lines, 1, dir.path().join("a")).unwrap();
        second.encode_file(&lines, 1, dir.path().join("b")).unwrap();

        let a = first.read_file(1, dir.path().join("a"), None).unwrap();
        let b = first.read_file(1, dir.path().join("b"), None).unwrap();
        assert_eq!(a.header.payload_seed, BigInt::from(517_300_519u64));
        assert_eq!(b.header.payload_seed, BigInt::from(517_808_571u64));
        assert_eq!(a.lines, lines);
        assert_eq!(b.lines, lines);
    }

    #[test]
    fn test_timed_seed_collapses_to_zero_for_large_seeds() {
        let dir = TempDir::new().unwrap();
        let lines = sample_lines();
        for seed in [10, -12, 100, i64::MAX] {
            let codec = codec(CodecOptions::default(), instant(2026, 10, 18, 12, 0, 0));
            let base = dir.path().join(format!("large{seed}"));
            codec.encode_file(&lines, seed, &base).unwrap();

            let decoded = codec.read_file(seed, &base, None).unwrap();
            assert_eq!(decoded.header.payload_seed, BigInt::from(0));
            assert_eq!(decoded.lines, lines);
        }
    }

    #[test]
    fn test_expiring_file_only_decodes_on_its_date() {
        let dir = TempDir::new().unwrap();
        let lines = sample_lines();
        let base = dir.path().join("daily");

        codec(CodecOptions::expiring(), instant(2026, 10, 18, 23, 59, 0))
            .encode_file(&lines, 3, &base)
            .unwrap();

        let same_day = codec(CodecOptions::expiring(), instant(2026, 10, 18, 8, 0, 0));
        assert_eq!(same_day.decode_file(3, &base, None).unwrap(), lines);

        let next_day = codec(CodecOptions::expiring(), instant(2026, 10, 19, 0, 1, 0));
        match next_day.decode_file(3, &base, None) {
            Ok(decoded) => assert_ne!(decoded, lines),
            Err(e) => assert!(e.is_format_error(), "unexpected error {e}"),
        }
    }

    #[test]
    fn test_path_bound_file_breaks_when_moved() {
        let dir = TempDir::new().unwrap();
        let lines = sample_lines();
        let options = CodecOptions::default().with_version(FormatVersion::PathBound);
        let codec = codec(options, noon());

        let original = codec.encode_file(&lines, 11, dir.path().join("home")).unwrap();
        assert_eq!(codec.decode_file(11, dir.path().join("home"), None).unwrap(), lines);

        fs::copy(&original, dir.path().join("moved.savc")).unwrap();
        match codec.decode_file(11, dir.path().join("moved"), None) {
            Ok(decoded) => assert_ne!(decoded, lines),
            Err(e) => assert!(e.is_format_error(), "unexpected error {e}"),
        }
    }

    #[test]
    fn test_header_only_decode() {
        let dir = TempDir::new().unwrap();
        let options = CodecOptions::default().with_version(FormatVersion::PathBound);
        let codec = codec(options, noon());
        codec.encode_file(&sample_lines(), 2, dir.path().join("h")).unwrap();

        let header_only = codec.read_file(2, dir.path().join("h"), Some(0)).unwrap();
        assert!(header_only.lines.is_empty());
        assert_eq!(header_only.header.version, FormatVersion::PathBound);
        assert!(header_only.header.compressed);
        assert!(header_only.header.has_compress_flag);

        let first_two = codec.decode_file(2, dir.path().join("h"), Some(2)).unwrap();
        assert_eq!(first_two, sample_lines()[..2].to_vec());
    }

    #[test]
    fn test_wrong_seed_is_rejected() {
        let dir = TempDir::new().unwrap();
        let codec = codec(CodecOptions::default(), noon());
        codec.encode_file(&sample_lines(), 1, dir.path().join("s")).unwrap();

        let err = codec.decode_file(2, dir.path().join("s"), None).unwrap_err();
        assert!(err.is_format_error(), "unexpected error {err}");
    }

    #[test]
    fn test_legacy_layout_without_flag_record() {
        let base_seed = derive_base_seed(4).unwrap();
        let long_line = "l".repeat(120);

        let mut header_rng = LineRng::from_seed(&base_seed);
        let mut bytes = encode_line("1", &mut header_rng, TextEncoding::Utf8, false).unwrap();
        bytes.extend(encode_line("-1", &mut header_rng, TextEncoding::Utf8, false).unwrap());
        let mut payload_rng = LineRng::from_seed(&base_seed);
        for line in [long_line.as_str(), "second"] {
            bytes.extend(encode_line(line, &mut payload_rng, TextEncoding::Utf8, false).unwrap());
        }

        let clock = FixedClock(noon());
        let decoded =
            decode_records(&bytes, 4, Path::new("old.savc"), None, TextEncoding::Utf8, &clock)
                .unwrap();
        assert!(!decoded.header.has_compress_flag);
        assert_eq!(decoded.lines, vec![long_line, "second".to_string()]);
    }

    #[test]
    fn test_unreadable_version_record() {
        let mut rng = LineRng::from_seed(&derive_base_seed(1).unwrap());
        let bytes = encode_line(&"9".repeat(80), &mut rng, TextEncoding::Utf8, false).unwrap();
        let mut bytes = bytes;
        bytes.extend(encode_line("0", &mut rng, TextEncoding::Utf8, false).unwrap());

        let clock = FixedClock(noon());
        let err = decode_records(&bytes, 1, Path::new("v.savc"), None, TextEncoding::Utf8, &clock)
            .unwrap_err();
        assert_eq!(err.to_string(), "Format error: The seed of the file cannot be decoded.");
    }

    #[test]
    fn test_empty_and_truncated_files() {
        let clock = FixedClock(noon());
        let path = Path::new("e.savc");

        let err = decode_records(&[], 1, path, None, TextEncoding::Utf8, &clock).unwrap_err();
        assert_eq!(err.to_string(), "Format error: The file is empty.");

        let err = decode_records(b"no terminator", 1, path, None, TextEncoding::Utf8, &clock)
            .unwrap_err();
        assert!(err.is_format_error());

        let mut rng = LineRng::from_seed(&derive_base_seed(1).unwrap());
        let only_version = encode_line("2", &mut rng, TextEncoding::Utf8, false).unwrap();
        let err = decode_records(&only_version, 1, path, None, TextEncoding::Utf8, &clock)
            .unwrap_err();
        assert!(err.is_format_error());
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = FileCodec::default().decode_file(1, dir.path().join("absent"), None).unwrap_err();
        assert!(matches!(err, CodecError::FileNotFound { .. }));
    }

    #[test]
    fn test_atomic_write_leaves_no_temp_file() {
        let dir = TempDir::new().unwrap();
        let codec = codec(CodecOptions::default(), noon());
        let path = codec.encode_file(&sample_lines(), 1, dir.path().join("nested/dir/save")).unwrap();
        assert!(path.exists());
        assert!(!temp_path_for(&path).exists());

        // overwrite in place
        codec.encode_file(&["replaced"], 1, dir.path().join("nested/dir/save")).unwrap();
        assert_eq!(codec.decode_file(1, dir.path().join("nested/dir/save"), None).unwrap(), vec!["replaced"]);
    }

    #[test]
    fn test_zero_seed_cannot_derive_timed_seed() {
        let dir = TempDir::new().unwrap();
        let err = codec(CodecOptions::default(), noon())
            .encode_file(&["x"], 0, dir.path().join("zero"))
            .unwrap_err();
        assert!(matches!(err, CodecError::SeedDerivation { version: 2, .. }));
    }

    #[test]
    fn test_missing_final_terminator_is_rejected() {
        let clock = FixedClock(noon());
        let path = Path::new("/saves/cut.savc");
        let mut bytes =
            encode_records(&["a", "b"], 1, path, &CodecOptions::legacy(), &clock).unwrap();
        bytes.pop();

        let err = decode_records(&bytes, 1, path, None, TextEncoding::Utf8, &clock).unwrap_err();
        assert!(err.is_format_error());
        assert!(err.to_string().contains("truncated"), "unexpected error {err}");
    }

    #[test]
    fn test_failed_write_removes_temp_file() {
        let dir = TempDir::new().unwrap();
        let codec = codec(CodecOptions::default(), noon());
        // a non-empty directory at the target makes the final rename fail
        let target = dir.path().join("blocked.savc");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep"), "x").unwrap();

        let err = codec.encode_file(&["x"], 1, dir.path().join("blocked")).unwrap_err();
        assert!(matches!(err, CodecError::Io(_)));
        assert!(!temp_path_for(&target).exists());
        assert!(target.join("keep").exists());
    }

    #[test]
    fn test_split_records() {
        let records = split_records(b"ab\n\ncd\nleftover");
        assert_eq!(records, vec![&b"ab\n"[..], &b"\n"[..], &b"cd\n"[..]]);
        assert!(split_records(b"").is_empty());
    }

    #[test]
    fn test_no_terminator_inside_records() {
        let codec = codec(CodecOptions::default().with_version(FormatVersion::PathBound), noon());
        let bytes = encode_records(
            &sample_lines(),
            21,
            Path::new("/saves/file21.savc"),
            codec.options(),
            &FixedClock(noon()),
        )
        .unwrap();
        assert_eq!(split_records(&bytes).len(), 3 + sample_lines().len());
        assert_eq!(bytes.last(), Some(&TERMINATOR));
    }
}
