//! Numbered save slots in a directory.
//!
//! A slot pattern such as `file*` names one file per slot: the `*` is
//! replaced by the slot number, which is also the seed the file was encoded
//! with. Directories can also be scanned by extension alone with one shared
//! seed.

pub mod natural;

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;

pub use natural::{natural_cmp, natural_sort};

use crate::codec::FileCodec;
use crate::error::{CodecError, Result};
use crate::SEED_PLACEHOLDER;

/// Replaces every `*` in `pattern` with `number`.
pub fn resolve_name(pattern: &str, number: i64) -> String {
    pattern.replace(SEED_PLACEHOLDER, &number.to_string())
}

/// One scanned file. `lines` is `None` when the file could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotEntry {
    /// Slot number for pattern scans, file stem for extension scans
    pub name: String,
    pub lines: Option<Vec<String>>,
}

impl SlotEntry {
    pub fn slot(&self) -> Option<i64> {
        self.name.parse().ok()
    }

    pub fn is_corrupted(&self) -> bool {
        self.lines.is_none()
    }
}

/// Smallest positive slot not taken by `entries`, or `None` once it would
/// pass `max_slot`.
pub fn next_free_slot(entries: &[SlotEntry], max_slot: Option<i64>) -> Option<i64> {
    let used: BTreeSet<i64> = entries.iter().filter_map(SlotEntry::slot).collect();
    let free = (1..).find(|slot| !used.contains(slot))?;
    match max_slot {
        Some(max) if free > max => None,
        _ => Some(free),
    }
}

/// Lowest and highest numeric slot names.
pub fn slot_range(entries: &[SlotEntry]) -> Option<(i64, i64)> {
    let mut slots = entries.iter().filter_map(SlotEntry::slot);
    let first = slots.next()?;
    Some(slots.fold((first, first), |(lo, hi), s| (lo.min(s), hi.max(s))))
}

pub struct SlotDirectory {
    dir: PathBuf,
    codec: FileCodec,
}

impl SlotDirectory {
    pub fn new(dir: impl Into<PathBuf>, codec: FileCodec) -> Self {
        Self { dir: dir.into(), codec }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn codec(&self) -> &FileCodec {
        &self.codec
    }

    /// Path of the file for `slot` under `pattern`.
    pub fn slot_path(&self, pattern: &str, slot: i64) -> PathBuf {
        self.dir.join(self.codec.file_path(resolve_name(pattern, slot)))
    }

    /// Encodes `lines` into the file for `slot`, using the slot as the seed.
    pub fn write_slot<S: AsRef<str>>(&self, pattern: &str, slot: i64, lines: &[S]) -> Result<PathBuf> {
        self.codec.encode_file(lines, slot, self.dir.join(resolve_name(pattern, slot)))
    }

    /// Decodes every file matching `pattern`, each with its own slot number
    /// as the seed. Slots above `max_slot` are skipped.
    pub fn read_by_pattern(
        &self,
        pattern: &str,
        max_slot: Option<i64>,
        decode_until: Option<usize>,
    ) -> Result<Vec<SlotEntry>> {
        let matcher = self.pattern_regex(pattern)?;

        let mut slots = Vec::new();
        for name in self.file_names()? {
            let Some(slot) = matched_slot(&matcher, &name) else {
                continue;
            };
            if max_slot.map_or(true, |max| slot <= max) {
                slots.push(slot);
            }
        }
        // numeric order is the natural order of the slot names
        slots.sort_unstable();
        slots.dedup();

        let mut entries = Vec::with_capacity(slots.len());
        for slot in slots {
            let path = self.slot_path(pattern, slot);
            if let Some(entry) = self.scan_file(slot.to_string(), &path, slot, decode_until)? {
                entries.push(entry);
            }
        }
        log::debug!("Pattern scan of {:?} found {} slots", self.dir, entries.len());
        Ok(entries)
    }

    /// Decodes up to `max_files` files carrying the codec extension, all with
    /// the same `seed`.
    pub fn read_by_seed(
        &self,
        seed: i64,
        max_files: Option<usize>,
        decode_until: Option<usize>,
    ) -> Result<Vec<SlotEntry>> {
        let suffix = format!(".{}", self.codec.options().extension);

        let mut stems: Vec<String> = self
            .file_names()?
            .into_iter()
            .filter_map(|name| name.strip_suffix(&suffix).filter(|s| !s.is_empty()).map(str::to_string))
            .collect();
        natural_sort(&mut stems);
        stems.truncate(max_files.unwrap_or(usize::MAX));

        let mut entries = Vec::with_capacity(stems.len());
        for stem in stems {
            let path = self.dir.join(self.codec.file_path(&stem));
            if let Some(entry) = self.scan_file(stem, &path, seed, decode_until)? {
                entries.push(entry);
            }
        }
        log::debug!("Extension scan of {:?} found {} files", self.dir, entries.len());
        Ok(entries)
    }

    /// Removes the file for `slot`. Returns false when there was none.
    pub fn delete_slot(&self, pattern: &str, slot: i64) -> Result<bool> {
        let path = self.slot_path(pattern, slot);
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)?;
        log::info!("Deleted save slot {} ({:?})", slot, path);
        Ok(true)
    }

    fn scan_file(
        &self,
        name: String,
        path: &Path,
        seed: i64,
        decode_until: Option<usize>,
    ) -> Result<Option<SlotEntry>> {
        match self.codec.read_path(path, seed, decode_until) {
            Ok(decoded) => Ok(Some(SlotEntry { name, lines: Some(decoded.lines) })),
            Err(e) if e.is_format_error() => {
                log::warn!("Save file {:?} is corrupted: {}", path, e);
                Ok(Some(SlotEntry { name, lines: None }))
            }
            Err(CodecError::FileNotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn pattern_regex(&self, pattern: &str) -> Result<Regex> {
        if !pattern.contains(SEED_PLACEHOLDER) {
            return Err(CodecError::InvalidReadArgs(format!(
                "pattern '{pattern}' has no '{SEED_PLACEHOLDER}' placeholder"
            )));
        }
        let file_name = format!("{}.{}", pattern, self.codec.options().extension);
        let body = file_name
            .split(SEED_PLACEHOLDER)
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(r"(\d+)");
        Regex::new(&format!("^{body}$")).map_err(|e| CodecError::InvalidReadArgs(e.to_string()))
    }

    fn file_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if let Ok(name) = entry.file_name().into_string() {
                names.push(name);
            }
        }
        Ok(names)
    }
}

/// Slot number when every placeholder captured the same digits.
fn matched_slot(matcher: &Regex, name: &str) -> Option<i64> {
    let captures = matcher.captures(name)?;
    let mut groups = captures.iter().skip(1).flatten().map(|m| m.as_str());
    let first = groups.next()?;
    if groups.any(|g| g != first) {
        return None;
    }
    first.parse().ok()
}
