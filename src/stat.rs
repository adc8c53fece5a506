//! Projection of engine stat records into caller-facing file info

use crate::engine::{FileAttributes, RawAttributes};
use chrono::{DateTime, Utc};
use std::fmt;

/// Unix-style mode: type bit plus permission bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMode(u32);

impl FileMode {
    /// Directory type bit
    pub const DIR: u32 = 0o040000;

    /// Derive a mode from SMB attributes
    pub fn from_attributes(attributes: FileAttributes) -> Self {
        let mut mode = if attributes.contains(FileAttributes::READONLY) {
            0o444
        } else {
            0o666
        };
        if attributes.contains(FileAttributes::DIRECTORY) {
            mode |= Self::DIR | 0o111;
        }
        FileMode(mode)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn is_dir(self) -> bool {
        self.0 & Self::DIR != 0
    }

    /// Permission bits only
    pub fn permissions(self) -> u32 {
        self.0 & 0o777
    }

    pub fn is_read_only(self) -> bool {
        self.0 & 0o222 == 0
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_dir() { 'd' } else { '-' };
        let mut text = String::with_capacity(10);
        text.push(kind);
        for shift in [6, 3, 0] {
            let bits = (self.0 >> shift) & 0o7;
            text.push(if bits & 0o4 != 0 { 'r' } else { '-' });
            text.push(if bits & 0o2 != 0 { 'w' } else { '-' });
            text.push(if bits & 0o1 != 0 { 'x' } else { '-' });
        }
        f.write_str(&text)
    }
}

/// Metadata for an open handle or a directory entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    name: String,
    is_dir: bool,
    mod_time: DateTime<Utc>,
    mode: FileMode,
    size: u64,
}

impl FileInfo {
    /// Project an engine stat record
    pub fn from_raw(name: &str, raw: &RawAttributes) -> Self {
        let mod_time = i64::try_from(raw.mtime)
            .ok()
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .unwrap_or_default();

        Self {
            name: name.to_string(),
            is_dir: raw.attributes.contains(FileAttributes::DIRECTORY),
            mod_time,
            mode: FileMode::from_attributes(raw.attributes),
            size: raw.size,
        }
    }

    /// Record for a path that only opened as a directory
    pub fn synthesized_dir(name: &str) -> Self {
        let now = Utc::now();
        let mod_time = DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now);

        Self {
            name: name.to_string(),
            is_dir: true,
            mod_time,
            mode: FileMode::from_attributes(FileAttributes::DIRECTORY),
            size: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_dir(&self) -> bool {
        self.is_dir
    }

    pub fn mod_time(&self) -> DateTime<Utc> {
        self.mod_time
    }

    pub fn mode(&self) -> FileMode {
        self.mode
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

/// Last element of a share path, accepting both separator styles
///
/// Trailing separators are ignored; an empty path yields `.` and a path of
/// only separators yields `/`.
pub fn base_name(path: &str) -> &str {
    if path.is_empty() {
        return ".";
    }
    let is_sep = |c: char| c == '/' || c == '\\';
    let trimmed = path.trim_end_matches(is_sep);
    if trimmed.is_empty() {
        return "/";
    }
    match trimmed.rfind(is_sep) {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}
