//! Collision-free sequential filename allocation.

use std::fs::{File, OpenOptions};
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::{IngestError, IngestResult};

/// Upper bound on exclusive-create retries before giving up.
const MAX_ALLOCATION_ATTEMPTS: u32 = 10_000;

/// A freshly allocated output file.
///
/// The file at `path` has been created exclusively and is empty; the caller
/// owns writing its contents.
#[derive(Debug)]
pub struct NamedFile {
    /// Directory the file lives in.
    pub directory: PathBuf,
    /// Filename prefix.
    pub prefix: String,
    /// Positive numeric suffix.
    pub index: u32,
    /// Full path, `{directory}/{prefix}{index}.wav`.
    pub path: PathBuf,
    /// Exclusively created handle for the allocated file.
    pub file: File,
}

/// Allocates the next free `{prefix}{n}.wav` in `directory`.
///
/// Scans existing entries matching `{prefix}<digits>.wav`, starts at one
/// past the highest suffix (or 1 in an empty directory), and claims the
/// name with an exclusive create. A concurrent allocator racing for the
/// same index loses the create and this call retries with the next index,
/// so the returned name never collides with an existing file.
pub fn allocate(directory: &Path, prefix: &str) -> IngestResult<NamedFile> {
    let mut index = next_index(directory, prefix)?;

    for _ in 0..MAX_ALLOCATION_ATTEMPTS {
        let path = directory.join(format!("{prefix}{index}.wav"));
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => {
                return Ok(NamedFile {
                    directory: directory.to_path_buf(),
                    prefix: prefix.to_string(),
                    index,
                    path,
                    file,
                });
            }
            Err(e) if e.kind() == IoErrorKind::AlreadyExists => {
                index += 1;
            }
            Err(e) => {
                return Err(IngestError::Persist { path, source: e });
            }
        }
    }

    Err(IngestError::AllocatorExhausted {
        directory: directory.to_path_buf(),
        prefix: prefix.to_string(),
    })
}

/// Returns one past the highest existing `{prefix}<digits>.wav` suffix in
/// `directory`, or 1 if none match.
pub fn next_index(directory: &Path, prefix: &str) -> IngestResult<u32> {
    let pattern = Regex::new(&format!(r"^{}(\d+)\.wav$", regex::escape(prefix)))
        .expect("escaped prefix always forms a valid pattern");

    let entries = std::fs::read_dir(directory).map_err(|e| IngestError::ScanDirectory {
        path: directory.to_path_buf(),
        source: e,
    })?;

    let mut max_index = 0u32;
    for entry in entries {
        let entry = entry.map_err(|e| IngestError::ScanDirectory {
            path: directory.to_path_buf(),
            source: e,
        })?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if let Some(caps) = pattern.captures(name) {
            // Suffixes too long to fit a u32 are not ours to contend with.
            if let Ok(n) = caps[1].parse::<u32>() {
                max_index = max_index.max(n);
            }
        }
    }

    Ok(max_index + 1)
}
