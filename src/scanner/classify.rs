//! Per-entry policy: hidden/symlink handling, canonicalization and filters.
//!
//! # Overview
//!
//! [`classify`] turns one raw directory entry into a verdict: skip it,
//! descend into it, or hash it. Canonicalization happens here so the group
//! map is keyed by canonical paths: alias paths for one object coalesce by
//! equality, while distinct inodes stay distinct.
//!
//! Policy is applied in a fixed order: hidden test, symlink resolution,
//! existence, file kind, extension filter, size window. The first rule that
//! fires wins.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::ErrorCondition;

use super::ScanPolicy;

/// Verdict for one directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// The entry is filtered out or is not a regular file.
    Skip,
    /// The entry is a directory; the walk may descend into the canonical path.
    Descend(PathBuf),
    /// The entry is a regular file that passed every filter.
    HashFile {
        /// Canonical path to the file
        path: PathBuf,
        /// Byte length reported by the canonical target's metadata
        size: u64,
    },
}

/// A per-entry failure, ready for the `scan_error` callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryError {
    /// The entry the failure applies to
    pub path: PathBuf,
    /// Platform-neutral category of the failure
    pub condition: ErrorCondition,
}

impl EntryError {
    fn new(path: &Path, err: &io::Error) -> Self {
        Self {
            path: path.to_path_buf(),
            condition: ErrorCondition::from(err),
        }
    }
}

/// Whether the entry counts as hidden under the platform's conventions.
///
/// A leading `.` in the filename always counts; on Windows the hidden file
/// attribute is honored as well.
pub(crate) fn is_hidden(entry: &Path) -> io::Result<bool> {
    let by_name = entry
        .file_name()
        .is_some_and(|n| n.to_string_lossy().starts_with('.'));
    if by_name {
        return Ok(true);
    }

    #[cfg(windows)]
    {
        use std::os::windows::fs::MetadataExt;
        const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;

        let meta = fs::symlink_metadata(entry)?;
        Ok(meta.file_attributes() & FILE_ATTRIBUTE_HIDDEN != 0)
    }

    #[cfg(not(windows))]
    Ok(false)
}

/// Apply the scan policy to one directory entry.
///
/// # Errors
///
/// Returns an [`EntryError`] when a probe fails (permission denied,
/// canonicalization failure, metadata failure). A target that vanished
/// between discovery and the existence check is a plain [`Classification::Skip`],
/// not an error.
pub fn classify(entry: &Path, policy: &ScanPolicy) -> Result<Classification, EntryError> {
    // 1. Hidden test.
    let hidden = is_hidden(entry).map_err(|e| EntryError::new(entry, &e))?;
    if policy.skip_hidden && hidden {
        log::trace!("Skipping hidden entry: {}", entry.display());
        return Ok(Classification::Skip);
    }

    // 2. Symlink resolution.
    let link_meta = fs::symlink_metadata(entry).map_err(|e| EntryError::new(entry, &e))?;
    if link_meta.file_type().is_symlink() && !policy.follow_symlinks {
        log::trace!("Skipping symlink: {}", entry.display());
        return Ok(Classification::Skip);
    }
    let canonical = fs::canonicalize(entry).map_err(|e| EntryError::new(entry, &e))?;

    // 3. Existence check on the canonical target. A vanished target is not
    // an error; the file simply left the scan's world.
    let meta = match fs::metadata(&canonical) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::debug!("Entry vanished mid-scan: {}", canonical.display());
            return Ok(Classification::Skip);
        }
        Err(e) => return Err(EntryError::new(&canonical, &e)),
    };

    // 4. File kind.
    if meta.is_dir() {
        return Ok(Classification::Descend(canonical));
    }
    if !meta.is_file() {
        log::trace!("Skipping special file: {}", canonical.display());
        return Ok(Classification::Skip);
    }

    // 5. Extension filter.
    if !policy.accepts_extension(&canonical) {
        log::trace!("Skipping by extension filter: {}", canonical.display());
        return Ok(Classification::Skip);
    }

    // 6. Size window.
    let size = meta.len();
    if !policy.size_in_bounds(size) {
        log::trace!(
            "Skipping by size filter ({} bytes): {}",
            size,
            canonical.display()
        );
        return Ok(Classification::Skip);
    }

    Ok(Classification::HashFile {
        path: canonical,
        size,
    })
}
