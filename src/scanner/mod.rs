//! Scan engine: directory enumeration, entry classification, hashing and
//! grouping.
//!
//! # Architecture
//!
//! The engine is divided into submodules:
//! - [`enumerator`]: restartable single-level directory cursor with
//!   transient-error retry
//! - [`classify`]: hidden/symlink/extension/size policy applied to one entry
//! - [`hasher`]: streaming SHA-512 fingerprints with a bounded buffer
//! - [`order`]: intra-group path comparators (numbered filenames, mtime, ...)
//! - [`groups`]: the concurrent `(size, digest)` → ordered path set map
//! - [`duplicates`]: the scan orchestrator and worker pool
//! - [`unique`]: one-representative-per-group adapter
//!
//! # Example
//!
//! ```no_run
//! use dupescan::scanner::DuplicateScanner;
//!
//! let mut scanner = DuplicateScanner::new("/home/user/photos")?;
//! scanner.set_skip_hidden(true);
//! scanner.add_filter("jpg");
//! scanner.perform_scan(true)?;
//!
//! for (fingerprint, set) in scanner.groups().iter() {
//!     println!("{} bytes, {} copies", fingerprint.size, set.len());
//! }
//! # Ok::<(), dupescan::error::ScanError>(())
//! ```

pub mod classify;
pub mod duplicates;
pub mod enumerator;
pub mod groups;
pub mod hasher;
pub mod order;
pub mod unique;

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use crate::error::ErrorCondition;

// Re-export main types
pub use classify::Classification;
pub use duplicates::{DuplicateScanner, ScanSummary};
pub use enumerator::DirEnumerator;
pub use groups::{DuplicateSet, Fingerprint, GroupMap, GroupsView, InsertOutcome};
pub use hasher::{fingerprint_file, DIGEST_LENGTH};
pub use order::SortOrder;
pub use unique::UniqueFilesScanner;

/// Filtering policy for one scan, immutable while the scan runs.
///
/// Extension filters are stored as lowercased dotted suffixes; well-known
/// alias pairs (`.jpg`/`.jpeg`, `.tif`/`.tiff`, `.htm`/`.html`) are always
/// inserted together so that supplying either member accepts both.
#[derive(Debug, Clone)]
pub struct ScanPolicy {
    /// Resolve and classify symlink targets instead of ignoring links.
    pub follow_symlinks: bool,

    /// Skip entries whose filename begins with `.` (and, on Windows, entries
    /// carrying the hidden attribute).
    pub skip_hidden: bool,

    /// Minimum file size to include, inclusive.
    pub min_size: u64,

    /// Maximum file size to include, inclusive.
    pub max_size: u64,

    /// Accepted extensions; empty means every file is considered.
    pub extensions: BTreeSet<String>,

    /// Drop groups of size 1 after the scan (duplicate mode).
    pub remove_singletons: bool,
}

impl Default for ScanPolicy {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            skip_hidden: false,
            min_size: 0,
            max_size: u64::MAX,
            extensions: BTreeSet::new(),
            remove_singletons: true,
        }
    }
}

impl ScanPolicy {
    /// Add a single extension filter.
    ///
    /// The filter is lowercased and a leading `.` is prepended if missing.
    /// Alias pairs are expanded: adding `jpg` also accepts `.jpeg`, `tif`
    /// also accepts `.tiff`, and `htm` also accepts `.html`.
    pub fn add_filter(&mut self, filter: &str) {
        let mut ext = filter.to_lowercase();
        if !ext.starts_with('.') {
            ext.insert(0, '.');
        }

        match ext.as_str() {
            ".jpg" | ".jpeg" => {
                self.extensions.insert(".jpg".to_string());
                self.extensions.insert(".jpeg".to_string());
            }
            ".tif" | ".tiff" => {
                self.extensions.insert(".tif".to_string());
                self.extensions.insert(".tiff".to_string());
            }
            ".htm" | ".html" => {
                self.extensions.insert(".htm".to_string());
                self.extensions.insert(".html".to_string());
            }
            _ => {
                self.extensions.insert(ext);
            }
        }
    }

    /// Add several extension filters at once.
    pub fn add_filters<I, S>(&mut self, filters: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for filter in filters {
            self.add_filter(filter.as_ref());
        }
    }

    /// Whether a path passes the extension filter.
    ///
    /// With no filters configured every path passes. The comparison is over
    /// the lowercased dotted suffix; extensionless files only pass when no
    /// filters are set.
    #[must_use]
    pub fn accepts_extension(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }

        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => {
                let dotted = format!(".{}", ext.to_lowercase());
                self.extensions.contains(&dotted)
            }
            None => false,
        }
    }

    /// Whether a file size falls inside the inclusive `[min, max]` window.
    #[must_use]
    pub fn size_in_bounds(&self, size: u64) -> bool {
        size >= self.min_size && size <= self.max_size
    }
}

/// Callback invoked when a scan begins; receives the canonical root.
pub type ScanStartedFn = dyn Fn(&Path) + Send + Sync;

/// Callback invoked when a new duplicate group is discovered; receives the
/// root, the files-encountered counter and the duplicate-group counter.
pub type ScanProgressFn = dyn Fn(&Path, u64, u64) + Send + Sync;

/// Callback invoked when a scan completes; receives the root, files
/// encountered, duplicate file count, group count and wasted bytes.
pub type ScanCompletedFn = dyn Fn(&Path, u64, u64, u64, u64) + Send + Sync;

/// Callback invoked for a skippable per-entry failure; receives the root,
/// the offending path and the error category.
pub type ScanErrorFn = dyn Fn(&Path, &Path, ErrorCondition) + Send + Sync;

/// Registered callback slots, shared read-only with worker threads.
///
/// Callbacks may be invoked from any worker; implementers must not block
/// inside them.
#[derive(Clone, Default)]
pub(crate) struct ScanCallbacks {
    pub(crate) started: Option<Arc<ScanStartedFn>>,
    pub(crate) progress: Option<Arc<ScanProgressFn>>,
    pub(crate) completed: Option<Arc<ScanCompletedFn>>,
    pub(crate) error: Option<Arc<ScanErrorFn>>,
}

impl ScanCallbacks {
    pub(crate) fn fire_started(&self, root: &Path) {
        if let Some(cb) = &self.started {
            cb(root);
        }
    }

    pub(crate) fn fire_progress(&self, root: &Path, files: u64, groups: u64) {
        if let Some(cb) = &self.progress {
            cb(root, files, groups);
        }
    }

    pub(crate) fn fire_completed(
        &self,
        root: &Path,
        files: u64,
        duplicates: u64,
        groups: u64,
        wasted: u64,
    ) {
        if let Some(cb) = &self.completed {
            cb(root, files, duplicates, groups, wasted);
        }
    }

    pub(crate) fn fire_error(&self, root: &Path, entry: &Path, condition: ErrorCondition) {
        if let Some(cb) = &self.error {
            cb(root, entry, condition);
        }
    }
}

impl std::fmt::Debug for ScanCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanCallbacks")
            .field("started", &self.started.is_some())
            .field("progress", &self.progress.is_some())
            .field("completed", &self.completed.is_some())
            .field("error", &self.error.is_some())
            .finish()
    }
}
