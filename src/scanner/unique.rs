//! One representative per content class.
//!
//! # Overview
//!
//! [`UniqueFilesScanner`] runs the duplicate engine with singleton groups
//! retained and keeps the principal of every group: the result is one path
//! per distinct file content under the root. The collected sequence can be
//! re-sorted under any [`SortOrder`] after the scan.

use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::error::ScanError;
use crate::progress::OperationState;

use super::duplicates::DuplicateScanner;
use super::order::SortOrder;

/// Progress callback for unique-file scans: files examined so far, content
/// classes seen so far, and the operation state.
pub type UniqueProgressFn = dyn Fn(u64, u64, OperationState) + Send + Sync;

/// Scanner yielding one representative path per file content.
///
/// # Example
///
/// ```no_run
/// use dupescan::scanner::{SortOrder, UniqueFilesScanner};
///
/// let mut scanner = UniqueFilesScanner::new("/data")?;
/// scanner.perform_scan(true)?;
/// scanner.sort(SortOrder::LastWriteTime);
/// for path in scanner.iter() {
///     println!("{}", path.display());
/// }
/// # Ok::<(), dupescan::error::ScanError>(())
/// ```
pub struct UniqueFilesScanner {
    scanner: DuplicateScanner,
    files: Vec<PathBuf>,
    progress_callback: Option<Arc<UniqueProgressFn>>,
}

impl std::fmt::Debug for UniqueFilesScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UniqueFilesScanner")
            .field("scanner", &self.scanner)
            .field("files", &self.files)
            .field("progress_callback", &self.progress_callback.is_some())
            .finish()
    }
}

impl UniqueFilesScanner {
    /// Create a scanner for the given root.
    ///
    /// # Errors
    ///
    /// Same as [`DuplicateScanner::new`]: the root must be an existing
    /// directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, ScanError> {
        Ok(Self {
            scanner: DuplicateScanner::new(root)?,
            files: Vec::new(),
            progress_callback: None,
        })
    }

    /// The canonical root this scanner is bound to.
    #[must_use]
    pub fn search_dir(&self) -> &Path {
        self.scanner.search_dir()
    }

    /// Resolve and hash symlink targets instead of ignoring links.
    pub fn set_follow_symlinks(&mut self, flag: bool) {
        self.scanner.set_follow_symlinks(flag);
    }

    /// Skip hidden entries.
    pub fn set_skip_hidden(&mut self, flag: bool) {
        self.scanner.set_skip_hidden(flag);
    }

    /// Inclusive lower bound on file size.
    pub fn set_minimum_size(&mut self, size: u64) {
        self.scanner.set_minimum_size(size);
    }

    /// Inclusive upper bound on file size.
    pub fn set_maximum_size(&mut self, size: u64) {
        self.scanner.set_maximum_size(size);
    }

    /// Add one extension filter.
    pub fn add_filter(&mut self, filter: &str) {
        self.scanner.add_filter(filter);
    }

    /// Add several extension filters.
    pub fn add_filters<I, S>(&mut self, filters: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.scanner.add_filters(filters);
    }

    /// Cap the worker pool instead of using the hardware parallelism.
    pub fn set_thread_count(&mut self, threads: usize) {
        self.scanner.set_thread_count(threads);
    }

    /// Share the cancellation flag of the underlying scan.
    #[must_use]
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.scanner.cancel_flag()
    }

    /// Use an externally owned cancellation flag.
    pub fn set_cancel_flag(&mut self, flag: Arc<AtomicBool>) {
        self.scanner.set_cancel_flag(flag);
    }

    /// Register the progress callback. May be invoked from worker threads;
    /// do not block.
    pub fn set_progress_callback(
        &mut self,
        cb: impl Fn(u64, u64, OperationState) + Send + Sync + 'static,
    ) {
        self.progress_callback = Some(Arc::new(cb) as Arc<UniqueProgressFn>);
    }

    /// Run one scan and collect the principal of every group.
    ///
    /// The collected sequence is ordered by group key; call
    /// [`sort`](Self::sort) to impose a path order instead.
    ///
    /// # Errors
    ///
    /// Same as [`DuplicateScanner::perform_scan`].
    pub fn perform_scan(&mut self, recursive: bool) -> Result<(), ScanError> {
        self.scanner.set_remove_singletons(false);

        if let Some(cb) = &self.progress_callback {
            cb(0, 0, OperationState::Imminent);
            let broker = Arc::clone(cb);
            self.scanner
                .set_scan_progress_callback(move |_root, files, groups| {
                    broker(files, groups, OperationState::Underway);
                });
        }

        self.scanner.perform_scan(recursive)?;

        self.files = self
            .scanner
            .groups()
            .iter()
            .filter_map(|(_, set)| set.principal().map(Path::to_path_buf))
            .collect();

        if let Some(cb) = &self.progress_callback {
            cb(
                self.scanner.files_encountered(),
                self.scanner.group_count(),
                OperationState::Complete,
            );
        }

        Ok(())
    }

    /// Re-sort the collected representatives under the given order.
    pub fn sort(&mut self, order: SortOrder) {
        self.files.sort_by(|a, b| order.compare(a, b));
    }

    /// The representatives collected by the last scan.
    #[must_use]
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Iterate the representatives in order.
    pub fn iter(&self) -> std::slice::Iter<'_, PathBuf> {
        self.files.iter()
    }

    /// Iterate the representatives in reverse order.
    pub fn iter_rev(&self) -> std::iter::Rev<std::slice::Iter<'_, PathBuf>> {
        self.files.iter().rev()
    }

    /// Number of representatives held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether no representatives are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Files fingerprinted by the underlying engine.
    #[must_use]
    pub fn files_encountered(&self) -> u64 {
        self.scanner.files_encountered()
    }

    /// Drop the collected representatives and the underlying groups.
    pub fn clear(&mut self) {
        self.scanner.clear();
        self.files.clear();
    }
}
