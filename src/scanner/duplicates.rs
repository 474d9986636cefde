//! Duplicate scan orchestration: tree walk, worker pool, post-processing.
//!
//! # Overview
//!
//! [`DuplicateScanner`] owns one scan root and drives the pipeline: the
//! orchestrator thread walks directories with [`DirEnumerator`], classifies
//! every entry, and hands accepted files to a bounded worker pool. Each
//! worker fingerprints its file and inserts the result into the shared
//! [`GroupMap`]. Once the pool quiesces the scanner drops singleton groups
//! (duplicate mode), computes the summary counters and fires the completion
//! callback.
//!
//! A scan moves through `Idle → Walking → Draining → Finalizing → Idle`.
//! Cancellation is a single flag consulted between directory entries, before
//! each submission and at every hash loop iteration; in-flight work finishes
//! at its next safepoint.
//!
//! Exactly two shared mutable structures exist during a scan, each behind
//! its own lock: the group map and the files-encountered counter. They are
//! never held together.
//!
//! # Example
//!
//! ```no_run
//! use dupescan::scanner::DuplicateScanner;
//!
//! let mut scanner = DuplicateScanner::new("/data")?;
//! scanner.set_scan_progress_callback(|_root, files, groups| {
//!     eprintln!("{files} files, {groups} duplicate groups");
//! });
//! scanner.perform_scan(true)?;
//! println!("{} bytes wasted", scanner.wasted_bytes());
//! # Ok::<(), dupescan::error::ScanError>(())
//! ```

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use rayon::ThreadPoolBuilder;
use serde::Serialize;

use crate::error::{ErrorCondition, ScanError};

use super::classify::{classify, Classification};
use super::enumerator::{canonical_dir, DirEnumerator};
use super::groups::{GroupMap, GroupsView, InsertOutcome};
use super::hasher::fingerprint_file;
use super::order::SortOrder;
use super::{ScanCallbacks, ScanCompletedFn, ScanErrorFn, ScanPolicy, ScanProgressFn, ScanStartedFn};

/// Counters produced by a completed scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    /// Regular files that were fingerprinted, across all runs since `clear`
    pub files_encountered: u64,
    /// Files that duplicate a principal, summed over kept groups
    pub duplicate_files: u64,
    /// Groups currently held
    pub group_count: u64,
    /// Bytes recoverable by keeping one copy per group
    pub wasted_bytes: u64,
}

/// Content-addressed duplicate scanner bound to one root directory.
///
/// Policy setters are meaningful only before [`perform_scan`](Self::perform_scan);
/// the borrow rules enforce this, as a scan holds the scanner exclusively.
/// Results accumulate across runs until [`clear`](Self::clear).
#[derive(Debug)]
pub struct DuplicateScanner {
    search_dir: PathBuf,
    policy: ScanPolicy,
    sets: GroupMap,
    files_encountered: Mutex<u64>,
    file_count: u64,
    space_occupied: u64,
    callbacks: ScanCallbacks,
    cancel: Arc<AtomicBool>,
    threads: Option<usize>,
}

impl DuplicateScanner {
    /// Create a scanner for the given root.
    ///
    /// The root is canonicalized and validated immediately.
    ///
    /// # Errors
    ///
    /// [`ScanError::EmptyPath`], [`ScanError::RootNotFound`] or
    /// [`ScanError::NotADirectory`] when the root is unusable.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, ScanError> {
        let search_dir = canonical_dir(root.as_ref())?;

        Ok(Self {
            search_dir,
            policy: ScanPolicy::default(),
            sets: GroupMap::new(SortOrder::FileName),
            files_encountered: Mutex::new(0),
            file_count: 0,
            space_occupied: 0,
            callbacks: ScanCallbacks::default(),
            cancel: Arc::new(AtomicBool::new(false)),
            threads: None,
        })
    }

    /// Replace the intra-group ordering predicate.
    ///
    /// Builder-style and consuming, so the order is fixed before any group
    /// exists.
    #[must_use]
    pub fn with_sort_order(mut self, order: SortOrder) -> Self {
        self.sets = GroupMap::new(order);
        self
    }

    /// The canonical root this scanner is bound to.
    #[must_use]
    pub fn search_dir(&self) -> &Path {
        &self.search_dir
    }

    /// Resolve and hash symlink targets instead of ignoring links.
    pub fn set_follow_symlinks(&mut self, flag: bool) {
        self.policy.follow_symlinks = flag;
    }

    /// Whether symlink targets are followed.
    #[must_use]
    pub fn follow_symlinks(&self) -> bool {
        self.policy.follow_symlinks
    }

    /// Skip entries whose name starts with `.` (or carry a hidden attribute).
    pub fn set_skip_hidden(&mut self, flag: bool) {
        self.policy.skip_hidden = flag;
    }

    /// Whether hidden entries are skipped.
    #[must_use]
    pub fn skip_hidden(&self) -> bool {
        self.policy.skip_hidden
    }

    /// Inclusive lower bound on file size.
    pub fn set_minimum_size(&mut self, size: u64) {
        self.policy.min_size = size;
    }

    /// Inclusive upper bound on file size.
    pub fn set_maximum_size(&mut self, size: u64) {
        self.policy.max_size = size;
    }

    /// Add one extension filter; see [`ScanPolicy::add_filter`].
    pub fn add_filter(&mut self, filter: &str) {
        self.policy.add_filter(filter);
    }

    /// Add several extension filters.
    pub fn add_filters<I, S>(&mut self, filters: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.policy.add_filters(filters);
    }

    /// The active extension filters.
    #[must_use]
    pub fn filters(&self) -> &std::collections::BTreeSet<String> {
        &self.policy.extensions
    }

    /// Keep or drop singleton groups at scan end.
    ///
    /// Duplicate mode (the default) drops them; the unique-files adapter
    /// keeps them.
    pub fn set_remove_singletons(&mut self, flag: bool) {
        self.policy.remove_singletons = flag;
    }

    /// Cap the worker pool instead of using the hardware parallelism.
    pub fn set_thread_count(&mut self, threads: usize) {
        self.threads = Some(threads.max(1));
    }

    /// Share this scanner's cancellation flag.
    ///
    /// Raise the flag to stop the scan at its next safepoint.
    #[must_use]
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Use an externally owned cancellation flag (e.g. a Ctrl-C handler's).
    pub fn set_cancel_flag(&mut self, flag: Arc<AtomicBool>) {
        self.cancel = flag;
    }

    /// Register the scan-started callback.
    pub fn set_scan_started_callback(&mut self, cb: impl Fn(&Path) + Send + Sync + 'static) {
        self.callbacks.started = Some(Arc::new(cb) as Arc<ScanStartedFn>);
    }

    /// Register the progress callback, fired when a new duplicate group is
    /// discovered. May be invoked from any worker thread; do not block.
    pub fn set_scan_progress_callback(
        &mut self,
        cb: impl Fn(&Path, u64, u64) + Send + Sync + 'static,
    ) {
        self.callbacks.progress = Some(Arc::new(cb) as Arc<ScanProgressFn>);
    }

    /// Register the scan-completed callback.
    pub fn set_scan_completed_callback(
        &mut self,
        cb: impl Fn(&Path, u64, u64, u64, u64) + Send + Sync + 'static,
    ) {
        self.callbacks.completed = Some(Arc::new(cb) as Arc<ScanCompletedFn>);
    }

    /// Register the per-entry error callback. May be invoked from any worker
    /// thread; do not block.
    pub fn set_scan_error_callback(
        &mut self,
        cb: impl Fn(&Path, &Path, ErrorCondition) + Send + Sync + 'static,
    ) {
        self.callbacks.error = Some(Arc::new(cb) as Arc<ScanErrorFn>);
    }

    /// Run one scan.
    ///
    /// Walks the root (descending into subdirectories iff `recursive`),
    /// fingerprints accepted files across the worker pool, joins every
    /// worker, applies the singleton post-filter and computes the summary.
    /// Synchronous: when this returns the group map is quiescent.
    ///
    /// # Errors
    ///
    /// [`ScanError::Pool`] if the worker pool cannot be built, or
    /// [`ScanError::WorkerPanicked`] if a worker unwound. Per-entry problems
    /// are reported through the error callback instead.
    pub fn perform_scan(&mut self, recursive: bool) -> Result<(), ScanError> {
        self.callbacks.fire_started(&self.search_dir);

        let threads = self.threads.unwrap_or_else(|| {
            std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
        });
        let pool = ThreadPoolBuilder::new().num_threads(threads).build()?;

        log::info!(
            "Scan of {} starting: {} workers, recursive={}",
            self.search_dir.display(),
            threads,
            recursive
        );
        log::debug!("Scan phase: Idle -> Walking");

        // The walk stays on this thread; workers hash inside the pool.
        let walk = catch_unwind(AssertUnwindSafe(|| {
            pool.in_place_scope(|scope| {
                self.walk_directory(&self.search_dir, recursive, scope);
                log::debug!("Scan phase: Walking -> Draining");
            });
        }));
        // The scope only returns once every spawned worker has finished.
        if walk.is_err() {
            log::error!("A scan worker panicked; abandoning this run");
            return Err(ScanError::WorkerPanicked);
        }

        log::debug!("Scan phase: Draining -> Finalizing");
        if self.policy.remove_singletons {
            self.sets.drop_singletons();
        }

        let (duplicates, wasted, groups) = {
            let view = self.sets.view();
            let mut duplicates = 0u64;
            let mut wasted = 0u64;
            for (fingerprint, set) in view.iter() {
                let extra = set.len().saturating_sub(1) as u64;
                duplicates += extra;
                wasted += fingerprint.size * extra;
            }
            (duplicates, wasted, view.len() as u64)
        };
        self.file_count = duplicates;
        self.space_occupied = wasted;

        let files = self.files_encountered();
        log::info!(
            "Scan of {} complete: {} files, {} groups, {} duplicate files, {} wasted bytes",
            self.search_dir.display(),
            files,
            groups,
            duplicates,
            wasted
        );
        log::debug!("Scan phase: Finalizing -> Idle");
        self.callbacks
            .fire_completed(&self.search_dir, files, duplicates, groups, wasted);

        Ok(())
    }

    /// Depth-first walk of one directory, spawning hash work as it goes.
    fn walk_directory<'s>(&'s self, dir: &Path, recursive: bool, scope: &rayon::Scope<'s>) {
        let mut cursor = match DirEnumerator::new(dir) {
            Ok(cursor) => cursor.with_cancel_flag(Arc::clone(&self.cancel)),
            Err(e) => {
                self.callbacks
                    .fire_error(&self.search_dir, dir, ErrorCondition::from(&e));
                return;
            }
        };

        loop {
            // Safepoint between directory entries.
            if self.cancelled() {
                log::debug!("Cancellation observed while walking {}", dir.display());
                return;
            }

            match cursor.advance() {
                Ok(true) => {}
                Ok(false) => return,
                Err(e) => {
                    self.callbacks
                        .fire_error(&self.search_dir, dir, ErrorCondition::from(&e));
                    return;
                }
            }
            let Some(entry) = cursor.current().map(Path::to_path_buf) else {
                return;
            };

            match classify(&entry, &self.policy) {
                Ok(Classification::Skip) => {}
                Ok(Classification::Descend(subdir)) => {
                    if recursive {
                        self.walk_directory(&subdir, recursive, scope);
                    }
                }
                Ok(Classification::HashFile { path, size }) => {
                    // Safepoint before submission.
                    if self.cancelled() {
                        return;
                    }
                    scope.spawn(move |_| self.hash_and_insert(path, size));
                }
                Err(entry_error) => {
                    log::warn!(
                        "Skipping {}: {}",
                        entry_error.path.display(),
                        entry_error.condition
                    );
                    self.callbacks.fire_error(
                        &self.search_dir,
                        &entry_error.path,
                        entry_error.condition,
                    );
                }
            }
        }
    }

    /// Worker body: fingerprint one file and record it.
    fn hash_and_insert(&self, path: PathBuf, size: u64) {
        let fingerprint = match fingerprint_file(&path, size, &self.cancel) {
            Ok(fingerprint) => fingerprint,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {
                log::debug!("Hash of {} abandoned by cancellation", path.display());
                return;
            }
            Err(e) => {
                log::warn!("Failed to hash {}: {}", path.display(), e);
                self.callbacks
                    .fire_error(&self.search_dir, &path, ErrorCondition::from(&e));
                return;
            }
        };

        // Counter lock and map lock are taken one after the other, never
        // nested.
        let files = {
            let mut count = self
                .files_encountered
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            *count += 1;
            *count
        };

        if let Some((InsertOutcome::SecondInGroup, groups)) = self.sets.insert(fingerprint, path) {
            self.callbacks
                .fire_progress(&self.search_dir, files, groups);
        }
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Regular files fingerprinted since construction or the last `clear`.
    #[must_use]
    pub fn files_encountered(&self) -> u64 {
        *self
            .files_encountered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of groups currently held.
    #[must_use]
    pub fn group_count(&self) -> u64 {
        self.sets.len() as u64
    }

    /// Files that duplicate a principal, as of the last completed scan.
    #[must_use]
    pub fn duplicate_count(&self) -> u64 {
        self.file_count
    }

    /// Bytes recoverable by keeping one copy per group, as of the last
    /// completed scan.
    #[must_use]
    pub fn wasted_bytes(&self) -> u64 {
        self.space_occupied
    }

    /// Whether no groups are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Summary counters of the last completed scan.
    #[must_use]
    pub fn summary(&self) -> ScanSummary {
        ScanSummary {
            files_encountered: self.files_encountered(),
            duplicate_files: self.file_count,
            group_count: self.group_count(),
            wasted_bytes: self.space_occupied,
        }
    }

    /// Read-only view of the groups; forward and reverse iteration.
    #[must_use]
    pub fn groups(&self) -> GroupsView<'_> {
        self.sets.view()
    }

    /// Drop all accumulated groups and reset every counter.
    pub fn clear(&mut self) {
        self.sets.clear();
        *self
            .files_encountered
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = 0;
        self.file_count = 0;
        self.space_occupied = 0;
    }
}
