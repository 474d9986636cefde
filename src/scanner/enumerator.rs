//! Restartable single-level directory cursor.
//!
//! # Overview
//!
//! [`DirEnumerator`] walks exactly one directory, one entry per call, with
//! no recursion and no checking of what the entry refers to; callers decide
//! whether the returned path is a file, directory or symlink. The special
//! entries `.` and `..` are never returned.
//!
//! Open and readdir failures that indicate transient resource exhaustion
//! (too many open files, out of memory, device busy) block the cursor for a
//! bounded interval and re-try; every other error is returned to the caller
//! after the underlying handle is closed.

use std::fs::{self, ReadDir};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{is_transient, ScanError};

/// Interval slept before re-trying a transiently failed open or readdir.
pub(crate) const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Canonicalize a search path and require it to be a directory.
pub(crate) fn canonical_dir(path: &Path) -> Result<PathBuf, ScanError> {
    if path.as_os_str().is_empty() {
        return Err(ScanError::EmptyPath);
    }

    let canonical = fs::canonicalize(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ScanError::RootNotFound(path.to_path_buf()),
        _ => ScanError::Io {
            path: path.to_path_buf(),
            source: e,
        },
    })?;

    let meta = fs::metadata(&canonical).map_err(|e| ScanError::Io {
        path: canonical.clone(),
        source: e,
    })?;
    if !meta.is_dir() {
        return Err(ScanError::NotADirectory(canonical));
    }
    Ok(canonical)
}

/// Lazy cursor over the entries of a single directory.
///
/// # Example
///
/// ```no_run
/// use dupescan::scanner::DirEnumerator;
///
/// let mut cursor = DirEnumerator::new(".")?;
/// while cursor.advance()? {
///     println!("{}", cursor.current().unwrap().display());
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct DirEnumerator {
    /// Canonical directory being enumerated
    search_dir: PathBuf,
    /// Open readdir handle, populated on first advance
    handle: Option<ReadDir>,
    /// Entry at the cursor position
    current: Option<PathBuf>,
    /// Optional cancellation flag consulted inside retry sleeps
    cancel: Option<Arc<AtomicBool>>,
    /// Retry sleep, shortened in tests
    retry_delay: Duration,
}

impl DirEnumerator {
    /// Create a cursor for the given directory.
    ///
    /// The path is canonicalized up front; it may be relative or a symlink
    /// to a directory.
    ///
    /// # Errors
    ///
    /// [`ScanError::EmptyPath`] for an empty path, [`ScanError::RootNotFound`]
    /// if the path cannot be resolved, and [`ScanError::NotADirectory`] if it
    /// resolves to anything but a directory.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, ScanError> {
        let search_dir = canonical_dir(path.as_ref())?;

        Ok(Self {
            search_dir,
            handle: None,
            current: None,
            cancel: None,
            retry_delay: RETRY_DELAY,
        })
    }

    /// Attach a cancellation flag consulted during retry sleeps.
    ///
    /// When the flag goes up mid-retry the cursor stops with an
    /// [`io::ErrorKind::Interrupted`] error instead of blocking further.
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    #[cfg(test)]
    pub(crate) fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// The canonical directory this cursor enumerates.
    #[must_use]
    pub fn search_dir(&self) -> &Path {
        &self.search_dir
    }

    /// Rewind the cursor so the next [`advance`](Self::advance) starts over.
    pub fn restart(&mut self) {
        self.handle = None;
        self.current = None;
    }

    /// Move to the next directory entry.
    ///
    /// Returns `Ok(true)` if the cursor now rests on an entry, `Ok(false)`
    /// at the end of the directory. Transient resource errors are absorbed
    /// by sleep-and-retry; anything else is returned after the handle is
    /// closed.
    pub fn advance(&mut self) -> io::Result<bool> {
        if self.handle.is_none() {
            self.handle = Some(self.open_with_retry()?);
        }

        loop {
            // The handle is always present here; it is only taken at end.
            let Some(iter) = self.handle.as_mut() else {
                return Ok(false);
            };

            match iter.next() {
                Some(Ok(entry)) => {
                    let name = entry.file_name();
                    // std's readdir already filters the dot entries on every
                    // supported platform; keep the guard for odd filesystems.
                    if name == "." || name == ".." {
                        continue;
                    }
                    self.current = Some(self.search_dir.join(name));
                    return Ok(true);
                }
                Some(Err(e)) => {
                    if is_transient(&e) {
                        log::debug!(
                            "Transient readdir error in {}: {}; retrying",
                            self.search_dir.display(),
                            e
                        );
                        self.sleep_or_interrupt()?;
                        continue;
                    }
                    self.handle = None;
                    self.current = None;
                    return Err(e);
                }
                None => {
                    self.handle = None;
                    self.current = None;
                    return Ok(false);
                }
            }
        }
    }

    /// The entry at the cursor position.
    ///
    /// Only meaningful immediately after an [`advance`](Self::advance) that
    /// returned `Ok(true)`; `None` otherwise.
    #[must_use]
    pub fn current(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    /// Open the directory, absorbing transient failures.
    fn open_with_retry(&self) -> io::Result<ReadDir> {
        loop {
            match fs::read_dir(&self.search_dir) {
                Ok(handle) => return Ok(handle),
                Err(e) if is_transient(&e) => {
                    log::debug!(
                        "Transient open error for {}: {}; retrying",
                        self.search_dir.display(),
                        e
                    );
                    self.sleep_or_interrupt()?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Sleep one retry interval, or fail if cancellation fired.
    fn sleep_or_interrupt(&self) -> io::Result<()> {
        if let Some(flag) = &self.cancel {
            if flag.load(Ordering::SeqCst) {
                return Err(io::Error::new(
                    io::ErrorKind::Interrupted,
                    "scan cancelled during retry",
                ));
            }
        }
        std::thread::sleep(self.retry_delay);
        Ok(())
    }
}
