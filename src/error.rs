//! Error taxonomy, transient-error classification and exit codes.
//!
//! Three kinds of failure flow through the crate:
//!
//! - **Argument errors** (bad root, non-directory root, empty path) are
//!   raised synchronously as [`ScanError`] from constructors and setters.
//! - **Transient resource errors** (too many open files, out of memory,
//!   device busy) are absorbed by retry loops; [`is_transient`] decides
//!   eligibility.
//! - **Per-entry errors** are reduced to a platform-neutral
//!   [`ErrorCondition`] and surfaced through the `scan_error` callback;
//!   the affected entry is skipped and the scan continues.

use std::io;
use std::path::PathBuf;

use serde::Serialize;

/// Errors raised synchronously from scanner construction or a scan run.
///
/// These never travel through callbacks; anything recoverable or skippable
/// is reported as an [`ErrorCondition`] instead.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// An empty path was supplied where a search path is required.
    #[error("Invalid search path")]
    EmptyPath,

    /// The search root was not found or could not be resolved.
    #[error("Search path not found: {}", .0.display())]
    RootNotFound(PathBuf),

    /// The search root exists but is not a directory.
    #[error("Search path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// An I/O error occurred while validating the search root.
    #[error("I/O error for {}: {source}", .path.display())]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The worker pool could not be constructed.
    #[error("Failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    /// A worker thread violated an internal invariant and unwound.
    #[error("A scan worker panicked; results are incomplete")]
    WorkerPanicked,
}

impl From<&ScanError> for ErrorCondition {
    fn from(err: &ScanError) -> Self {
        match err {
            ScanError::EmptyPath | ScanError::NotADirectory(_) => Self::InvalidInput,
            ScanError::RootNotFound(_) => Self::NotFound,
            ScanError::Io { source, .. } => Self::from(source),
            ScanError::Pool(_) | ScanError::WorkerPanicked => Self::Other,
        }
    }
}

/// Platform-neutral category for a per-entry failure.
///
/// This is the value handed to `scan_error` callbacks: enough to decide
/// what to tell the user, without leaking OS-specific error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCondition {
    /// Access to the entry was denied.
    PermissionDenied,
    /// The entry disappeared between discovery and use.
    NotFound,
    /// The entry or its device was busy.
    Busy,
    /// The entry or an argument was malformed.
    InvalidInput,
    /// The operation was interrupted by cancellation.
    Interrupted,
    /// Any other I/O failure (short read, hash-state failure, ...).
    Io,
    /// A failure that fits no other category.
    Other,
}

impl From<&io::Error> for ErrorCondition {
    fn from(err: &io::Error) -> Self {
        use io::ErrorKind;

        match err.kind() {
            ErrorKind::PermissionDenied => Self::PermissionDenied,
            ErrorKind::NotFound => Self::NotFound,
            ErrorKind::WouldBlock => Self::Busy,
            ErrorKind::InvalidInput | ErrorKind::InvalidData => Self::InvalidInput,
            ErrorKind::Interrupted => Self::Interrupted,
            ErrorKind::UnexpectedEof | ErrorKind::WriteZero | ErrorKind::BrokenPipe => Self::Io,
            _ => Self::Other,
        }
    }
}

impl std::fmt::Display for ErrorCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::PermissionDenied => "permission denied",
            Self::NotFound => "not found",
            Self::Busy => "resource busy",
            Self::InvalidInput => "invalid input",
            Self::Interrupted => "interrupted",
            Self::Io => "I/O error",
            Self::Other => "error",
        };
        f.write_str(text)
    }
}

/// Whether an I/O error indicates temporary resource exhaustion.
///
/// Open and readdir retry loops block and re-try on these instead of
/// failing the entry. Everything else surfaces to the caller.
#[cfg(unix)]
pub(crate) fn is_transient(err: &io::Error) -> bool {
    let Some(code) = err.raw_os_error() else {
        return false;
    };
    if matches!(code, libc::EAGAIN | libc::EMFILE | libc::ENFILE | libc::ENOMEM) {
        return true;
    }
    #[cfg(target_os = "linux")]
    if code == libc::ENOSR {
        return true;
    }
    false
}

/// Whether an I/O error indicates temporary resource exhaustion.
#[cfg(windows)]
pub(crate) fn is_transient(err: &io::Error) -> bool {
    // The ERROR_* family that FindFirstFile and CreateFile report when the
    // system or a share is temporarily saturated.
    const ERROR_TOO_MANY_OPEN_FILES: i32 = 4;
    const ERROR_NOT_ENOUGH_MEMORY: i32 = 8;
    const ERROR_OUTOFMEMORY: i32 = 14;
    const ERROR_NOT_READY: i32 = 21;
    const ERROR_SHARING_VIOLATION: i32 = 32;
    const ERROR_LOCK_VIOLATION: i32 = 33;
    const ERROR_NETWORK_BUSY: i32 = 54;
    const ERROR_PATH_BUSY: i32 = 148;
    const ERROR_BUSY: i32 = 170;

    matches!(
        err.raw_os_error(),
        Some(
            ERROR_TOO_MANY_OPEN_FILES
                | ERROR_NOT_ENOUGH_MEMORY
                | ERROR_OUTOFMEMORY
                | ERROR_NOT_READY
                | ERROR_SHARING_VIOLATION
                | ERROR_LOCK_VIOLATION
                | ERROR_NETWORK_BUSY
                | ERROR_PATH_BUSY
                | ERROR_BUSY
        )
    )
}

#[cfg(not(any(unix, windows)))]
pub(crate) fn is_transient(_err: &io::Error) -> bool {
    false
}

/// Exit codes for the dupescan binary.
///
/// - 0: Success (completed normally, duplicates found)
/// - 1: General error (unexpected failure)
/// - 2: No duplicates found (completed normally, no duplicates)
/// - 130: Interrupted by user (Ctrl+C)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Success: scan completed and duplicates were found.
    Success = 0,
    /// General error: an unexpected error occurred.
    GeneralError = 1,
    /// No duplicates: scan completed but no duplicates were found.
    NoDuplicates = 2,
    /// Interrupted: scan was interrupted by user (Ctrl+C).
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_condition_from_io_error() {
        let err = io::Error::new(io::ErrorKind::PermissionDenied, "nope");
        assert_eq!(ErrorCondition::from(&err), ErrorCondition::PermissionDenied);

        let err = io::Error::new(io::ErrorKind::NotFound, "gone");
        assert_eq!(ErrorCondition::from(&err), ErrorCondition::NotFound);

        let err = io::Error::new(io::ErrorKind::UnexpectedEof, "short read");
        assert_eq!(ErrorCondition::from(&err), ErrorCondition::Io);

        let err = io::Error::other("mystery");
        assert_eq!(ErrorCondition::from(&err), ErrorCondition::Other);
    }

    #[test]
    fn test_condition_display() {
        assert_eq!(
            ErrorCondition::PermissionDenied.to_string(),
            "permission denied"
        );
        assert_eq!(ErrorCondition::Busy.to_string(), "resource busy");
    }

    #[test]
    fn test_scan_error_display() {
        let err = ScanError::NotADirectory(PathBuf::from("/file.txt"));
        assert_eq!(err.to_string(), "Search path is not a directory: /file.txt");

        let err = ScanError::EmptyPath;
        assert_eq!(err.to_string(), "Invalid search path");
    }

    #[test]
    #[cfg(unix)]
    fn test_transient_classification() {
        let emfile = io::Error::from_raw_os_error(libc::EMFILE);
        assert!(is_transient(&emfile));

        let eagain = io::Error::from_raw_os_error(libc::EAGAIN);
        assert!(is_transient(&eagain));

        let enoent = io::Error::from_raw_os_error(libc::ENOENT);
        assert!(!is_transient(&enoent));

        let custom = io::Error::other("no raw code");
        assert!(!is_transient(&custom));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
        assert_eq!(ExitCode::GeneralError.as_i32(), 1);
        assert_eq!(ExitCode::NoDuplicates.as_i32(), 2);
        assert_eq!(ExitCode::Interrupted.as_i32(), 130);
    }
}
