//! Ctrl+C handling wired to the scanner's cancellation flag.
//!
//! The handler wraps an `Arc<AtomicBool>`; hand the flag to a scanner with
//! `set_cancel_flag` and the walk stops at its next safepoint when the user
//! interrupts. The binary then exits with code 130.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Shutdown flag shared between the signal hook and scan workers.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandler {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandler {
    /// A fresh handler with no shutdown requested.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether Ctrl+C was pressed or a shutdown was requested manually.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Request a shutdown without a signal.
    pub fn request_shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// The shared flag, for `DuplicateScanner::set_cancel_flag` and friends.
    #[must_use]
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    /// Reset the flag; used by tests that reuse one handler.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

static GLOBAL_HANDLER: OnceLock<ShutdownHandler> = OnceLock::new();

/// Install the process-wide Ctrl+C hook and return its handler.
///
/// Safe to call repeatedly (tests running in parallel included): the first
/// call installs the hook, later calls get the same handler back with the
/// flag reset. If the hook cannot be installed at all — another library
/// already owns the signal — an unhooked handler is returned; manual
/// [`ShutdownHandler::request_shutdown`] still works.
pub fn install_handler() -> ShutdownHandler {
    if let Some(handler) = GLOBAL_HANDLER.get() {
        handler.reset();
        return handler.clone();
    }

    let handler = ShutdownHandler::new();
    let flag = handler.flag();

    let hooked = ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
        let _ = writeln!(std::io::stderr(), "\nInterrupted. Finishing in-flight work...");
        let _ = std::io::stderr().flush();
    })
    .is_ok();

    if !hooked {
        log::debug!("Ctrl+C hook already owned elsewhere; using unhooked handler");
    }
    GLOBAL_HANDLER.get_or_init(|| handler).clone()
}
