//! Cancellation handling for graceful scan shutdown.
//!
//! This module provides the shared cancellation flag used by every stage of
//! the scan pipeline, plus a Ctrl+C hook that sets it. The flag is an
//! `AtomicBool` shared by reference across the scan thread and the hash
//! worker pool; stages poll it at bounded intervals and finish the unit of
//! work already in flight before stopping.
//!
//! # Usage
//!
//! ```rust,no_run
//! use dupsweep::signal::install_handler;
//!
//! let handle = install_handler();
//!
//! // Pass the flag to worker threads
//! let cancel_flag = handle.flag();
//!
//! if handle.is_cancelled() {
//!     println!("Cancel requested, stopping...");
//! }
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Shared handle to a scan's cancellation flag.
///
/// Cloning the handle shares the underlying flag; setting it from any clone
/// (or from the flag itself) is observed by all of them. The scan engine
/// never resets a caller-provided flag, so a cancel issued before the scan
/// starts still wins - create a fresh handle (or call [`CancelHandle::reset`])
/// for each new scan.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Create a new handle with the flag initially unset.
    #[must_use]
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Check whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Request cancellation of the current scan or cleanup.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Get a clone of the flag for passing to worker threads.
    ///
    /// This is the hand-off point for `FinderConfig`, `Walker`, and the
    /// cleanup functions.
    #[must_use]
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    /// Reset the flag to unset, for reuse across scans.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL_HANDLE: OnceLock<CancelHandle> = OnceLock::new();

/// Install a Ctrl+C handler that sets the cancellation flag on interrupt.
///
/// Call this once, early in application startup. Repeated calls (including
/// from parallel tests) return the already-installed handle with its flag
/// reset, so a new scan is never born cancelled by a previous run. If the
/// process-wide signal hook cannot be registered, an unhooked handle is
/// returned; manual [`CancelHandle::cancel`] calls still work on it.
#[must_use]
pub fn install_handler() -> CancelHandle {
    if let Some(handle) = GLOBAL_HANDLE.get() {
        handle.reset();
        return handle.clone();
    }

    let handle = CancelHandle::new();
    let flag = handle.flag();

    match ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);

        // stderr is line-buffered, flush explicitly
        let _ = writeln!(std::io::stderr(), "\nCancelling. Finishing current work...");
        let _ = std::io::stderr().flush();

        log::info!("Cancellation signal received");
    }) {
        Ok(()) => {
            let _ = GLOBAL_HANDLE.set(handle.clone());
            handle
        }
        Err(e) => {
            // Another component already owns the signal hook. Fall back to a
            // handle that only responds to manual cancel() calls.
            log::debug!("Ctrl+C handler not installed ({}), using unhooked handle", e);
            let fallback = GLOBAL_HANDLE.get_or_init(CancelHandle::new).clone();
            fallback.reset();
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_starts_unset() {
        let handle = CancelHandle::new();
        assert!(!handle.is_cancelled());
    }

    #[test]
    fn test_cancel_sets_flag() {
        let handle = CancelHandle::new();
        handle.cancel();
        assert!(handle.is_cancelled());
    }

    #[test]
    fn test_reset_clears_flag() {
        let handle = CancelHandle::new();
        handle.cancel();
        handle.reset();
        assert!(!handle.is_cancelled());
    }

    #[test]
    fn test_flag_shares_state() {
        let handle = CancelHandle::new();
        let flag = handle.flag();

        assert!(!flag.load(Ordering::SeqCst));
        handle.cancel();
        assert!(flag.load(Ordering::SeqCst));
    }

    #[test]
    fn test_external_store_is_observed() {
        let handle = CancelHandle::new();
        handle.flag().store(true, Ordering::SeqCst);
        assert!(handle.is_cancelled());
    }

    #[test]
    fn test_clone_shares_flag() {
        let handle = CancelHandle::new();
        let cloned = handle.clone();

        handle.cancel();
        assert!(cloned.is_cancelled());
    }

    #[test]
    fn test_handle_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CancelHandle>();
    }
}
