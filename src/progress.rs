//! Progress reporting for the scan pipeline.
//!
//! Every pipeline stage reports through the [`ProgressSink`] trait: a single
//! `report(percent, message)` call with an overall 0-100 percentage and a
//! human-readable status line. Stages own their update granularity (at most
//! once per ten files or once per bucket) so a sink is never flooded.
//!
//! The percentage bands are fixed across a scan: discovery fills 0-30,
//! the fast-checksum filter 30-60, and strong hashing 60-100.

use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressStyle};

/// Sink for scan progress updates.
///
/// Implementations must tolerate calls from the scan worker thread and from
/// hash pool workers; percentages are monotonically non-decreasing over the
/// life of one scan.
pub trait ProgressSink: Send + Sync {
    /// Report overall scan progress.
    ///
    /// # Arguments
    ///
    /// * `percent` - Overall completion, 0-100
    /// * `message` - Human-readable status line
    fn report(&self, percent: u8, message: &str);
}

/// Sink that discards all updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn report(&self, _percent: u8, _message: &str) {}
}

/// Terminal progress bar backed by indicatif.
///
/// The bar runs 0-100 and mirrors each reported message. `ProgressBar` is
/// internally reference-counted, so clones share one bar and the sink can be
/// handed to the scan thread while the caller keeps a handle for
/// [`TermProgress::finish_and_clear`].
#[derive(Clone)]
pub struct TermProgress {
    bar: ProgressBar,
}

impl TermProgress {
    /// Create a new terminal progress bar.
    #[must_use]
    pub fn new() -> Self {
        let bar = ProgressBar::new(100);
        bar.set_style(
            ProgressStyle::with_template(
                "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}% {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█>-"),
        );
        Self { bar }
    }

    /// Clear the bar, e.g. before printing the scan summary.
    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for TermProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for TermProgress {
    fn report(&self, percent: u8, message: &str) {
        self.bar.set_position(u64::from(percent.min(100)));
        self.bar.set_message(message.to_string());
    }
}

/// Sink that records every update, for tests and for driving non-terminal
/// frontends.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    updates: Mutex<Vec<(u8, String)>>,
}

impl RecordingProgress {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all updates received so far.
    #[must_use]
    pub fn updates(&self) -> Vec<(u8, String)> {
        self.updates.lock().expect("progress recorder poisoned").clone()
    }
}

impl ProgressSink for RecordingProgress {
    fn report(&self, percent: u8, message: &str) {
        self.updates
            .lock()
            .expect("progress recorder poisoned")
            .push((percent, message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_progress_is_silent() {
        // Just exercising the no-op path.
        let sink = NullProgress;
        sink.report(50, "halfway");
    }

    #[test]
    fn test_recording_progress_captures_updates() {
        let sink = RecordingProgress::new();
        sink.report(0, "start");
        sink.report(30, "discovered");

        let updates = sink.updates();
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0], (0, "start".to_string()));
        assert_eq!(updates[1], (30, "discovered".to_string()));
    }

    #[test]
    fn test_sinks_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NullProgress>();
        assert_send_sync::<TermProgress>();
        assert_send_sync::<RecordingProgress>();
    }
}
