//! Directory walker for candidate file discovery.
//!
//! # Overview
//!
//! The [`Walker`] enumerates candidate files under a scan root, applying
//! three admission rules: the directory skip-set (pruned subtrees are never
//! entered or counted), the extension allow-set (case-insensitive), and the
//! configured size bounds in megabytes. Entries are visited in file-name
//! order, so discovery order is stable for a fixed tree - the rest of the
//! pipeline relies on this for its "first file is the original" convention.
//!
//! Discovery runs in two passes: a counting pass to establish a progress
//! denominator, then the collection pass, which reports progress across the
//! first 30% of the scan at a bounded granularity. Both passes poll the
//! cancellation flag at every entry and stop early with whatever has been
//! collected.
//!
//! Per-entry failures (unreadable directories, files that vanish between
//! listing and stat) are logged and skipped; only an invalid scan root
//! fails the walk.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use walkdir::WalkDir;

use super::{ScanConfig, ScanError};
use crate::progress::ProgressSink;

/// Report discovery progress at most once per this many files.
const PROGRESS_EVERY: u64 = 10;

/// Portion of overall scan progress taken by discovery.
const DISCOVERY_BAND: u64 = 30;

/// Directory walker for candidate file discovery.
pub struct Walker {
    /// Root path to walk.
    root: PathBuf,
    /// Scan configuration.
    config: ScanConfig,
    /// Optional cancellation flag, polled per entry.
    cancel_flag: Option<Arc<AtomicBool>>,
    /// Optional progress sink for the 0-30% discovery band.
    progress: Option<Arc<dyn ProgressSink>>,
}

impl std::fmt::Debug for Walker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Walker")
            .field("root", &self.root)
            .field("config", &self.config)
            .field("cancel_flag", &self.cancel_flag)
            .field("progress", &self.progress.as_ref().map(|_| "<sink>"))
            .finish()
    }
}

impl Walker {
    /// Create a new walker for the given root.
    #[must_use]
    pub fn new(root: &Path, config: ScanConfig) -> Self {
        Self {
            root: root.to_path_buf(),
            config,
            cancel_flag: None,
            progress: None,
        }
    }

    /// Set the cancellation flag, polled at every directory and file.
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel_flag = Some(flag);
        self
    }

    /// Set the progress sink for discovery updates.
    #[must_use]
    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    fn report(&self, percent: u8, message: &str) {
        if let Some(ref sink) = self.progress {
            sink.report(percent, message);
        }
    }

    /// Discover all admissible files under the root, in stable file-name
    /// order per directory level.
    ///
    /// # Errors
    ///
    /// Returns `ScanError::RootNotFound` / `ScanError::RootNotADirectory`
    /// when the root is missing or not a directory, and
    /// `ScanError::RootIo` when the root cannot be inspected at all.
    /// Per-entry failures are logged and skipped, never returned.
    pub fn discover(&self) -> Result<Vec<PathBuf>, ScanError> {
        self.validate_root()?;

        // Pass 1: count candidate entries so progress has a denominator.
        let total = self.count_entries();
        if self.is_cancelled() {
            log::info!("Discovery cancelled during counting pass");
            return Ok(Vec::new());
        }
        log::debug!("Discovery counting pass saw {} files", total);

        // Pass 2: collect admissible files.
        let mut files = Vec::new();
        let mut processed: u64 = 0;

        for entry in self.walk_dir() {
            if self.is_cancelled() {
                log::info!("Discovery cancelled after {} files", processed);
                break;
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    self.log_walk_error(&e);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }
            processed += 1;

            if self.admits(&entry) {
                files.push(entry.into_path());
            }

            if processed % PROGRESS_EVERY == 0 {
                let percent = if total == 0 {
                    0
                } else {
                    (processed * DISCOVERY_BAND / total).min(DISCOVERY_BAND) as u8
                };
                self.report(
                    percent,
                    &format!("Discovering files... ({} found)", files.len()),
                );
            }
        }

        log::info!(
            "Discovery complete: {} of {} files admitted",
            files.len(),
            processed
        );
        Ok(files)
    }

    /// Fail fast when the root is unusable; everything below this is
    /// recoverable per entry.
    fn validate_root(&self) -> Result<(), ScanError> {
        let metadata = fs::metadata(&self.root).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ScanError::RootNotFound(self.root.clone())
            } else {
                ScanError::RootIo {
                    path: self.root.clone(),
                    source: e,
                }
            }
        })?;

        if !metadata.is_dir() {
            return Err(ScanError::RootNotADirectory(self.root.clone()));
        }
        Ok(())
    }

    /// Walk configured with deterministic ordering and skip-folder pruning.
    ///
    /// The root itself is never pruned: scanning it was an explicit request,
    /// even when its own name appears in the skip-set.
    fn walk_dir(&self) -> impl Iterator<Item = Result<walkdir::DirEntry, walkdir::Error>> + '_ {
        WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| {
                if entry.depth() == 0 || !entry.file_type().is_dir() {
                    return true;
                }
                let name = entry.file_name().to_string_lossy();
                if self.config.skip_folders.contains(name.as_ref()) {
                    log::debug!("Skipping folder: {}", entry.path().display());
                    false
                } else {
                    true
                }
            })
    }

    /// Count files the collection pass will consider, honoring the same
    /// pruning rules. Entry errors are ignored here; the collection pass
    /// logs them.
    fn count_entries(&self) -> u64 {
        let mut total: u64 = 0;
        for entry in self.walk_dir() {
            if self.is_cancelled() {
                break;
            }
            if let Ok(entry) = entry {
                if entry.file_type().is_file() {
                    total += 1;
                }
            }
        }
        total
    }

    /// Admission check: extension allow-set and size bounds. Metadata
    /// failures exclude the file silently.
    fn admits(&self, entry: &walkdir::DirEntry) -> bool {
        let path = entry.path();

        let Some(extension) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        if !self
            .config
            .allowed_extensions
            .contains(&format!(".{}", extension.to_lowercase()))
        {
            return false;
        }

        let size = match entry.metadata() {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                log::debug!("Excluding {} (metadata error: {})", path.display(), e);
                return false;
            }
        };

        let size_mb = size as f64 / (1024.0 * 1024.0);
        if size_mb < self.config.min_file_size_mb || size_mb > self.config.max_file_size_mb {
            log::trace!("Excluding {} ({:.2} MB out of bounds)", path.display(), size_mb);
            return false;
        }

        true
    }

    fn log_walk_error(&self, error: &walkdir::Error) {
        let path = error
            .path()
            .map_or_else(|| self.root.clone(), Path::to_path_buf);
        log::warn!(
            "{}",
            ScanError::Access {
                path,
                source: std::io::Error::other(error.to_string()),
            }
        );
    }
}
