//! Relocation and deletion of confirmed duplicates.
//!
//! # Overview
//!
//! Both operations take the duplicate groups produced by a scan and act on
//! indices 1..N-1 of each group; index 0 - the first-discovered file - is
//! never touched. Relocation moves duplicates into a destination folder
//! under a collision-free name (`<stem>_<n><ext>`, n from 1); removal
//! deletes them outright.
//!
//! A per-file failure (permissions, already gone, locked) is logged,
//! recorded in the outcome, and the batch continues. The cancellation flag
//! is polled once per group, so the group being processed always finishes.
//! Outcomes report the files and bytes actually acted on, which stays
//! accurate under partial failure.

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::duplicates::DuplicateGroup;

/// Result of a relocation or removal batch.
#[derive(Debug, Clone, Default)]
pub struct CleanupOutcome {
    /// Files actually moved or deleted.
    pub files: usize,
    /// Bytes actually moved or deleted.
    pub bytes: u64,
    /// Per-file failures, with the error message.
    pub failures: Vec<(PathBuf, String)>,
}

impl CleanupOutcome {
    /// Number of per-file failures.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Check if every attempted file succeeded.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    /// Human-readable summary of the batch.
    #[must_use]
    pub fn summary(&self, verb: &str) -> String {
        if self.all_succeeded() {
            format!("{} {} file(s), {} bytes", verb, self.files, self.bytes)
        } else {
            format!(
                "{} {} file(s), {} failed, {} bytes",
                verb,
                self.files,
                self.failure_count(),
                self.bytes
            )
        }
    }
}

/// Relocate the duplicates of each group into `destination`.
///
/// The destination directory is created if absent; failure to create it is
/// fatal since no file could be moved. Every duplicate gets a
/// collision-free name inside `destination` and is then moved there
/// (rename, with a copy-and-remove fallback for cross-device moves).
///
/// # Errors
///
/// Only destination-directory creation errors are returned; per-file
/// failures are recorded in the outcome.
pub fn relocate_duplicates(
    groups: &[DuplicateGroup],
    destination: &Path,
    cancel: Option<&AtomicBool>,
) -> io::Result<CleanupOutcome> {
    fs::create_dir_all(destination)?;

    let mut outcome = CleanupOutcome::default();

    for group in groups {
        if cancel.is_some_and(|f| f.load(Ordering::SeqCst)) {
            log::info!("Relocation cancelled after {} file(s)", outcome.files);
            break;
        }

        for duplicate in group.duplicates() {
            match relocate_one(duplicate, destination) {
                Ok(bytes) => {
                    outcome.files += 1;
                    outcome.bytes += bytes;
                }
                Err(e) => {
                    log::warn!("Failed to move {}: {}", duplicate.display(), e);
                    outcome.failures.push((duplicate.clone(), e.to_string()));
                }
            }
        }
    }

    log::info!("{}", outcome.summary("Moved"));
    Ok(outcome)
}

/// Delete the duplicates of each group.
///
/// Nothing about this batch is fatal: per-file failures are recorded in the
/// outcome and the loop continues.
#[must_use]
pub fn remove_duplicates(
    groups: &[DuplicateGroup],
    cancel: Option<&AtomicBool>,
) -> CleanupOutcome {
    let mut outcome = CleanupOutcome::default();

    for group in groups {
        if cancel.is_some_and(|f| f.load(Ordering::SeqCst)) {
            log::info!("Removal cancelled after {} file(s)", outcome.files);
            break;
        }

        for duplicate in group.duplicates() {
            match remove_one(duplicate) {
                Ok(bytes) => {
                    outcome.files += 1;
                    outcome.bytes += bytes;
                }
                Err(e) => {
                    log::warn!("Failed to delete {}: {}", duplicate.display(), e);
                    outcome.failures.push((duplicate.clone(), e.to_string()));
                }
            }
        }
    }

    log::info!("{}", outcome.summary("Deleted"));
    outcome
}

/// Compute a collision-free destination path for `file_name` inside `dir`.
///
/// Returns `dir/file_name` when free, otherwise `dir/<stem>_<n><ext>` with
/// `n` counting up from 1 until the candidate does not exist.
#[must_use]
pub fn unique_destination(dir: &Path, file_name: &OsStr) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let base = Path::new(file_name);
    let stem = base
        .file_stem()
        .map_or_else(|| file_name.to_string_lossy().into_owned(), |s| {
            s.to_string_lossy().into_owned()
        });
    let extension = base.extension().map(|e| e.to_string_lossy().into_owned());

    let mut n: u32 = 1;
    loop {
        let name = match extension {
            Some(ref ext) => format!("{stem}_{n}.{ext}"),
            None => format!("{stem}_{n}"),
        };
        let candidate = dir.join(name);
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

fn relocate_one(path: &Path, destination: &Path) -> io::Result<u64> {
    let size = fs::metadata(path)?.len();
    let file_name = path.file_name().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "path has no file name")
    })?;

    let target = unique_destination(destination, file_name);
    move_file(path, &target)?;

    log::debug!("Moved {} -> {}", path.display(), target.display());
    Ok(size)
}

fn remove_one(path: &Path) -> io::Result<u64> {
    let size = fs::metadata(path)?.len();
    fs::remove_file(path)?;

    log::debug!("Deleted {} ({} bytes)", path.display(), size);
    Ok(size)
}

/// Move a file, falling back to copy-and-remove when rename fails
/// (typically a cross-device move).
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }

    fs::copy(from, to)?;
    if let Err(e) = fs::remove_file(from) {
        // Source could not be removed; take the copy back so the file is
        // not duplicated by the cleanup itself.
        let _ = fs::remove_file(to);
        return Err(e);
    }
    Ok(())
}
