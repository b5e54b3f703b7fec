//! Duplicate finder: the staged scan pipeline.
//!
//! # Overview
//!
//! [`DuplicateFinder`] orchestrates the four detection stages:
//!
//! 1. **Discovery** - walk the root collecting admissible files
//!    (see [`crate::scanner::Walker`])
//! 2. **Size classification** - bucket files by exact byte size
//! 3. **Fast-hash filtering** - CRC32 within multi-member buckets
//! 4. **Strong-hash resolution** - MD5 on a bounded worker pool, confirming
//!    the final duplicate groups
//!
//! Stage four is the only concurrent stage. Each work item carries the
//! global discovery index of its file; results are collected as workers
//! finish and group members are re-sorted by that index before groups are
//! finalized, so "index 0 is the original" does not depend on hash
//! completion timing.
//!
//! A scan cancelled at any stage returns a partial [`ScanResult`] with the
//! `cancelled` flag set; cancellation is never an error. Only an invalid
//! scan root fails a scan.
//!
//! # Example
//!
//! ```no_run
//! use dupsweep::duplicates::{DuplicateFinder, FinderConfig};
//! use std::path::Path;
//!
//! let finder = DuplicateFinder::new(FinderConfig::default());
//! let result = finder.scan(Path::new("/some/path")).unwrap();
//!
//! println!(
//!     "{} duplicate groups, {} reclaimable",
//!     result.groups.len(),
//!     result.reclaimable_display()
//! );
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use bytesize::ByteSize;
use rayon::prelude::*;

use super::groups::{group_by_fast_hash, group_by_size, DuplicateGroup};
use crate::progress::ProgressSink;
use crate::scanner::{md5_file, DigestKind, FileRecord, ScanConfig, ScanError, Walker};

/// Report strong-hash progress at most once per this many completions.
const PROGRESS_EVERY: usize = 10;

/// Strong-hash progress band: the final 40% of the scan.
const STRONG_BAND_START: u64 = 60;
const STRONG_BAND: u64 = 40;

/// The stages a scan session moves through.
///
/// `Cancelled` absorbs from any non-terminal stage; a scan only fails (the
/// `Err` path, logged as `Failed`) on an unusable root. Per-file errors
/// never change the stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStage {
    /// No scan running yet.
    Idle,
    /// Walking the root for candidate files.
    Discovering,
    /// Bucketing files by size.
    SizeGrouping,
    /// CRC32 filtering within size buckets.
    FastHashing,
    /// MD5 confirmation on the worker pool.
    StrongHashing,
    /// Scan finished normally.
    Completed,
    /// Scan observed the cancellation flag.
    Cancelled,
    /// Scan aborted on an unusable root.
    Failed,
}

impl std::fmt::Display for ScanStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Discovering => "discovering",
            Self::SizeGrouping => "size-grouping",
            Self::FastHashing => "fast-hashing",
            Self::StrongHashing => "strong-hashing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// Configuration for the duplicate finder.
#[derive(Clone, Default)]
pub struct FinderConfig {
    /// Scanner configuration (filters, skip-set, worker count).
    pub scan: ScanConfig,
    /// Optional cancellation flag shared with the caller.
    pub cancel_flag: Option<Arc<AtomicBool>>,
    /// Optional progress sink.
    pub progress: Option<Arc<dyn ProgressSink>>,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("scan", &self.scan)
            .field("cancel_flag", &self.cancel_flag)
            .field("progress", &self.progress.as_ref().map(|_| "<sink>"))
            .finish()
    }
}

impl FinderConfig {
    /// Create a configuration around a scanner config.
    #[must_use]
    pub fn new(scan: ScanConfig) -> Self {
        Self {
            scan,
            cancel_flag: None,
            progress: None,
        }
    }

    /// Set the cancellation flag shared across all stages.
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel_flag = Some(flag);
        self
    }

    /// Set the progress sink.
    #[must_use]
    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.progress = Some(sink);
        self
    }
}

/// Results of one scan, complete or cancelled.
#[derive(Debug, Clone)]
pub struct ScanResult {
    /// Number of files discovered.
    pub total_files: usize,
    /// Total bytes across the classified files.
    pub total_bytes: u64,
    /// Confirmed duplicate groups, ordered by the discovery index of each
    /// group's first member.
    pub groups: Vec<DuplicateGroup>,
    /// Wall-clock duration of the scan.
    pub elapsed: Duration,
    /// Whether the scan observed the cancellation flag.
    pub cancelled: bool,
}

impl ScanResult {
    /// Total redundant files across all groups (excluding each original).
    #[must_use]
    pub fn duplicate_file_count(&self) -> usize {
        self.groups.iter().map(DuplicateGroup::duplicate_count).sum()
    }

    /// Bytes freed by removing every duplicate.
    #[must_use]
    pub fn reclaimable_bytes(&self) -> u64 {
        self.groups.iter().map(DuplicateGroup::reclaimable_bytes).sum()
    }

    /// Reclaimable bytes as a human-readable string.
    #[must_use]
    pub fn reclaimable_display(&self) -> String {
        ByteSize::b(self.reclaimable_bytes()).to_string()
    }

    /// Total scanned bytes as a human-readable string.
    #[must_use]
    pub fn total_size_display(&self) -> String {
        ByteSize::b(self.total_bytes).to_string()
    }
}

/// Group hashed records into duplicate groups.
///
/// This is the ordering contract of the concurrent stage, kept as a pure
/// function: members are keyed by `(size, digest)`, sorted by their global
/// discovery index, and only keys with two or more members survive. Groups
/// come back ordered by the index of their first member. Records without a
/// digest (failed or cancelled hashes) are ignored.
#[must_use]
pub fn group_records(records: Vec<(usize, FileRecord)>) -> Vec<DuplicateGroup> {
    let mut by_digest: HashMap<(u64, String), Vec<(usize, PathBuf)>> = HashMap::new();

    for (index, record) in records {
        let Some(digest) = record.digest else { continue };
        by_digest
            .entry((record.size, digest))
            .or_default()
            .push((index, record.path));
    }

    let mut ordered: Vec<(usize, DuplicateGroup)> = by_digest
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .map(|((size, digest), mut members)| {
            members.sort_by_key(|&(index, _)| index);
            let first = members[0].0;
            let paths = members.into_iter().map(|(_, path)| path).collect();
            (first, DuplicateGroup { digest, size, paths })
        })
        .collect();

    ordered.sort_by_key(|&(first, _)| first);
    ordered.into_iter().map(|(_, group)| group).collect()
}

/// Duplicate finder orchestrating the staged detection pipeline.
pub struct DuplicateFinder {
    config: FinderConfig,
}

impl DuplicateFinder {
    /// Create a new finder with the given configuration.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        Self { config }
    }

    fn is_cancelled(&self) -> bool {
        self.config
            .cancel_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    fn cancel_ref(&self) -> Option<&AtomicBool> {
        self.config.cancel_flag.as_deref()
    }

    fn report(&self, percent: u8, message: &str) {
        if let Some(ref sink) = self.config.progress {
            sink.report(percent, message);
        }
    }

    fn advance(&self, stage: &mut ScanStage, next: ScanStage) {
        log::debug!("Scan stage: {} -> {}", stage, next);
        *stage = next;
    }

    /// Run the full pipeline against a scan root.
    ///
    /// # Errors
    ///
    /// Fails only when the root is missing, not a directory, or cannot be
    /// inspected. Per-file errors are absorbed by the stages, and a
    /// cancelled scan returns a partial result, not an error.
    pub fn scan(&self, root: &Path) -> Result<ScanResult, ScanError> {
        let start = Instant::now();
        let mut stage = ScanStage::Idle;

        log::info!("Starting duplicate scan of {}", root.display());
        self.advance(&mut stage, ScanStage::Discovering);
        self.report(0, "Starting scan...");

        let mut walker = Walker::new(root, self.config.scan.clone());
        if let Some(ref flag) = self.config.cancel_flag {
            walker = walker.with_cancel_flag(Arc::clone(flag));
        }
        if let Some(ref sink) = self.config.progress {
            walker = walker.with_progress(Arc::clone(sink));
        }

        let files = match walker.discover() {
            Ok(files) => files,
            Err(e) => {
                self.advance(&mut stage, ScanStage::Failed);
                return Err(e);
            }
        };
        if self.is_cancelled() {
            self.advance(&mut stage, ScanStage::Cancelled);
            return Ok(self.partial(files.len(), 0, start));
        }

        self.advance(&mut stage, ScanStage::SizeGrouping);
        let (size_groups, grouping_stats) = group_by_size(&files, self.cancel_ref());
        if self.is_cancelled() {
            self.advance(&mut stage, ScanStage::Cancelled);
            return Ok(self.partial(files.len(), grouping_stats.total_bytes, start));
        }

        self.advance(&mut stage, ScanStage::FastHashing);
        self.report(30, "Computing CRC32 checksums...");
        let (fast_groups, _) =
            group_by_fast_hash(size_groups, self.cancel_ref(), self.config.progress.as_deref());
        if self.is_cancelled() {
            self.advance(&mut stage, ScanStage::Cancelled);
            return Ok(self.partial(files.len(), grouping_stats.total_bytes, start));
        }

        self.advance(&mut stage, ScanStage::StrongHashing);
        self.report(60, "Computing MD5 digests...");

        // Tag every surviving candidate with its global discovery index so
        // the concurrent stage can restore discovery order afterwards.
        let index_of: HashMap<&Path, usize> = files
            .iter()
            .enumerate()
            .map(|(index, path)| (path.as_path(), index))
            .collect();

        let mut candidates: Vec<(usize, FileRecord)> = Vec::new();
        for ((size, _checksum), paths) in fast_groups {
            if paths.len() < 2 {
                continue;
            }
            for path in paths {
                if let Some(index) = index_of.get(path.as_path()).copied() {
                    candidates.push((index, FileRecord::new(path, size)));
                } else {
                    log::debug!("Dropping {} (not in discovery set)", path.display());
                }
            }
        }

        let hashed = self.strong_hash(candidates);
        let groups = group_records(hashed);

        let cancelled = self.is_cancelled();
        if cancelled {
            self.advance(&mut stage, ScanStage::Cancelled);
        } else {
            self.advance(&mut stage, ScanStage::Completed);
            self.report(100, "Scan complete");
        }

        let result = ScanResult {
            total_files: files.len(),
            total_bytes: grouping_stats.total_bytes,
            groups,
            elapsed: start.elapsed(),
            cancelled,
        };

        log::info!(
            "Scan {}: {} groups, {} duplicate files, {} reclaimable in {:.2?}",
            stage,
            result.groups.len(),
            result.duplicate_file_count(),
            result.reclaimable_display(),
            result.elapsed
        );

        Ok(result)
    }

    /// Compute MD5 digests on the bounded worker pool.
    ///
    /// Items observed after cancellation are skipped; completed digests are
    /// kept so a cancelled scan still yields whatever groups were confirmed.
    fn strong_hash(&self, candidates: Vec<(usize, FileRecord)>) -> Vec<(usize, FileRecord)> {
        let total = candidates.len();
        if total == 0 {
            return Vec::new();
        }

        log::debug!("Strong-hashing {} candidates", total);
        let done = AtomicUsize::new(0);
        // Reports from pool workers are serialized through this guard so the
        // percentage a sink observes never goes backwards.
        let last_percent = Mutex::new(STRONG_BAND_START as u8);

        let hash_one = |(index, mut record): (usize, FileRecord)| {
            if self.is_cancelled() {
                return None;
            }

            match md5_file(&record.path) {
                Ok(digest) => {
                    record.digest = Some(digest);
                    record.digest_kind = Some(DigestKind::Md5);

                    let n = done.fetch_add(1, Ordering::SeqCst) + 1;
                    if n % PROGRESS_EVERY == 0 || n == total {
                        let percent =
                            (STRONG_BAND_START + (n as u64 * STRONG_BAND / total as u64)) as u8;
                        let mut last = last_percent.lock().expect("progress guard poisoned");
                        if percent > *last {
                            *last = percent;
                            self.report(
                                percent,
                                &format!("Hashing candidates... ({n}/{total})"),
                            );
                        }
                    }
                    Some((index, record))
                }
                Err(e) => {
                    log::warn!("Failed to hash {}: {}", record.path.display(), e);
                    None
                }
            }
        };

        let workers = self.config.scan.workers.max(1);
        match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
            Ok(pool) => {
                pool.install(|| candidates.into_par_iter().filter_map(&hash_one).collect())
            }
            Err(e) => {
                log::warn!("Failed to build hash pool ({}), using global pool", e);
                candidates.into_par_iter().filter_map(&hash_one).collect()
            }
        }
    }

    fn partial(&self, total_files: usize, total_bytes: u64, start: Instant) -> ScanResult {
        ScanResult {
            total_files,
            total_bytes,
            groups: Vec::new(),
            elapsed: start.elapsed(),
            cancelled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn record(path: &str, size: u64, digest: Option<&str>) -> FileRecord {
        FileRecord {
            path: PathBuf::from(path),
            size,
            digest: digest.map(ToString::to_string),
            digest_kind: digest.map(|_| DigestKind::Md5),
        }
    }

    #[test]
    fn test_group_records_sorts_by_discovery_index() {
        // Completion order deliberately scrambled.
        let records = vec![
            (7, record("/g.txt", 10, Some("aaaa"))),
            (2, record("/c.txt", 10, Some("aaaa"))),
            (4, record("/e.txt", 10, Some("aaaa"))),
        ];

        let groups = group_records(records);

        assert_eq!(groups.len(), 1);
        let paths: Vec<_> = groups[0].paths.iter().map(|p| p.to_str().unwrap()).collect();
        assert_eq!(paths, vec!["/c.txt", "/e.txt", "/g.txt"]);
    }

    #[test]
    fn test_group_records_drops_singletons() {
        let records = vec![
            (0, record("/a.txt", 10, Some("aaaa"))),
            (1, record("/b.txt", 10, Some("bbbb"))),
        ];

        assert!(group_records(records).is_empty());
    }

    #[test]
    fn test_group_records_ignores_missing_digests() {
        let records = vec![
            (0, record("/a.txt", 10, Some("aaaa"))),
            (1, record("/b.txt", 10, None)),
            (2, record("/c.txt", 10, Some("aaaa"))),
        ];

        let groups = group_records(records);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 2);
    }

    #[test]
    fn test_group_records_separates_sizes_and_digests() {
        let records = vec![
            (0, record("/a.txt", 10, Some("aaaa"))),
            (1, record("/b.txt", 10, Some("aaaa"))),
            (2, record("/c.txt", 20, Some("cccc"))),
            (3, record("/d.txt", 20, Some("cccc"))),
        ];

        let groups = group_records(records);
        assert_eq!(groups.len(), 2);
        // Ordered by first member's discovery index.
        assert_eq!(groups[0].size, 10);
        assert_eq!(groups[1].size, 20);
        for group in &groups {
            assert!(group.paths.len() == 2);
        }
    }

    #[test]
    fn test_scan_invalid_root_fails() {
        let finder = DuplicateFinder::new(FinderConfig::default());
        assert!(matches!(
            finder.scan(Path::new("/nonexistent/root/xyz")),
            Err(ScanError::RootNotFound(_))
        ));
    }

    #[test]
    fn test_scan_empty_directory() {
        let dir = TempDir::new().unwrap();
        let finder = DuplicateFinder::new(FinderConfig::default());

        let result = finder.scan(dir.path()).unwrap();

        assert_eq!(result.total_files, 0);
        assert!(result.groups.is_empty());
        assert!(!result.cancelled);
        assert_eq!(result.reclaimable_bytes(), 0);
    }

    #[test]
    fn test_scan_finds_duplicate_pair() {
        let dir = TempDir::new().unwrap();
        for (name, content) in [("a.txt", "hello"), ("b.txt", "hello"), ("c.txt", "world")] {
            let mut f = File::create(dir.path().join(name)).unwrap();
            f.write_all(content.as_bytes()).unwrap();
        }

        let finder = DuplicateFinder::new(FinderConfig::default());
        let result = finder.scan(dir.path()).unwrap();

        assert_eq!(result.total_files, 3);
        assert_eq!(result.groups.len(), 1);
        assert_eq!(result.groups[0].len(), 2);
        assert_eq!(result.duplicate_file_count(), 1);
        assert_eq!(result.reclaimable_bytes(), 5);
    }

    #[test]
    fn test_scan_stage_display() {
        assert_eq!(ScanStage::Idle.to_string(), "idle");
        assert_eq!(ScanStage::StrongHashing.to_string(), "strong-hashing");
        assert_eq!(ScanStage::Cancelled.to_string(), "cancelled");
        assert_eq!(ScanStage::Failed.to_string(), "failed");
    }
}
