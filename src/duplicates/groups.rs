//! Size classification and fast-hash filtering.
//!
//! # Overview
//!
//! These are the two cheap elimination stages of the pipeline:
//!
//! 1. **Size classification**: files of different lengths cannot be
//!    duplicates, so discovered paths are bucketed by exact byte size.
//! 2. **Fast-hash filtering**: within each multi-member size bucket, a CRC32
//!    checksum splits files whose bytes differ, leaving only real duplicate
//!    candidates for the expensive strong-hash stage.
//!
//! Both stages preserve discovery order within every group they emit; the
//! resolver depends on that for the "first file is the original" convention.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use crate::progress::ProgressSink;
use crate::scanner::crc32_file;

/// Fast-hash progress band: starts where discovery left off.
const FAST_HASH_BAND_START: u64 = 30;

/// Width of the fast-hash progress band.
const FAST_HASH_BAND: u64 = 30;

/// A confirmed group of byte-identical files.
///
/// Members are in discovery order; index 0 is the conventionally-kept
/// "original" and the rest are its duplicates. The designation is purely
/// positional.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    /// Strong digest shared by every member, as lower-case hex.
    pub digest: String,
    /// Byte size shared by every member.
    pub size: u64,
    /// Member paths in discovery order.
    pub paths: Vec<PathBuf>,
}

impl DuplicateGroup {
    /// Number of files in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Check if this group has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// The kept representative (first-discovered member).
    #[must_use]
    pub fn original(&self) -> Option<&Path> {
        self.paths.first().map(PathBuf::as_path)
    }

    /// The redundant members (everything after index 0).
    #[must_use]
    pub fn duplicates(&self) -> &[PathBuf] {
        if self.paths.len() > 1 {
            &self.paths[1..]
        } else {
            &[]
        }
    }

    /// Number of redundant copies.
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.paths.len().saturating_sub(1)
    }

    /// Bytes freed by removing everything except the representative.
    #[must_use]
    pub fn reclaimable_bytes(&self) -> u64 {
        self.size * self.duplicate_count() as u64
    }
}

/// Statistics from the size classification stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupingStats {
    /// Number of paths classified.
    pub total_files: usize,
    /// Total bytes across all classified files.
    pub total_bytes: u64,
    /// Paths excluded because they could not be stat'ed.
    pub stat_failures: usize,
}

/// Group discovered paths by exact file size.
///
/// Pure grouping over `fs::metadata`: a stat failure on an individual file
/// excludes only that file. The cancellation flag is polled once per file;
/// on trip, the buckets built so far are returned.
///
/// Buckets preserve input (discovery) order and singleton buckets are kept;
/// the fast-hash stage skips them, which keeps this stage a pure grouping.
#[must_use]
pub fn group_by_size(
    paths: &[PathBuf],
    cancel: Option<&AtomicBool>,
) -> (HashMap<u64, Vec<PathBuf>>, GroupingStats) {
    let mut buckets: HashMap<u64, Vec<PathBuf>> = HashMap::new();
    let mut stats = GroupingStats::default();

    for path in paths {
        if cancel.is_some_and(|f| f.load(Ordering::SeqCst)) {
            log::info!("Size classification cancelled after {} files", stats.total_files);
            break;
        }

        let size = match fs::metadata(path) {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                log::debug!("Excluding {} from size groups: {}", path.display(), e);
                stats.stat_failures += 1;
                continue;
            }
        };

        stats.total_files += 1;
        stats.total_bytes += size;
        buckets.entry(size).or_default().push(path.clone());
    }

    log::debug!(
        "Size classification: {} files into {} buckets ({} stat failures)",
        stats.total_files,
        buckets.len(),
        stats.stat_failures
    );

    (buckets, stats)
}

/// Statistics from the fast-hash filtering stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FastHashStats {
    /// Files that entered the stage (members of multi-member size buckets).
    pub candidate_files: usize,
    /// Files successfully checksummed.
    pub hashed_files: usize,
    /// Files excluded by read failures.
    pub read_failures: usize,
    /// Files proven unique by their size alone (singleton buckets).
    pub eliminated_by_size: usize,
}

/// Checksum every member of each multi-member size bucket and regroup by
/// `(size, checksum)`.
///
/// Singleton size buckets cannot contain duplicates and are skipped without
/// any hashing. A read failure on one file excludes only that file. The
/// stage runs sequentially; the checksum is a pure function of file bytes,
/// so a concurrent replacement only needs to preserve the insertion order
/// within each emitted group.
///
/// Progress covers the 30-60% band, reported per bucket. Cancellation is
/// polled per bucket and per file; on trip the groups built so far are
/// returned.
#[must_use]
pub fn group_by_fast_hash(
    size_groups: HashMap<u64, Vec<PathBuf>>,
    cancel: Option<&AtomicBool>,
    progress: Option<&dyn ProgressSink>,
) -> (HashMap<(u64, u32), Vec<PathBuf>>, FastHashStats) {
    let mut groups: HashMap<(u64, u32), Vec<PathBuf>> = HashMap::new();
    let mut stats = FastHashStats::default();

    let multi_buckets = size_groups.values().filter(|v| v.len() > 1).count() as u64;
    let mut buckets_done: u64 = 0;

    'buckets: for (size, paths) in size_groups {
        if cancel.is_some_and(|f| f.load(Ordering::SeqCst)) {
            log::info!("Fast-hash filtering cancelled");
            break;
        }

        if paths.len() < 2 {
            stats.eliminated_by_size += paths.len();
            continue;
        }

        stats.candidate_files += paths.len();
        for path in paths {
            if cancel.is_some_and(|f| f.load(Ordering::SeqCst)) {
                log::info!("Fast-hash filtering cancelled mid-bucket");
                break 'buckets;
            }

            match crc32_file(&path) {
                Ok(checksum) => {
                    stats.hashed_files += 1;
                    groups.entry((size, checksum)).or_default().push(path);
                }
                Err(e) => {
                    log::warn!("Failed to checksum {}: {}", path.display(), e);
                    stats.read_failures += 1;
                }
            }
        }

        buckets_done += 1;
        if let Some(sink) = progress {
            let band_offset = if multi_buckets == 0 {
                0
            } else {
                buckets_done * FAST_HASH_BAND / multi_buckets
            };
            let percent = (FAST_HASH_BAND_START + band_offset) as u8;
            sink.report(
                percent,
                &format!(
                    "Computing CRC32 checksums... ({}/{} groups)",
                    buckets_done, multi_buckets
                ),
            );
        }
    }

    log::debug!(
        "Fast-hash filtering: {} candidates into {} groups ({} read failures)",
        stats.candidate_files,
        groups.len(),
        stats.read_failures
    );

    (groups, stats)
}
