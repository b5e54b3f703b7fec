//! Scanner module for file discovery and content hashing.
//!
//! This module provides:
//! - Deterministic directory traversal with skip-folder, extension, and
//!   size filtering ([`walker`])
//! - Streaming CRC32 and MD5 file hashing ([`hasher`])
//!
//! # Example
//!
//! ```no_run
//! use dupsweep::scanner::{ScanConfig, Walker};
//! use std::path::Path;
//!
//! let config = ScanConfig::default();
//! let walker = Walker::new(Path::new("/home/user/Pictures"), config);
//! let files = walker.discover().expect("scan root should be a directory");
//! println!("Found {} candidate files", files.len());
//! ```

pub mod hasher;
pub mod walker;

use std::collections::HashSet;
use std::path::PathBuf;

pub use hasher::{crc32_file, md5_file, DigestKind};
pub use walker::Walker;

/// Metadata for a file moving through the scan pipeline.
///
/// Created when a discovered path is classified by size; the digest fields
/// are filled in by the hashing stages and left untouched afterwards.
/// Records are independent values keyed by path - no record owns another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Absolute path to the file.
    pub path: PathBuf,
    /// File size in bytes.
    pub size: u64,
    /// Hex digest, once a hashing stage has produced one.
    pub digest: Option<String>,
    /// Which algorithm produced `digest`.
    pub digest_kind: Option<DigestKind>,
}

impl FileRecord {
    /// Create a record with no digest yet.
    #[must_use]
    pub fn new(path: PathBuf, size: u64) -> Self {
        Self {
            path,
            size,
            digest: None,
            digest_kind: None,
        }
    }
}

/// Runtime configuration for a scan, derived from the persisted settings.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Allowed extensions in `.ext` lower-case form. Files whose lower-cased
    /// extension is not in this set are skipped.
    pub allowed_extensions: HashSet<String>,
    /// Minimum file size in megabytes.
    pub min_file_size_mb: f64,
    /// Maximum file size in megabytes.
    pub max_file_size_mb: f64,
    /// Directory base names that are pruned, case-sensitively.
    pub skip_folders: HashSet<String>,
    /// Strong-hash worker pool size.
    pub workers: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        crate::config::Settings::default().scan_config()
    }
}

/// Errors raised by the scan pipeline.
///
/// Only the root-validation variants abort a scan. `Access` describes a
/// per-entry failure; those are logged and the entry is skipped, so the
/// variant never propagates out of the pipeline.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// The scan root does not exist.
    #[error("Scan root not found: {0}")]
    RootNotFound(PathBuf),

    /// The scan root is not a directory.
    #[error("Scan root is not a directory: {0}")]
    RootNotADirectory(PathBuf),

    /// The scan root exists but could not be inspected.
    #[error("I/O error for scan root {path}: {source}")]
    RootIo {
        /// The scan root.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Permission or I/O failure on a single entry.
    #[error("Access error for {path}: {source}")]
    Access {
        /// Path where the error occurred.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}
