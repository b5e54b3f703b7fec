//! Command-line interface definitions.
//!
//! All CLI arguments and subcommands are defined with the clap derive API:
//! global options (verbosity, quiet) plus the `scan` subcommand that drives
//! the pipeline and the optional cleanup step.
//!
//! # Example
//!
//! ```bash
//! # Scan a directory and list duplicate groups
//! dupsweep scan ~/Pictures
//!
//! # Restrict to larger files and extra extensions
//! dupsweep scan ~/Downloads --min-size-mb 1 --ext iso --ext zip
//!
//! # Relocate duplicates into a holding folder, no confirmation prompt
//! dupsweep scan ~/Pictures --move-to ~/Desktop/Duplicates --yes
//!
//! # Delete duplicates outright
//! dupsweep scan ~/Pictures --delete
//! ```

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Staged duplicate file finder and cleaner.
///
/// dupsweep finds duplicate files by size grouping, CRC32 filtering, and MD5
/// confirmation, then relocates or deletes the redundant copies while always
/// keeping the first-discovered file of each group.
#[derive(Debug, Parser)]
#[command(name = "dupsweep")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress progress output and all logging except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan a directory for duplicate files
    Scan(ScanArgs),
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Directory to scan for duplicates
    #[arg(value_name = "PATH")]
    pub path: PathBuf,

    /// Minimum file size in megabytes
    #[arg(long, value_name = "MB")]
    pub min_size_mb: Option<f64>,

    /// Maximum file size in megabytes
    #[arg(long, value_name = "MB")]
    pub max_size_mb: Option<f64>,

    /// Additional file extension to scan (can be repeated)
    #[arg(long = "ext", value_name = "EXT")]
    pub extensions: Vec<String>,

    /// Additional folder name to skip (can be repeated)
    #[arg(long = "skip-folder", value_name = "NAME")]
    pub skip_folders: Vec<String>,

    /// Number of strong-hash workers
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,

    /// Relocate duplicates into this directory after the scan
    #[arg(long, value_name = "DIR", conflicts_with = "delete")]
    pub move_to: Option<PathBuf>,

    /// Delete duplicates after the scan
    ///
    /// The first-discovered file of each group is always kept.
    #[arg(long)]
    pub delete: bool,

    /// Apply the cleanup action configured in settings (move or delete)
    #[arg(long, conflicts_with_all = ["move_to", "delete"])]
    pub cleanup: bool,

    /// Skip the confirmation prompt before moving or deleting
    #[arg(short = 'y', long)]
    pub yes: bool,
}
