//! Application driver: wires settings, signal handling, the scan worker
//! thread, and the cleanup step together behind the CLI.

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use std::thread;

use anyhow::{anyhow, Context, Result};
use bytesize::ByteSize;

use crate::actions::{relocate_duplicates, remove_duplicates};
use crate::cli::{Cli, Commands, ScanArgs};
use crate::config::{normalize_extension, CleanupAction, Settings};
use crate::duplicates::{DuplicateFinder, FinderConfig, ScanResult};
use crate::error::ExitCode;
use crate::progress::{ProgressSink, TermProgress};
use crate::{logging, signal};

/// Run the application logic and return the process exit code.
///
/// # Errors
///
/// Returns an error for unrecoverable conditions only (invalid scan root,
/// unusable relocation destination). Cancelled scans and per-file cleanup
/// failures are reported through the exit code and logs instead.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Scan(args) => run_scan(&args, cli.quiet),
    }
}

fn run_scan(args: &ScanArgs, quiet: bool) -> Result<ExitCode> {
    let mut settings = Settings::load();
    apply_overrides(&mut settings, args);

    let handle = signal::install_handler();

    let term = if quiet { None } else { Some(TermProgress::new()) };

    let mut finder_config = FinderConfig::new(settings.scan_config())
        .with_cancel_flag(handle.flag());
    if let Some(ref term) = term {
        let sink: Arc<dyn ProgressSink> = Arc::new(term.clone());
        finder_config = finder_config.with_progress(sink);
    }

    // The scan runs on its own worker thread so this one stays responsive
    // to Ctrl+C while stages block on file I/O.
    let root = args.path.clone();
    let worker = thread::spawn(move || DuplicateFinder::new(finder_config).scan(&root));
    let result = worker
        .join()
        .map_err(|_| anyhow!("scan worker panicked"))?
        .with_context(|| format!("scanning {}", args.path.display()))?;

    if let Some(ref term) = term {
        term.finish_and_clear();
    }

    print_summary(&result);

    if result.cancelled {
        println!("Scan cancelled; results above are partial.");
        return Ok(ExitCode::Cancelled);
    }

    if result.groups.is_empty() {
        println!("No duplicates found.");
        return Ok(ExitCode::NoDuplicates);
    }

    if args.delete {
        run_removal(&result, args.yes, &handle)?;
    } else if let Some(ref dest) = args.move_to {
        run_relocation(&result, dest, args.yes, &handle)?;
    } else if args.cleanup {
        match settings.cleanup.action {
            CleanupAction::Move => {
                let dest = settings.destination_folder();
                run_relocation(&result, &dest, args.yes, &handle)?;
            }
            CleanupAction::Delete => run_removal(&result, args.yes, &handle)?,
        }
    }

    Ok(ExitCode::Success)
}

/// CLI flags win over persisted settings for this invocation.
fn apply_overrides(settings: &mut Settings, args: &ScanArgs) {
    if let Some(min) = args.min_size_mb {
        settings.scan.min_file_size_mb = min;
    }
    if let Some(max) = args.max_size_mb {
        settings.scan.max_file_size_mb = max;
    }
    if let Some(workers) = args.workers {
        settings.scan.workers = workers;
    }
    settings
        .scan
        .custom_extensions
        .extend(args.extensions.iter().map(|e| normalize_extension(e)));
    settings.scan.skip_folders.extend(args.skip_folders.iter().cloned());
}

fn print_summary(result: &ScanResult) {
    println!(
        "Scanned {} file(s) ({}) in {:.2?}",
        result.total_files,
        result.total_size_display(),
        result.elapsed
    );

    if result.groups.is_empty() {
        return;
    }

    println!(
        "{} duplicate group(s), {} redundant file(s), {} reclaimable:",
        result.groups.len(),
        result.duplicate_file_count(),
        result.reclaimable_display()
    );

    for (i, group) in result.groups.iter().enumerate() {
        println!(
            "\nGroup {} - {} files of {} (md5 {}):",
            i + 1,
            group.len(),
            ByteSize::b(group.size),
            group.digest
        );
        for (j, path) in group.paths.iter().enumerate() {
            let marker = if j == 0 { "[keep]" } else { "      " };
            println!("  {} {}", marker, path.display());
        }
    }
    println!();
}

fn run_removal(result: &ScanResult, yes: bool, handle: &signal::CancelHandle) -> Result<()> {
    let count = result.duplicate_file_count();
    if !yes && !confirm(&format!("Delete {count} duplicate file(s)?"))? {
        println!("Aborted.");
        return Ok(());
    }

    let flag = handle.flag();
    let outcome = remove_duplicates(&result.groups, Some(flag.as_ref()));
    println!("{}", outcome.summary("Deleted"));
    Ok(())
}

fn run_relocation(
    result: &ScanResult,
    destination: &Path,
    yes: bool,
    handle: &signal::CancelHandle,
) -> Result<()> {
    let count = result.duplicate_file_count();
    if !yes
        && !confirm(&format!(
            "Move {count} duplicate file(s) to {}?",
            destination.display()
        ))?
    {
        println!("Aborted.");
        return Ok(());
    }

    let flag = handle.flag();
    let outcome = relocate_duplicates(&result.groups, destination, Some(flag.as_ref()))
        .with_context(|| format!("creating destination {}", destination.display()))?;
    println!("{}", outcome.summary("Moved"));
    Ok(())
}

/// Ask a yes/no question on stdin; defaults to no.
fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N] ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(matches!(line.trim(), "y" | "Y" | "yes" | "Yes"))
}
