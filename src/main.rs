//! dupescan - content-addressed duplicate file finder.
//!
//! Entry point for the CLI: wires the scan engine to logging, Ctrl+C
//! handling, a progress spinner and text/JSON output.

use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use bytesize::ByteSize;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use dupescan::cli::{Cli, Commands, FilterArgs, OutputFormat, ScanArgs, UniqueArgs};
use dupescan::error::ExitCode;
use dupescan::progress::OperationState;
use dupescan::scanner::{DuplicateScanner, ScanSummary, UniqueFilesScanner};
use dupescan::signal::ShutdownHandler;
use dupescan::{logging, signal};

fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose, cli.quiet);
    let handler = signal::install_handler();

    let quiet = cli.quiet;
    let result = match cli.command {
        Commands::Scan(args) => run_scan(args, &handler, quiet),
        Commands::Unique(args) => run_unique(args, &handler, quiet),
    };

    let code = match result {
        Ok(_) if handler.is_shutdown_requested() => ExitCode::Interrupted,
        Ok(code) => code,
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::GeneralError
        }
    };
    process::exit(code.as_i32());
}

/// JSON shape of one duplicate group.
#[derive(Serialize)]
struct GroupReport<'a> {
    size: u64,
    digest: &'a str,
    paths: &'a [PathBuf],
}

/// JSON shape of a whole duplicate scan.
#[derive(Serialize)]
struct ScanReport<'a> {
    root: &'a Path,
    summary: ScanSummary,
    groups: Vec<GroupReport<'a>>,
}

/// JSON shape of a unique-files run.
#[derive(Serialize)]
struct UniqueReport<'a> {
    root: &'a Path,
    files_encountered: u64,
    count: usize,
    files: &'a [PathBuf],
}

fn run_scan(args: ScanArgs, handler: &ShutdownHandler, quiet: bool) -> Result<ExitCode> {
    let mut scanner = DuplicateScanner::new(&args.filters.path)?;
    scanner.set_cancel_flag(handler.flag());
    apply_scan_filters(&mut scanner, &args.filters);

    let spinner = make_spinner(quiet || args.output == OutputFormat::Json);
    if let Some(pb) = &spinner {
        let pb = pb.clone();
        scanner.set_scan_progress_callback(move |_root, files, groups| {
            pb.set_message(format!("{files} files examined, {groups} duplicate groups"));
        });
    }

    let errors = Arc::new(AtomicU64::new(0));
    {
        let errors = Arc::clone(&errors);
        scanner.set_scan_error_callback(move |_root, path, condition| {
            errors.fetch_add(1, Ordering::SeqCst);
            log::warn!("Skipped {}: {}", path.display(), condition);
        });
    }

    scanner.perform_scan(args.filters.recursive)?;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    match args.output {
        OutputFormat::Text => print_scan_text(&scanner),
        OutputFormat::Json => print_scan_json(&scanner)?,
    }

    let error_count = errors.load(Ordering::SeqCst);
    if error_count > 0 {
        log::warn!("{error_count} entries could not be read");
    }

    Ok(if scanner.group_count() > 0 {
        ExitCode::Success
    } else {
        ExitCode::NoDuplicates
    })
}

fn run_unique(args: UniqueArgs, handler: &ShutdownHandler, quiet: bool) -> Result<ExitCode> {
    let mut scanner = UniqueFilesScanner::new(&args.filters.path)?;
    scanner.set_cancel_flag(handler.flag());
    apply_unique_filters(&mut scanner, &args.filters);

    let spinner = make_spinner(quiet || args.output == OutputFormat::Json);
    if let Some(pb) = &spinner {
        let pb = pb.clone();
        scanner.set_progress_callback(move |files, classes, state| {
            if state == OperationState::Underway {
                pb.set_message(format!("{files} files examined, {classes} distinct contents"));
            }
        });
    }

    scanner.perform_scan(args.filters.recursive)?;
    scanner.sort(args.sort_by.into());
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    match args.output {
        OutputFormat::Text => {
            for path in scanner.iter() {
                println!("{}", path.display());
            }
            log::info!(
                "{} distinct contents among {} files",
                scanner.len(),
                scanner.files_encountered()
            );
        }
        OutputFormat::Json => {
            let report = UniqueReport {
                root: scanner.search_dir(),
                files_encountered: scanner.files_encountered(),
                count: scanner.len(),
                files: scanner.files(),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(ExitCode::Success)
}

fn apply_scan_filters(scanner: &mut DuplicateScanner, filters: &FilterArgs) {
    scanner.set_follow_symlinks(filters.follow_symlinks);
    scanner.set_skip_hidden(filters.skip_hidden);
    if let Some(min) = filters.min_size {
        scanner.set_minimum_size(min.as_u64());
    }
    if let Some(max) = filters.max_size {
        scanner.set_maximum_size(max.as_u64());
    }
    scanner.add_filters(&filters.extensions);
    if let Some(threads) = filters.threads {
        scanner.set_thread_count(threads);
    }
}

fn apply_unique_filters(scanner: &mut UniqueFilesScanner, filters: &FilterArgs) {
    scanner.set_follow_symlinks(filters.follow_symlinks);
    scanner.set_skip_hidden(filters.skip_hidden);
    if let Some(min) = filters.min_size {
        scanner.set_minimum_size(min.as_u64());
    }
    if let Some(max) = filters.max_size {
        scanner.set_maximum_size(max.as_u64());
    }
    scanner.add_filters(&filters.extensions);
    if let Some(threads) = filters.threads {
        scanner.set_thread_count(threads);
    }
}

fn make_spinner(disabled: bool) -> Option<ProgressBar> {
    if disabled {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{spinner:.green} {msg}").expect("valid template"));
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_message("scanning...");
    Some(pb)
}

fn print_scan_text(scanner: &DuplicateScanner) {
    let view = scanner.groups();
    for (fingerprint, set) in view.iter() {
        println!(
            "Duplicate group ({}, {} files):",
            ByteSize::b(fingerprint.size),
            set.len()
        );
        for path in set {
            println!("  {}", path.display());
        }
        println!();
    }

    let summary = scanner.summary();
    println!(
        "{} files examined; {} duplicates in {} groups; {} recoverable",
        summary.files_encountered,
        summary.duplicate_files,
        summary.group_count,
        ByteSize::b(summary.wasted_bytes)
    );
}

fn print_scan_json(scanner: &DuplicateScanner) -> Result<()> {
    let view = scanner.groups();
    let groups: Vec<GroupReport<'_>> = view
        .iter()
        .map(|(fingerprint, set)| GroupReport {
            size: fingerprint.size,
            digest: &fingerprint.digest,
            paths: set.paths(),
        })
        .collect();
    let report = ScanReport {
        root: scanner.search_dir(),
        summary: scanner.summary(),
        groups,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
