//! Command-line interface definitions.
//!
//! Defines the CLI arguments, subcommands and options using the clap derive
//! API: global verbosity flags plus one subcommand per engine mode.
//!
//! # Example
//!
//! ```bash
//! # Find duplicates under ~/Downloads, recursively
//! dupescan scan -r ~/Downloads
//!
//! # Only consider images between 10KB and 100MB
//! dupescan scan -r --ext jpg --ext png --min-size 10KB --max-size 100MB ~/Pictures
//!
//! # JSON output for scripting
//! dupescan scan -r --output json ~/Downloads
//!
//! # One representative per distinct content, newest last
//! dupescan unique -r --sort-by modified ~/music
//! ```

use std::path::PathBuf;

use bytesize::ByteSize;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::scanner::SortOrder;

/// Content-addressed duplicate file finder.
///
/// Scans a directory tree, fingerprints every accepted file with SHA-512
/// and reports groups of byte-identical files.
#[derive(Debug, Parser)]
#[command(name = "dupescan")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Find groups of duplicate files
    Scan(ScanArgs),
    /// List one representative per distinct file content
    Unique(UniqueArgs),
}

/// Filters shared by both modes.
#[derive(Debug, Args)]
pub struct FilterArgs {
    /// Directory to scan
    pub path: PathBuf,

    /// Descend into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Follow symbolic links instead of ignoring them
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Skip hidden files and directories
    #[arg(long)]
    pub skip_hidden: bool,

    /// Minimum file size to consider (e.g. 10KB)
    #[arg(long, value_name = "SIZE")]
    pub min_size: Option<ByteSize>,

    /// Maximum file size to consider (e.g. 1GB)
    #[arg(long, value_name = "SIZE")]
    pub max_size: Option<ByteSize>,

    /// Only consider files with this extension (repeatable; aliases like
    /// jpg/jpeg are expanded automatically)
    #[arg(long = "ext", value_name = "EXT")]
    pub extensions: Vec<String>,

    /// Number of worker threads (default: hardware parallelism)
    #[arg(long, value_name = "N")]
    pub threads: Option<usize>,
}

/// Arguments for the `scan` subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    #[command(flatten)]
    pub filters: FilterArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

/// Arguments for the `unique` subcommand.
#[derive(Debug, Args)]
pub struct UniqueArgs {
    #[command(flatten)]
    pub filters: FilterArgs,

    /// Order of the resulting file list
    #[arg(long, value_enum, default_value_t = SortByArg::Name)]
    pub sort_by: SortByArg,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

/// Output format selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable listing
    Text,
    /// Machine-readable JSON report
    Json,
}

/// CLI spelling of the available sort orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortByArg {
    /// Numbered-filename order, then case-insensitive name order
    Name,
    /// Last modification time, oldest first
    Modified,
    /// Creation time, oldest first
    Created,
    /// File size, smallest first
    Size,
}

impl From<SortByArg> for SortOrder {
    fn from(arg: SortByArg) -> Self {
        match arg {
            SortByArg::Name => SortOrder::FileName,
            SortByArg::Modified => SortOrder::LastWriteTime,
            SortByArg::Created => SortOrder::CreationTime,
            SortByArg::Size => SortOrder::FileSize,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_scan() {
        let cli = Cli::try_parse_from(["dupescan", "scan", "-r", "/tmp"]).unwrap();
        match cli.command {
            Commands::Scan(args) => {
                assert!(args.filters.recursive);
                assert_eq!(args.filters.path, PathBuf::from("/tmp"));
                assert_eq!(args.output, OutputFormat::Text);
            }
            Commands::Unique(_) => panic!("expected scan subcommand"),
        }
    }

    #[test]
    fn test_cli_parses_sizes_and_extensions() {
        let cli = Cli::try_parse_from([
            "dupescan", "scan", "--min-size", "10KB", "--max-size", "1GB", "--ext", "jpg",
            "--ext", "png", "/tmp",
        ])
        .unwrap();
        match cli.command {
            Commands::Scan(args) => {
                assert_eq!(args.filters.min_size.unwrap().as_u64(), 10_000);
                assert_eq!(args.filters.max_size.unwrap().as_u64(), 1_000_000_000);
                assert_eq!(args.filters.extensions, vec!["jpg", "png"]);
            }
            Commands::Unique(_) => panic!("expected scan subcommand"),
        }
    }

    #[test]
    fn test_cli_parses_unique_sort() {
        let cli =
            Cli::try_parse_from(["dupescan", "unique", "--sort-by", "modified", "/tmp"]).unwrap();
        match cli.command {
            Commands::Unique(args) => {
                assert_eq!(args.sort_by, SortByArg::Modified);
                assert_eq!(SortOrder::from(args.sort_by), SortOrder::LastWriteTime);
            }
            Commands::Scan(_) => panic!("expected unique subcommand"),
        }
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["dupescan", "-q", "-v", "scan", "/tmp"]).is_err());
    }

    #[test]
    fn test_missing_path_is_an_error() {
        assert!(Cli::try_parse_from(["dupescan", "scan"]).is_err());
    }
}
