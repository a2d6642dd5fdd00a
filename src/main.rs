mod actions;
mod audit;
mod grouping;
mod hasher;
mod index;
mod interactive;
mod linkstate;
mod output;
mod progress;
mod scanner;
mod util;

use std::io;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use colored::Colorize;
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::actions::{Action, ExecOptions};
use crate::audit::{AuditLogger, FileAuditLogger, NullAuditLogger};
use crate::hasher::HashAlgorithm;
use crate::output::{DuplicateReport, Formatter, HumanFormatter, JsonFormatter};
use crate::progress::{NoProgress, ProgressReporter, TermProgress};
use crate::scanner::ScanOptions;
use crate::util::{format_bytes, format_number};

#[derive(Parser, Debug)]
#[command(name = "dupelink")]
#[command(version, about = "Find duplicate files and collapse them into links", long_about = None)]
struct Cli {
    /// First directory to scan
    dir_a: PathBuf,

    /// Optional second directory; duplicates are matched across both trees
    dir_b: Option<PathBuf>,

    /// Action to take on duplicates
    #[arg(short, long, value_enum, default_value_t = Action::Compare)]
    action: Action,

    /// Digest algorithm for content signatures
    #[arg(long, value_enum, default_value_t = HashAlgorithm::Blake3)]
    algorithm: HashAlgorithm,

    /// Prefer files under this directory as group masters
    #[arg(long)]
    master_dir: Option<PathBuf>,

    /// Sample large files instead of reading them fully
    #[arg(long)]
    fast: bool,

    /// Size in bytes at or above which --fast samples instead of reading fully
    #[arg(long, value_name = "BYTES", default_value_t = hasher::FAST_MODE_THRESHOLD)]
    fast_threshold: u64,

    /// Fall back to symlinks when hardlinking would cross filesystems
    #[arg(long)]
    fallback_symlink: bool,

    /// Create links under this directory instead of replacing in place
    #[arg(long)]
    target_dir: Option<PathBuf>,

    /// Confirm each group before executing
    #[arg(short, long)]
    interactive: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Human)]
    format: OutputFormat,

    /// Glob pattern of paths to exclude (repeatable)
    #[arg(long = "exclude", value_name = "GLOB")]
    excludes: Vec<String>,

    /// Minimum file size in bytes to consider
    #[arg(short = 's', long, default_value_t = 1)]
    min_size: u64,

    /// Preview changes without actually modifying files
    #[arg(long)]
    dry_run: bool,

    /// Append one line per executed action to this file
    #[arg(long)]
    audit_log: Option<PathBuf>,

    /// Disable the progress bar
    #[arg(long)]
    no_progress: bool,

    /// Print a status line per processed duplicate
    #[arg(short, long)]
    verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON output for scripting
    Json,
}

fn main() {
    let cli = Cli::parse();
    std::process::exit(run(cli));
}

fn run(cli: Cli) -> i32 {
    // Setup problems are fatal before any indexing starts.
    let excludes = match build_excludes(&cli.excludes) {
        Ok(set) => set,
        Err(msg) => return setup_error(&msg),
    };
    if let Err(msg) = validate(&cli) {
        return setup_error(&msg);
    }

    let human = cli.format == OutputFormat::Human;
    let formatter: Box<dyn Formatter> = match cli.format {
        OutputFormat::Human => Box::new(HumanFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    };
    let progress: Box<dyn ProgressReporter> = if cli.no_progress || !human {
        Box::new(NoProgress)
    } else {
        Box::new(TermProgress::new())
    };
    let mut audit: Box<dyn AuditLogger> = match &cli.audit_log {
        Some(path) => match FileAuditLogger::open(path) {
            Ok(logger) => Box::new(logger),
            Err(e) => return setup_error(&format!("cannot open audit log {}: {}", path.display(), e)),
        },
        None => Box::new(NullAuditLogger),
    };

    let scan_options = ScanOptions {
        min_size: cli.min_size,
        excludes,
    };

    // Stage 1: discover files under each root
    let records_a = scanner::scan_directory(&cli.dir_a, &scan_options);
    let records_b = cli
        .dir_b
        .as_ref()
        .map(|dir| scanner::scan_directory(dir, &scan_options));

    let mut all_records = records_a.clone();
    if let Some(records) = &records_b {
        all_records.extend(records.iter().cloned());
    }

    // Stage 2: eliminate globally unique sizes before any content is read
    let (sizes, stats) = grouping::candidate_sizes(&all_records);

    if human {
        println!(
            "Found {} files ({} candidates by size)",
            format_number(stats.total_files),
            format_number(stats.candidate_files)
        );
    }

    // Stage 3: hash candidates into per-root signature indexes
    let index_a = index::index_directory(
        &cli.dir_a,
        &records_a,
        &sizes,
        cli.algorithm,
        cli.fast,
        cli.fast_threshold,
        progress.as_ref(),
    );
    let index_b = match (&cli.dir_b, &records_b) {
        (Some(dir), Some(records)) => Some(index::index_directory(
            dir,
            records,
            &sizes,
            cli.algorithm,
            cli.fast,
            cli.fast_threshold,
            progress.as_ref(),
        )),
        _ => None,
    };

    // Stage 4: build groups and pick masters
    let (groups, warnings) =
        grouping::find_matching_files(&index_a, index_b.as_ref(), cli.master_dir.as_deref());
    for warning in &warnings {
        eprintln!("{} {}", "warning:".yellow().bold(), warning);
    }

    if cli.action == Action::Compare {
        let report = DuplicateReport::from_groups(&groups, stats.total_files);
        println!("{}", formatter.render_report(&report));
        return 0;
    }

    if groups.is_empty() {
        if human {
            println!("{}", "No duplicates found, nothing to do.".green());
        }
        return 0;
    }

    let exec_options = ExecOptions {
        dry_run: cli.dry_run,
        fallback_symlink: cli.fallback_symlink,
        target_dir: cli.target_dir.clone(),
        fast_mode: cli.fast,
        verbose: cli.verbose,
    };

    if cli.interactive {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let summary = interactive::run_confirmation(
            &groups,
            cli.action,
            &exec_options,
            &mut input,
            formatter.as_ref(),
            audit.as_mut(),
            progress.as_ref(),
        );

        if human {
            println!(
                "Groups confirmed: {}, declined: {}{}",
                format_number(summary.confirmed_groups),
                format_number(summary.skipped_groups),
                if summary.quit_early {
                    format!(
                        ", quit with {} remaining",
                        format_number(summary.remaining_groups)
                    )
                } else {
                    String::new()
                }
            );
        }
        println!("{}", formatter.render_summary(&summary.exec));

        exit_code(
            summary.exec.succeeded,
            summary.exec.failed,
            summary.quit_early && summary.remaining_groups > 0,
        )
    } else {
        let summary = actions::execute_all(
            &groups,
            cli.action,
            &exec_options,
            audit.as_mut(),
            progress.as_ref(),
        );
        println!("{}", formatter.render_summary(&summary));

        if human && !cli.dry_run && summary.bytes_saved > 0 {
            println!("Reclaimed {}", format_bytes(summary.bytes_saved).yellow());
        }

        exit_code(summary.succeeded, summary.failed, false)
    }
}

/// Map a run's aggregate outcome to the process exit code:
/// 0 full success, 1 total failure, 2 partial completion.
fn exit_code(succeeded: usize, failed: usize, quit_with_remaining: bool) -> i32 {
    if failed == 0 && !quit_with_remaining {
        0
    } else if failed > 0 && succeeded == 0 {
        1
    } else {
        2
    }
}

fn setup_error(message: &str) -> i32 {
    eprintln!("{} {}", "error:".red().bold(), message);
    2
}

fn build_excludes(patterns: &[String]) -> Result<Option<GlobSet>, String> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob =
            Glob::new(pattern).map_err(|e| format!("invalid exclude pattern {}: {}", pattern, e))?;
        builder.add(glob);
    }
    let set = builder
        .build()
        .map_err(|e| format!("cannot build exclude set: {}", e))?;
    Ok(Some(set))
}

fn validate(cli: &Cli) -> Result<(), String> {
    if !cli.dir_a.is_dir() {
        return Err(format!("{} is not a directory", cli.dir_a.display()));
    }
    if let Some(dir) = &cli.dir_b {
        if !dir.is_dir() {
            return Err(format!("{} is not a directory", dir.display()));
        }
    }
    if let Some(dir) = &cli.master_dir {
        if !dir.is_dir() {
            return Err(format!(
                "master directory {} is not a directory",
                dir.display()
            ));
        }
    }
    if cli.target_dir.is_some() && !matches!(cli.action, Action::Hardlink | Action::Symlink) {
        return Err("--target-dir requires --action hardlink or symlink".to_string());
    }
    if cli.interactive && cli.action == Action::Compare {
        return Err("--interactive requires an action other than compare".to_string());
    }
    Ok(())
}
