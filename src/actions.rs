use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use colored::Colorize;

use crate::audit::{AuditLogger, AuditRecord};
use crate::grouping::DuplicateGroup;
use crate::hasher::{self, HashAlgorithm};
use crate::linkstate;
use crate::progress::ProgressReporter;
use crate::scanner::FileRecord;

/// What to do with each duplicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Action {
    /// List duplicates without touching the filesystem (default)
    Compare,
    /// Replace duplicates with hard links to the master
    Hardlink,
    /// Replace duplicates with symbolic links to the master
    Symlink,
    /// Remove duplicates, keeping only the master
    Delete,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Compare => "compare",
            Action::Hardlink => "hardlink",
            Action::Symlink => "symlink",
            Action::Delete => "delete",
        }
    }
}

/// Executor behavior knobs, fixed once per run
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    /// Report what would happen without modifying files
    pub dry_run: bool,
    /// Fall back to a symlink when a hardlink would cross filesystems
    pub fallback_symlink: bool,
    /// Relocation mode: create links under this root instead of in place
    pub target_dir: Option<PathBuf>,
    /// Signatures may come from sparse hashing; deletes re-verify content
    pub fast_mode: bool,
    /// Print a status line per processed duplicate
    pub verbose: bool,
}

/// What actually happened to one duplicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionTaken {
    Compared,
    Hardlinked,
    Symlinked,
    Deleted,
    SkippedSymlinkToMaster,
    SkippedHardlinkToMaster,
    WouldHardlink,
    WouldSymlink,
    WouldDelete,
    Failed,
}

impl ActionTaken {
    fn is_skip(&self) -> bool {
        matches!(
            self,
            ActionTaken::SkippedSymlinkToMaster | ActionTaken::SkippedHardlinkToMaster
        )
    }

    fn saves_space(&self) -> bool {
        matches!(
            self,
            ActionTaken::Hardlinked
                | ActionTaken::Symlinked
                | ActionTaken::Deleted
                | ActionTaken::WouldHardlink
                | ActionTaken::WouldSymlink
                | ActionTaken::WouldDelete
        )
    }
}

impl fmt::Display for ActionTaken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ActionTaken::Compared => "compared",
            ActionTaken::Hardlinked => "hardlinked",
            ActionTaken::Symlinked => "symlinked",
            ActionTaken::Deleted => "deleted",
            ActionTaken::SkippedSymlinkToMaster => "skipped: symlink to master",
            ActionTaken::SkippedHardlinkToMaster => "skipped: hardlink to master",
            ActionTaken::WouldHardlink => "dry-run: would hardlink",
            ActionTaken::WouldSymlink => "dry-run: would symlink",
            ActionTaken::WouldDelete => "dry-run: would delete",
            ActionTaken::Failed => "failed",
        };
        f.write_str(text)
    }
}

/// Result of processing one duplicate
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub success: bool,
    /// Empty on success
    pub error: String,
    pub taken: ActionTaken,
}

impl ExecutionOutcome {
    fn ok(taken: ActionTaken) -> Self {
        Self {
            success: true,
            error: String::new(),
            taken,
        }
    }

    fn fail(error: String) -> Self {
        Self {
            success: false,
            error,
            taken: ActionTaken::Failed,
        }
    }
}

/// One failed per-file operation, kept for the final report
#[derive(Debug, Clone)]
pub struct FailedOperation {
    pub path: PathBuf,
    pub reason: String,
}

/// Aggregate outcome of a batch or interactive run
#[derive(Debug, Default)]
pub struct ExecSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub bytes_saved: u64,
    pub failures: Vec<FailedOperation>,
}

impl ExecSummary {
    pub fn absorb(&mut self, path: &Path, size: u64, outcome: &ExecutionOutcome) {
        if !outcome.success {
            self.failed += 1;
            self.failures.push(FailedOperation {
                path: path.to_path_buf(),
                reason: outcome.error.clone(),
            });
        } else if outcome.taken.is_skip() {
            self.skipped += 1;
        } else {
            self.succeeded += 1;
            if outcome.taken.saves_space() {
                self.bytes_saved += size;
            }
        }
    }

    pub fn merge(&mut self, other: ExecSummary) {
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.bytes_saved += other.bytes_saved;
        self.failures.extend(other.failures);
    }
}

/// Apply one action to one duplicate.
///
/// The skip policy runs first for every action: a duplicate already linked to
/// its master is reported as a successful skip and the filesystem is left
/// untouched. Per-file failures are returned as data, never raised.
pub fn execute_action(
    duplicate: &FileRecord,
    master: &Path,
    action: Action,
    opts: &ExecOptions,
) -> ExecutionOutcome {
    match linkstate::link_state(&duplicate.path, master) {
        linkstate::LinkState::SymlinkToMaster => {
            return ExecutionOutcome::ok(ActionTaken::SkippedSymlinkToMaster);
        }
        linkstate::LinkState::HardlinkToMaster => {
            return ExecutionOutcome::ok(ActionTaken::SkippedHardlinkToMaster);
        }
        linkstate::LinkState::None => {}
    }

    if action == Action::Compare {
        return ExecutionOutcome::ok(ActionTaken::Compared);
    }

    if let Err(e) = fs::symlink_metadata(&duplicate.path) {
        return ExecutionOutcome::fail(format!(
            "cannot access {}: {}",
            duplicate.path.display(),
            e
        ));
    }

    let same_device = linkstate::same_device(&duplicate.path, master);
    execute_on_device(duplicate, master, action, opts, same_device)
}

/// Hard links cannot cross filesystems: resolve the requested action to the
/// one actually performed, or `None` when hardlinking is impossible and no
/// fallback is enabled.
fn resolve_cross_device(action: Action, same_device: bool, fallback_symlink: bool) -> Option<Action> {
    if action == Action::Hardlink && !same_device {
        return fallback_symlink.then_some(Action::Symlink);
    }
    Some(action)
}

/// The executor body past the skip and access checks, with device equality
/// passed in so the cross-filesystem branches are testable on one filesystem.
fn execute_on_device(
    duplicate: &FileRecord,
    master: &Path,
    action: Action,
    opts: &ExecOptions,
    same_device: bool,
) -> ExecutionOutcome {
    let Some(effective) = resolve_cross_device(action, same_device, opts.fallback_symlink) else {
        return ExecutionOutcome::fail(format!(
            "cross-filesystem: cannot hardlink {} to {} (different devices, no symlink fallback enabled)",
            duplicate.path.display(),
            master.display()
        ));
    };

    if opts.dry_run {
        let taken = match effective {
            Action::Hardlink => ActionTaken::WouldHardlink,
            Action::Symlink => ActionTaken::WouldSymlink,
            Action::Delete => ActionTaken::WouldDelete,
            Action::Compare => ActionTaken::Compared,
        };
        return ExecutionOutcome::ok(taken);
    }

    match effective {
        Action::Delete => {
            if opts.fast_mode {
                if let Err(reason) = verify_same_content(&duplicate.path, master) {
                    return ExecutionOutcome::fail(reason);
                }
            }
            match fs::remove_file(&duplicate.path) {
                Ok(()) => ExecutionOutcome::ok(ActionTaken::Deleted),
                Err(e) => ExecutionOutcome::fail(format!(
                    "cannot delete {}: {}",
                    duplicate.path.display(),
                    e
                )),
            }
        }
        Action::Hardlink | Action::Symlink => {
            if let Some(target_root) = &opts.target_dir {
                relocate_duplicate(duplicate, master, effective, target_root)
            } else {
                replace_with_link(&duplicate.path, master, effective)
            }
        }
        Action::Compare => ExecutionOutcome::ok(ActionTaken::Compared),
    }
}

/// Sparse signatures carry a false-positive risk, so a delete under fast mode
/// only proceeds after a full-content re-hash of both files agrees.
fn verify_same_content(duplicate: &Path, master: &Path) -> Result<(), String> {
    let dup_sig = hasher::hash_file(duplicate, HashAlgorithm::Blake3)
        .map_err(|e| format!("cannot verify {}: {}", duplicate.display(), e))?;
    let master_sig = hasher::hash_file(master, HashAlgorithm::Blake3)
        .map_err(|e| format!("cannot verify {}: {}", master.display(), e))?;
    if dup_sig != master_sig {
        return Err(format!(
            "content verification failed: {} does not match {} on a full read, refusing to delete",
            duplicate.display(),
            master.display()
        ));
    }
    Ok(())
}

/// Atomically replace `path` with a link to `master`.
///
/// The link is created under a temporary name next to `path` and renamed over
/// it, so an interrupted run leaves either the original file or the finished
/// link. A failed rename triggers removal of the temporary link; if that
/// removal also fails, the orphaned path is named in the error.
fn replace_with_link(path: &Path, master: &Path, link: Action) -> ExecutionOutcome {
    let temp_path = temp_link_path(path);

    // A leftover temp link from an interrupted run would block creation.
    match fs::remove_file(&temp_path) {
        Ok(()) => (),
        Err(e) if e.kind() == io::ErrorKind::NotFound => (),
        Err(e) => {
            return ExecutionOutcome::fail(format!(
                "cannot clear stale temporary {}: {}",
                temp_path.display(),
                e
            ));
        }
    }

    if let Err(e) = create_link(master, &temp_path, link) {
        return ExecutionOutcome::fail(format!(
            "cannot create link {}: {}",
            temp_path.display(),
            e
        ));
    }

    if let Err(e) = fs::rename(&temp_path, path) {
        return match fs::remove_file(&temp_path) {
            Ok(()) => ExecutionOutcome::fail(format!(
                "cannot replace {}: {}",
                path.display(),
                e
            )),
            Err(rollback_err) => {
                eprintln!(
                    "{} rollback failed, temporary file left behind at {}",
                    "error:".red().bold(),
                    temp_path.display()
                );
                ExecutionOutcome::fail(format!(
                    "cannot replace {}: {}; rollback also failed ({}), orphaned temporary file at {}",
                    path.display(),
                    e,
                    rollback_err,
                    temp_path.display()
                ))
            }
        };
    }

    match link {
        Action::Hardlink => ExecutionOutcome::ok(ActionTaken::Hardlinked),
        _ => ExecutionOutcome::ok(ActionTaken::Symlinked),
    }
}

/// Relocation mode: recreate the duplicate's root-relative path under the
/// target directory, link it to the master there, then remove the original.
fn relocate_duplicate(
    duplicate: &FileRecord,
    master: &Path,
    link: Action,
    target_root: &Path,
) -> ExecutionOutcome {
    let relative = match duplicate.path.strip_prefix(&duplicate.root) {
        Ok(rel) => rel,
        Err(_) => {
            return ExecutionOutcome::fail(format!(
                "{} is not under its source root {}",
                duplicate.path.display(),
                duplicate.root.display()
            ));
        }
    };
    let dest = target_root.join(relative);

    if dest.exists() || fs::symlink_metadata(&dest).is_ok() {
        return ExecutionOutcome::fail(format!(
            "relocation target {} already exists",
            dest.display()
        ));
    }

    if let Some(parent) = dest.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            return ExecutionOutcome::fail(format!(
                "cannot create {}: {}",
                parent.display(),
                e
            ));
        }
    }

    if let Err(e) = create_link(master, &dest, link) {
        return ExecutionOutcome::fail(format!("cannot create link {}: {}", dest.display(), e));
    }

    if let Err(e) = fs::remove_file(&duplicate.path) {
        // Undo the freshly created link so the run stays re-runnable
        let _ = fs::remove_file(&dest);
        return ExecutionOutcome::fail(format!(
            "cannot remove original {}: {}",
            duplicate.path.display(),
            e
        ));
    }

    match link {
        Action::Hardlink => ExecutionOutcome::ok(ActionTaken::Hardlinked),
        _ => ExecutionOutcome::ok(ActionTaken::Symlinked),
    }
}

fn create_link(master: &Path, at: &Path, link: Action) -> io::Result<()> {
    match link {
        Action::Hardlink => fs::hard_link(master, at),
        _ => {
            // An absolute target keeps the symlink valid from any directory
            let target = fs::canonicalize(master)?;
            std::os::unix::fs::symlink(target, at)
        }
    }
}

fn temp_link_path(path: &Path) -> PathBuf {
    path.with_extension(format!(
        "{}.dupelink_tmp",
        path.extension().unwrap_or_default().to_string_lossy()
    ))
}

/// Apply one action to every duplicate in every group, in sorted order.
///
/// A single file's failure is recorded and processing continues; the
/// aggregate summary is the only surfaced result.
pub fn execute_all(
    groups: &[DuplicateGroup],
    action: Action,
    opts: &ExecOptions,
    audit: &mut dyn AuditLogger,
    progress: &dyn ProgressReporter,
) -> ExecSummary {
    let total: usize = groups.iter().map(|g| g.duplicates.len()).sum();
    progress.begin(total as u64, "applying");

    let mut summary = ExecSummary::default();
    let mut current = 0u64;

    for group in groups {
        for duplicate in &group.duplicates {
            current += 1;
            progress.update(current, &duplicate.path.display().to_string());

            let outcome = execute_action(duplicate, &group.master.path, action, opts);

            if action != Action::Compare {
                audit.record(&AuditRecord {
                    action,
                    duplicate: &duplicate.path,
                    master: &group.master.path,
                    size: group.size,
                    signature: &group.signature,
                    success: outcome.success,
                    error: &outcome.error,
                });
            }

            if opts.verbose {
                print_outcome(duplicate, &group.master.path, &outcome);
            }

            summary.absorb(&duplicate.path, group.size, &outcome);
        }
    }

    progress.finish();
    summary
}

fn print_outcome(duplicate: &FileRecord, master: &Path, outcome: &ExecutionOutcome) {
    if outcome.success {
        let tag = format!("[{}]", outcome.taken);
        let tag = if outcome.taken.is_skip() {
            tag.blue()
        } else {
            tag.green()
        };
        println!(
            "{} {} -> {}",
            tag,
            duplicate.path.display(),
            master.display()
        );
    } else {
        println!(
            "{} {}: {}",
            "[failed]".red(),
            duplicate.path.display(),
            outcome.error
        );
    }
}
