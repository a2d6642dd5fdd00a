use std::path::{Path, PathBuf};
use std::time::SystemTime;

use colored::Colorize;
use globset::GlobSet;
use jwalk::{Parallelism, WalkDir};

/// A file discovered during scanning, before it is hashed into an index
#[derive(Debug, Clone)]
pub struct FileRecord {
    pub path: PathBuf,
    /// Root directory the file was discovered under
    pub root: PathBuf,
    pub size: u64,
    pub modified: SystemTime,
}

/// Filters applied while walking a tree
#[derive(Debug, Default)]
pub struct ScanOptions {
    /// Files smaller than this are ignored
    pub min_size: u64,
    /// Paths matching any of these globs are ignored
    pub excludes: Option<GlobSet>,
}

/// Walk a directory tree and return all matching regular files, sorted by path.
///
/// The walk is serial and never follows symlinks. Entries that cannot be read
/// produce a warning on stderr and are skipped; the walk itself continues.
pub fn scan_directory(root: &Path, options: &ScanOptions) -> Vec<FileRecord> {
    let mut records: Vec<FileRecord> = WalkDir::new(root)
        .skip_hidden(false)
        .follow_links(false)
        .parallelism(Parallelism::Serial)
        .sort(true)
        .into_iter()
        .filter_map(|entry| {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    eprintln!("{} unreadable entry under {}: {}", "warning:".yellow().bold(), root.display(), e);
                    return None;
                }
            };
            if !entry.file_type().is_file() {
                return None;
            }

            let path = entry.path();
            if let Some(globs) = &options.excludes {
                if globs.is_match(&path) {
                    return None;
                }
            }

            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    eprintln!("{} cannot stat {}: {}", "warning:".yellow().bold(), path.display(), e);
                    return None;
                }
            };

            let size = metadata.len();
            if size < options.min_size {
                return None;
            }

            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);

            Some(FileRecord {
                path,
                root: root.to_path_buf(),
                size,
                modified,
            })
        })
        .collect();

    records.sort_by(|a, b| a.path.cmp(&b.path));
    records
}
