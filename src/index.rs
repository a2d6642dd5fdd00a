use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use colored::Colorize;

use crate::hasher::{self, ContentSignature, HashAlgorithm};
use crate::progress::ProgressReporter;
use crate::scanner::FileRecord;

/// Files grouped by content signature, with path-sorted entries per signature
pub type FileIndex = BTreeMap<ContentSignature, Vec<FileRecord>>;

/// Hash the candidate files discovered under one root into a signature index.
///
/// Only files whose size appears in `candidate_sizes` are hashed; a file with
/// a globally unique size cannot have a duplicate anywhere. Per-file read
/// errors produce a warning and the file is dropped from the index; the rest
/// of the indexing pass continues.
pub fn index_directory(
    root: &Path,
    records: &[FileRecord],
    candidate_sizes: &HashSet<u64>,
    algorithm: HashAlgorithm,
    fast_mode: bool,
    fast_threshold: u64,
    progress: &dyn ProgressReporter,
) -> FileIndex {
    let candidates: Vec<&FileRecord> = records
        .iter()
        .filter(|r| candidate_sizes.contains(&r.size))
        .collect();

    let label = format!("hashing {}", root.display());
    progress.begin(candidates.len() as u64, &label);

    let mut index = FileIndex::new();
    for (i, record) in candidates.iter().enumerate() {
        progress.update((i + 1) as u64, &record.path.display().to_string());

        let signature = match hasher::signature_for(
            &record.path,
            record.size,
            algorithm,
            fast_mode,
            fast_threshold,
        ) {
            Ok(sig) => sig,
            Err(e) => {
                eprintln!(
                    "{} cannot hash {}: {}",
                    "warning:".yellow().bold(),
                    record.path.display(),
                    e
                );
                continue;
            }
        };

        index.entry(signature).or_default().push((*record).clone());
    }

    progress.finish();
    index
}
