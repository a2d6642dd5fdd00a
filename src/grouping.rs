use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::hasher::ContentSignature;
use crate::index::FileIndex;
use crate::scanner::FileRecord;

/// Statistics from the size pre-elimination stage
#[derive(Debug, Clone)]
pub struct SizeStats {
    /// Total number of files scanned across all roots
    pub total_files: usize,
    /// Files whose size is shared with at least one other file
    pub candidate_files: usize,
}

/// Sizes that occur at least twice across all scanned roots.
///
/// Files with a globally unique size cannot be duplicates, so this is the
/// first elimination stage before any file content is read.
pub fn candidate_sizes(records: &[FileRecord]) -> (HashSet<u64>, SizeStats) {
    let mut counts: HashMap<u64, usize> = HashMap::new();
    for record in records {
        *counts.entry(record.size).or_insert(0) += 1;
    }

    let sizes: HashSet<u64> = counts
        .iter()
        .filter(|&(_, &count)| count >= 2)
        .map(|(&size, _)| size)
        .collect();

    let candidate_files = records.iter().filter(|r| sizes.contains(&r.size)).count();

    let stats = SizeStats {
        total_files: records.len(),
        candidate_files,
    };

    (sizes, stats)
}

/// One set of files sharing a content signature, with the canonical copy
/// singled out.
///
/// The master never appears in `duplicates`, and `duplicates` is sorted by
/// path so output and execution order are reproducible.
#[derive(Debug, Clone)]
pub struct DuplicateGroup {
    pub signature: ContentSignature,
    /// Size of each file in the group
    pub size: u64,
    pub master: FileRecord,
    pub duplicates: Vec<FileRecord>,
}

/// Build duplicate groups from one or two signature indexes.
///
/// In two-directory mode a group exists for every signature present in both
/// indexes; in single-directory mode for every signature with two or more
/// entries. Returned groups are sorted by master path. Warnings (for
/// ambiguous master selection) are returned for the caller to surface.
pub fn find_matching_files(
    index_a: &FileIndex,
    index_b: Option<&FileIndex>,
    master_dir: Option<&Path>,
) -> (Vec<DuplicateGroup>, Vec<String>) {
    let mut groups = Vec::new();
    let mut warnings = Vec::new();

    for (signature, records_a) in index_a {
        let mut members: Vec<FileRecord> = match index_b {
            Some(other) => {
                let Some(records_b) = other.get(signature) else {
                    continue;
                };
                records_a.iter().chain(records_b.iter()).cloned().collect()
            }
            None => {
                if records_a.len() < 2 {
                    continue;
                }
                records_a.clone()
            }
        };
        members.sort_by(|a, b| a.path.cmp(&b.path));

        let (master, duplicates, warning) = select_master(members, master_dir);
        if let Some(text) = warning {
            warnings.push(format!("{} ({})", text, signature));
        }

        groups.push(DuplicateGroup {
            signature: signature.clone(),
            size: master.size,
            master,
            duplicates,
        });
    }

    groups.sort_by(|a, b| a.master.path.cmp(&b.master.path));
    (groups, warnings)
}

/// Pick the canonical file for one group.
///
/// With a master directory holding two or more group members, the oldest of
/// those wins and an ambiguity warning is raised when several tie for
/// oldest. With exactly one member inside, that member wins. Otherwise the
/// oldest file overall wins.
fn select_master(
    members: Vec<FileRecord>,
    master_dir: Option<&Path>,
) -> (FileRecord, Vec<FileRecord>, Option<String>) {
    if let Some(dir) = master_dir {
        let inside_count = members.iter().filter(|m| m.path.starts_with(dir)).count();
        if inside_count >= 1 {
            let oldest = members
                .iter()
                .filter(|m| m.path.starts_with(dir))
                .min_by(|a, b| a.modified.cmp(&b.modified).then(a.path.cmp(&b.path)))
                .cloned();
            // inside_count >= 1 guarantees a minimum exists
            let Some(oldest) = oldest else {
                let (master, rest) = select_oldest(members);
                return (master, rest, None);
            };

            let ties = members
                .iter()
                .filter(|m| m.path.starts_with(dir) && m.modified == oldest.modified)
                .count();
            let warning = (inside_count >= 2 && ties > 1).then(|| {
                format!(
                    "multiple files in the master directory tie for oldest; keeping {}",
                    oldest.path.display()
                )
            });

            let oldest_path = oldest.path.clone();
            let (master, rest) = split_off(members, &oldest_path);
            return (master, rest, warning);
        }
    }

    let (oldest, rest) = select_oldest(members);
    (oldest, rest, None)
}

/// Split the oldest file (by modification time, ties broken by path order)
/// from the rest of the group.
pub fn select_oldest(members: Vec<FileRecord>) -> (FileRecord, Vec<FileRecord>) {
    debug_assert!(!members.is_empty());
    let oldest_path = members
        .iter()
        .min_by(|a, b| a.modified.cmp(&b.modified).then(a.path.cmp(&b.path)))
        .map(|r| r.path.clone())
        .unwrap_or_default();
    split_off(members, &oldest_path)
}

fn split_off(members: Vec<FileRecord>, master_path: &Path) -> (FileRecord, Vec<FileRecord>) {
    let mut master = None;
    let mut rest = Vec::with_capacity(members.len().saturating_sub(1));
    for member in members {
        if master.is_none() && member.path == master_path {
            master = Some(member);
        } else {
            rest.push(member);
        }
    }
    // members always contains master_path
    let master = master.unwrap_or_else(|| rest.remove(0));
    (master, rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hasher::HashAlgorithm;
    use std::path::PathBuf;
    use std::time::{Duration, SystemTime};

    fn record(path: &str, mtime_secs: u64) -> FileRecord {
        FileRecord {
            path: PathBuf::from(path),
            root: PathBuf::from("/"),
            size: 100,
            modified: SystemTime::UNIX_EPOCH + Duration::from_secs(mtime_secs),
        }
    }

    fn signature(tag: &str) -> ContentSignature {
        ContentSignature {
            algorithm: HashAlgorithm::Blake3,
            digest: tag.to_string(),
        }
    }

    fn index_of(entries: Vec<(&str, Vec<FileRecord>)>) -> FileIndex {
        entries
            .into_iter()
            .map(|(tag, records)| (signature(tag), records))
            .collect()
    }

    #[test]
    fn test_candidate_sizes_requires_two_occurrences() {
        let mut a = record("/a", 1);
        a.size = 10;
        let mut b = record("/b", 1);
        b.size = 10;
        let mut c = record("/c", 1);
        c.size = 99;

        let (sizes, stats) = candidate_sizes(&[a, b, c]);

        assert!(sizes.contains(&10));
        assert!(!sizes.contains(&99));
        assert_eq!(stats.total_files, 3);
        assert_eq!(stats.candidate_files, 2);
    }

    #[test]
    fn test_select_oldest_by_mtime() {
        let members = vec![record("/z", 50), record("/a", 200)];
        let (oldest, rest) = select_oldest(members);

        assert_eq!(oldest.path, PathBuf::from("/z"));
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].path, PathBuf::from("/a"));
    }

    #[test]
    fn test_select_oldest_tie_breaks_by_path_order() {
        let members = vec![record("/b", 100), record("/a", 100), record("/c", 100)];
        let (oldest, rest) = select_oldest(members);

        assert_eq!(oldest.path, PathBuf::from("/a"));
        assert_eq!(rest.len(), 2);
    }

    #[test]
    fn test_single_directory_mode_groups_multi_entries() {
        let index = index_of(vec![
            ("dup", vec![record("/dir/a", 10), record("/dir/b", 20)]),
            ("unique", vec![record("/dir/c", 30)]),
        ]);

        let (groups, warnings) = find_matching_files(&index, None, None);

        assert_eq!(groups.len(), 1);
        assert!(warnings.is_empty());
        assert_eq!(groups[0].master.path, PathBuf::from("/dir/a"));
        assert_eq!(groups[0].duplicates.len(), 1);
    }

    #[test]
    fn test_two_directory_mode_intersects_signatures() {
        let index_a = index_of(vec![
            ("shared", vec![record("/a/x", 10)]),
            ("only-a", vec![record("/a/y", 10)]),
        ]);
        let index_b = index_of(vec![
            ("shared", vec![record("/b/x", 20)]),
            ("only-b", vec![record("/b/y", 20)]),
        ]);

        let (groups, _) = find_matching_files(&index_a, Some(&index_b), None);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].master.path, PathBuf::from("/a/x"));
        assert_eq!(groups[0].duplicates[0].path, PathBuf::from("/b/x"));
    }

    #[test]
    fn test_master_never_in_its_own_duplicates() {
        let index = index_of(vec![(
            "dup",
            vec![record("/d/a", 5), record("/d/b", 5), record("/d/c", 1)],
        )]);

        let (groups, _) = find_matching_files(&index, None, None);

        for group in &groups {
            assert!(
                !group.duplicates.iter().any(|d| d.path == group.master.path),
                "master leaked into duplicates"
            );
        }
    }

    #[test]
    fn test_duplicates_are_path_sorted() {
        let index = index_of(vec![(
            "dup",
            vec![record("/d/c", 10), record("/d/a", 1), record("/d/b", 10)],
        )]);

        let (groups, _) = find_matching_files(&index, None, None);

        let paths: Vec<&Path> = groups[0].duplicates.iter().map(|d| d.path.as_path()).collect();
        let mut sorted = paths.clone();
        sorted.sort();
        assert_eq!(paths, sorted);
    }

    #[test]
    fn test_master_dir_single_member_wins_even_if_newer() {
        let index_a = index_of(vec![("dup", vec![record("/keep/new", 900)])]);
        let index_b = index_of(vec![("dup", vec![record("/other/old", 10)])]);

        let (groups, warnings) =
            find_matching_files(&index_a, Some(&index_b), Some(Path::new("/keep")));

        assert!(warnings.is_empty());
        assert_eq!(groups[0].master.path, PathBuf::from("/keep/new"));
        assert_eq!(groups[0].duplicates[0].path, PathBuf::from("/other/old"));
    }

    #[test]
    fn test_master_dir_multiple_members_oldest_wins() {
        let index = index_of(vec![(
            "dup",
            vec![
                record("/keep/newer", 500),
                record("/keep/older", 100),
                record("/other/oldest", 1),
            ],
        )]);

        let (groups, warnings) = find_matching_files(&index, None, Some(Path::new("/keep")));

        assert!(warnings.is_empty());
        assert_eq!(groups[0].master.path, PathBuf::from("/keep/older"));
        assert_eq!(groups[0].duplicates.len(), 2);
    }

    #[test]
    fn test_master_dir_tie_raises_warning_but_proceeds() {
        let index = index_of(vec![(
            "dup",
            vec![record("/keep/b", 100), record("/keep/a", 100)],
        )]);

        let (groups, warnings) = find_matching_files(&index, None, Some(Path::new("/keep")));

        assert_eq!(groups.len(), 1);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("tie for oldest"));
        // Path order breaks the tie
        assert_eq!(groups[0].master.path, PathBuf::from("/keep/a"));
    }

    #[test]
    fn test_master_dir_without_members_falls_back_to_oldest() {
        let index = index_of(vec![(
            "dup",
            vec![record("/x/new", 300), record("/y/old", 10)],
        )]);

        let (groups, _) = find_matching_files(&index, None, Some(Path::new("/keep")));

        assert_eq!(groups[0].master.path, PathBuf::from("/y/old"));
    }

    #[test]
    fn test_groups_sorted_by_master_path() {
        let index = index_of(vec![
            ("zz", vec![record("/d/z1", 1), record("/d/z2", 2)]),
            ("aa", vec![record("/d/a1", 1), record("/d/a2", 2)]),
        ]);

        let (groups, _) = find_matching_files(&index, None, None);

        assert_eq!(groups.len(), 2);
        assert!(groups[0].master.path < groups[1].master.path);
    }
}
