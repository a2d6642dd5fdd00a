use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

/// Whether a duplicate already shares storage with its group's master
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    None,
    HardlinkToMaster,
    SymlinkToMaster,
}

/// True when `a` and `b` are hard links to the same inode.
///
/// Uses symlink_metadata so a symbolic link is judged by its own inode and
/// never mistaken for a hard link to its target.
pub fn is_hardlink_to(a: &Path, b: &Path) -> bool {
    let (Ok(ma), Ok(mb)) = (fs::symlink_metadata(a), fs::symlink_metadata(b)) else {
        return false;
    };
    ma.ino() == mb.ino() && ma.dev() == mb.dev()
}

/// True when `a` is a symbolic link whose resolved target is `b`.
pub fn is_symlink_to(a: &Path, b: &Path) -> bool {
    let Ok(meta) = fs::symlink_metadata(a) else {
        return false;
    };
    if !meta.file_type().is_symlink() {
        return false;
    }
    let (Ok(resolved_a), Ok(resolved_b)) = (fs::canonicalize(a), fs::canonicalize(b)) else {
        return false;
    };
    resolved_a == resolved_b
}

/// Classify a duplicate's relationship to its master.
pub fn link_state(duplicate: &Path, master: &Path) -> LinkState {
    if is_symlink_to(duplicate, master) {
        LinkState::SymlinkToMaster
    } else if is_hardlink_to(duplicate, master) {
        LinkState::HardlinkToMaster
    } else {
        LinkState::None
    }
}

/// True when both paths live on the same filesystem, which hard linking
/// requires.
pub fn same_device(a: &Path, b: &Path) -> bool {
    let (Ok(ma), Ok(mb)) = (fs::symlink_metadata(a), fs::symlink_metadata(b)) else {
        return false;
    };
    ma.dev() == mb.dev()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn create_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(content).unwrap();
        path
    }

    #[test]
    fn test_hardlink_detected() {
        let temp = TempDir::new().unwrap();
        let master = create_file(temp.path(), "master.txt", b"content");
        let dup = temp.path().join("dup.txt");
        fs::hard_link(&master, &dup).unwrap();

        assert!(is_hardlink_to(&dup, &master));
        assert_eq!(link_state(&dup, &master), LinkState::HardlinkToMaster);
    }

    #[test]
    fn test_separate_files_not_linked() {
        let temp = TempDir::new().unwrap();
        let master = create_file(temp.path(), "master.txt", b"content");
        let dup = create_file(temp.path(), "dup.txt", b"content");

        assert!(!is_hardlink_to(&dup, &master));
        assert!(!is_symlink_to(&dup, &master));
        assert_eq!(link_state(&dup, &master), LinkState::None);
    }

    #[test]
    fn test_symlink_detected() {
        let temp = TempDir::new().unwrap();
        let master = create_file(temp.path(), "master.txt", b"content");
        let dup = temp.path().join("dup.txt");
        std::os::unix::fs::symlink(&master, &dup).unwrap();

        assert!(is_symlink_to(&dup, &master));
        assert_eq!(link_state(&dup, &master), LinkState::SymlinkToMaster);
    }

    #[test]
    fn test_symlink_never_classified_as_hardlink() {
        let temp = TempDir::new().unwrap();
        let master = create_file(temp.path(), "master.txt", b"content");
        let dup = temp.path().join("dup.txt");
        std::os::unix::fs::symlink(&master, &dup).unwrap();

        assert!(!is_hardlink_to(&dup, &master));
    }

    #[test]
    fn test_symlink_to_other_target_is_not_symlink_to_master() {
        let temp = TempDir::new().unwrap();
        let master = create_file(temp.path(), "master.txt", b"content");
        let other = create_file(temp.path(), "other.txt", b"content");
        let dup = temp.path().join("dup.txt");
        std::os::unix::fs::symlink(&other, &dup).unwrap();

        assert!(!is_symlink_to(&dup, &master));
    }

    #[test]
    fn test_missing_paths_are_not_linked() {
        let temp = TempDir::new().unwrap();
        let master = create_file(temp.path(), "master.txt", b"content");

        assert!(!is_hardlink_to(&temp.path().join("gone"), &master));
        assert!(!is_symlink_to(&temp.path().join("gone"), &master));
    }

    #[test]
    fn test_dangling_symlink_is_not_symlink_to_master() {
        let temp = TempDir::new().unwrap();
        let master = create_file(temp.path(), "master.txt", b"content");
        let dup = temp.path().join("dup.txt");
        std::os::unix::fs::symlink(temp.path().join("gone.txt"), &dup).unwrap();

        assert!(!is_symlink_to(&dup, &master));
    }

    #[test]
    fn test_same_device_for_siblings() {
        let temp = TempDir::new().unwrap();
        let a = create_file(temp.path(), "a.txt", b"a");
        let b = create_file(temp.path(), "b.txt", b"b");

        assert!(same_device(&a, &b));
    }
}
