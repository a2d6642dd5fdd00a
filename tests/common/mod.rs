#![allow(dead_code)]

use assert_cmd::cargo;
use filetime::FileTime;
use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

pub fn dupelink() -> assert_cmd::Command {
    assert_cmd::Command::new(cargo::cargo_bin!("dupelink"))
}

pub fn create_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

pub fn file_inode(path: &Path) -> u64 {
    fs::metadata(path).unwrap().ino()
}

/// Pin a file's modification time so master selection is deterministic.
pub fn set_mtime(path: &Path, unix_secs: i64) {
    filetime::set_file_mtime(path, FileTime::from_unix_time(unix_secs, 0)).unwrap();
}
