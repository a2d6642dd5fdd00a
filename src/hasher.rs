use std::fmt;
use std::fs::File;
use std::hash::Hasher as _;
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use clap::ValueEnum;
use twox_hash::Xxh3Hash128;
use twox_hash::xxh3::HasherExt;

/// Default size at or above which fast mode samples instead of fully reading.
pub const FAST_MODE_THRESHOLD: u64 = 100 * 1024 * 1024;

/// Size of each sampled window in sparse hashing (1 MiB).
pub const SAMPLE_WINDOW: u64 = 1024 * 1024;

/// Read buffer size for full-content hashing (64 KiB)
const READ_CHUNK: usize = 64 * 1024;

/// Digest algorithm used to build content signatures
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
pub enum HashAlgorithm {
    /// 128-bit xxh3: very fast, fine for read-only comparison
    Xxh3,
    /// 256-bit BLAKE3: cryptographic, preferred before destructive actions
    Blake3,
}

impl HashAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::Xxh3 => "xxh3",
            HashAlgorithm::Blake3 => "blake3",
        }
    }
}

/// A content digest tagged with the algorithm that produced it.
///
/// Two files with equal signatures are identical when the signature came from
/// a full read, and probably identical when it came from a sparse read.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentSignature {
    pub algorithm: HashAlgorithm,
    pub digest: String,
}

impl fmt::Display for ContentSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm.name(), self.digest)
    }
}

/// Streaming digest state, one variant per supported algorithm
enum DigestState {
    Blake3(Box<blake3::Hasher>),
    Xxh3(Xxh3Hash128),
}

impl DigestState {
    fn new(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Blake3 => DigestState::Blake3(Box::new(blake3::Hasher::new())),
            HashAlgorithm::Xxh3 => DigestState::Xxh3(Xxh3Hash128::default()),
        }
    }

    fn update(&mut self, buf: &[u8]) {
        match self {
            DigestState::Blake3(h) => {
                h.update(buf);
            }
            DigestState::Xxh3(h) => h.write(buf),
        }
    }

    fn finalize(self, algorithm: HashAlgorithm) -> ContentSignature {
        let digest = match self {
            DigestState::Blake3(h) => h.finalize().to_hex().to_string(),
            DigestState::Xxh3(h) => format!("{:032x}", h.finish_ext()),
        };
        ContentSignature { algorithm, digest }
    }
}

/// Compute the signature of a file's entire contents.
pub fn hash_file(path: &Path, algorithm: HashAlgorithm) -> io::Result<ContentSignature> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut buffer = vec![0u8; READ_CHUNK];
    let mut state = DigestState::new(algorithm);

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        state.update(&buffer[..bytes_read]);
    }

    Ok(state.finalize(algorithm))
}

/// Compute a signature from sampled windows of a large file.
///
/// Reads one window at the start, at 25%, 50% and 75% of the byte length, and
/// one ending at the last byte, then hashes the concatenation. Files smaller
/// than three windows degrade to a full read so the samples cannot overlap
/// into a degenerate signature.
pub fn sparse_hash_file(
    path: &Path,
    size: u64,
    algorithm: HashAlgorithm,
) -> io::Result<ContentSignature> {
    if size < 3 * SAMPLE_WINDOW {
        return hash_file(path, algorithm);
    }

    let offsets = [0, size / 4, size / 2, (size / 4) * 3, size - SAMPLE_WINDOW];

    let mut file = File::open(path)?;
    let mut buffer = vec![0u8; SAMPLE_WINDOW as usize];
    let mut state = DigestState::new(algorithm);

    for offset in offsets {
        file.seek(SeekFrom::Start(offset))?;
        let n = read_window(&mut file, &mut buffer)?;
        state.update(&buffer[..n]);
    }

    Ok(state.finalize(algorithm))
}

/// Pick sparse or full hashing based on fast mode and the size threshold.
pub fn signature_for(
    path: &Path,
    size: u64,
    algorithm: HashAlgorithm,
    fast_mode: bool,
    fast_threshold: u64,
) -> io::Result<ContentSignature> {
    if fast_mode && size >= fast_threshold {
        sparse_hash_file(path, size, algorithm)
    } else {
        hash_file(path, algorithm)
    }
}

/// Fill `buffer` from the file, stopping early only at EOF.
fn read_window(file: &mut File, buffer: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        let n = file.read(&mut buffer[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}
