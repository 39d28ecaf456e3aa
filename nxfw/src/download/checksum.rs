//! SHA-256 helpers for downloaded blobs.
//!
//! Content ids and their hashes come out of the manifest as lower-case hex;
//! the comparison here ignores case so hashes from other tools also match.

use std::fs::File;
use std::io;
use std::path::Path;

use sha2::{Digest, Sha256};

use super::error::FetchError;

/// Lower-case hex SHA-256 of a file's contents.
pub fn calculate_file_checksum(path: &Path) -> Result<String, FetchError> {
    let read_failed = |source| FetchError::ReadFailed {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).map_err(read_failed)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(read_failed)?;

    Ok(hex::encode(hasher.finalize()))
}

/// Fail with [`FetchError::ChecksumMismatch`] unless `path` hashes to
/// `expected`.
pub fn verify_checksum(path: &Path, expected: &str) -> Result<(), FetchError> {
    let actual = calculate_file_checksum(path)?;
    if actual.eq_ignore_ascii_case(expected) {
        return Ok(());
    }

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Err(FetchError::ChecksumMismatch {
        filename,
        expected: expected.to_string(),
        actual,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const HELLO_WORLD: &str = "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";
    const EMPTY: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    fn blob(dir: &TempDir, name: &str, data: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, data).unwrap();
        path
    }

    #[test]
    fn test_known_digests() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            calculate_file_checksum(&blob(&dir, "a.nca", b"hello world")).unwrap(),
            HELLO_WORLD
        );
        assert_eq!(
            calculate_file_checksum(&blob(&dir, "empty.nca", b"")).unwrap(),
            EMPTY
        );
    }

    #[test]
    fn test_missing_file_is_read_error() {
        assert!(matches!(
            calculate_file_checksum(Path::new("/nonexistent/blob.nca")),
            Err(FetchError::ReadFailed { .. })
        ));
    }

    #[test]
    fn test_upper_case_hash_matches() {
        let dir = TempDir::new().unwrap();
        let path = blob(&dir, "a.nca", b"hello world");

        verify_checksum(&path, HELLO_WORLD).unwrap();
        verify_checksum(&path, &HELLO_WORLD.to_uppercase()).unwrap();
    }

    #[test]
    fn test_mismatch_names_the_file() {
        let dir = TempDir::new().unwrap();
        let path = blob(&dir, "0123.nca", b"hello world");

        match verify_checksum(&path, EMPTY) {
            Err(FetchError::ChecksumMismatch {
                filename, actual, ..
            }) => {
                assert_eq!(filename, "0123.nca");
                assert_eq!(actual, HELLO_WORLD);
            }
            other => panic!("expected ChecksumMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_multi_buffer_file() {
        let dir = TempDir::new().unwrap();
        let path = blob(&dir, "big.nca", &vec![0xABu8; 300_000]);

        let digest = calculate_file_checksum(&path).unwrap();
        assert_eq!(digest.len(), 64);
        assert!(digest.bytes().all(|b| !b.is_ascii_uppercase()));
    }
}
