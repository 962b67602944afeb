//! Content digests for snapshot files
//!
//! The digest taken when a backup is created is the baseline every later
//! verification compares against.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::error::{LabkeepError, LabkeepResult};

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Streaming SHA-256 of a file, as lowercase hex
pub fn file_digest(path: &Path) -> LabkeepResult<String> {
    let file = File::open(path).map_err(|e| {
        LabkeepError::Io(format!("Failed to open {} for hashing: {}", path.display(), e))
    })?;

    let mut reader = BufReader::with_capacity(READ_BUFFER_SIZE, file);
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];

    loop {
        let n = reader.read(&mut buffer).map_err(|e| {
            LabkeepError::Io(format!("Failed to read {} for hashing: {}", path.display(), e))
        })?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Compare two hex digests
pub fn digests_match(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_known_digest() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("abc.txt");
        std::fs::write(&path, b"abc").unwrap();

        assert_eq!(
            file_digest(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_digest_is_deterministic() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data.bin");
        std::fs::write(&path, vec![7u8; 200_000]).unwrap();

        assert_eq!(file_digest(&path).unwrap(), file_digest(&path).unwrap());
    }

    #[test]
    fn test_single_byte_changes_digest() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data.bin");
        let mut bytes = vec![1u8; 1024];
        std::fs::write(&path, &bytes).unwrap();
        let before = file_digest(&path).unwrap();

        bytes[512] ^= 0xFF;
        std::fs::write(&path, &bytes).unwrap();
        assert_ne!(before, file_digest(&path).unwrap());
    }

    #[test]
    fn test_missing_file_is_error() {
        let temp = TempDir::new().unwrap();
        assert!(file_digest(&temp.path().join("missing")).is_err());
    }

    #[test]
    fn test_digests_match_ignores_case() {
        assert!(digests_match("ABCDEF", "abcdef"));
        assert!(!digests_match("abc", "abd"));
    }
}
