//! SHA-256 file hashing.
//!
//! The hash of the scanned file is the default correlation identifier for
//! stored verdicts and webhook callbacks.

use crate::core::error::ScanError;

use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;

/// Computes hex-encoded SHA-256 digests of files and buffers.
///
/// # Examples
///
/// ```rust
/// use avbridge::core::FileHasher;
///
/// let hasher = FileHasher::new();
/// let digest = hasher.hash_bytes(b"hello world");
/// assert_eq!(digest.len(), 64);
/// ```
#[derive(Debug, Clone, Default)]
pub struct FileHasher;

impl FileHasher {
    /// Creates a new `FileHasher`.
    pub fn new() -> Self {
        Self
    }

    /// Hashes an in-memory buffer.
    pub fn hash_bytes(&self, data: &[u8]) -> String {
        format!("{:x}", Sha256::digest(data))
    }

    /// Hashes a file on disk, streaming it through a 64 KiB buffer.
    pub fn hash_file(&self, path: &Path) -> Result<String, ScanError> {
        let file = std::fs::File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ScanError::FileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                ScanError::Io(e)
            }
        })?;

        let mut reader = std::io::BufReader::new(file);
        self.hash_reader(&mut reader)
    }

    /// Hashes everything a reader yields.
    pub fn hash_reader<R: Read>(&self, reader: &mut R) -> Result<String, ScanError> {
        let mut hasher = Sha256::new();
        let mut buffer = [0u8; 64 * 1024];
        loop {
            let bytes_read = reader.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }
        Ok(format!("{:x}", hasher.finalize()))
    }
}
