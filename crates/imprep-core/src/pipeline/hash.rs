//! Content hashing used to verify copies before an original is removed.

use blake3::Hasher as Blake3Hasher;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Streaming BLAKE3 digests of file contents.
pub struct ContentHasher;

impl ContentHasher {
    /// Hex digest of a file's bytes, read in 64KB chunks.
    pub fn content_hash(path: &Path) -> std::io::Result<String> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let mut hasher = Blake3Hasher::new();

        let mut buffer = [0u8; 65536];
        loop {
            let bytes_read = reader.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            hasher.update(&buffer[..bytes_read]);
        }

        Ok(hasher.finalize().to_hex().to_string())
    }

    /// True when both files exist and have identical contents.
    pub fn same_contents(a: &Path, b: &Path) -> std::io::Result<bool> {
        let len_a = std::fs::metadata(a)?.len();
        let len_b = std::fs::metadata(b)?.len();
        if len_a != len_b {
            return Ok(false);
        }
        Ok(Self::content_hash(a)? == Self::content_hash(b)?)
    }
}
