//! Streaming digest computation for artifact verification.
//!
//! Downloaded artifacts are verified against the digest declared in the
//! catalog before any installer code runs. Files may be gigabytes, so the
//! digest is computed over fixed-size chunks rather than buffering the
//! whole file.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest as _, Sha256, Sha512};
use thiserror::Error;

/// Buffer size for reading files during digest calculation (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Supported digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Sha256,
    Sha512,
}

impl DigestAlgorithm {
    /// Length of the hex-encoded digest for this algorithm.
    pub fn hex_len(&self) -> usize {
        match self {
            Self::Sha256 => 64,
            Self::Sha512 => 128,
        }
    }
}

impl std::fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sha256 => write!(f, "sha256"),
            Self::Sha512 => write!(f, "sha512"),
        }
    }
}

/// Errors that can occur during digest verification.
///
/// `Read` and `Mismatch` must be handled differently by callers: a read
/// failure is a transient I/O problem and the verification can be retried,
/// while a mismatch means the bytes themselves are wrong and re-verifying
/// the same file cannot succeed.
#[derive(Debug, Error)]
pub enum ChecksumError {
    /// Failed to read the file being verified.
    #[error("failed to read {path}: {source}")]
    Read {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    /// The computed digest does not match the expected value.
    #[error("checksum mismatch for {filename}: expected {expected}, got {actual}")]
    Mismatch {
        filename: String,
        expected: String,
        actual: String,
    },
}

impl ChecksumError {
    /// Returns true if retrying the verification could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Read { .. })
    }
}

/// Compute the digest of a file, streaming it in fixed-size chunks.
///
/// Returns the lowercase hexadecimal digest of the file contents.
pub fn digest_file(path: &Path, algorithm: DigestAlgorithm) -> Result<String, ChecksumError> {
    let mut file = File::open(path).map_err(|e| ChecksumError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut buffer = vec![0u8; BUFFER_SIZE];

    match algorithm {
        DigestAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            stream_into(&mut file, &mut buffer, path, |chunk| hasher.update(chunk))?;
            Ok(format!("{:x}", hasher.finalize()))
        }
        DigestAlgorithm::Sha512 => {
            let mut hasher = Sha512::new();
            stream_into(&mut file, &mut buffer, path, |chunk| hasher.update(chunk))?;
            Ok(format!("{:x}", hasher.finalize()))
        }
    }
}

fn stream_into(
    file: &mut File,
    buffer: &mut [u8],
    path: &Path,
    mut consume: impl FnMut(&[u8]),
) -> Result<(), ChecksumError> {
    loop {
        let bytes_read = file.read(buffer).map_err(|e| ChecksumError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;

        if bytes_read == 0 {
            return Ok(());
        }

        consume(&buffer[..bytes_read]);
    }
}

/// Verify that a file matches an expected digest.
///
/// The expected value is compared case-insensitively, so uppercase hex in
/// a catalog entry still matches.
pub fn verify_file(
    path: &Path,
    algorithm: DigestAlgorithm,
    expected: &str,
) -> Result<(), ChecksumError> {
    let actual = digest_file(path, algorithm)?;
    if !actual.eq_ignore_ascii_case(expected) {
        return Err(ChecksumError::Mismatch {
            filename: path
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string(),
            expected: expected.to_ascii_lowercase(),
            actual,
        });
    }
    Ok(())
}
