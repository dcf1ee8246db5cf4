//! Item-level error taxonomy.
//!
//! Every phase failure is recorded here so completion events can carry a
//! single error type. Errors never cross item boundaries: an item's error
//! surfaces only through its completion event.

use thiserror::Error;

use crate::checksum::ChecksumError;
use crate::download::DownloadError;
use crate::hooks::HookError;

/// Why an item reached the `Failed` (or `Cancelled`) state.
#[derive(Debug, Error)]
pub enum ItemError {
    /// The download phase failed (retry budget exhausted or fatal).
    #[error(transparent)]
    Download(DownloadError),

    /// The artifact digest did not match. Never retried: the bytes are
    /// wrong, and re-verifying the same file cannot help. The artifact is
    /// deleted before this error is recorded.
    #[error("integrity check failed: expected {expected}, got {actual}")]
    IntegrityMismatch { expected: String, actual: String },

    /// The artifact could not be read back for verification. Unlike a
    /// mismatch this is an I/O problem, not evidence of corruption.
    #[error("failed to read artifact for verification: {0}")]
    VerifyRead(#[source] ChecksumError),

    /// The install hook failed; partial files are left for diagnosis.
    #[error(transparent)]
    Hook(HookError),

    /// A dependency of this item failed, so it was never started.
    /// Distinguished from a direct failure of the item itself.
    #[error("upstream dependency failed: {id}")]
    UpstreamFailed { id: String },

    /// The run was cancelled while this item was in flight.
    #[error("cancelled")]
    Cancelled,
}

impl From<DownloadError> for ItemError {
    fn from(e: DownloadError) -> Self {
        match e {
            DownloadError::Cancelled => Self::Cancelled,
            other => Self::Download(other),
        }
    }
}

impl From<ChecksumError> for ItemError {
    fn from(e: ChecksumError) -> Self {
        match e {
            ChecksumError::Mismatch {
                expected, actual, ..
            } => Self::IntegrityMismatch { expected, actual },
            read @ ChecksumError::Read { .. } => Self::VerifyRead(read),
        }
    }
}

impl From<HookError> for ItemError {
    fn from(e: HookError) -> Self {
        match e {
            HookError::Cancelled => Self::Cancelled,
            other => Self::Hook(other),
        }
    }
}
