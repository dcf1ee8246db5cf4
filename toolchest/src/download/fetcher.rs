//! The single-attempt transfer boundary.
//!
//! A [`Fetcher`] performs exactly one transfer attempt; retry, backoff, and
//! cancellation live in the [`Downloader`](super::Downloader) that drives it.
//! Keeping the seam here means the retry logic can be exercised in tests
//! with a scripted fetcher instead of a live server.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Progress callback for a transfer.
///
/// # Arguments
///
/// * `bytes_so_far` - Bytes written to the destination so far
/// * `total` - Expected total from content-length, `None` if the server
///   did not declare one (indeterminate progress)
pub type FetchProgress = Box<dyn Fn(u64, Option<u64>) + Send + Sync>;

/// Error from a single transfer attempt.
///
/// Carries a transient flag so the retry driver can distinguish failures
/// worth retrying (connection reset, timeout, 5xx) from fatal ones
/// (4xx, malformed URL).
#[derive(Debug)]
pub struct FetchError {
    message: String,
    transient: bool,
}

impl FetchError {
    /// Creates a fatal (non-retryable) error.
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            transient: false,
        }
    }

    /// Creates a transient (retryable) error.
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            transient: true,
        }
    }

    /// Returns true if this error is worth retrying.
    pub fn is_transient(&self) -> bool {
        self.transient
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for FetchError {}

/// One transfer attempt: stream `url` to `dest`, reporting progress.
///
/// Implementations must truncate any existing file at `dest` before
/// writing; a retried attempt always restarts from byte zero.
pub trait Fetcher: Send + Sync {
    /// Fetch the URL to the destination path.
    ///
    /// Returns the number of bytes written on success.
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        dest: &'a Path,
        progress: Option<&'a FetchProgress>,
    ) -> BoxFuture<'a, Result<u64, FetchError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_fatal() {
        let err = FetchError::fatal("HTTP 404");
        assert!(!err.is_transient());
        assert_eq!(err.message(), "HTTP 404");
    }

    #[test]
    fn test_fetch_error_transient() {
        let err = FetchError::transient("connection reset");
        assert!(err.is_transient());
        assert_eq!(format!("{}", err), "connection reset");
    }
}
