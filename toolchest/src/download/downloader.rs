//! Retry driver for artifact downloads.
//!
//! Wraps a [`Fetcher`] with the retry/backoff/cancellation behavior every
//! download shares. A retry truncates the partial file and restarts from
//! byte zero; byte-range resume is deliberately not attempted.

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::fetcher::{FetchProgress, Fetcher};
use super::retry::RetryPolicy;

/// Errors that can end a download.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Transient failures persisted past the retry budget.
    #[error("download failed after {attempts} attempt(s): {reason}")]
    RetriesExhausted { attempts: u32, reason: String },

    /// A non-retryable failure (4xx, bad URL, unwritable destination).
    #[error("download failed: {reason}")]
    Fatal { reason: String },

    /// The transfer was cancelled. Distinct from failure so callers can
    /// report it separately.
    #[error("download cancelled")]
    Cancelled,
}

/// Result of a completed download.
#[derive(Debug, Clone, Copy)]
pub struct DownloadOutcome {
    /// Bytes written to the destination.
    pub bytes: u64,
    /// Number of retry attempts that preceded the successful one.
    pub retries: u32,
}

/// Downloads a URL to a local path with retry, backoff, and cancellation.
///
/// The destination is expected to be a temporary path; committing the
/// artifact (after verification) is the caller's decision.
pub struct Downloader {
    fetcher: Arc<dyn Fetcher>,
    policy: RetryPolicy,
}

impl Downloader {
    /// Create a downloader over the given fetcher.
    pub fn new(fetcher: Arc<dyn Fetcher>, policy: RetryPolicy) -> Self {
        Self { fetcher, policy }
    }

    /// Fetch `url` to `dest`.
    ///
    /// On cancellation the in-flight attempt is aborted, the partial file
    /// is deleted, and [`DownloadError::Cancelled`] is returned. On any
    /// terminal failure the partial file is also deleted.
    pub async fn fetch(
        &self,
        url: &str,
        dest: &Path,
        progress: Option<FetchProgress>,
        cancel: &CancellationToken,
    ) -> Result<DownloadOutcome, DownloadError> {
        let mut attempt = 1u32;

        loop {
            // Checked before the fetcher is invoked at all, so an already
            // cancelled run never opens a connection
            if cancel.is_cancelled() {
                remove_partial(dest).await;
                return Err(DownloadError::Cancelled);
            }

            let result = tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    remove_partial(dest).await;
                    return Err(DownloadError::Cancelled);
                }

                r = self.fetcher.fetch(url, dest, progress.as_ref()) => r,
            };

            match result {
                Ok(bytes) => {
                    debug!(url, bytes, retries = attempt - 1, "download complete");
                    return Ok(DownloadOutcome {
                        bytes,
                        retries: attempt - 1,
                    });
                }
                Err(e) if e.is_transient() => match self.policy.delay_for_attempt(attempt) {
                    Some(delay) => {
                        warn!(
                            url,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "transient download failure, retrying"
                        );
                        remove_partial(dest).await;

                        tokio::select! {
                            biased;

                            _ = cancel.cancelled() => {
                                return Err(DownloadError::Cancelled);
                            }
                            _ = tokio::time::sleep(delay) => {}
                        }
                        attempt += 1;
                    }
                    None => {
                        remove_partial(dest).await;
                        return Err(DownloadError::RetriesExhausted {
                            attempts: attempt,
                            reason: e.to_string(),
                        });
                    }
                },
                Err(e) => {
                    remove_partial(dest).await;
                    return Err(DownloadError::Fatal {
                        reason: e.to_string(),
                    });
                }
            }
        }
    }
}

async fn remove_partial(dest: &Path) {
    // Best effort; the file may not exist yet
    tokio::fs::remove_file(dest).await.ok();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::fetcher::{BoxFuture, FetchError};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    /// A fetcher that plays back a scripted sequence of attempt outcomes.
    struct ScriptedFetcher {
        outcomes: Mutex<VecDeque<Result<u64, FetchError>>>,
        attempts: AtomicU32,
    }

    impl ScriptedFetcher {
        fn new(outcomes: Vec<Result<u64, FetchError>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                attempts: AtomicU32::new(0),
            }
        }

        fn attempts(&self) -> u32 {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    impl Fetcher for ScriptedFetcher {
        fn fetch<'a>(
            &'a self,
            _url: &'a str,
            dest: &'a Path,
            _progress: Option<&'a FetchProgress>,
        ) -> BoxFuture<'a, Result<u64, FetchError>> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let outcome = self
                .outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(0));
            Box::pin(async move {
                // Leave a partial file behind on failure so cleanup is observable
                std::fs::write(dest, b"partial").unwrap();
                outcome
            })
        }
    }

    fn quick_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::fixed(max_attempts, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_success_first_attempt() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![Ok(42)]));
        let downloader = Downloader::new(fetcher.clone(), quick_policy(3));
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("a.bin");

        let outcome = downloader
            .fetch("http://example.com/a", &dest, None, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.bytes, 42);
        assert_eq!(outcome.retries, 0);
        assert_eq!(fetcher.attempts(), 1);
    }

    #[tokio::test]
    async fn test_succeeds_on_final_attempt_with_recorded_retries() {
        // Budget of 3: fails on attempts 1 and 2, succeeds on 3
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            Err(FetchError::transient("reset")),
            Err(FetchError::transient("timeout")),
            Ok(100),
        ]));
        let downloader = Downloader::new(fetcher.clone(), quick_policy(3));
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("a.bin");

        let outcome = downloader
            .fetch("http://example.com/a", &dest, None, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.retries, 2);
        assert_eq!(fetcher.attempts(), 3);
    }

    #[tokio::test]
    async fn test_retry_budget_exhaustion() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            Err(FetchError::transient("reset")),
            Err(FetchError::transient("reset")),
            Err(FetchError::transient("reset")),
        ]));
        let downloader = Downloader::new(fetcher.clone(), quick_policy(3));
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("a.bin");

        let err = downloader
            .fetch("http://example.com/a", &dest, None, &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            DownloadError::RetriesExhausted { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("Expected RetriesExhausted, got {:?}", other),
        }
        assert_eq!(fetcher.attempts(), 3);
        assert!(!dest.exists(), "partial file should be deleted");
    }

    #[tokio::test]
    async fn test_fatal_error_is_not_retried() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            Err(FetchError::fatal("HTTP 404")),
            Ok(1),
        ]));
        let downloader = Downloader::new(fetcher.clone(), quick_policy(5));
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("a.bin");

        let err = downloader
            .fetch("http://example.com/a", &dest, None, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::Fatal { .. }));
        assert_eq!(fetcher.attempts(), 1);
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_pre_cancelled_token() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![Ok(1)]));
        let downloader = Downloader::new(fetcher.clone(), quick_policy(3));
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("a.bin");

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = downloader
            .fetch("http://example.com/a", &dest, None, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::Cancelled));
        assert_eq!(fetcher.attempts(), 0);
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_cancel_during_backoff() {
        let fetcher = Arc::new(ScriptedFetcher::new(vec![Err(FetchError::transient(
            "reset",
        ))]));
        let downloader = Downloader::new(
            fetcher.clone(),
            RetryPolicy::fixed(3, Duration::from_secs(60)),
        );
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("a.bin");

        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel_clone.cancel();
        });

        // The backoff delay is 60s; cancellation must cut it short
        let err = tokio::time::timeout(
            Duration::from_secs(5),
            downloader.fetch("http://example.com/a", &dest, None, &cancel),
        )
        .await
        .unwrap()
        .unwrap_err();

        assert!(matches!(err, DownloadError::Cancelled));
    }
}
