//! HTTP implementation of the transfer boundary.
//!
//! Streams response bodies to disk chunk by chunk, with a per-chunk
//! inactivity timeout that is distinct from the retry budget: a transfer
//! that stalls mid-stream fails the attempt without waiting for the whole
//! response to time out.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::fetcher::{BoxFuture, FetchError, FetchProgress, Fetcher};

/// Default inactivity timeout between received chunks (60 seconds).
pub const DEFAULT_INACTIVITY_TIMEOUT_SECS: u64 = 60;

/// Default connect timeout (15 seconds).
const CONNECT_TIMEOUT_SECS: u64 = 15;

/// HTTP-based fetcher.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    inactivity_timeout: Duration,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpFetcher {
    /// Create a new HTTP fetcher with default settings.
    pub fn new() -> Self {
        Self::with_inactivity_timeout(Duration::from_secs(DEFAULT_INACTIVITY_TIMEOUT_SECS))
    }

    /// Create a new HTTP fetcher with a custom inactivity timeout.
    pub fn with_inactivity_timeout(inactivity_timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            inactivity_timeout,
        }
    }

    async fn fetch_inner(
        &self,
        url: &str,
        dest: &Path,
        progress: Option<&FetchProgress>,
    ) -> Result<u64, FetchError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_builder() {
                FetchError::fatal(format!("invalid URL {}: {}", url, e))
            } else {
                // Connect failures, resets, and timeouts are all transient
                FetchError::transient(format!("request to {} failed: {}", url, e))
            }
        })?;

        let status = response.status();
        if status.is_client_error() {
            return Err(FetchError::fatal(format!(
                "GET {} returned {}",
                url, status
            )));
        }
        if !status.is_success() {
            return Err(FetchError::transient(format!(
                "GET {} returned {}",
                url, status
            )));
        }

        let total = response.content_length();
        debug!(url, ?total, "starting transfer");

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FetchError::fatal(format!("failed to create {}: {}", parent.display(), e)))?;
        }

        // Truncate any previous partial file; attempts always restart from zero
        let file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| FetchError::fatal(format!("failed to create {}: {}", dest.display(), e)))?;
        let mut writer = tokio::io::BufWriter::new(file);

        let mut stream = response.bytes_stream();
        let mut downloaded = 0u64;

        loop {
            let chunk = match tokio::time::timeout(self.inactivity_timeout, stream.next()).await {
                Err(_) => {
                    return Err(FetchError::transient(format!(
                        "transfer from {} stalled for {}s",
                        url,
                        self.inactivity_timeout.as_secs()
                    )));
                }
                Ok(None) => break,
                Ok(Some(Err(e))) => {
                    return Err(FetchError::transient(format!(
                        "read error from {}: {}",
                        url, e
                    )));
                }
                Ok(Some(Ok(chunk))) => chunk,
            };

            writer.write_all(&chunk).await.map_err(|e| {
                FetchError::fatal(format!("failed to write {}: {}", dest.display(), e))
            })?;

            downloaded += chunk.len() as u64;
            if let Some(cb) = progress {
                cb(downloaded, total);
            }
        }

        writer.flush().await.map_err(|e| {
            FetchError::fatal(format!("failed to write {}: {}", dest.display(), e))
        })?;

        debug!(url, downloaded, "transfer complete");
        Ok(downloaded)
    }
}

impl Fetcher for HttpFetcher {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        dest: &'a Path,
        progress: Option<&'a FetchProgress>,
    ) -> BoxFuture<'a, Result<u64, FetchError>> {
        Box::pin(self.fetch_inner(url, dest, progress))
    }
}
