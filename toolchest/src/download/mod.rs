//! Artifact download engine.
//!
//! This module provides everything needed to fetch a component artifact to
//! a local temp path:
//! - The single-attempt transfer boundary (`fetcher`)
//! - The reqwest-based streaming implementation (`http`)
//! - Retry/backoff policy (`retry`)
//! - The retry driver with cancellation (`downloader`)
//!
//! # Architecture
//!
//! ```text
//! Downloader (retry driver)
//!         │
//!         ├── RetryPolicy (backoff schedule)
//!         │
//!         └── Fetcher (trait, one attempt)
//!                 └── HttpFetcher (reqwest streaming)
//! ```
//!
//! A retried attempt always restarts the transfer from byte zero; the
//! destination file is truncated first. Cancellation aborts the in-flight
//! attempt and removes the partial file.

mod downloader;
mod fetcher;
mod http;
mod retry;

pub use downloader::{DownloadError, DownloadOutcome, Downloader};
pub use fetcher::{BoxFuture, FetchError, FetchProgress, Fetcher};
pub use http::{HttpFetcher, DEFAULT_INACTIVITY_TIMEOUT_SECS};
pub use retry::{RetryPolicy, DEFAULT_MAX_ATTEMPTS};
