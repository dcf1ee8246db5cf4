//! Configuration for an install run.

use std::path::PathBuf;
use std::time::Duration;

use crate::download::{RetryPolicy, DEFAULT_INACTIVITY_TIMEOUT_SECS};

/// Default bound on simultaneously-downloading items.
pub const DEFAULT_MAX_CONCURRENT_DOWNLOADS: usize = 3;

/// Configuration for the install registry.
///
/// The install root and temp directory are caller decisions; the core
/// never picks locations on its own.
#[derive(Debug, Clone)]
pub struct InstallerConfig {
    /// Directory components are installed under (each in its own
    /// `target_dir` subdirectory).
    pub install_root: PathBuf,

    /// Directory for downloaded artifacts and extraction staging.
    pub temp_dir: PathBuf,

    /// Maximum number of items downloading at once. Items ready to start
    /// beyond this stay `Pending` until a slot frees.
    pub max_concurrent_downloads: usize,

    /// Retry policy applied to every download.
    pub retry_policy: RetryPolicy,

    /// Per-attempt inactivity timeout for transfers.
    pub inactivity_timeout: Duration,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            install_root: PathBuf::from("."),
            temp_dir: std::env::temp_dir().join("toolchest"),
            max_concurrent_downloads: DEFAULT_MAX_CONCURRENT_DOWNLOADS,
            retry_policy: RetryPolicy::default(),
            inactivity_timeout: Duration::from_secs(DEFAULT_INACTIVITY_TIMEOUT_SECS),
        }
    }
}

impl InstallerConfig {
    /// Create a configuration with the given install root.
    pub fn new(install_root: PathBuf) -> Self {
        Self {
            install_root,
            ..Default::default()
        }
    }

    /// Set the temp directory.
    pub fn with_temp_dir(mut self, path: PathBuf) -> Self {
        self.temp_dir = path;
        self
    }

    /// Set the maximum concurrent downloads.
    pub fn with_max_concurrent_downloads(mut self, max: usize) -> Self {
        self.max_concurrent_downloads = max.max(1);
        self
    }

    /// Set the download retry policy.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Set the per-attempt inactivity timeout.
    pub fn with_inactivity_timeout(mut self, timeout: Duration) -> Self {
        self.inactivity_timeout = timeout;
        self
    }
}
