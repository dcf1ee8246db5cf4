//! Error types for install hooks.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while installing a verified artifact.
#[derive(Debug, Error)]
pub enum HookError {
    /// Failed to spawn an external program.
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    /// An external program exited with a non-zero status. The stderr tail
    /// is recorded verbatim for diagnostics.
    #[error("{program} exited with status {code}: {stderr}")]
    CommandFailed {
        program: String,
        /// Exit code, or -1 if the process was killed by a signal.
        code: i32,
        stderr: String,
    },

    /// Archive extraction failed.
    #[error("failed to extract {path}: {reason}")]
    Extraction { path: PathBuf, reason: String },

    /// The artifact's filename does not match any supported archive format.
    #[error("unsupported archive format: {filename}")]
    UnsupportedArchive { filename: String },

    /// Failed to read a file or directory.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write a file or directory.
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to create a directory.
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The file a config patch targets is missing from the extracted tree.
    #[error("config file {path} missing from extracted archive")]
    PatchTargetMissing { path: PathBuf },

    /// The hook was cancelled; any partially-installed files are left in
    /// place for diagnosis.
    #[error("install cancelled")]
    Cancelled,
}
