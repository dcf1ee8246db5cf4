//! CLI error type.

use thiserror::Error;

/// Errors surfaced to the user by the CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Catalog loading or resolution failed.
    #[error("{0}")]
    Catalog(#[from] toolchest::CatalogError),

    /// Invalid command-line usage.
    #[error("{0}")]
    Usage(String),

    /// The install run did not end with every mandatory item installed.
    #[error("install run failed")]
    RunFailed,
}
