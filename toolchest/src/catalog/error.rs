//! Error types for catalog loading and resolution.
//!
//! Every variant here is a configuration error: all of them are detected
//! before any download starts, and all of them abort the run.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading or resolving a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Failed to read the catalog document.
    #[error("failed to read catalog {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The catalog document is not valid JSON.
    #[error("failed to parse catalog: {0}")]
    Parse(#[source] serde_json::Error),

    /// A URL or filename template contains a placeholder that cannot be
    /// substituted from the entry's declared fields.
    #[error("component {id}: unresolved placeholder ${{{placeholder}}} in template")]
    UnresolvedPlaceholder { id: String, placeholder: String },

    /// A declared dependency id does not exist in the catalog at all.
    #[error("component {id}: dependency {dependency} is not in the catalog")]
    MissingDependency { id: String, dependency: String },

    /// A declared dependency exists but was filtered out for this platform.
    /// The edge is not silently dropped; the whole resolution fails.
    #[error("component {id}: dependency {dependency} has no metadata for platform {platform}")]
    DependencyNotAvailable {
        id: String,
        dependency: String,
        platform: String,
    },

    /// The dependency relation contains a cycle.
    #[error("dependency cycle: {}", path.join(" -> "))]
    DependencyCycle { path: Vec<String> },

    /// A declared digest is not valid hex of the expected length.
    #[error("component {id}: invalid digest: {reason}")]
    InvalidDigest { id: String, reason: String },
}
