//! Requirements catalog loading and platform resolution.
//!
//! The catalog is the external input document describing every component:
//! per-platform download URLs, digests, versions, install behavior, and
//! dependency edges. This module parses it (`raw`), resolves it for a
//! concrete platform/arch into immutable descriptors (`resolve`), and
//! validates the dependency graph up front so configuration errors abort
//! before any download starts.

mod descriptor;
mod error;
mod raw;
mod resolve;

pub use descriptor::{ComponentDescriptor, Digest, InstallAction, PatchSpec};
pub use error::CatalogError;
pub use raw::{RawCatalog, RawComponent, RawPatch, RawPlatform};
pub use resolve::resolve;
