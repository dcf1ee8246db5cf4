//! Toolchest - dependency-ordered installer for developer tool bundles
//!
//! This library resolves a requirements catalog into per-platform
//! component descriptors, then downloads, verifies, and installs each
//! component while honoring the dependency graph between them:
//!
//! ```text
//! catalog (JSON) ──► catalog::resolve ──► ComponentDescriptor list
//!                                              │
//!                                              ▼
//!                                      InstallRegistry::run
//!                                              │
//!                 per item: download ──► verify ──► install hook
//!                                              │
//!                                   InstallEvent stream + RunSummary
//! ```
//!
//! # Example
//!
//! ```ignore
//! use toolchest::catalog::{resolve, RawCatalog};
//! use toolchest::config::InstallerConfig;
//! use toolchest::registry::InstallRegistry;
//! use tokio_util::sync::CancellationToken;
//!
//! let catalog = RawCatalog::from_path("requirements.json".as_ref())?;
//! let descriptors = resolve(&catalog, "linux", "x64")?;
//!
//! let config = InstallerConfig::new("/opt/devtools".into());
//! let mut registry = InstallRegistry::new(descriptors, config);
//! let mut events = registry.subscribe();
//!
//! let summary = registry.run(CancellationToken::new()).await;
//! println!("{}", summary);
//! ```

pub mod catalog;
pub mod checksum;
pub mod config;
pub mod download;
pub mod hooks;
pub mod item;
pub mod registry;

pub use catalog::{CatalogError, ComponentDescriptor, RawCatalog};
pub use config::InstallerConfig;
pub use item::{ItemError, LifecycleState, Outcome, ProgressState};
pub use registry::{InstallEvent, InstallRegistry, RunState, RunSummary};
