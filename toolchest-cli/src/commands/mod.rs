//! CLI command implementations.

mod install;
mod resolve;

pub use install::{run_install, InstallOptions};
pub use resolve::run_resolve;

use std::path::PathBuf;

use crate::error::CliError;

/// Catalog platform key for the host OS, unless overridden.
pub fn host_platform() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        "windows" => "win32",
        // Everything unix-like uses the linux metadata
        _ => "linux",
    }
}

/// Catalog architecture key for the host, unless overridden.
pub fn host_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "x64",
        "aarch64" => "arm64",
        other => other,
    }
}

/// Default install root: a `toolchest` directory under the user's local
/// data directory.
pub fn default_install_root() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("toolchest"))
        .unwrap_or_else(|| PathBuf::from("toolchest"))
}

/// Default temp directory for downloads and staging.
pub fn default_temp_dir() -> PathBuf {
    std::env::temp_dir().join("toolchest")
}

/// Load and resolve a catalog for the requested platform.
pub fn load_descriptors(
    catalog_path: &PathBuf,
    platform: Option<&str>,
    arch: Option<&str>,
) -> Result<Vec<toolchest::ComponentDescriptor>, CliError> {
    let catalog = toolchest::RawCatalog::from_path(catalog_path)?;
    if catalog.is_empty() {
        return Err(CliError::Usage(format!(
            "catalog {} contains no components",
            catalog_path.display()
        )));
    }

    let platform = platform.unwrap_or_else(|| host_platform());
    let arch = arch.unwrap_or_else(|| host_arch());
    let descriptors = toolchest::catalog::resolve(&catalog, platform, arch)?;

    if descriptors.is_empty() {
        return Err(CliError::Usage(format!(
            "no components in {} declare metadata for {}-{}",
            catalog_path.display(),
            platform,
            arch
        )));
    }

    Ok(descriptors)
}
