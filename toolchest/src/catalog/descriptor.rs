//! Resolved, platform-specific component metadata.

use indexmap::IndexMap;
use serde::Deserialize;

use crate::checksum::DigestAlgorithm;

/// Which install behavior applies once the artifact is verified on disk.
///
/// Polymorphism across component kinds is confined to this tag: download,
/// verification, and scheduling are shared by every component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallAction {
    /// Extract an archive into the target directory.
    Archive,
    /// Run the downloaded binary as a silent installer.
    Installer,
    /// Extract an archive, then patch a config file inside it.
    Patch,
}

impl std::fmt::Display for InstallAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Archive => write!(f, "archive"),
            Self::Installer => write!(f, "installer"),
            Self::Patch => write!(f, "patch"),
        }
    }
}

/// An expected artifact digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    pub algorithm: DigestAlgorithm,
    /// Lowercase hex value.
    pub hex: String,
}

/// Config patch applied after extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchSpec {
    /// File to patch, relative to the component's install directory.
    pub file: String,
    /// `key=value` entries to set in the file.
    pub entries: IndexMap<String, String>,
}

/// Resolved, immutable metadata for one installable component.
///
/// Produced by [`resolve`](super::resolve) for a concrete platform/arch;
/// all templates are already substituted.
#[derive(Debug, Clone)]
pub struct ComponentDescriptor {
    /// Unique component id (the catalog key).
    pub id: String,
    /// Human-readable name.
    pub display_name: String,
    /// Short description.
    pub description: String,
    /// Fully-substituted download URL.
    pub url: String,
    /// Artifact filename (used for the temp path).
    pub filename: String,
    /// Expected digest; `None` means trust without verification.
    pub digest: Option<Digest>,
    /// Resolved version string.
    pub version: String,
    /// Optional revision string.
    pub revision: Option<String>,
    /// Install behavior tag.
    pub action: InstallAction,
    /// Subdirectory under the install root.
    pub target_dir: String,
    /// Ids of components that must be terminal before this one starts.
    pub dependencies: Vec<String>,
    /// Whether failure of this component fails the whole run.
    pub mandatory: bool,
    /// Extra arguments for installer-binary components.
    pub install_args: Vec<String>,
    /// Config patch for patch-install components.
    pub patch: Option<PatchSpec>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_action_display() {
        assert_eq!(InstallAction::Archive.to_string(), "archive");
        assert_eq!(InstallAction::Installer.to_string(), "installer");
        assert_eq!(InstallAction::Patch.to_string(), "patch");
    }

    #[test]
    fn test_install_action_deserialize() {
        let action: InstallAction = serde_json::from_str("\"installer\"").unwrap();
        assert_eq!(action, InstallAction::Installer);
    }
}
