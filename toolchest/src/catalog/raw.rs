//! Serde model of the requirements catalog input document.
//!
//! The catalog is authored externally and treated as opaque input: a JSON
//! mapping from component id to an entry describing the component and its
//! per-platform download metadata. Nothing here touches the network or the
//! filesystem beyond reading the document itself.

use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;

use super::descriptor::InstallAction;
use super::error::CatalogError;

/// The raw requirements catalog: component id → entry, in declaration order.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct RawCatalog {
    pub components: IndexMap<String, RawComponent>,
}

impl RawCatalog {
    /// Parse a catalog from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        serde_json::from_str(json).map_err(CatalogError::Parse)
    }

    /// Load a catalog from a JSON file.
    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let contents = std::fs::read_to_string(path).map_err(|e| CatalogError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(&contents)
    }

    /// Number of components in the catalog.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Returns true if the catalog has no components.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

/// One raw catalog entry.
#[derive(Debug, Clone, Deserialize)]
pub struct RawComponent {
    /// Human-readable component name.
    pub name: String,

    /// Short description shown in progress output.
    #[serde(default)]
    pub description: String,

    /// Which install behavior applies once the artifact is on disk.
    pub install: InstallAction,

    /// Subdirectory under the install root this component lands in.
    pub target_dir: String,

    /// Ids of components that must reach a terminal state first.
    #[serde(default)]
    pub dependencies: Vec<String>,

    /// Whether a failure of this component fails the whole run.
    #[serde(default = "default_mandatory")]
    pub mandatory: bool,

    /// Component version, substituted for `${version}` in templates.
    pub version: String,

    /// Optional revision, substituted for `${revision}` in templates.
    #[serde(default)]
    pub revision: Option<String>,

    /// Extra arguments passed to installer-binary components.
    #[serde(default)]
    pub install_args: Vec<String>,

    /// Config patch applied after extraction (patch-install components).
    #[serde(default)]
    pub patch: Option<RawPatch>,

    /// Per-platform download metadata, keyed `"{platform}-{arch}"`
    /// (e.g. `win32-x64`, `darwin-arm64`, `linux-x64`).
    pub platforms: IndexMap<String, RawPlatform>,
}

fn default_mandatory() -> bool {
    true
}

/// Raw config patch declaration.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPatch {
    /// File to patch, relative to the component's install directory.
    pub file: String,

    /// `key=value` entries to set in the file.
    #[serde(default)]
    pub entries: IndexMap<String, String>,
}

/// Download metadata for one platform/arch combination.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPlatform {
    /// Download URL template; may contain `${version}` and `${revision}`.
    pub url: String,

    /// Optional alternate (download-manager) URL. Accepted for catalog
    /// compatibility; the core pipeline does not use it.
    #[serde(default)]
    pub dm_url: Option<String>,

    /// Artifact filename template.
    pub filename: String,

    /// Expected SHA-256 digest, lowercase or uppercase hex. Absent means
    /// "trust without verification".
    #[serde(default)]
    pub sha256sum: Option<String>,

    /// Platform-specific version override.
    #[serde(default)]
    pub version: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "jdk": {
            "name": "OpenJDK",
            "install": "archive",
            "target_dir": "jdk",
            "version": "21.0.2",
            "platforms": {
                "linux-x64": {
                    "url": "https://example.com/jdk-${version}.tar.gz",
                    "filename": "jdk-${version}.tar.gz",
                    "sha256sum": "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"
                }
            }
        }
    }"#;

    #[test]
    fn test_parse_minimal_catalog() {
        let catalog = RawCatalog::from_json(MINIMAL).unwrap();
        assert_eq!(catalog.len(), 1);

        let entry = &catalog.components["jdk"];
        assert_eq!(entry.name, "OpenJDK");
        assert!(entry.mandatory, "mandatory should default to true");
        assert!(entry.dependencies.is_empty());
        assert_eq!(entry.install, InstallAction::Archive);
    }

    #[test]
    fn test_parse_preserves_declaration_order() {
        let json = r#"{
            "c": {"name": "C", "install": "archive", "target_dir": "c", "version": "1", "platforms": {}},
            "a": {"name": "A", "install": "archive", "target_dir": "a", "version": "1", "platforms": {}},
            "b": {"name": "B", "install": "archive", "target_dir": "b", "version": "1", "platforms": {}}
        }"#;
        let catalog = RawCatalog::from_json(json).unwrap();
        let ids: Vec<&String> = catalog.components.keys().collect();
        assert_eq!(ids, ["c", "a", "b"]);
    }

    #[test]
    fn test_parse_invalid_json() {
        let result = RawCatalog::from_json("not json");
        assert!(matches!(result, Err(CatalogError::Parse(_))));
    }

    #[test]
    fn test_optional_component() {
        let json = r#"{
            "docs": {
                "name": "Docs",
                "install": "archive",
                "target_dir": "docs",
                "version": "1.0",
                "mandatory": false,
                "platforms": {}
            }
        }"#;
        let catalog = RawCatalog::from_json(json).unwrap();
        assert!(!catalog.components["docs"].mandatory);
    }
}
