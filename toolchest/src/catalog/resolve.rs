//! Catalog resolution: raw catalog + target platform → descriptor list.
//!
//! Resolution is a pure function. For each entry it selects the metadata
//! for the requested platform/arch, substitutes `${version}` and
//! `${revision}` placeholders, validates the declared digest, and checks
//! the dependency graph. Entries with no metadata for the platform are
//! dropped; a dependency edge into a dropped entry is a fatal
//! configuration error, as is any cycle.

use indexmap::IndexMap;
use tracing::debug;

use crate::checksum::DigestAlgorithm;

use super::descriptor::{ComponentDescriptor, Digest, PatchSpec};
use super::error::CatalogError;
use super::raw::{RawCatalog, RawComponent};

/// Resolve a raw catalog for a concrete platform and architecture.
///
/// Returns descriptors in catalog declaration order (filtered to the
/// platform). Same inputs always produce the same output; no network or
/// filesystem access happens here.
pub fn resolve(
    catalog: &RawCatalog,
    platform: &str,
    arch: &str,
) -> Result<Vec<ComponentDescriptor>, CatalogError> {
    let platform_key = format!("{}-{}", platform, arch);

    // Pass 1: select platform metadata and build descriptors
    let mut descriptors: IndexMap<String, ComponentDescriptor> = IndexMap::new();
    for (id, entry) in &catalog.components {
        let Some(plat) = entry.platforms.get(&platform_key) else {
            debug!(id, platform = %platform_key, "component has no metadata for platform, dropping");
            continue;
        };

        let version = plat.version.as_deref().unwrap_or(&entry.version);
        let url = substitute(id, &plat.url, version, entry.revision.as_deref())?;
        let filename = substitute(id, &plat.filename, version, entry.revision.as_deref())?;
        let digest = plat
            .sha256sum
            .as_deref()
            .map(|hex| parse_digest(id, hex))
            .transpose()?;

        descriptors.insert(
            id.clone(),
            ComponentDescriptor {
                id: id.clone(),
                display_name: entry.name.clone(),
                description: entry.description.clone(),
                url,
                filename,
                digest,
                version: version.to_string(),
                revision: entry.revision.clone(),
                action: entry.install,
                target_dir: entry.target_dir.clone(),
                dependencies: entry.dependencies.clone(),
                mandatory: entry.mandatory,
                install_args: entry.install_args.clone(),
                patch: entry.patch.as_ref().map(|p| PatchSpec {
                    file: p.file.clone(),
                    entries: p.entries.clone(),
                }),
            },
        );
    }

    // Pass 2: validate dependency edges against the filtered set
    for descriptor in descriptors.values() {
        for dependency in &descriptor.dependencies {
            if !catalog.components.contains_key(dependency) {
                return Err(CatalogError::MissingDependency {
                    id: descriptor.id.clone(),
                    dependency: dependency.clone(),
                });
            }
            if !descriptors.contains_key(dependency) {
                return Err(CatalogError::DependencyNotAvailable {
                    id: descriptor.id.clone(),
                    dependency: dependency.clone(),
                    platform: platform_key.clone(),
                });
            }
        }
    }

    // Pass 3: reject cycles
    detect_cycle(&descriptors)?;

    Ok(descriptors.into_values().collect())
}

/// Substitute `${version}` and `${revision}` in a template.
fn substitute(
    id: &str,
    template: &str,
    version: &str,
    revision: Option<&str>,
) -> Result<String, CatalogError> {
    let mut out = template.replace("${version}", version);
    if let Some(revision) = revision {
        out = out.replace("${revision}", revision);
    }

    // Anything still in ${...} form is unsubstitutable: either an unknown
    // placeholder name or ${revision} on an entry that declares none
    if let Some(placeholder) = find_placeholder(&out) {
        return Err(CatalogError::UnresolvedPlaceholder {
            id: id.to_string(),
            placeholder: placeholder.to_string(),
        });
    }

    Ok(out)
}

fn find_placeholder(s: &str) -> Option<&str> {
    let start = s.find("${")?;
    let rest = &s[start + 2..];
    let end = rest.find('}').unwrap_or(rest.len());
    Some(&rest[..end])
}

fn parse_digest(id: &str, hex: &str) -> Result<Digest, CatalogError> {
    let algorithm = DigestAlgorithm::Sha256;
    if hex.len() != algorithm.hex_len() {
        return Err(CatalogError::InvalidDigest {
            id: id.to_string(),
            reason: format!(
                "expected {} hex characters, got {}",
                algorithm.hex_len(),
                hex.len()
            ),
        });
    }
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(CatalogError::InvalidDigest {
            id: id.to_string(),
            reason: "non-hex character in digest".to_string(),
        });
    }
    Ok(Digest {
        algorithm,
        hex: hex.to_ascii_lowercase(),
    })
}

/// Depth-first search for a cycle in the dependency relation.
///
/// Returns the cycle path (first node repeated at the end) in the error.
fn detect_cycle(descriptors: &IndexMap<String, ComponentDescriptor>) -> Result<(), CatalogError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        InProgress,
        Done,
    }

    let mut marks: IndexMap<&str, Mark> = IndexMap::new();
    let mut stack: Vec<&str> = Vec::new();

    fn visit<'a>(
        id: &'a str,
        descriptors: &'a IndexMap<String, ComponentDescriptor>,
        marks: &mut IndexMap<&'a str, Mark>,
        stack: &mut Vec<&'a str>,
    ) -> Result<(), CatalogError> {
        match marks.get(id) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::InProgress) => {
                let cycle_start = stack.iter().position(|s| *s == id).unwrap_or(0);
                let mut path: Vec<String> =
                    stack[cycle_start..].iter().map(|s| s.to_string()).collect();
                path.push(id.to_string());
                return Err(CatalogError::DependencyCycle { path });
            }
            None => {}
        }

        marks.insert(id, Mark::InProgress);
        stack.push(id);

        if let Some(descriptor) = descriptors.get(id) {
            for dependency in &descriptor.dependencies {
                visit(dependency.as_str(), descriptors, marks, stack)?;
            }
        }

        stack.pop();
        marks.insert(id, Mark::Done);
        Ok(())
    }

    for id in descriptors.keys() {
        visit(id.as_str(), descriptors, &mut marks, &mut stack)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::descriptor::InstallAction;

    fn catalog(json: &str) -> RawCatalog {
        RawCatalog::from_json(json).unwrap()
    }

    const TWO_PLATFORMS: &str = r#"{
        "jdk": {
            "name": "OpenJDK",
            "install": "archive",
            "target_dir": "jdk",
            "version": "21.0.2",
            "platforms": {
                "linux-x64": {
                    "url": "https://example.com/jdk-${version}-linux.tar.gz",
                    "filename": "jdk-${version}.tar.gz",
                    "sha256sum": "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa"
                },
                "darwin-arm64": {
                    "url": "https://example.com/jdk-${version}-macos.tar.gz",
                    "filename": "jdk-${version}.tar.gz"
                }
            }
        },
        "ide": {
            "name": "IDE",
            "install": "archive",
            "target_dir": "ide",
            "version": "4.31",
            "dependencies": ["jdk"],
            "platforms": {
                "linux-x64": {
                    "url": "https://example.com/ide-${version}.tar.gz",
                    "filename": "ide-${version}.tar.gz"
                }
            }
        }
    }"#;

    #[test]
    fn test_resolve_substitutes_version() {
        let descriptors = resolve(&catalog(TWO_PLATFORMS), "linux", "x64").unwrap();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(
            descriptors[0].url,
            "https://example.com/jdk-21.0.2-linux.tar.gz"
        );
        assert_eq!(descriptors[0].filename, "jdk-21.0.2.tar.gz");
    }

    #[test]
    fn test_resolve_drops_unlisted_platform() {
        // The IDE has no darwin metadata, but nothing depends on it there
        let result = resolve(&catalog(TWO_PLATFORMS), "darwin", "arm64");
        // ide depends on jdk which IS present on darwin; ide itself is dropped
        let descriptors = result.unwrap();
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].id, "jdk");
    }

    #[test]
    fn test_resolve_digest_optional() {
        let descriptors = resolve(&catalog(TWO_PLATFORMS), "linux", "x64").unwrap();
        assert!(descriptors[0].digest.is_some());
        assert!(descriptors[1].digest.is_none());
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let raw = catalog(TWO_PLATFORMS);
        let first = resolve(&raw, "linux", "x64").unwrap();
        let second = resolve(&raw, "linux", "x64").unwrap();
        let first_ids: Vec<&str> = first.iter().map(|d| d.id.as_str()).collect();
        let second_ids: Vec<&str> = second.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(first_ids, second_ids);
    }

    #[test]
    fn test_dependency_on_filtered_component_is_fatal() {
        let json = r#"{
            "vm": {
                "name": "Hypervisor",
                "install": "installer",
                "target_dir": "vm",
                "version": "7.0",
                "platforms": {
                    "win32-x64": {"url": "https://example.com/vm.exe", "filename": "vm.exe"}
                }
            },
            "toolkit": {
                "name": "Container Toolkit",
                "install": "archive",
                "target_dir": "toolkit",
                "version": "1.2",
                "dependencies": ["vm"],
                "platforms": {
                    "linux-x64": {"url": "https://example.com/toolkit.tar.gz", "filename": "toolkit.tar.gz"}
                }
            }
        }"#;

        let err = resolve(&catalog(json), "linux", "x64").unwrap_err();
        match err {
            CatalogError::DependencyNotAvailable {
                id,
                dependency,
                platform,
            } => {
                assert_eq!(id, "toolkit");
                assert_eq!(dependency, "vm");
                assert_eq!(platform, "linux-x64");
            }
            other => panic!("Expected DependencyNotAvailable, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_dependency_is_fatal() {
        let json = r#"{
            "toolkit": {
                "name": "Toolkit",
                "install": "archive",
                "target_dir": "toolkit",
                "version": "1.2",
                "dependencies": ["ghost"],
                "platforms": {
                    "linux-x64": {"url": "https://example.com/t.tar.gz", "filename": "t.tar.gz"}
                }
            }
        }"#;

        let err = resolve(&catalog(json), "linux", "x64").unwrap_err();
        assert!(matches!(err, CatalogError::MissingDependency { .. }));
    }

    #[test]
    fn test_cycle_is_fatal() {
        let json = r#"{
            "a": {
                "name": "A", "install": "archive", "target_dir": "a", "version": "1",
                "dependencies": ["b"],
                "platforms": {"linux-x64": {"url": "u", "filename": "f"}}
            },
            "b": {
                "name": "B", "install": "archive", "target_dir": "b", "version": "1",
                "dependencies": ["a"],
                "platforms": {"linux-x64": {"url": "u", "filename": "f"}}
            }
        }"#;

        let err = resolve(&catalog(json), "linux", "x64").unwrap_err();
        match err {
            CatalogError::DependencyCycle { path } => {
                assert!(path.len() >= 3);
                assert_eq!(path.first(), path.last());
            }
            other => panic!("Expected DependencyCycle, got {:?}", other),
        }
    }

    #[test]
    fn test_self_cycle_is_fatal() {
        let json = r#"{
            "a": {
                "name": "A", "install": "archive", "target_dir": "a", "version": "1",
                "dependencies": ["a"],
                "platforms": {"linux-x64": {"url": "u", "filename": "f"}}
            }
        }"#;

        let err = resolve(&catalog(json), "linux", "x64").unwrap_err();
        assert!(matches!(err, CatalogError::DependencyCycle { .. }));
    }

    #[test]
    fn test_unresolved_placeholder_is_fatal() {
        let json = r#"{
            "a": {
                "name": "A", "install": "archive", "target_dir": "a", "version": "1",
                "platforms": {"linux-x64": {"url": "https://example.com/${revision}/a", "filename": "a"}}
            }
        }"#;

        let err = resolve(&catalog(json), "linux", "x64").unwrap_err();
        match err {
            CatalogError::UnresolvedPlaceholder { placeholder, .. } => {
                assert_eq!(placeholder, "revision");
            }
            other => panic!("Expected UnresolvedPlaceholder, got {:?}", other),
        }
    }

    #[test]
    fn test_revision_substitution() {
        let json = r#"{
            "a": {
                "name": "A", "install": "archive", "target_dir": "a",
                "version": "1.0", "revision": "42",
                "platforms": {"linux-x64": {"url": "https://example.com/${version}+${revision}/a", "filename": "a"}}
            }
        }"#;

        let descriptors = resolve(&catalog(json), "linux", "x64").unwrap();
        assert_eq!(descriptors[0].url, "https://example.com/1.0+42/a");
    }

    #[test]
    fn test_platform_version_override() {
        let json = r#"{
            "a": {
                "name": "A", "install": "archive", "target_dir": "a", "version": "1.0",
                "platforms": {
                    "linux-x64": {"url": "https://example.com/${version}/a", "filename": "a", "version": "2.0"}
                }
            }
        }"#;

        let descriptors = resolve(&catalog(json), "linux", "x64").unwrap();
        assert_eq!(descriptors[0].url, "https://example.com/2.0/a");
        assert_eq!(descriptors[0].version, "2.0");
    }

    #[test]
    fn test_invalid_digest_is_fatal() {
        let json = r#"{
            "a": {
                "name": "A", "install": "archive", "target_dir": "a", "version": "1",
                "platforms": {"linux-x64": {"url": "u", "filename": "f", "sha256sum": "zz"}}
            }
        }"#;

        let err = resolve(&catalog(json), "linux", "x64").unwrap_err();
        assert!(matches!(err, CatalogError::InvalidDigest { .. }));
    }

    #[test]
    fn test_resolved_action_carried_through() {
        let json = r#"{
            "vm": {
                "name": "Hypervisor", "install": "installer", "target_dir": "vm", "version": "7",
                "install_args": ["--silent"],
                "platforms": {"linux-x64": {"url": "u", "filename": "vm.run"}}
            }
        }"#;

        let descriptors = resolve(&catalog(json), "linux", "x64").unwrap();
        assert_eq!(descriptors[0].action, InstallAction::Installer);
        assert_eq!(descriptors[0].install_args, ["--silent"]);
    }
}
