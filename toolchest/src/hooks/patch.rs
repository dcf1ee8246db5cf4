//! Config-file patching for components that need post-extraction edits.
//!
//! Some bundles ship a properties-style config file that must point at the
//! local install (ports, paths) before first launch. The patch sets
//! `key=value` entries: an existing line for the key is replaced, a
//! missing key is appended.

use std::fs;
use std::path::Path;

use crate::catalog::PatchSpec;

use super::error::HookError;

/// Apply a config patch under the component's install directory.
///
/// Returns the number of entries applied.
pub fn apply_patch(install_dir: &Path, patch: &PatchSpec) -> Result<usize, HookError> {
    let target = install_dir.join(&patch.file);
    if !target.exists() {
        return Err(HookError::PatchTargetMissing { path: target });
    }

    let contents = fs::read_to_string(&target).map_err(|e| HookError::Read {
        path: target.clone(),
        source: e,
    })?;

    let mut lines: Vec<String> = contents.lines().map(|l| l.to_string()).collect();

    for (key, value) in &patch.entries {
        let prefix = format!("{}=", key);
        match lines.iter_mut().find(|l| l.starts_with(&prefix)) {
            Some(line) => *line = format!("{}={}", key, value),
            None => lines.push(format!("{}={}", key, value)),
        }
    }

    let mut output = lines.join("\n");
    output.push('\n');

    fs::write(&target, output).map_err(|e| HookError::Write {
        path: target,
        source: e,
    })?;

    Ok(patch.entries.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;
    use tempfile::TempDir;

    fn patch(file: &str, entries: &[(&str, &str)]) -> PatchSpec {
        PatchSpec {
            file: file.to_string(),
            entries: entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<IndexMap<_, _>>(),
        }
    }

    #[test]
    fn test_patch_replaces_existing_key() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("server.properties"),
            "port=8080\nhost=remote.example.com\n",
        )
        .unwrap();

        let applied = apply_patch(
            temp.path(),
            &patch("server.properties", &[("host", "localhost")]),
        )
        .unwrap();

        assert_eq!(applied, 1);
        let contents = fs::read_to_string(temp.path().join("server.properties")).unwrap();
        assert!(contents.contains("host=localhost"));
        assert!(contents.contains("port=8080"));
        assert!(!contents.contains("remote.example.com"));
    }

    #[test]
    fn test_patch_appends_missing_key() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("app.conf"), "port=8080\n").unwrap();

        apply_patch(temp.path(), &patch("app.conf", &[("debug", "false")])).unwrap();

        let contents = fs::read_to_string(temp.path().join("app.conf")).unwrap();
        assert!(contents.contains("port=8080"));
        assert!(contents.ends_with("debug=false\n"));
    }

    #[test]
    fn test_patch_missing_target() {
        let temp = TempDir::new().unwrap();
        let result = apply_patch(temp.path(), &patch("missing.conf", &[("a", "b")]));
        assert!(matches!(result, Err(HookError::PatchTargetMissing { .. })));
    }

    #[test]
    fn test_patch_nested_file() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("conf")).unwrap();
        fs::write(temp.path().join("conf/server.xml.properties"), "a=1\n").unwrap();

        apply_patch(
            temp.path(),
            &patch("conf/server.xml.properties", &[("a", "2")]),
        )
        .unwrap();

        let contents = fs::read_to_string(temp.path().join("conf/server.xml.properties")).unwrap();
        assert_eq!(contents, "a=2\n");
    }
}
