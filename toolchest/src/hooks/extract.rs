//! Archive extraction into the component's install directory.
//!
//! Extraction shells out to the system `tar`/`unzip`, matching the tools
//! that produce the archives. Archives are extracted into a staging
//! directory first, then their contents are moved into the install
//! directory; an archive with a single top-level folder is flattened so
//! the install directory is the component root.

use std::fs;
use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;

use super::command::CommandRunner;
use super::error::HookError;

/// Extract an archive into `dest_dir`, choosing the tool by extension.
///
/// Returns the number of files extracted.
pub async fn extract_archive(
    archive: &Path,
    dest_dir: &Path,
    runner: &dyn CommandRunner,
    cancel: &CancellationToken,
) -> Result<usize, HookError> {
    fs::create_dir_all(dest_dir).map_err(|e| HookError::CreateDir {
        path: dest_dir.to_path_buf(),
        source: e,
    })?;

    let archive_str = archive.to_string_lossy().to_string();
    let dest_str = dest_dir.to_string_lossy().to_string();
    let filename = archive
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();

    let (program, args) = if filename.ends_with(".tar.gz") || filename.ends_with(".tgz") {
        ("tar", vec!["-xzf".to_string(), archive_str, "-C".to_string(), dest_str])
    } else if filename.ends_with(".tar") {
        ("tar", vec!["-xf".to_string(), archive_str, "-C".to_string(), dest_str])
    } else if filename.ends_with(".zip") {
        (
            "unzip",
            vec!["-o".to_string(), "-q".to_string(), archive_str, "-d".to_string(), dest_str],
        )
    } else {
        return Err(HookError::UnsupportedArchive { filename });
    };

    let output = runner.run(program, &args, None, cancel).await?;
    if !output.success {
        return Err(HookError::Extraction {
            path: archive.to_path_buf(),
            reason: format!("{} failed: {}", program, output.stderr),
        });
    }

    count_files_recursive(dest_dir)
}

/// Move extracted contents into the install directory.
///
/// An archive with a single top-level directory is flattened: that
/// directory becomes the install directory. Otherwise every entry is
/// moved under it. Rename is tried first; a cross-filesystem move falls
/// back to a recursive copy.
pub fn promote_extracted(staging: &Path, install_dir: &Path) -> Result<(), HookError> {
    let entries: Vec<_> = fs::read_dir(staging)
        .map_err(|e| HookError::Read {
            path: staging.to_path_buf(),
            source: e,
        })?
        .filter_map(|e| e.ok())
        .collect();

    if let Some(parent) = install_dir.parent() {
        fs::create_dir_all(parent).map_err(|e| HookError::CreateDir {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    if entries.len() == 1 && entries[0].path().is_dir() {
        // Single top-level directory: it IS the component root
        let source = entries[0].path();
        if fs::rename(&source, install_dir).is_err() {
            copy_dir_recursive(&source, install_dir)?;
        }
        return Ok(());
    }

    fs::create_dir_all(install_dir).map_err(|e| HookError::CreateDir {
        path: install_dir.to_path_buf(),
        source: e,
    })?;

    for entry in entries {
        let source = entry.path();
        let dest = install_dir.join(entry.file_name());

        if fs::rename(&source, &dest).is_err() {
            if source.is_dir() {
                copy_dir_recursive(&source, &dest)?;
            } else {
                fs::copy(&source, &dest).map_err(|e| HookError::Write {
                    path: dest,
                    source: e,
                })?;
            }
        }
    }

    Ok(())
}

fn copy_dir_recursive(source: &Path, dest: &Path) -> Result<(), HookError> {
    fs::create_dir_all(dest).map_err(|e| HookError::CreateDir {
        path: dest.to_path_buf(),
        source: e,
    })?;

    for entry in fs::read_dir(source).map_err(|e| HookError::Read {
        path: source.to_path_buf(),
        source: e,
    })? {
        let entry = entry.map_err(|e| HookError::Read {
            path: source.to_path_buf(),
            source: e,
        })?;

        let source_path = entry.path();
        let dest_path = dest.join(entry.file_name());

        if source_path.is_dir() {
            copy_dir_recursive(&source_path, &dest_path)?;
        } else {
            fs::copy(&source_path, &dest_path).map_err(|e| HookError::Write {
                path: dest_path,
                source: e,
            })?;
        }
    }

    Ok(())
}

fn count_files_recursive(dir: &Path) -> Result<usize, HookError> {
    let mut count = 0;

    if !dir.exists() {
        return Ok(0);
    }

    let entries = fs::read_dir(dir).map_err(|e| HookError::Read {
        path: dir.to_path_buf(),
        source: e,
    })?;

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_file() {
            count += 1;
        } else if path.is_dir() {
            count += count_files_recursive(&path)?;
        }
    }

    Ok(count)
}

/// Staging directory for a component's extraction, next to the artifact.
pub fn staging_dir(artifact: &Path, id: &str) -> PathBuf {
    artifact
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(format!("{}-extracted", id))
}
