//! Install hooks: what happens once bytes are verified on disk.
//!
//! Polymorphism across component kinds lives entirely here, as a tagged
//! dispatch on [`InstallAction`](crate::catalog::InstallAction):
//!
//! - `Archive` — extract into the target directory
//! - `Installer` — run the downloaded binary with silent-install flags
//! - `Patch` — extract, then patch a config file inside the result
//!
//! Scheduling, download, and verification never vary per component kind.
//! Process spawning goes through the [`CommandRunner`] boundary so the
//! behaviors stay testable and a cancelled run can kill a live installer.

mod command;
mod error;
mod extract;
mod patch;

pub use command::{CommandOutput, CommandRunner, ProcessRunner};
pub use error::HookError;
pub use extract::{extract_archive, promote_extracted, staging_dir};
pub use patch::apply_patch;

use std::path::Path;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::catalog::{ComponentDescriptor, InstallAction};

/// Run the install hook for a verified artifact.
///
/// On failure, partially-installed files are left in place for diagnosis;
/// rollback is not attempted here.
pub async fn run_hook(
    descriptor: &ComponentDescriptor,
    artifact: &Path,
    install_root: &Path,
    runner: &dyn CommandRunner,
    cancel: &CancellationToken,
) -> Result<(), HookError> {
    if cancel.is_cancelled() {
        return Err(HookError::Cancelled);
    }

    let install_dir = install_root.join(&descriptor.target_dir);
    debug!(
        id = %descriptor.id,
        action = %descriptor.action,
        install_dir = %install_dir.display(),
        "running install hook"
    );

    match descriptor.action {
        InstallAction::Archive => {
            install_from_archive(descriptor, artifact, &install_dir, runner, cancel).await?;
        }
        InstallAction::Installer => {
            run_installer_binary(descriptor, artifact, runner, cancel).await?;
        }
        InstallAction::Patch => {
            install_from_archive(descriptor, artifact, &install_dir, runner, cancel).await?;
            if let Some(patch) = &descriptor.patch {
                let applied = apply_patch(&install_dir, patch)?;
                debug!(id = %descriptor.id, applied, "config patch applied");
            }
        }
    }

    info!(id = %descriptor.id, "install hook complete");
    Ok(())
}

async fn install_from_archive(
    descriptor: &ComponentDescriptor,
    artifact: &Path,
    install_dir: &Path,
    runner: &dyn CommandRunner,
    cancel: &CancellationToken,
) -> Result<(), HookError> {
    let staging = staging_dir(artifact, &descriptor.id);
    let extracted = extract_archive(artifact, &staging, runner, cancel).await?;
    debug!(id = %descriptor.id, files = extracted, "archive extracted");

    // Replace any previous installation of this component
    if install_dir.exists() {
        std::fs::remove_dir_all(install_dir).map_err(|e| HookError::Write {
            path: install_dir.to_path_buf(),
            source: e,
        })?;
    }

    promote_extracted(&staging, install_dir)?;
    std::fs::remove_dir_all(&staging).ok();
    Ok(())
}

async fn run_installer_binary(
    descriptor: &ComponentDescriptor,
    artifact: &Path,
    runner: &dyn CommandRunner,
    cancel: &CancellationToken,
) -> Result<(), HookError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o755);
        std::fs::set_permissions(artifact, perms).map_err(|e| HookError::Write {
            path: artifact.to_path_buf(),
            source: e,
        })?;
    }

    let program = artifact.to_string_lossy().to_string();
    let output = runner
        .run(&program, &descriptor.install_args, None, cancel)
        .await?;

    if !output.success {
        return Err(HookError::CommandFailed {
            program,
            code: output.code,
            stderr: output.stderr,
        });
    }

    Ok(())
}
