//! The per-item driving task.
//!
//! One task per item walks the phases: acquire a download slot, download,
//! verify, install. The task is the item's single writer; it reports every
//! transition over the bus and publishes progress on the item's watch
//! channel. The registry mirrors the reported states onto the owned item.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, watch, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::catalog::{ComponentDescriptor, Digest};
use crate::checksum::{self, ChecksumError};
use crate::download::{Downloader, FetchProgress};
use crate::hooks::{self, CommandRunner};
use crate::item::{ItemError, LifecycleState, Outcome, ProgressState};

use super::events::ItemMessage;

/// Shared collaborators every driving task needs.
pub(crate) struct DriveContext {
    pub downloader: Arc<Downloader>,
    pub runner: Arc<dyn CommandRunner>,
    pub install_root: PathBuf,
    pub temp_dir: PathBuf,
}

/// How the drive ended, before mapping to a terminal outcome.
enum DriveResult {
    Installed { artifact: PathBuf },
    CancelledBeforeStart,
    Failed(ItemError),
}

/// Drive one item from `Pending` to a terminal state.
pub(crate) async fn drive_item(
    descriptor: ComponentDescriptor,
    ctx: Arc<DriveContext>,
    permits: Arc<Semaphore>,
    cancel: CancellationToken,
    bus: mpsc::UnboundedSender<ItemMessage>,
    progress: watch::Sender<ProgressState>,
) {
    let id = descriptor.id.clone();
    let result = run_phases(&descriptor, &ctx, &permits, &cancel, &bus, &progress).await;

    // The watch channel is updated before the completion message is sent,
    // so a dependent reacting to the event never observes a stale state.
    match result {
        DriveResult::Installed { artifact } => {
            progress.send_replace(ProgressState::terminal(LifecycleState::Installed, 100));
            let _ = bus.send(ItemMessage::Done {
                id,
                outcome: Outcome::Installed,
                error: None,
                artifact: Some(artifact),
            });
        }
        DriveResult::CancelledBeforeStart => {
            progress.send_replace(ProgressState::terminal(LifecycleState::Cancelled, 0));
            let _ = bus.send(ItemMessage::Done {
                id,
                outcome: Outcome::Cancelled,
                error: None,
                artifact: None,
            });
        }
        DriveResult::Failed(error) => {
            warn!(id = %id, error = %error, "item failed");
            let percent = progress.borrow().percent;
            progress.send_replace(ProgressState::terminal(LifecycleState::Failed, percent));
            let _ = bus.send(ItemMessage::Done {
                id,
                outcome: Outcome::Failed,
                error: Some(error),
                artifact: None,
            });
        }
    }
}

async fn run_phases(
    descriptor: &ComponentDescriptor,
    ctx: &DriveContext,
    permits: &Semaphore,
    cancel: &CancellationToken,
    bus: &mpsc::UnboundedSender<ItemMessage>,
    progress: &watch::Sender<ProgressState>,
) -> DriveResult {
    let id = &descriptor.id;

    // Wait for a download slot; the item remains Pending until one frees
    let permit = tokio::select! {
        biased;

        _ = cancel.cancelled() => return DriveResult::CancelledBeforeStart,

        permit = permits.acquire() => match permit {
            Ok(p) => p,
            Err(_) => return DriveResult::CancelledBeforeStart,
        },
    };

    // ---- Downloading ----
    enter_phase(id, LifecycleState::Downloading, bus, progress);
    let artifact = ctx.temp_dir.join(&descriptor.filename);

    let already_verified = match &descriptor.digest {
        Some(digest) if artifact.exists() => {
            verify_artifact(&artifact, digest).await.is_ok()
        }
        _ => false,
    };

    if already_verified {
        debug!(id = %id, "artifact already present with matching digest, skipping download");
        report_percent(id, 100, bus, progress);
    } else {
        let reporter = phase_percent_reporter(id.clone(), bus.clone(), progress.clone());
        match ctx
            .downloader
            .fetch(&descriptor.url, &artifact, Some(reporter), cancel)
            .await
        {
            Ok(outcome) => {
                debug!(
                    id = %id,
                    bytes = outcome.bytes,
                    retries = outcome.retries,
                    "download finished"
                );
                report_percent(id, 100, bus, progress);
            }
            Err(e) => {
                drop(permit);
                return DriveResult::Failed(e.into());
            }
        }
    }

    // The slot bounds simultaneous downloads only; release before the
    // (potentially long) install phase
    drop(permit);

    // ---- Verifying ----
    if let Some(digest) = &descriptor.digest {
        enter_phase(id, LifecycleState::Verifying, bus, progress);

        if let Err(e) = verify_artifact(&artifact, digest).await {
            if matches!(e, ChecksumError::Mismatch { .. }) {
                // A corrupt artifact must not survive to a later run
                std::fs::remove_file(&artifact).ok();
            }
            return DriveResult::Failed(e.into());
        }
        report_percent(id, 100, bus, progress);

        if cancel.is_cancelled() {
            return DriveResult::Failed(ItemError::Cancelled);
        }
    }

    // ---- Installing ----
    enter_phase(id, LifecycleState::Installing, bus, progress);
    match hooks::run_hook(
        descriptor,
        &artifact,
        &ctx.install_root,
        ctx.runner.as_ref(),
        cancel,
    )
    .await
    {
        Ok(()) => DriveResult::Installed { artifact },
        Err(e) => DriveResult::Failed(e.into()),
    }
}

fn enter_phase(
    id: &str,
    state: LifecycleState,
    bus: &mpsc::UnboundedSender<ItemMessage>,
    progress: &watch::Sender<ProgressState>,
) {
    progress.send_replace(ProgressState::phase(state));
    let _ = bus.send(ItemMessage::Phase {
        id: id.to_string(),
        state,
    });
}

fn report_percent(
    id: &str,
    percent: u8,
    bus: &mpsc::UnboundedSender<ItemMessage>,
    progress: &watch::Sender<ProgressState>,
) {
    let current = progress.borrow().clone();
    progress.send_replace(current.at_percent(percent));
    let _ = bus.send(ItemMessage::Progress {
        id: id.to_string(),
        percent,
    });
}

/// Progress callback for the download phase.
///
/// Percent is clamped to be monotonic within the phase: a retried
/// transfer restarts from byte zero, but reported progress never moves
/// backwards. Indeterminate transfers (no content-length) report no
/// percentage until completion.
fn phase_percent_reporter(
    id: String,
    bus: mpsc::UnboundedSender<ItemMessage>,
    progress: watch::Sender<ProgressState>,
) -> FetchProgress {
    let high_water = AtomicU8::new(0);

    Box::new(move |bytes, total| {
        let Some(total) = total.filter(|t| *t > 0) else {
            return;
        };

        let percent = ((bytes.saturating_mul(100)) / total).min(100) as u8;
        let previous = high_water.fetch_max(percent, Ordering::SeqCst);
        if percent <= previous {
            return;
        }

        let current = progress.borrow().clone();
        progress.send_replace(current.at_percent(percent));
        let _ = bus.send(ItemMessage::Progress {
            id: id.clone(),
            percent,
        });
    })
}

async fn verify_artifact(artifact: &std::path::Path, digest: &Digest) -> Result<(), ChecksumError> {
    let path = artifact.to_path_buf();
    let algorithm = digest.algorithm;
    let expected = digest.hex.clone();

    match tokio::task::spawn_blocking(move || checksum::verify_file(&path, algorithm, &expected))
        .await
    {
        Ok(result) => result,
        Err(join_error) => Err(ChecksumError::Read {
            path: artifact.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::Other, join_error.to_string()),
        }),
    }
}
