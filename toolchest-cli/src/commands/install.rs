//! `toolchest install` - run the full install pipeline.

use std::path::PathBuf;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use toolchest::registry::InstallEvent;
use toolchest::{InstallerConfig, InstallRegistry, Outcome, RunState};

use crate::error::CliError;

use super::{default_install_root, default_temp_dir, load_descriptors};

/// Options for the install command.
pub struct InstallOptions {
    pub catalog: PathBuf,
    pub install_root: Option<PathBuf>,
    pub temp_dir: Option<PathBuf>,
    pub max_downloads: Option<usize>,
    pub skip: Vec<String>,
    pub platform: Option<String>,
    pub arch: Option<String>,
}

pub async fn run_install(options: InstallOptions) -> Result<(), CliError> {
    let descriptors = load_descriptors(
        &options.catalog,
        options.platform.as_deref(),
        options.arch.as_deref(),
    )?;

    let mut config = InstallerConfig::new(
        options.install_root.unwrap_or_else(default_install_root),
    )
    .with_temp_dir(options.temp_dir.unwrap_or_else(default_temp_dir));
    if let Some(max) = options.max_downloads {
        config = config.with_max_concurrent_downloads(max);
    }

    println!(
        "Installing {} component(s) to {}",
        descriptors.len(),
        config.install_root.display()
    );

    let mut registry = InstallRegistry::new(descriptors, config);
    for id in &options.skip {
        if !registry.request_skip(id) {
            return Err(CliError::Usage(format!("--skip {}: unknown component", id)));
        }
    }

    let events = registry.subscribe();
    let renderer = tokio::spawn(render_events(events));

    // Ctrl-C cancels the whole run; in-flight transfers and installers
    // are aborted
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nInterrupted, cancelling run...");
            signal_cancel.cancel();
        }
    });

    let summary = registry.run(cancel).await;
    renderer.await.ok();

    println!();
    println!("{}", summary);

    match summary.state {
        RunState::AllInstalled => Ok(()),
        _ => Err(CliError::RunFailed),
    }
}

/// Print phase transitions and completions as they happen.
async fn render_events(mut events: tokio::sync::mpsc::UnboundedReceiver<InstallEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            InstallEvent::Progress {
                id,
                status,
                percent,
            } => {
                if percent == 0 {
                    println!("  {:<24} {}", id, status);
                } else {
                    debug!(id = %id, status = %status, percent, "progress");
                }
            }
            InstallEvent::Completed { id, outcome, error } => match outcome {
                Outcome::Installed => println!("  {:<24} installed", id),
                Outcome::Skipped => println!("  {:<24} skipped", id),
                Outcome::Cancelled => println!("  {:<24} cancelled", id),
                Outcome::Failed => {
                    let reason = error.unwrap_or_else(|| "unknown error".to_string());
                    println!("  {:<24} FAILED: {}", id, reason);
                }
            },
        }
    }
}
