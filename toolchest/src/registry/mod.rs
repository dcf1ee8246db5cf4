//! The install registry and dependency-ordered scheduler.
//!
//! The registry owns every [`InstallableItem`] and the dependency edges
//! between them, and drives the run to completion:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       InstallRegistry                        │
//! │                                                              │
//! │  start eligible items ──► drive_item task (one per item)     │
//! │        ▲                        │                            │
//! │        │                        ▼                            │
//! │  re-evaluate Pending ◄── completion event bus (mpsc)         │
//! │        │                                                     │
//! │        └── propagate upstream failures to dependents         │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! An item leaves `Pending` exactly when every declared dependency is
//! terminal with an unblocking outcome (`Installed` or `Skipped`). A
//! failed dependency fails its dependents transitively without starting
//! them. Eligibility is re-evaluated only on completion events; there is
//! no polling. A semaphore bounds how many items download simultaneously;
//! items over the limit stay `Pending` until a slot frees.

mod driver;
mod events;

pub use events::InstallEvent;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use indexmap::IndexMap;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::catalog::ComponentDescriptor;
use crate::config::InstallerConfig;
use crate::download::{Downloader, Fetcher, HttpFetcher};
use crate::hooks::{CommandRunner, ProcessRunner};
use crate::item::{
    aggregate_progress, InstallableItem, LifecycleState, Outcome, ProgressState,
};

use driver::{drive_item, DriveContext};
use events::ItemMessage;

/// Overall state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Items are still in flight.
    Running,
    /// Every non-skipped, non-failed item is installed.
    AllInstalled,
    /// At least one mandatory item failed.
    Failed,
    /// The run was cancelled.
    Cancelled,
}

/// Final accounting of a run, in catalog order.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub state: RunState,
    pub installed: Vec<String>,
    pub skipped: Vec<String>,
    /// Failed ids with the recorded reason.
    pub failed: Vec<(String, String)>,
    pub cancelled: Vec<String>,
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.state {
            RunState::AllInstalled => {
                write!(f, "installed: {}", self.installed.join(", "))?;
                if !self.skipped.is_empty() {
                    write!(f, " (skipped: {})", self.skipped.join(", "))?;
                }
                Ok(())
            }
            RunState::Failed | RunState::Running => {
                let reasons: Vec<String> = self
                    .failed
                    .iter()
                    .map(|(id, reason)| format!("{} ({})", id, reason))
                    .collect();
                write!(f, "failed: {}", reasons.join(", "))
            }
            RunState::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Owns the full set of installable items and schedules them in
/// dependency order.
pub struct InstallRegistry {
    items: IndexMap<String, InstallableItem>,
    /// Transpose of the dependency relation: id → items depending on it.
    dependents: HashMap<String, Vec<String>>,
    config: InstallerConfig,
    downloader: Arc<Downloader>,
    runner: Arc<dyn CommandRunner>,
    events_tx: Option<mpsc::UnboundedSender<InstallEvent>>,
}

impl InstallRegistry {
    /// Build a registry with the production downloader and process runner.
    pub fn new(descriptors: Vec<ComponentDescriptor>, config: InstallerConfig) -> Self {
        let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::with_inactivity_timeout(
            config.inactivity_timeout,
        ));
        let runner: Arc<dyn CommandRunner> = Arc::new(ProcessRunner::new());
        Self::with_collaborators(descriptors, config, fetcher, runner)
    }

    /// Build a registry with explicit collaborators.
    ///
    /// Tests inject scripted fetchers and runners here.
    pub fn with_collaborators(
        descriptors: Vec<ComponentDescriptor>,
        config: InstallerConfig,
        fetcher: Arc<dyn Fetcher>,
        runner: Arc<dyn CommandRunner>,
    ) -> Self {
        let downloader = Arc::new(Downloader::new(fetcher, config.retry_policy.clone()));

        let mut dependents: HashMap<String, Vec<String>> = HashMap::new();
        for descriptor in &descriptors {
            for dependency in &descriptor.dependencies {
                dependents
                    .entry(dependency.clone())
                    .or_default()
                    .push(descriptor.id.clone());
            }
        }

        let items: IndexMap<String, InstallableItem> = descriptors
            .into_iter()
            .map(|d| (d.id.clone(), InstallableItem::new(d)))
            .collect();

        Self {
            items,
            dependents,
            config,
            downloader,
            runner,
            events_tx: None,
        }
    }

    /// Subscribe to the observer event stream.
    ///
    /// Must be called before [`run`](Self::run); events emitted with no
    /// subscriber are dropped.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<InstallEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.events_tx = Some(tx);
        rx
    }

    /// Request that an item be skipped (user opt-out).
    ///
    /// Returns false if the id is unknown.
    pub fn request_skip(&mut self, id: &str) -> bool {
        match self.items.get_mut(id) {
            Some(item) => {
                item.request_skip();
                true
            }
            None => false,
        }
    }

    /// Look up an item by id.
    pub fn item(&self, id: &str) -> Option<&InstallableItem> {
        self.items.get(id)
    }

    /// All items in catalog order.
    pub fn items(&self) -> impl Iterator<Item = &InstallableItem> {
        self.items.values()
    }

    /// Current overall state.
    pub fn run_state(&self) -> RunState {
        if self.all_terminal() {
            self.summarize(false).state
        } else {
            RunState::Running
        }
    }

    /// Aggregate progress: the arithmetic mean of per-item percentages.
    pub fn aggregate(&self) -> f64 {
        let percents: Vec<u8> = self.items.values().map(|i| i.progress().percent).collect();
        aggregate_progress(&percents)
    }

    /// Run every item to a terminal state.
    ///
    /// Cancelling the token aborts in-flight downloads and installers;
    /// items that had not started transition directly to `Cancelled`.
    /// The loop stays live through individual failures so independent
    /// branches of the dependency graph still complete.
    pub async fn run(mut self, cancel: CancellationToken) -> RunSummary {
        let (bus_tx, mut bus_rx) = mpsc::unbounded_channel();
        let permits = Arc::new(Semaphore::new(self.config.max_concurrent_downloads.max(1)));
        let ctx = Arc::new(DriveContext {
            downloader: Arc::clone(&self.downloader),
            runner: Arc::clone(&self.runner),
            install_root: self.config.install_root.clone(),
            temp_dir: self.config.temp_dir.clone(),
        });

        info!(
            items = self.items.len(),
            max_concurrent_downloads = self.config.max_concurrent_downloads,
            "starting install run"
        );

        let mut spawned: HashSet<String> = HashSet::new();
        let mut cancel_handled = false;

        self.apply_skips();
        self.start_eligible(&ctx, &permits, &cancel, &bus_tx, &mut spawned);

        while !self.all_terminal() {
            tokio::select! {
                biased;

                _ = cancel.cancelled(), if !cancel_handled => {
                    cancel_handled = true;
                    info!("run cancelled, winding down");
                    self.cancel_unstarted(&spawned);
                }

                message = bus_rx.recv() => {
                    let Some(message) = message else { break };
                    self.handle_message(message, &ctx, &permits, &cancel, &bus_tx, &mut spawned);
                }
            }
        }

        let summary = self.summarize(cancel_handled);
        info!(state = ?summary.state, "install run finished");
        summary
    }

    fn handle_message(
        &mut self,
        message: ItemMessage,
        ctx: &Arc<DriveContext>,
        permits: &Arc<Semaphore>,
        cancel: &CancellationToken,
        bus_tx: &mpsc::UnboundedSender<ItemMessage>,
        spawned: &mut HashSet<String>,
    ) {
        match message {
            ItemMessage::Phase { id, state } => {
                if let Some(item) = self.items.get_mut(&id) {
                    item.set_state(state);
                }
                self.emit(InstallEvent::Progress {
                    id,
                    status: state.label().to_string(),
                    percent: 0,
                });
            }
            ItemMessage::Progress { id, percent } => {
                let status = self
                    .items
                    .get(&id)
                    .map(|i| i.state().label().to_string())
                    .unwrap_or_default();
                self.emit(InstallEvent::Progress {
                    id,
                    status,
                    percent,
                });
            }
            ItemMessage::Done {
                id,
                outcome,
                error,
                artifact,
            } => {
                let error_text = error.as_ref().map(|e| e.to_string());
                if let Some(item) = self.items.get_mut(&id) {
                    item.set_state(outcome.terminal_state());
                    if let Some(text) = &error_text {
                        item.record_error(text.clone());
                    }
                    if let Some(artifact) = artifact {
                        item.record_downloaded_path(artifact);
                    }
                }
                self.emit(InstallEvent::Completed {
                    id: id.clone(),
                    outcome,
                    error: error_text,
                });

                match outcome {
                    Outcome::Failed => self.fail_dependents_of(&id),
                    Outcome::Installed | Outcome::Skipped => {
                        self.start_eligible(ctx, permits, cancel, bus_tx, spawned);
                    }
                    // Unstarted dependents were already cancelled when the
                    // token fired
                    Outcome::Cancelled => {}
                }
            }
        }
    }

    /// Mark user-opted-out items `Skipped` before anything starts.
    fn apply_skips(&mut self) {
        let skip_ids: Vec<String> = self
            .items
            .values()
            .filter(|i| i.skip_requested())
            .map(|i| i.id().to_string())
            .collect();

        for id in skip_ids {
            debug!(id = %id, "skipping item on request");
            self.finish_registry_side(&id, Outcome::Skipped, None);
        }
    }

    /// Start every Pending item whose dependencies are all terminal with
    /// an unblocking outcome.
    fn start_eligible(
        &mut self,
        ctx: &Arc<DriveContext>,
        permits: &Arc<Semaphore>,
        cancel: &CancellationToken,
        bus_tx: &mpsc::UnboundedSender<ItemMessage>,
        spawned: &mut HashSet<String>,
    ) {
        let ready: Vec<String> = self
            .items
            .values()
            .filter(|item| !spawned.contains(item.id()) && self.is_eligible(item))
            .map(|item| item.id().to_string())
            .collect();

        for id in ready {
            if cancel.is_cancelled() {
                self.finish_registry_side(&id, Outcome::Cancelled, None);
                continue;
            }

            let item = &self.items[&id];
            debug!(id = %id, "item eligible, starting");
            spawned.insert(id.clone());
            tokio::spawn(drive_item(
                item.descriptor().clone(),
                Arc::clone(ctx),
                Arc::clone(permits),
                cancel.child_token(),
                bus_tx.clone(),
                item.progress_sender(),
            ));
        }
    }

    fn is_eligible(&self, item: &InstallableItem) -> bool {
        if item.state() != LifecycleState::Pending || item.skip_requested() {
            return false;
        }

        item.descriptor().dependencies.iter().all(|dependency| {
            self.items
                .get(dependency)
                .and_then(|dep| dep.state().outcome())
                .map(|outcome| outcome.unblocks_dependents())
                .unwrap_or(false)
        })
    }

    /// Fail every Pending dependent of a failed item, transitively.
    fn fail_dependents_of(&mut self, failed_id: &str) {
        let mut queue = vec![failed_id.to_string()];

        while let Some(upstream) = queue.pop() {
            let dependent_ids = self
                .dependents
                .get(&upstream)
                .cloned()
                .unwrap_or_default();

            for id in dependent_ids {
                let is_pending = self
                    .items
                    .get(&id)
                    .map(|i| i.state() == LifecycleState::Pending)
                    .unwrap_or(false);
                if !is_pending {
                    continue;
                }

                warn!(id = %id, upstream = %upstream, "failing item: upstream dependency failed");
                self.finish_registry_side(
                    &id,
                    Outcome::Failed,
                    Some(format!("upstream dependency failed: {}", upstream)),
                );
                queue.push(id);
            }
        }
    }

    /// Cancel every Pending item that has no driving task.
    fn cancel_unstarted(&mut self, spawned: &HashSet<String>) {
        let pending: Vec<String> = self
            .items
            .values()
            .filter(|i| i.state() == LifecycleState::Pending && !spawned.contains(i.id()))
            .map(|i| i.id().to_string())
            .collect();

        for id in pending {
            self.finish_registry_side(&id, Outcome::Cancelled, None);
        }
    }

    /// Terminate an item from the registry side (skip, upstream failure,
    /// cancellation before start). The state is set before the completion
    /// event is emitted.
    fn finish_registry_side(&mut self, id: &str, outcome: Outcome, error: Option<String>) {
        if let Some(item) = self.items.get_mut(id) {
            item.set_state(outcome.terminal_state());
            if let Some(text) = &error {
                item.record_error(text.clone());
            }
            let percent = item.progress().percent;
            item.progress_sender()
                .send_replace(ProgressState::terminal(outcome.terminal_state(), percent));
        }

        self.emit(InstallEvent::Completed {
            id: id.to_string(),
            outcome,
            error,
        });
    }

    fn emit(&self, event: InstallEvent) {
        if let Some(tx) = &self.events_tx {
            let _ = tx.send(event);
        }
    }

    fn all_terminal(&self) -> bool {
        self.items.values().all(|i| i.state().is_terminal())
    }

    fn summarize(&self, cancelled: bool) -> RunSummary {
        let mut installed = Vec::new();
        let mut skipped = Vec::new();
        let mut failed = Vec::new();
        let mut cancelled_ids = Vec::new();
        let mut mandatory_failure = false;

        for item in self.items.values() {
            match item.state() {
                LifecycleState::Installed => installed.push(item.id().to_string()),
                LifecycleState::Skipped => skipped.push(item.id().to_string()),
                LifecycleState::Failed => {
                    if item.descriptor().mandatory {
                        mandatory_failure = true;
                    }
                    failed.push((
                        item.id().to_string(),
                        item.last_error().unwrap_or("unknown error").to_string(),
                    ));
                }
                LifecycleState::Cancelled => cancelled_ids.push(item.id().to_string()),
                _ => {}
            }
        }

        let state = if cancelled {
            RunState::Cancelled
        } else if mandatory_failure {
            RunState::Failed
        } else {
            RunState::AllInstalled
        };

        RunSummary {
            state,
            installed,
            skipped,
            failed,
            cancelled: cancelled_ids,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
