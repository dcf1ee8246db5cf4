//! The per-component installable item.
//!
//! An [`InstallableItem`] pairs a resolved descriptor with its lifecycle
//! state, last error, and an observable [`ProgressState`]. Items are owned
//! exclusively by the registry; state changes happen only through the
//! item's own driving task (relayed via the registry's event bus), never
//! through external mutation.

mod error;
mod progress;
mod state;

pub use error::ItemError;
pub use progress::{aggregate_progress, ProgressState};
pub use state::{LifecycleState, Outcome};

use std::path::PathBuf;

use tokio::sync::watch;
use tracing::debug;

use crate::catalog::ComponentDescriptor;

/// One component in the catalog with its own download/verify/install
/// lifecycle.
#[derive(Debug)]
pub struct InstallableItem {
    descriptor: ComponentDescriptor,
    state: LifecycleState,
    downloaded_path: Option<PathBuf>,
    last_error: Option<String>,
    skip_requested: bool,
    progress_tx: watch::Sender<ProgressState>,
}

impl InstallableItem {
    /// Create a new item in the `Pending` state.
    pub fn new(descriptor: ComponentDescriptor) -> Self {
        let (progress_tx, _) = watch::channel(ProgressState::pending());
        Self {
            descriptor,
            state: LifecycleState::Pending,
            downloaded_path: None,
            last_error: None,
            skip_requested: false,
            progress_tx,
        }
    }

    /// The item's resolved descriptor.
    pub fn descriptor(&self) -> &ComponentDescriptor {
        &self.descriptor
    }

    /// The item's id (the catalog key).
    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// The error recorded on the most recent failure, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Where the verified artifact was downloaded, once known.
    pub fn downloaded_path(&self) -> Option<&PathBuf> {
        self.downloaded_path.as_ref()
    }

    /// Whether the user opted this item out before the run.
    pub fn skip_requested(&self) -> bool {
        self.skip_requested
    }

    /// Request that this item be skipped instead of installed.
    ///
    /// Only honored while the item is still `Pending`.
    pub fn request_skip(&mut self) {
        self.skip_requested = true;
    }

    /// Subscribe to this item's progress updates.
    pub fn subscribe_progress(&self) -> watch::Receiver<ProgressState> {
        self.progress_tx.subscribe()
    }

    /// Snapshot of the item's current progress.
    pub fn progress(&self) -> ProgressState {
        self.progress_tx.borrow().clone()
    }

    /// Sender half of the progress channel, handed to the driving task.
    pub(crate) fn progress_sender(&self) -> watch::Sender<ProgressState> {
        self.progress_tx.clone()
    }

    /// Apply a state transition.
    ///
    /// Illegal transitions are a scheduler bug; they are logged and
    /// ignored rather than corrupting the machine.
    pub(crate) fn set_state(&mut self, next: LifecycleState) {
        if !self.state.can_transition(next) {
            debug_assert!(false, "illegal transition {:?} -> {:?}", self.state, next);
            tracing::error!(
                id = %self.descriptor.id,
                from = %self.state,
                to = %next,
                "ignoring illegal state transition"
            );
            return;
        }
        debug!(id = %self.descriptor.id, from = %self.state, to = %next, "state transition");
        self.state = next;
    }

    /// Record the error that drove a failure transition.
    pub(crate) fn record_error(&mut self, error: String) {
        self.last_error = Some(error);
    }

    /// Record where the artifact landed.
    pub(crate) fn record_downloaded_path(&mut self, path: PathBuf) {
        self.downloaded_path = Some(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InstallAction;

    fn descriptor(id: &str) -> ComponentDescriptor {
        ComponentDescriptor {
            id: id.to_string(),
            display_name: id.to_string(),
            description: String::new(),
            url: format!("https://example.com/{}.tar.gz", id),
            filename: format!("{}.tar.gz", id),
            digest: None,
            version: "1.0".to_string(),
            revision: None,
            action: InstallAction::Archive,
            target_dir: id.to_string(),
            dependencies: Vec::new(),
            mandatory: true,
            install_args: Vec::new(),
            patch: None,
        }
    }

    #[test]
    fn test_new_item_is_pending() {
        let item = InstallableItem::new(descriptor("jdk"));
        assert_eq!(item.state(), LifecycleState::Pending);
        assert!(item.last_error().is_none());
        assert!(!item.skip_requested());
    }

    #[test]
    fn test_legal_transition_applies() {
        let mut item = InstallableItem::new(descriptor("jdk"));
        item.set_state(LifecycleState::Downloading);
        assert_eq!(item.state(), LifecycleState::Downloading);
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn test_illegal_transition_is_ignored() {
        let mut item = InstallableItem::new(descriptor("jdk"));
        item.set_state(LifecycleState::Installed); // Pending -> Installed is illegal
        assert_eq!(item.state(), LifecycleState::Pending);
    }

    #[test]
    fn test_progress_subscription_sees_updates() {
        let item = InstallableItem::new(descriptor("jdk"));
        let rx = item.subscribe_progress();
        assert_eq!(rx.borrow().status, "Pending");

        item.progress_sender()
            .send_replace(ProgressState::phase(LifecycleState::Downloading).at_percent(40));
        assert_eq!(rx.borrow().status, "Downloading");
        assert_eq!(rx.borrow().percent, 40);
    }

    #[test]
    fn test_request_skip() {
        let mut item = InstallableItem::new(descriptor("docs"));
        item.request_skip();
        assert!(item.skip_requested());
    }
}
