//! Typed events for the registry's buses.
//!
//! Two channels exist: the internal bus items use to report to the
//! scheduler, and the external observer stream the presentation layer
//! subscribes to. Both are plain message passing; no transport is
//! assumed.

use std::path::PathBuf;

use crate::item::{ItemError, LifecycleState, Outcome};

/// Observer event emitted by the registry.
///
/// Per item, a sequence of `Progress` events followed by exactly one
/// `Completed` event.
#[derive(Debug, Clone)]
pub enum InstallEvent {
    /// An item's status or percentage changed.
    Progress {
        id: String,
        status: String,
        percent: u8,
    },
    /// An item reached a terminal state.
    Completed {
        id: String,
        outcome: Outcome,
        error: Option<String>,
    },
}

/// Internal message from an item's driving task to the scheduler loop.
#[derive(Debug)]
pub(crate) enum ItemMessage {
    /// The item entered a new active phase.
    Phase { id: String, state: LifecycleState },
    /// Progress within the current phase.
    Progress { id: String, percent: u8 },
    /// The item reached a terminal state.
    Done {
        id: String,
        outcome: Outcome,
        error: Option<ItemError>,
        artifact: Option<PathBuf>,
    },
}
