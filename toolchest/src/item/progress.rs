//! Observable per-item progress and aggregate calculation.

use super::state::LifecycleState;

/// Snapshot of one item's progress, published on a watch channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressState {
    /// Status label ("Downloading", "Verifying", ...).
    pub status: String,
    /// Progress within the current phase (0-100). Monotonic
    /// non-decreasing within a phase; resets on phase transition.
    pub percent: u8,
    /// True once the item has reached a terminal state.
    pub terminal: bool,
}

impl ProgressState {
    /// Initial state for a freshly-created item.
    pub fn pending() -> Self {
        Self {
            status: LifecycleState::Pending.label().to_string(),
            percent: 0,
            terminal: false,
        }
    }

    /// State at the start of an active phase; percent resets to zero.
    pub fn phase(state: LifecycleState) -> Self {
        Self {
            status: state.label().to_string(),
            percent: 0,
            terminal: false,
        }
    }

    /// Terminal state with the given final percentage.
    pub fn terminal(state: LifecycleState, percent: u8) -> Self {
        Self {
            status: state.label().to_string(),
            percent,
            terminal: true,
        }
    }

    /// Same phase, updated percentage.
    pub fn at_percent(&self, percent: u8) -> Self {
        Self {
            status: self.status.clone(),
            percent,
            terminal: self.terminal,
        }
    }
}

/// Aggregate progress across items: the unweighted arithmetic mean of
/// per-item percentages. An empty set aggregates to 100.
pub fn aggregate_progress(percents: &[u8]) -> f64 {
    if percents.is_empty() {
        return 100.0;
    }
    let sum: u64 = percents.iter().map(|p| *p as u64).sum();
    sum as f64 / percents.len() as f64
}
