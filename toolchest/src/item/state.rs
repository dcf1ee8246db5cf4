//! Lifecycle states and terminal outcomes for installable items.
//!
//! The success path is `Pending → Downloading → Verifying → Installing →
//! Installed`. `Skipped` is reachable only from `Pending`; `Failed` from
//! any active phase; `Cancelled` from `Pending` when the run is cancelled
//! before the item starts. Terminal states have no outgoing transitions.

/// Lifecycle state of an installable item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    /// Waiting for dependencies and a download slot.
    Pending,
    /// The downloader is fetching the artifact.
    Downloading,
    /// The artifact digest is being checked.
    Verifying,
    /// The install hook is running.
    Installing,
    /// Terminal: installed successfully.
    Installed,
    /// Terminal: opted out or excluded for this platform.
    Skipped,
    /// Terminal: a phase failed.
    Failed,
    /// Terminal: the run was cancelled before this item started.
    Cancelled,
}

impl LifecycleState {
    /// Returns true if no further transitions can leave this state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Installed | Self::Skipped | Self::Failed | Self::Cancelled
        )
    }

    /// Status label published with progress updates.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Downloading => "Downloading",
            Self::Verifying => "Verifying",
            Self::Installing => "Installing",
            Self::Installed => "Complete",
            Self::Skipped => "Skipped",
            Self::Failed => "Failed",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Whether `next` is a legal transition out of this state.
    pub fn can_transition(self, next: Self) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Pending, Downloading)
                | (Pending, Skipped)
                | (Pending, Failed)
                | (Pending, Cancelled)
                | (Downloading, Verifying)
                // No declared digest: verification is skipped entirely
                | (Downloading, Installing)
                | (Downloading, Failed)
                | (Verifying, Installing)
                | (Verifying, Failed)
                | (Installing, Installed)
                | (Installing, Failed)
        )
    }

    /// The outcome this state represents, if it is terminal.
    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            Self::Installed => Some(Outcome::Installed),
            Self::Skipped => Some(Outcome::Skipped),
            Self::Failed => Some(Outcome::Failed),
            Self::Cancelled => Some(Outcome::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Terminal outcome of an item, carried on completion events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Installed,
    Skipped,
    Failed,
    Cancelled,
}

impl Outcome {
    /// The terminal lifecycle state for this outcome.
    pub fn terminal_state(&self) -> LifecycleState {
        match self {
            Self::Installed => LifecycleState::Installed,
            Self::Skipped => LifecycleState::Skipped,
            Self::Failed => LifecycleState::Failed,
            Self::Cancelled => LifecycleState::Cancelled,
        }
    }

    /// A skipped prerequisite is not a failure: dependents may proceed.
    pub fn unblocks_dependents(&self) -> bool {
        matches!(self, Self::Installed | Self::Skipped)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Installed => write!(f, "installed"),
            Self::Skipped => write!(f, "skipped"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LifecycleState::*;

    #[test]
    fn test_terminal_states() {
        assert!(Installed.is_terminal());
        assert!(Skipped.is_terminal());
        assert!(Failed.is_terminal());
        assert!(Cancelled.is_terminal());
        assert!(!Pending.is_terminal());
        assert!(!Downloading.is_terminal());
        assert!(!Verifying.is_terminal());
        assert!(!Installing.is_terminal());
    }

    #[test]
    fn test_success_path_transitions() {
        assert!(Pending.can_transition(Downloading));
        assert!(Downloading.can_transition(Verifying));
        assert!(Verifying.can_transition(Installing));
        assert!(Installing.can_transition(Installed));
    }

    #[test]
    fn test_no_digest_skips_verification() {
        assert!(Downloading.can_transition(Installing));
    }

    #[test]
    fn test_failure_transitions() {
        assert!(Downloading.can_transition(Failed));
        assert!(Verifying.can_transition(Failed));
        assert!(Installing.can_transition(Failed));
        assert!(Pending.can_transition(Failed)); // upstream dependency failed
    }

    #[test]
    fn test_skip_only_from_pending() {
        assert!(Pending.can_transition(Skipped));
        assert!(!Downloading.can_transition(Skipped));
        assert!(!Installing.can_transition(Skipped));
    }

    #[test]
    fn test_no_transitions_leave_terminal_states() {
        let all = [
            Pending, Downloading, Verifying, Installing, Installed, Skipped, Failed, Cancelled,
        ];
        for terminal in [Installed, Skipped, Failed, Cancelled] {
            for next in all {
                assert!(
                    !terminal.can_transition(next),
                    "{:?} -> {:?} should be illegal",
                    terminal,
                    next
                );
            }
        }
    }

    #[test]
    fn test_no_backward_transitions() {
        assert!(!Verifying.can_transition(Downloading));
        assert!(!Installing.can_transition(Verifying));
        assert!(!Downloading.can_transition(Pending));
    }

    #[test]
    fn test_outcome_mapping() {
        assert_eq!(Installed.outcome(), Some(Outcome::Installed));
        assert_eq!(Failed.outcome(), Some(Outcome::Failed));
        assert_eq!(Pending.outcome(), None);
    }

    #[test]
    fn test_outcome_unblocks_dependents() {
        assert!(Outcome::Installed.unblocks_dependents());
        assert!(Outcome::Skipped.unblocks_dependents());
        assert!(!Outcome::Failed.unblocks_dependents());
        assert!(!Outcome::Cancelled.unblocks_dependents());
    }
}
