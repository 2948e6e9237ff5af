//! # Reconciliation State Machine
//!
//! Explicit states a `Certificate` moves through and the events that move it.
//! The current state is persisted in `status.phase` and parsed back at the
//! start of every pass.
//!
//! ```text
//! Unmanaged -> Creating -> Syncing -> Synced <-> Updating
//!                             |          |
//!                             v          v
//!                           Failed <-> Updating
//!
//! any (except Deleted) -> Deleting -> Deleted
//! any (except Deleting/Deleted) -> TerminallyFailed -> Deleting
//! ```

use crate::provider::RemoteStatus;

/// Reconciliation state of a managed certificate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReconcileState {
    /// No remote certificate yet
    Unmanaged,
    /// A create (request or import) call is in flight
    Creating,
    /// Waiting for the remote certificate to settle
    Syncing,
    /// Remote certificate is issued and matches the spec
    Synced,
    /// Applying a diff to the remote certificate
    Updating,
    /// Remote delete issued, waiting to observe absence
    Deleting,
    /// Remote certificate confirmed absent after a delete request
    Deleted,
    /// Remote certificate reached a permanent failure status, or vanished
    Failed,
    /// Non-retriable failure; only a delete request moves it further
    TerminallyFailed,
}

impl ReconcileState {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileState::Unmanaged => "Unmanaged",
            ReconcileState::Creating => "Creating",
            ReconcileState::Syncing => "Syncing",
            ReconcileState::Synced => "Synced",
            ReconcileState::Updating => "Updating",
            ReconcileState::Deleting => "Deleting",
            ReconcileState::Deleted => "Deleted",
            ReconcileState::Failed => "Failed",
            ReconcileState::TerminallyFailed => "TerminallyFailed",
        }
    }

    /// Parse a persisted phase; a missing or unknown phase is `Unmanaged`
    #[must_use]
    pub fn parse(phase: Option<&str>) -> Self {
        match phase {
            Some("Creating") => ReconcileState::Creating,
            Some("Syncing") => ReconcileState::Syncing,
            Some("Synced") => ReconcileState::Synced,
            Some("Updating") => ReconcileState::Updating,
            Some("Deleting") => ReconcileState::Deleting,
            Some("Deleted") => ReconcileState::Deleted,
            Some("Failed") => ReconcileState::Failed,
            Some("TerminallyFailed") => ReconcileState::TerminallyFailed,
            _ => ReconcileState::Unmanaged,
        }
    }

    /// Absorbing states accept no further events except a delete request
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReconcileState::Deleted | ReconcileState::TerminallyFailed
        )
    }

    /// State a snapshot with the given remote status settles into
    #[must_use]
    pub fn settled_for(status: &RemoteStatus) -> Self {
        if status.is_success() {
            ReconcileState::Synced
        } else if status.is_permanent_failure() {
            ReconcileState::Failed
        } else {
            ReconcileState::Syncing
        }
    }

    /// Apply an event and return the next state
    ///
    /// Events that are not valid in the current state leave it unchanged.
    #[must_use]
    pub fn next(self, event: &StateEvent) -> Self {
        use ReconcileState as S;

        match (self, event) {
            (S::Deleted, _) => S::Deleted,
            (_, StateEvent::DeleteRequested) => S::Deleting,
            (S::Deleting, StateEvent::ConfirmedAbsent) => S::Deleted,
            (S::Deleting | S::TerminallyFailed, _) => self,
            (_, StateEvent::TerminalFailure) => S::TerminallyFailed,
            (S::Unmanaged, StateEvent::Create) => S::Creating,
            (S::Creating, StateEvent::Created) => S::Syncing,
            (
                S::Unmanaged | S::Creating | S::Syncing | S::Synced | S::Updating | S::Failed,
                StateEvent::Observed(status),
            ) => S::settled_for(status),
            (S::Syncing | S::Synced | S::Updating | S::Failed, StateEvent::RemoteMissing) => {
                S::Failed
            }
            (S::Syncing | S::Synced | S::Failed, StateEvent::DiffDetected) => S::Updating,
            _ => self,
        }
    }
}

/// Inputs to the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateEvent {
    /// No remote id is recorded and the spec is valid
    Create,
    /// The create call returned an id
    Created,
    /// A describe returned the remote certificate
    Observed(RemoteStatus),
    /// A describe found nothing for a recorded id
    RemoteMissing,
    /// The differ produced a non-empty plan
    DiffDetected,
    /// The resource is marked for deletion
    DeleteRequested,
    /// A describe after delete found nothing
    ConfirmedAbsent,
    /// A non-retriable failure was detected
    TerminalFailure,
}
