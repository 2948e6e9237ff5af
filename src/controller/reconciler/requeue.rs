//! # Requeue Scheduler
//!
//! Decides when a resource is reconciled again. The reconciler never sleeps;
//! it hands the directive back to the controller runtime as an `Action`.

use crate::config::ControllerConfig;
use crate::controller::backoff::ExponentialBackoff;
use crate::controller::reconciler::state::ReconcileState;
use crate::controller::reconciler::types::ReconcilerError;
use kube_runtime::controller::Action;
use std::time::Duration;

/// When to reconcile a resource next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requeue {
    /// Retry right away from fresh state
    Immediate,
    /// Retry after the given delay
    After(Duration),
    /// Wait for the resource to change
    Never,
}

impl Requeue {
    #[must_use]
    pub fn into_action(self) -> Action {
        match self {
            Requeue::Immediate => Action::requeue(Duration::ZERO),
            Requeue::After(delay) => Action::requeue(delay),
            Requeue::Never => Action::await_change(),
        }
    }

    /// Delay until the next pass, if one is scheduled
    #[must_use]
    pub fn delay(&self) -> Option<Duration> {
        match self {
            Requeue::Immediate => Some(Duration::ZERO),
            Requeue::After(delay) => Some(*delay),
            Requeue::Never => None,
        }
    }

    /// Metric label for the requeue reason
    #[must_use]
    pub fn trigger(&self, error: Option<&ReconcilerError>) -> &'static str {
        match (self, error) {
            (Requeue::Never, _) => "none",
            (_, Some(ReconcilerError::Conflict(_))) => "conflict",
            (_, Some(_)) => "error-backoff",
            (_, None) => "timer-based",
        }
    }
}

/// Next requeue for a pass that ended in `state` with an optional error
///
/// Transient errors, and any non-conflict error while deleting, advance
/// `backoff`; everything else leaves it untouched.
pub fn next_requeue(
    state: ReconcileState,
    error: Option<&ReconcilerError>,
    config: &ControllerConfig,
    backoff: &mut ExponentialBackoff,
) -> Requeue {
    // The finalizer is held until the delete is confirmed, so every failure retries
    if state == ReconcileState::Deleting {
        return match error {
            Some(ReconcilerError::Conflict(_)) => Requeue::Immediate,
            Some(_) => Requeue::After(backoff.next_backoff()),
            None => Requeue::After(config.deletion_poll_duration()),
        };
    }
    match error {
        Some(ReconcilerError::Transient(_) | ReconcilerError::Store(_)) => {
            Requeue::After(backoff.next_backoff())
        }
        Some(ReconcilerError::Conflict(_)) => Requeue::Immediate,
        // Wait for a spec edit or delete
        Some(ReconcilerError::Validation(_) | ReconcilerError::TerminalDomain(_)) => Requeue::Never,
        None => match state {
            ReconcileState::TerminallyFailed | ReconcileState::Deleted => Requeue::Never,
            _ => Requeue::After(config.requeue_on_success_duration()),
        },
    }
}
