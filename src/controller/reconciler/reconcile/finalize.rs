//! # Reconciliation Finalization
//!
//! Turns a pass outcome into a status write, metrics, and the next action.

use super::REQUEUE_SLACK;
use crate::controller::reconciler::requeue::{next_requeue, Requeue};
use crate::controller::reconciler::state::ReconcileState;
use crate::controller::reconciler::status::build_status;
use crate::controller::reconciler::types::{PassOutcome, Reconciler, ReconcilerError};
use crate::crd::{Certificate, CertificateStatus};
use crate::observability;
use crate::store::StoreError;
use chrono::{DateTime, Utc};
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Finalize reconciliation: update status, metrics, and determine next action
///
/// Errors already surfaced as conditions are not returned; the pass schedules
/// its own retry. Only a failed status write is returned to the error policy.
pub async fn finalize_pass(
    certificate: &Certificate,
    ctx: &Arc<Reconciler>,
    resource_key: &str,
    outcome: PassOutcome,
    start: Instant,
) -> Result<Action, ReconcilerError> {
    let previous = certificate.status.as_ref();
    let error = outcome.error.as_ref();

    if let Some(e) = error {
        observability::metrics::increment_reconciliation_errors(e.kind());
        if outcome.state == ReconcileState::TerminallyFailed {
            observability::metrics::increment_terminal_failures();
            error!("⛔ Certificate {} is terminally failed: {}", resource_key, e);
        } else {
            warn!("Reconciliation of {} failed ({}): {}", resource_key, e.kind(), e);
        }
    }

    let retriable = match error {
        Some(ReconcilerError::Transient(_) | ReconcilerError::Store(_)) => true,
        // Deletion keeps retrying until the certificate is confirmed gone
        Some(ReconcilerError::Conflict(_)) | None => false,
        Some(_) => outcome.state == ReconcileState::Deleting,
    };
    let requeue = ctx.with_backoff(resource_key, |backoff| {
        if retriable {
            backoff.increment_error();
        }
        next_requeue(outcome.state, error, &ctx.config, &mut backoff.backoff)
    });
    if !retriable && ctx.reset_backoff(resource_key) {
        info!("🔄 Backoff reset for {}", resource_key);
    }

    let now = Utc::now();
    let status = build_status(
        previous,
        certificate.metadata.generation,
        &outcome,
        requeue.delay(),
        now,
    );

    let unchanged = previous.is_some_and(|p| p.same_observation(&status));
    if unchanged && !schedule_lapsed(previous, requeue.delay(), now) {
        debug!("Status of {} unchanged, skipping write", resource_key);
    } else {
        match ctx.store.update_status(certificate, &status).await {
            Ok(_) => debug!("Updated status of {} (phase {})", resource_key, outcome.state.as_str()),
            Err(e @ StoreError::Conflict { .. }) => {
                observability::metrics::increment_status_conflicts();
                warn!("Discarding pass for {}: {}", resource_key, e);
                return Err(e.into());
            }
            Err(e) => {
                error!("Failed to update status of {}: {}", resource_key, e);
                return Err(e.into());
            }
        }
    }

    ctx.track_remote_status(resource_key, status.status.as_deref());
    observability::metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());

    match requeue {
        Requeue::Never => {
            debug!("No further reconciliation scheduled for {}", resource_key);
        }
        Requeue::Immediate | Requeue::After(_) => {
            observability::metrics::increment_requeues(requeue.trigger(error));
            info!(
                "✅ Reconciled {} (phase {}, next in {}s, {:.2}s elapsed)",
                resource_key,
                outcome.state.as_str(),
                requeue.delay().unwrap_or_default().as_secs(),
                start.elapsed().as_secs_f64()
            );
        }
    }

    Ok(requeue.into_action())
}

/// True when the stored `nextReconcileTime` is already due but the new one is not
///
/// Skipping the write in that case would leave a past timestamp behind, and
/// every later watch event would run a full pass instead of being skipped.
fn schedule_lapsed(
    previous: Option<&CertificateStatus>,
    next_delay: Option<Duration>,
    now: DateTime<Utc>,
) -> bool {
    let stored_due = previous
        .and_then(|p| p.next_reconcile_time.as_deref())
        .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        .is_some_and(|t| match (t.with_timezone(&Utc) - now).to_std() {
            Ok(remaining) => remaining <= REQUEUE_SLACK,
            Err(_) => true,
        });
    stored_due && !matches!(next_delay, Some(delay) if delay <= REQUEUE_SLACK)
}
