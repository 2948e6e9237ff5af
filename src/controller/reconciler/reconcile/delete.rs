//! # Delete
//!
//! Drives a resource marked for deletion to `Deleted`: delete the remote
//! certificate, confirm it is gone with a fresh describe, then release the
//! finalizer so the record can be garbage-collected.

use super::finalize::finalize_pass;
use crate::constants::FINALIZER;
use crate::controller::reconciler::state::{ReconcileState, StateEvent};
use crate::controller::reconciler::types::{PassOutcome, Reconciler, ReconcilerError};
use crate::crd::Certificate;
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

pub async fn reconcile_delete(
    certificate: Arc<Certificate>,
    ctx: &Arc<Reconciler>,
    resource_key: &str,
    start: Instant,
) -> Result<Action, ReconcilerError> {
    if !certificate.finalizers().iter().any(|f| f == FINALIZER) {
        // Not ours to clean up, or already released
        return Ok(Action::await_change());
    }

    let status = certificate.status.as_ref();
    let state = ReconcileState::parse(status.and_then(|s| s.phase.as_deref()))
        .next(&StateEvent::DeleteRequested);
    let arn = status.and_then(|s| s.arn.clone());
    let mut outcome = PassOutcome::new(state, arn.clone());

    if let Some(arn) = arn.as_deref() {
        if let Err(e) = ctx.provider.delete(arn).await {
            warn!("Failed to delete certificate {}: {}", arn, e);
            return finalize_pass(&certificate, ctx, resource_key, outcome.failed(e.into()), start)
                .await;
        }

        // The delete may still be propagating; only a fresh describe decides
        match ctx.provider.describe(arn).await {
            Ok(None) => outcome.state = outcome.state.next(&StateEvent::ConfirmedAbsent),
            Ok(Some(snapshot)) => {
                info!(
                    "⏳ Certificate {} still visible in ACM ({}), waiting for deletion",
                    arn,
                    snapshot.status.as_str()
                );
            }
            Err(e) => {
                return finalize_pass(&certificate, ctx, resource_key, outcome.failed(e.into()), start)
                    .await;
            }
        }
    } else {
        // Never created remotely
        outcome.state = outcome.state.next(&StateEvent::ConfirmedAbsent);
    }

    if outcome.state != ReconcileState::Deleted {
        return finalize_pass(&certificate, ctx, resource_key, outcome, start).await;
    }

    ctx.store.remove_finalizer(&certificate).await?;
    ctx.forget(resource_key);
    info!(
        "🗑️  Certificate {} deleted{}",
        resource_key,
        arn.map(|arn| format!(" (ACM certificate {arn})")).unwrap_or_default()
    );
    crate::observability::metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());
    Ok(Action::await_change())
}
