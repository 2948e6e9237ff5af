//! # Sync
//!
//! Observes the remote certificate and converges its mutable fields onto
//! the spec.

use crate::controller::reconciler::diff::{diff, Mutation};
use crate::controller::reconciler::state::StateEvent;
use crate::controller::reconciler::types::{PassOutcome, Reconciler, ReconcilerError};
use crate::crd::Certificate;
use crate::provider::RemoteSnapshot;
use tracing::{debug, info, warn};

/// Describe `arn` together with its tags
///
/// `Ok(None)` when either call reports the certificate missing.
pub async fn observe(
    ctx: &Reconciler,
    arn: &str,
) -> Result<Option<RemoteSnapshot>, ReconcilerError> {
    let Some(mut snapshot) = ctx.provider.describe(arn).await? else {
        return Ok(None);
    };
    let Some(tags) = ctx.provider.list_tags(arn).await? else {
        return Ok(None);
    };
    snapshot.tags = tags;
    Ok(Some(snapshot))
}

/// Observe the certificate, apply any diff, and record what was seen
pub async fn sync_certificate(
    certificate: &Certificate,
    ctx: &Reconciler,
    mut outcome: PassOutcome,
    arn: &str,
) -> PassOutcome {
    let name = certificate.metadata.name.as_deref().unwrap_or("unknown");

    let snapshot = match observe(ctx, arn).await {
        Ok(Some(snapshot)) => snapshot,
        Ok(None) => {
            warn!("Certificate {} for {} no longer exists in ACM", arn, name);
            outcome.state = outcome.state.next(&StateEvent::RemoteMissing);
            outcome.remote_missing = true;
            return outcome;
        }
        Err(e) => return outcome.failed(e),
    };

    let plan = match diff(&certificate.spec, &snapshot) {
        Ok(plan) => plan,
        Err(e) => {
            outcome.snapshot = Some(snapshot);
            return outcome.failed(e);
        }
    };

    if plan.is_empty() {
        debug!("Certificate {} is in sync with ACM ({})", name, snapshot.status.as_str());
        outcome.state = outcome.state.next(&StateEvent::Observed(snapshot.status.clone()));
        outcome.snapshot = Some(snapshot);
        outcome.plan = Some(plan);
        return outcome;
    }

    // ResourceSynced is not cleared while the update is in flight
    outcome.state = outcome.state.next(&StateEvent::DiffDetected);
    info!(
        "✏️  Updating certificate {} ({} mutation(s), state {})",
        name,
        plan.mutations.len(),
        outcome.state.as_str()
    );

    for mutation in &plan.mutations {
        let result = match mutation {
            Mutation::UpdateOptions {
                transparency_logging,
            } => ctx.provider.update_options(arn, transparency_logging).await,
            Mutation::UpdateTags(delta) => ctx.provider.update_tags(arn, delta).await,
        };
        if let Err(e) = result {
            warn!("Failed to update {} on {}: {}", mutation.field(), arn, e);
            outcome.snapshot = Some(snapshot);
            outcome.plan = Some(plan);
            return outcome.failed(e.into());
        }
    }

    // Re-read after the round trips instead of trusting the pre-update snapshot
    let refreshed = match observe(ctx, arn).await {
        Ok(Some(refreshed)) => refreshed,
        Ok(None) => {
            outcome.state = outcome.state.next(&StateEvent::RemoteMissing);
            outcome.remote_missing = true;
            outcome.plan = Some(plan);
            return outcome;
        }
        Err(e) => {
            outcome.snapshot = Some(snapshot);
            outcome.plan = Some(plan);
            outcome.updated = true;
            return outcome.failed(e);
        }
    };

    outcome.state = outcome.state.next(&StateEvent::Observed(refreshed.status.clone()));
    outcome.snapshot = Some(refreshed);
    outcome.plan = Some(plan);
    outcome.updated = true;
    outcome
}
