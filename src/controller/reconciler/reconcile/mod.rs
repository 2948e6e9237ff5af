//! # Reconciliation Logic
//!
//! Main reconciliation pass for `Certificate` resources.
//!
//! A pass classifies its trigger, then either drives deletion or walks the
//! create → observe → update path. Each pass ends in exactly one status
//! write (skipped when nothing changed) and one requeue directive.

mod create;
mod delete;
mod finalize;
mod sync;

pub use create::{creation_tags, idempotency_token};
pub use finalize::finalize_pass;
pub use sync::observe;

use crate::controller::reconciler::state::{ReconcileState, StateEvent};
use crate::controller::reconciler::types::{PassOutcome, Reconciler, ReconcilerError, TriggerSource};
use crate::controller::reconciler::validation::validate_certificate_spec;
use crate::crd::{Certificate, ConditionType};
use crate::observability;
use crate::store::StoreError;
use chrono::{DateTime, Utc};
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, Instrument};

/// Slack allowed when deciding whether a scheduled requeue is due
const REQUEUE_SLACK: Duration = Duration::from_secs(2);

/// Why a pass should run, or how long until it should
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Run(TriggerSource),
    /// The next scheduled pass is still in the future
    NotDue(Duration),
    /// Nothing changed and nothing is scheduled
    Idle,
}

/// Classify the trigger for a pass from the object alone
///
/// Watch events for our own status writes land here too; they are skipped
/// unless the spec moved or a scheduled requeue is due.
#[must_use]
pub fn classify_trigger(certificate: &Certificate, now: DateTime<Utc>) -> Trigger {
    if certificate.metadata.deletion_timestamp.is_some() {
        return Trigger::Run(TriggerSource::DeleteRequested);
    }
    let Some(status) = certificate.status.as_ref() else {
        return Trigger::Run(TriggerSource::SpecChanged);
    };
    if status.observed_generation != certificate.metadata.generation {
        return Trigger::Run(TriggerSource::SpecChanged);
    }

    let next = status
        .next_reconcile_time
        .as_deref()
        .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
        .map(|t| t.with_timezone(&Utc));
    match next {
        None => Trigger::Idle,
        Some(next) => match (next - now).to_std() {
            Ok(remaining) if remaining > REQUEUE_SLACK => Trigger::NotDue(remaining),
            // Due, or already in the past
            _ => Trigger::Run(TriggerSource::PeriodicRequeue),
        },
    }
}

/// Main reconciliation function
///
/// Errors returned here are handled by the error policy; errors that were
/// surfaced as conditions come back as `Ok` with their own requeue.
pub async fn reconcile(
    certificate: Arc<Certificate>,
    ctx: Arc<Reconciler>,
) -> Result<Action, ReconcilerError> {
    let name = certificate.name_any();
    let namespace = certificate.namespace().unwrap_or_else(|| "default".to_string());
    let resource_key = format!("{namespace}/{name}");

    let lock = ctx.reconcile_lock(&resource_key);
    let _guard = lock.lock().await;

    let trigger_source = match classify_trigger(&certificate, Utc::now()) {
        Trigger::Run(source) => source,
        Trigger::NotDue(remaining) => {
            debug!(
                "Skipping {}: next reconciliation due in {}s",
                resource_key,
                remaining.as_secs()
            );
            return Ok(Action::requeue(remaining));
        }
        Trigger::Idle => {
            debug!("Skipping {}: nothing to do", resource_key);
            return Ok(Action::await_change());
        }
    };

    let span = tracing::info_span!(
        "reconcile",
        resource.name = %name,
        resource.namespace = %namespace,
        resource.kind = "Certificate",
        trigger = trigger_source.as_str()
    );
    reconcile_internal(certificate, ctx, resource_key, trigger_source)
        .instrument(span)
        .await
}

async fn reconcile_internal(
    certificate: Arc<Certificate>,
    ctx: Arc<Reconciler>,
    resource_key: String,
    trigger_source: TriggerSource,
) -> Result<Action, ReconcilerError> {
    let start = Instant::now();
    observability::metrics::increment_reconciliations();
    info!(
        "🔄 Reconciling Certificate: {} (trigger source: {})",
        resource_key,
        trigger_source.as_str()
    );

    if trigger_source == TriggerSource::DeleteRequested {
        return delete::reconcile_delete(certificate, &ctx, &resource_key, start).await;
    }

    // Guard remote deletion before anything is created
    let certificate = ctx.store.add_finalizer(&certificate).await?;

    let status = certificate.status.as_ref();
    let state = ReconcileState::parse(status.and_then(|s| s.phase.as_deref()));
    if state == ReconcileState::TerminallyFailed
        || status.is_some_and(|s| s.is_condition_true(ConditionType::Terminal))
    {
        info!(
            "Certificate {} is terminally failed; waiting for deletion",
            resource_key
        );
        return Ok(Action::await_change());
    }

    let arn = status.and_then(|s| s.arn.clone());
    let outcome = PassOutcome::new(state, arn.clone());

    if let Err(e) = validate_certificate_spec(&certificate.spec) {
        return finalize_pass(&certificate, &ctx, &resource_key, outcome.failed(e), start).await;
    }

    let (certificate, outcome, arn) = match arn {
        Some(arn) => (certificate, outcome, arn),
        None => match create_and_persist(certificate, &ctx, outcome, &resource_key).await? {
            Created::Persisted {
                certificate,
                outcome,
                arn,
            } => (certificate, outcome, arn),
            Created::Failed {
                certificate,
                outcome,
            } => {
                return finalize_pass(&certificate, &ctx, &resource_key, outcome, start).await;
            }
        },
    };

    let outcome = sync::sync_certificate(&certificate, &ctx, outcome, &arn).await;
    finalize_pass(&certificate, &ctx, &resource_key, outcome, start).await
}

enum Created {
    Persisted {
        certificate: Certificate,
        outcome: PassOutcome,
        arn: String,
    },
    Failed {
        certificate: Certificate,
        outcome: PassOutcome,
    },
}

/// Create the remote certificate and record its ARN before doing anything else
///
/// A request goes through `Creating` and lands in `Syncing`. An import is
/// issued on arrival, so it stays `Unmanaged` until the first describe moves
/// it straight to `Synced`.
async fn create_and_persist(
    certificate: Certificate,
    ctx: &Arc<Reconciler>,
    mut outcome: PassOutcome,
    resource_key: &str,
) -> Result<Created, ReconcilerError> {
    let importing = certificate.spec.is_import();
    if !importing {
        outcome.state = outcome.state.next(&StateEvent::Create);
    }

    let arn = match create::create_certificate(&certificate, ctx).await {
        Ok(arn) => arn,
        Err(e) => {
            return Ok(Created::Failed {
                certificate,
                outcome: outcome.failed(e),
            });
        }
    };
    if !importing {
        outcome.state = outcome.state.next(&StateEvent::Created);
    }
    outcome.arn = Some(arn.clone());

    let certificate = persist_arn(certificate, ctx, &arn, outcome.state, resource_key).await?;
    Ok(Created::Persisted {
        certificate,
        outcome,
        arn,
    })
}

/// Write the new ARN into status, re-reading once if the write races
async fn persist_arn(
    certificate: Certificate,
    ctx: &Arc<Reconciler>,
    arn: &str,
    state: ReconcileState,
    resource_key: &str,
) -> Result<Certificate, ReconcilerError> {
    let mut current = certificate;
    for attempt in 0..2 {
        let mut status = current.status.clone().unwrap_or_default();
        status.arn = Some(arn.to_string());
        if state != ReconcileState::Unmanaged {
            status.phase = Some(state.as_str().to_string());
        }

        match ctx.store.update_status(&current, &status).await {
            Ok(updated) => return Ok(updated),
            Err(StoreError::Conflict { .. }) if attempt == 0 => {
                observability::metrics::increment_status_conflicts();
                debug!("Conflict recording ARN for {}, re-reading", resource_key);
                current = ctx.store.fetch(&current).await?.ok_or_else(|| {
                    ReconcilerError::Conflict(format!("{resource_key} disappeared while creating"))
                })?;
                if current.status.as_ref().is_some_and(|s| s.arn.is_some()) {
                    return Err(ReconcilerError::Conflict(format!(
                        "{resource_key} already records an ARN"
                    )));
                }
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(ReconcilerError::Conflict(format!(
        "could not record ARN {arn} for {resource_key}"
    )))
}
