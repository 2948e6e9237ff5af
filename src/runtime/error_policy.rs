//! # Error Policy
//!
//! Error handling and backoff logic for the controller watch loop.
//! This module handles reconciliation errors and watch stream errors.

use crate::controller::reconciler::requeue::next_requeue;
use crate::controller::reconciler::state::ReconcileState;
use crate::controller::reconciler::{Reconciler, ReconcilerError};
use crate::crd::Certificate;
use crate::observability;
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Handle reconciliation errors returned by a pass
///
/// Only errors the pass could not record in status reach this point: lost
/// status write races and store failures. The requeue comes from the same
/// scheduler the pass uses, with the resource's own backoff state.
pub fn handle_reconciliation_error(
    obj: &Arc<Certificate>,
    error: &ReconcilerError,
    ctx: &Arc<Reconciler>,
) -> Action {
    let name = obj.name_any();
    let namespace = obj.namespace().unwrap_or_else(|| "default".to_string());
    let resource_key = format!("{namespace}/{name}");

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.watch.reconciliation_error",
        resource.name = %name,
        resource.namespace = %namespace,
        error = %error
    );
    let _error_guard = error_span.enter();

    error!("Reconciliation error for {}: {:?}", resource_key, error);
    observability::metrics::increment_reconciliation_errors(error.kind());

    let state = ReconcileState::parse(obj.status.as_ref().and_then(|s| s.phase.as_deref()));
    let (requeue, error_count) = ctx.with_backoff(&resource_key, |backoff| {
        if !matches!(error, ReconcilerError::Conflict(_)) {
            backoff.increment_error();
        }
        let requeue = next_requeue(state, Some(error), &ctx.config, &mut backoff.backoff);
        (requeue, backoff.error_count)
    });

    match requeue.delay() {
        Some(delay) => info!(
            "🔄 Retrying {} in {}ms (error count: {}, trigger source: {})",
            resource_key,
            delay.as_millis(),
            error_count,
            requeue.trigger(Some(error))
        ),
        None => info!("Not retrying {} until it changes", resource_key),
    }

    observability::metrics::increment_requeues(requeue.trigger(Some(error)));
    requeue.into_action()
}

/// How a watch stream error should be handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchErrorKind {
    Unauthorized,
    NotFound,
    Expired,
    Throttled,
    Other,
}

/// Classify a watch stream error from its debug rendering
#[must_use]
pub fn classify_watch_error(error_string: &str) -> WatchErrorKind {
    // 404 first: a plain-text 404 body surfaces as a serde error mentioning WatchFailed
    let is_not_found = error_string.contains("ObjectNotFound")
        || error_string.contains("404")
        || error_string.contains("not found");
    if is_not_found {
        WatchErrorKind::NotFound
    } else if error_string.contains("401") || error_string.contains("Unauthorized") {
        WatchErrorKind::Unauthorized
    } else if error_string.contains("410")
        || error_string.contains("too old resource version")
        || error_string.contains("Expired")
        || error_string.contains("Gone")
    {
        WatchErrorKind::Expired
    } else if error_string.contains("429")
        || error_string.contains("storage is (re)initializing")
        || error_string.contains("TooManyRequests")
    {
        WatchErrorKind::Throttled
    } else {
        WatchErrorKind::Other
    }
}

/// Handle watch stream errors with appropriate classification and backoff
///
/// Returns `false` to drop the error and let the watch restart, `true` to
/// keep consuming the stream.
pub async fn handle_watch_stream_error(
    error_string: &str,
    backoff: &AtomicU64,
    max_backoff_ms: u64,
    watch_restart_delay: Duration,
) -> bool {
    let error_span = tracing::span!(
        tracing::Level::WARN,
        "controller.watch.error",
        error = %error_string
    );
    let _error_guard = error_span.enter();

    match classify_watch_error(error_string) {
        WatchErrorKind::Unauthorized => {
            error!(
                "❌ Watch authentication failed (401 Unauthorized) - RBAC may have been revoked or token expired"
            );
            error!("🔍 Verify the controller ClusterRole still grants list/watch on certificates.acm.certificates.k8s.io:");
            error!(
                "      kubectl auth can-i watch certificates.acm.certificates.k8s.io --as=system:serviceaccount:<namespace>:acm-certificate-controller --all-namespaces"
            );
            warn!(
                "⏳ Waiting {}s before retrying watch (RBAC may need time to propagate)...",
                watch_restart_delay.as_secs()
            );
            tokio::time::sleep(watch_restart_delay).await;
            false
        }
        WatchErrorKind::Expired => {
            warn!(
                "Watch resource version expired (410) - this is normal during pod restarts, watch will restart"
            );
            false
        }
        WatchErrorKind::Throttled => {
            let current_backoff = backoff.load(Ordering::Relaxed);
            warn!(
                "API server storage reinitializing (429), backing off for {}ms before restart...",
                current_backoff
            );
            tokio::time::sleep(Duration::from_millis(current_backoff)).await;
            backoff.store(
                current_backoff.saturating_mul(2).min(max_backoff_ms),
                Ordering::Relaxed,
            );
            false
        }
        WatchErrorKind::NotFound => {
            warn!(
                "Resource not found (404) - this may be normal if a Certificate was deleted or the CRD is missing. Error: {}",
                error_string
            );
            true
        }
        WatchErrorKind::Other => {
            error!("Controller stream error: {}", error_string);
            tokio::time::sleep(watch_restart_delay).await;
            false
        }
    }
}
