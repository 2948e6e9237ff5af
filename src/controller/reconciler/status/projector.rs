//! # Status & Condition Projector
//!
//! Maps a pass outcome onto the user-visible status.
//!
//! - `ResourceSynced` reports whether the pass completed without a client
//!   error. It stays True when ACM reports a failed certificate.
//! - `Ready` reports whether the certificate is issued.
//! - `Terminal` is sticky: once True it is carried into every later status.

use super::conditions::{condition, reasons, upsert_condition};
use crate::controller::reconciler::diff::user_tags;
use crate::controller::reconciler::state::ReconcileState;
use crate::controller::reconciler::types::PassOutcome;
use crate::crd::{CertificateStatus, Condition, ConditionStatus, ConditionType, FieldSyncState};
use chrono::{DateTime, SecondsFormat, Utc};
use std::time::Duration;

/// Mutable spec fields tracked in `status.fieldSync`
const TRACKED_FIELDS: [&str; 2] = ["options", "tags"];

/// RFC3339 with second precision and a `Z` suffix
#[must_use]
pub fn format_time(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Compute the condition set for a pass
///
/// Conditions are ordered Ready, ResourceSynced, Terminal.
#[must_use]
pub fn project_conditions(
    previous: Option<&CertificateStatus>,
    outcome: &PassOutcome,
    now: &str,
) -> Vec<Condition> {
    let prior: &[Condition] = previous.map_or(&[], |s| s.conditions.as_slice());
    let mut conditions = Vec::with_capacity(3);

    // Ready
    let issued_at_changed = outcome.snapshot.as_ref().is_some_and(|snapshot| {
        snapshot.issued_at.as_ref().map(format_time)
            != previous.and_then(|s| s.issued_at.clone())
    });
    let ready = if let Some(snapshot) = &outcome.snapshot {
        if snapshot.status.is_success() {
            condition(
                ConditionType::Ready,
                ConditionStatus::True,
                reasons::CERTIFICATE_ISSUED,
                format!("certificate {} is issued", snapshot.arn),
            )
        } else {
            let message = match &snapshot.failure_reason {
                Some(reason) => format!(
                    "certificate status is {} ({reason})",
                    snapshot.status.as_str()
                ),
                None => format!("certificate status is {}", snapshot.status.as_str()),
            };
            condition(
                ConditionType::Ready,
                ConditionStatus::False,
                reasons::CERTIFICATE_NOT_ISSUED,
                message,
            )
        }
    } else if outcome.remote_missing {
        condition(
            ConditionType::Ready,
            ConditionStatus::False,
            reasons::REMOTE_RESOURCE_MISSING,
            missing_message(outcome),
        )
    } else if outcome.state == ReconcileState::TerminallyFailed {
        condition(
            ConditionType::Ready,
            ConditionStatus::False,
            reasons::TERMINAL_ERROR,
            "certificate can not be reconciled",
        )
    } else {
        // Nothing observed this pass; keep what we knew
        prior
            .iter()
            .find(|c| c.r#type == ConditionType::Ready)
            .cloned()
            .unwrap_or_else(|| {
                condition(
                    ConditionType::Ready,
                    ConditionStatus::Unknown,
                    reasons::AWAITING_REMOTE_STATE,
                    "certificate has not been observed yet",
                )
            })
    };
    upsert_condition(&mut conditions, prior, ready, now, issued_at_changed);

    // ResourceSynced
    let synced = match (&outcome.error, outcome.remote_missing) {
        (Some(error), _) => condition(
            ConditionType::ResourceSynced,
            ConditionStatus::False,
            error.reason(),
            error.to_string(),
        ),
        (None, true) => condition(
            ConditionType::ResourceSynced,
            ConditionStatus::False,
            reasons::REMOTE_RESOURCE_MISSING,
            missing_message(outcome),
        ),
        (None, false) => condition(
            ConditionType::ResourceSynced,
            ConditionStatus::True,
            reasons::RECONCILE_SUCCEEDED,
            "last reconciliation completed without errors",
        ),
    };
    upsert_condition(&mut conditions, prior, synced, now, outcome.updated);

    // Terminal
    let was_terminal = prior
        .iter()
        .find(|c| c.r#type == ConditionType::Terminal)
        .filter(|c| c.status == ConditionStatus::True);
    if outcome.state == ReconcileState::TerminallyFailed || was_terminal.is_some() {
        let message = match (&outcome.error, was_terminal) {
            (_, Some(existing)) => existing.message.clone().unwrap_or_default(),
            (Some(error), None) => error.to_string(),
            (None, None) => "certificate can not be reconciled".to_string(),
        };
        upsert_condition(
            &mut conditions,
            prior,
            condition(
                ConditionType::Terminal,
                ConditionStatus::True,
                reasons::TERMINAL_ERROR,
                message,
            ),
            now,
            false,
        );
    }

    conditions
}

/// Build the full status for a pass
///
/// Remote fields come from the snapshot when one was taken, and are carried
/// over from `previous` otherwise.
#[must_use]
pub fn build_status(
    previous: Option<&CertificateStatus>,
    observed_generation: Option<i64>,
    outcome: &PassOutcome,
    next_reconcile: Option<Duration>,
    now: DateTime<Utc>,
) -> CertificateStatus {
    let now_str = format_time(&now);
    let mut status = previous.cloned().unwrap_or_default();

    status.arn.clone_from(&outcome.arn);
    if let Some(snapshot) = &outcome.snapshot {
        status.status = Some(snapshot.status.as_str().to_string());
        status.r#type = Some(snapshot.certificate_type.as_str().to_string());
        status.issued_at = snapshot.issued_at.as_ref().map(format_time);
        status.not_after = snapshot.not_after.as_ref().map(format_time);
        status.failure_reason.clone_from(&snapshot.failure_reason);
        status.domain_validations.clone_from(&snapshot.domain_validations);
        status.observed_tags = user_tags(&snapshot.tags);
    } else if outcome.remote_missing {
        status.status = None;
        status.r#type = None;
        status.issued_at = None;
        status.not_after = None;
        status.failure_reason = None;
        status.domain_validations.clear();
        status.observed_tags.clear();
    }

    if let Some(plan) = &outcome.plan {
        for field in TRACKED_FIELDS {
            let touched = plan.touches(field);
            let entry = status.field_sync.entry(field.to_string()).or_insert(FieldSyncState {
                in_sync: true,
                update_count: 0,
            });
            entry.in_sync = !touched || outcome.updated;
            if touched && outcome.updated {
                entry.update_count = entry.update_count.saturating_add(1);
            }
        }
    }

    status.phase = Some(outcome.state.as_str().to_string());
    status.conditions = project_conditions(previous, outcome, &now_str);
    status.observed_generation = observed_generation;
    status.last_reconcile_time = Some(now_str);
    status.next_reconcile_time = next_reconcile.and_then(|delay| {
        chrono::Duration::from_std(delay)
            .ok()
            .map(|delay| format_time(&(now + delay)))
    });

    status
}

fn missing_message(outcome: &PassOutcome) -> String {
    format!(
        "certificate {} no longer exists in ACM",
        outcome.arn.as_deref().unwrap_or("<unknown>")
    )
}
