//! # Conditions
//!
//! Helpers for maintaining the condition list, one entry per type.

use crate::crd::{Condition, ConditionStatus, ConditionType};

/// Condition reasons written by the controller
pub mod reasons {
    pub const RECONCILE_SUCCEEDED: &str = "ReconcileSucceeded";
    pub const REMOTE_RESOURCE_MISSING: &str = "RemoteResourceMissing";
    pub const CERTIFICATE_ISSUED: &str = "CertificateIssued";
    pub const CERTIFICATE_NOT_ISSUED: &str = "CertificateNotIssued";
    pub const AWAITING_REMOTE_STATE: &str = "AwaitingRemoteState";
    pub const TERMINAL_ERROR: &str = "TerminalError";
}

/// Insert or replace the condition of `condition.r#type`
///
/// The previous transition time is kept when the status did not change,
/// unless `force_transition` is set.
pub fn upsert_condition(
    conditions: &mut Vec<Condition>,
    previous: &[Condition],
    mut condition: Condition,
    now: &str,
    force_transition: bool,
) {
    let prior = previous.iter().find(|c| c.r#type == condition.r#type);
    condition.last_transition_time = match prior {
        Some(prior) if prior.status == condition.status && !force_transition => prior
            .last_transition_time
            .clone()
            .or_else(|| Some(now.to_string())),
        _ => Some(now.to_string()),
    };

    if let Some(existing) = conditions.iter_mut().find(|c| c.r#type == condition.r#type) {
        *existing = condition;
    } else {
        conditions.push(condition);
    }
}

/// Build a condition without a transition time; `upsert_condition` fills it in
#[must_use]
pub fn condition(
    condition_type: ConditionType,
    status: ConditionStatus,
    reason: &str,
    message: impl Into<String>,
) -> Condition {
    Condition {
        r#type: condition_type,
        status,
        last_transition_time: None,
        reason: Some(reason.to_string()),
        message: Some(message.into()),
    }
}
