//! # Certificate Status
//!
//! Status types for tracking reconciliation state and conditions.
//! Only the reconciler writes these.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Status of the Certificate resource
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertificateStatus {
    /// ARN of the ACM certificate once requested or imported
    #[serde(default)]
    pub arn: Option<String>,
    /// Remote lifecycle status as reported by ACM
    /// Values: PENDING_VALIDATION, ISSUED, INACTIVE, EXPIRED, VALIDATION_TIMED_OUT, REVOKED, FAILED
    #[serde(default)]
    pub status: Option<String>,
    /// AMAZON_ISSUED, IMPORTED or PRIVATE
    #[serde(default)]
    pub r#type: Option<String>,
    /// Reconciliation state
    /// Values: Unmanaged, Creating, Syncing, Synced, Updating, Deleting, Deleted, Failed, TerminallyFailed
    #[serde(default)]
    pub phase: Option<String>,
    /// Time the certificate was issued (RFC3339)
    #[serde(default)]
    pub issued_at: Option<String>,
    /// Expiry of the certificate (RFC3339)
    #[serde(default)]
    pub not_after: Option<String>,
    /// ACM failure reason when status is FAILED
    #[serde(default)]
    pub failure_reason: Option<String>,
    /// Validation records reported by ACM, one per domain
    #[serde(default)]
    pub domain_validations: Vec<DomainValidation>,
    /// User tags last observed on the certificate
    #[serde(default)]
    pub observed_tags: Vec<crate::crd::Tag>,
    /// Per-field sync state, keyed by spec field name
    #[serde(default)]
    pub field_sync: BTreeMap<String, FieldSyncState>,
    /// Conditions represent the latest available observations
    #[serde(default)]
    pub conditions: Vec<Condition>,
    /// Generation of the spec this status was computed from
    #[serde(default)]
    pub observed_generation: Option<i64>,
    /// Last reconciliation time that changed status (RFC3339)
    #[serde(default)]
    pub last_reconcile_time: Option<String>,
    /// Next scheduled reconciliation time (RFC3339)
    #[serde(default)]
    pub next_reconcile_time: Option<String>,
}

impl CertificateStatus {
    /// Look up a condition by type
    #[must_use]
    pub fn condition(&self, condition_type: ConditionType) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.r#type == condition_type)
    }

    /// True when the condition of the given type is present with status True
    #[must_use]
    pub fn is_condition_true(&self, condition_type: ConditionType) -> bool {
        self.condition(condition_type)
            .is_some_and(|c| c.status == ConditionStatus::True)
    }

    /// Compare two statuses ignoring bookkeeping timestamps
    ///
    /// Used to skip writes that would only bump `lastReconcileTime`, which
    /// would otherwise trigger a watch event on every pass.
    #[must_use]
    pub fn same_observation(&self, other: &CertificateStatus) -> bool {
        let strip = |s: &CertificateStatus| CertificateStatus {
            last_reconcile_time: None,
            next_reconcile_time: None,
            ..s.clone()
        };
        strip(self) == strip(other)
    }
}

/// Sync state tracking for a mutable spec field
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldSyncState {
    /// Whether the remote value matched the spec after the last pass
    pub in_sync: bool,
    /// Number of times the controller pushed a change for this field
    #[serde(default)]
    pub update_count: i32,
}

/// Domain validation state for one name on the certificate
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DomainValidation {
    pub domain_name: String,
    #[serde(default)]
    pub validation_status: Option<String>,
    #[serde(default)]
    pub validation_method: Option<String>,
    /// CNAME record to create when validating by DNS
    #[serde(default)]
    pub resource_record: Option<ResourceRecord>,
}

/// DNS record used for validation
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRecord {
    pub name: String,
    pub r#type: String,
    pub value: String,
}

/// Condition types surfaced on a Certificate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, schemars::JsonSchema)]
pub enum ConditionType {
    /// Remote certificate is issued and usable
    Ready,
    /// Last reconciliation pass completed without a client error
    ResourceSynced,
    /// Permanent failure; reconciliation stops until the resource is deleted
    Terminal,
}

impl ConditionType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionType::Ready => "Ready",
            ConditionType::ResourceSynced => "ResourceSynced",
            ConditionType::Terminal => "Terminal",
        }
    }
}

/// Boolean-as-string condition status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl From<bool> for ConditionStatus {
    fn from(value: bool) -> Self {
        if value {
            ConditionStatus::True
        } else {
            ConditionStatus::False
        }
    }
}

/// Condition represents a condition of a resource
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition
    pub r#type: ConditionType,
    /// Status of the condition (True, False, Unknown)
    pub status: ConditionStatus,
    /// Last transition time
    #[serde(default)]
    pub last_transition_time: Option<String>,
    /// Reason for the condition
    #[serde(default)]
    pub reason: Option<String>,
    /// Message describing the condition
    #[serde(default)]
    pub message: Option<String>,
}
