//! # Remote Snapshot Types
//!
//! Point-in-time view of an ACM certificate. A snapshot is never persisted;
//! it is read once per reconciliation pass and discarded.

use crate::crd::{DomainValidation, Tag};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use zeroize::Zeroizing;

/// ACM certificate lifecycle status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteStatus {
    PendingValidation,
    Issued,
    Inactive,
    Expired,
    ValidationTimedOut,
    Revoked,
    Failed,
    /// Any value this controller does not know about yet
    Unknown(String),
}

impl RemoteStatus {
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "PENDING_VALIDATION" => RemoteStatus::PendingValidation,
            "ISSUED" => RemoteStatus::Issued,
            "INACTIVE" => RemoteStatus::Inactive,
            "EXPIRED" => RemoteStatus::Expired,
            "VALIDATION_TIMED_OUT" => RemoteStatus::ValidationTimedOut,
            "REVOKED" => RemoteStatus::Revoked,
            "FAILED" => RemoteStatus::Failed,
            other => RemoteStatus::Unknown(other.to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            RemoteStatus::PendingValidation => "PENDING_VALIDATION",
            RemoteStatus::Issued => "ISSUED",
            RemoteStatus::Inactive => "INACTIVE",
            RemoteStatus::Expired => "EXPIRED",
            RemoteStatus::ValidationTimedOut => "VALIDATION_TIMED_OUT",
            RemoteStatus::Revoked => "REVOKED",
            RemoteStatus::Failed => "FAILED",
            RemoteStatus::Unknown(other) => other,
        }
    }

    /// The certificate is usable
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, RemoteStatus::Issued)
    }

    /// The certificate will never become usable without user action
    #[must_use]
    pub fn is_permanent_failure(&self) -> bool {
        matches!(
            self,
            RemoteStatus::Failed
                | RemoteStatus::ValidationTimedOut
                | RemoteStatus::Revoked
                | RemoteStatus::Expired
                | RemoteStatus::Inactive
        )
    }
}

/// How the certificate came to exist in ACM
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificateType {
    AmazonIssued,
    Imported,
    Private,
    Unknown(String),
}

impl CertificateType {
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "AMAZON_ISSUED" => CertificateType::AmazonIssued,
            "IMPORTED" => CertificateType::Imported,
            "PRIVATE" => CertificateType::Private,
            other => CertificateType::Unknown(other.to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            CertificateType::AmazonIssued => "AMAZON_ISSUED",
            CertificateType::Imported => "IMPORTED",
            CertificateType::Private => "PRIVATE",
            CertificateType::Unknown(other) => other,
        }
    }
}

/// Result of `describe`
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteSnapshot {
    pub arn: String,
    pub status: RemoteStatus,
    pub certificate_type: CertificateType,
    pub domain_name: String,
    pub subject_alternative_names: Vec<String>,
    pub issued_at: Option<DateTime<Utc>>,
    pub not_after: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
    pub domain_validations: Vec<DomainValidation>,
    /// Certificate transparency logging preference (ENABLED or DISABLED)
    pub transparency_logging: Option<String>,
    /// Filled from `list_tags`; `describe` alone leaves this empty
    pub tags: Vec<Tag>,
}

/// Key material read from Secrets for an import
#[derive(Clone)]
pub struct ImportMaterial {
    pub certificate: Vec<u8>,
    /// Zeroed on drop
    pub private_key: Zeroizing<Vec<u8>>,
    pub certificate_chain: Option<Vec<u8>>,
}

impl std::fmt::Debug for ImportMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImportMaterial")
            .field("certificate_len", &self.certificate.len())
            .field("private_key", &"<redacted>")
            .field("has_chain", &self.certificate_chain.is_some())
            .finish()
    }
}

/// Tag mutations for one `update_tags` call
///
/// Removal is applied before addition, so a key present in both sets is
/// replaced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagDelta {
    pub to_add: Vec<Tag>,
    pub to_remove: Vec<Tag>,
}

impl TagDelta {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    /// Apply the delta to a tag set, as the remote service would
    #[must_use]
    pub fn apply(&self, tags: &[Tag]) -> Vec<Tag> {
        let mut by_key: BTreeMap<String, Option<String>> = tags
            .iter()
            .map(|t| (t.key.clone(), t.value.clone()))
            .collect();
        for tag in &self.to_remove {
            by_key.remove(&tag.key);
        }
        for tag in &self.to_add {
            by_key.insert(tag.key.clone(), tag.value.clone());
        }
        by_key
            .into_iter()
            .map(|(key, value)| Tag { key, value })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_status_parse_known_and_unknown() {
        assert_eq!(RemoteStatus::parse("ISSUED"), RemoteStatus::Issued);
        assert_eq!(
            RemoteStatus::parse("PENDING_VALIDATION"),
            RemoteStatus::PendingValidation
        );
        let unknown = RemoteStatus::parse("SOMETHING_NEW");
        assert_eq!(unknown.as_str(), "SOMETHING_NEW");
        assert!(!unknown.is_success());
        assert!(!unknown.is_permanent_failure());
    }

    #[test]
    fn test_permanent_failure_statuses() {
        for status in ["FAILED", "VALIDATION_TIMED_OUT", "REVOKED", "EXPIRED", "INACTIVE"] {
            assert!(RemoteStatus::parse(status).is_permanent_failure(), "{status}");
        }
        assert!(!RemoteStatus::PendingValidation.is_permanent_failure());
        assert!(!RemoteStatus::Issued.is_permanent_failure());
    }

    #[test]
    fn test_tag_delta_apply_replaces_changed_values() {
        let current = vec![Tag::new("environment", "dev"), Tag::new("team", "a")];
        let delta = TagDelta {
            to_add: vec![Tag::new("environment", "dev2"), Tag::new("key-a", "value-a")],
            to_remove: vec![Tag::new("team", "a")],
        };
        let applied = delta.apply(&current);
        assert_eq!(
            applied,
            vec![Tag::new("environment", "dev2"), Tag::new("key-a", "value-a")]
        );
    }

    #[test]
    fn test_import_material_debug_redacts_key() {
        let material = ImportMaterial {
            certificate: b"cert".to_vec(),
            private_key: Zeroizing::new(b"secret".to_vec()),
            certificate_chain: None,
        };
        let rendered = format!("{material:?}");
        assert!(!rendered.contains("secret\""));
        assert!(rendered.contains("<redacted>"));
    }
}
