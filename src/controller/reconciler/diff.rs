//! # Desired/Observed Differ
//!
//! Compares a `CertificateSpec` against the latest `RemoteSnapshot` and
//! produces the ordered mutations needed to converge.
//!
//! Identity fields (domain name and subject alternative names) are checked
//! first and can never be mutated; a mismatch is a terminal error. Mutable
//! fields follow in spec declaration order: options, then tags.

use crate::constants::{AWS_RESERVED_TAG_PREFIX, TRACKING_TAG_PREFIX};
use crate::controller::reconciler::types::ReconcilerError;
use crate::crd::{CertificateSpec, Tag};
use crate::provider::{RemoteSnapshot, TagDelta};
use std::collections::{BTreeMap, BTreeSet};

/// One remote mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    UpdateOptions { transparency_logging: String },
    UpdateTags(TagDelta),
}

impl Mutation {
    /// Spec field the mutation converges
    #[must_use]
    pub fn field(&self) -> &'static str {
        match self {
            Mutation::UpdateOptions { .. } => "options",
            Mutation::UpdateTags(_) => "tags",
        }
    }
}

/// Mutations for one pass, in application order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffPlan {
    pub mutations: Vec<Mutation>,
}

impl DiffPlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    /// True when the plan touches the given spec field
    #[must_use]
    pub fn touches(&self, field: &str) -> bool {
        self.mutations.iter().any(|m| m.field() == field)
    }
}

/// Tags the controller or AWS own are never compared or mutated
#[must_use]
pub fn is_system_tag(key: &str) -> bool {
    key.starts_with(TRACKING_TAG_PREFIX) || key.starts_with(AWS_RESERVED_TAG_PREFIX)
}

/// User tags only, sorted by key
#[must_use]
pub fn user_tags(tags: &[Tag]) -> Vec<Tag> {
    let mut tags: Vec<Tag> = tags
        .iter()
        .filter(|t| !is_system_tag(&t.key))
        .cloned()
        .collect();
    tags.sort_by(|a, b| a.key.cmp(&b.key));
    tags
}

/// Compute the plan that converges `snapshot` onto `spec`
///
/// # Errors
///
/// Returns `ReconcilerError::TerminalDomain` when the domain names on the
/// remote certificate differ from the spec.
pub fn diff(spec: &CertificateSpec, snapshot: &RemoteSnapshot) -> Result<DiffPlan, ReconcilerError> {
    check_identity(spec, snapshot)?;

    let mut plan = DiffPlan::default();

    if let Some(desired) = spec
        .options
        .as_ref()
        .and_then(|o| o.certificate_transparency_logging_preference.as_deref())
    {
        if snapshot.transparency_logging.as_deref() != Some(desired) {
            plan.mutations.push(Mutation::UpdateOptions {
                transparency_logging: desired.to_string(),
            });
        }
    }

    let delta = diff_tags(&spec.tags, &snapshot.tags);
    if !delta.is_empty() {
        plan.mutations.push(Mutation::UpdateTags(delta));
    }

    Ok(plan)
}

/// Tag-set delta from `observed` to `desired`, ignoring system tags
///
/// Keys absent from desired are removed; new keys and changed values are added.
#[must_use]
pub fn diff_tags(desired: &[Tag], observed: &[Tag]) -> TagDelta {
    let desired: BTreeMap<&str, Option<&str>> = desired
        .iter()
        .filter(|t| !is_system_tag(&t.key))
        .map(|t| (t.key.as_str(), t.value.as_deref()))
        .collect();
    let observed: BTreeMap<&str, Option<&str>> = observed
        .iter()
        .filter(|t| !is_system_tag(&t.key))
        .map(|t| (t.key.as_str(), t.value.as_deref()))
        .collect();

    let to_remove = observed
        .iter()
        .filter(|(key, _)| !desired.contains_key(**key))
        .map(|(key, value)| Tag {
            key: (*key).to_string(),
            value: value.map(str::to_string),
        })
        .collect();
    let to_add = desired
        .iter()
        .filter(|(key, value)| observed.get(**key) != Some(*value))
        .map(|(key, value)| Tag {
            key: (*key).to_string(),
            value: value.map(str::to_string),
        })
        .collect();

    TagDelta { to_add, to_remove }
}

fn check_identity(spec: &CertificateSpec, snapshot: &RemoteSnapshot) -> Result<(), ReconcilerError> {
    // Imported certificates take their names from the key material
    if spec.is_import() || snapshot.domain_name.is_empty() {
        return Ok(());
    }
    let Some(domain_name) = spec.domain_name.as_deref() else {
        return Ok(());
    };

    let desired: BTreeSet<&str> = std::iter::once(domain_name)
        .chain(spec.subject_alternative_names.iter().map(String::as_str))
        .collect();
    let observed: BTreeSet<&str> = std::iter::once(snapshot.domain_name.as_str())
        .chain(snapshot.subject_alternative_names.iter().map(String::as_str))
        .collect();

    if desired == observed {
        Ok(())
    } else {
        Err(ReconcilerError::TerminalDomain(format!(
            "domain names are immutable: certificate {} covers {:?}, spec asks for {:?}",
            snapshot.arn, observed, desired
        )))
    }
}
