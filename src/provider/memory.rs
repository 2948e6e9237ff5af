//! # In-Memory Provider
//!
//! A `CertificateProvider` that keeps certificates in process memory.
//!
//! Used by the integration tests to drive the reconciler without AWS. It
//! records every call so tests can assert on the exact mutations performed,
//! and lets tests move certificates between remote states, inject failures,
//! and delay the disappearance of deleted certificates.

use crate::crd::{CertificateSpec, Tag};
use crate::provider::{
    CertificateProvider, CertificateType, ImportMaterial, ProviderError, RemoteSnapshot,
    RemoteStatus, TagDelta,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// One recorded provider call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCall {
    Describe(String),
    ListTags(String),
    Request { domain_name: String, token: String },
    Import,
    UpdateTags { arn: String, delta: TagDelta },
    UpdateOptions { arn: String, transparency_logging: String },
    Delete(String),
}

impl ProviderCall {
    /// Calls that change remote state
    #[must_use]
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            ProviderCall::Request { .. }
                | ProviderCall::Import
                | ProviderCall::UpdateTags { .. }
                | ProviderCall::UpdateOptions { .. }
                | ProviderCall::Delete(_)
        )
    }

    fn operation(&self) -> &'static str {
        match self {
            ProviderCall::Describe(_) => "describe",
            ProviderCall::ListTags(_) => "list_tags",
            ProviderCall::Request { .. } => "request",
            ProviderCall::Import => "import",
            ProviderCall::UpdateTags { .. } => "update_tags",
            ProviderCall::UpdateOptions { .. } => "update_options",
            ProviderCall::Delete(_) => "delete",
        }
    }
}

#[derive(Debug, Clone)]
struct StoredCertificate {
    snapshot: RemoteSnapshot,
    /// Remaining describes before a deleted certificate disappears
    pending_delete: Option<u32>,
}

#[derive(Debug, Default)]
struct State {
    certificates: HashMap<String, StoredCertificate>,
    tokens: HashMap<String, String>,
    calls: Vec<ProviderCall>,
    failures: HashMap<&'static str, VecDeque<ProviderError>>,
    next_id: u64,
    request_status: Option<RemoteStatus>,
    deletion_lag: u32,
}

/// In-memory certificate service
#[derive(Debug, Default)]
pub struct InMemoryCertificateProvider {
    state: Mutex<State>,
}

impl InMemoryCertificateProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Status newly requested certificates start in (default `PENDING_VALIDATION`)
    pub fn set_request_status(&self, status: RemoteStatus) {
        self.state().request_status = Some(status);
    }

    /// Number of describes a deleted certificate stays visible for
    pub fn set_deletion_lag(&self, describes: u32) {
        self.state().deletion_lag = describes;
    }

    /// Move an existing certificate to a new remote status
    pub fn set_status(&self, arn: &str, status: RemoteStatus) {
        if let Some(stored) = self.state().certificates.get_mut(arn) {
            if status.is_success() && stored.snapshot.issued_at.is_none() {
                stored.snapshot.issued_at = Some(Utc::now());
            }
            if status == RemoteStatus::Failed {
                stored.snapshot.failure_reason = Some("NO_AVAILABLE_CONTACTS".to_string());
            }
            stored.snapshot.status = status;
        }
    }

    /// Overwrite the tags of a certificate, bypassing the call log
    pub fn set_tags(&self, arn: &str, tags: Vec<Tag>) {
        if let Some(stored) = self.state().certificates.get_mut(arn) {
            stored.snapshot.tags = tags;
        }
    }

    /// Remove a certificate as if it were deleted out of band
    pub fn remove(&self, arn: &str) {
        self.state().certificates.remove(arn);
    }

    /// Insert a certificate directly, bypassing the call log
    pub fn insert(&self, snapshot: RemoteSnapshot) {
        self.state().certificates.insert(
            snapshot.arn.clone(),
            StoredCertificate {
                snapshot,
                pending_delete: None,
            },
        );
    }

    /// Make the next call of `operation` fail with `error`
    ///
    /// `operation` is one of `describe`, `list_tags`, `request`, `import`,
    /// `update_tags`, `update_options`, `delete`.
    pub fn fail_next(&self, operation: &'static str, error: ProviderError) {
        self.state()
            .failures
            .entry(operation)
            .or_default()
            .push_back(error);
    }

    /// Snapshot of a certificate including its tags
    #[must_use]
    pub fn get(&self, arn: &str) -> Option<RemoteSnapshot> {
        self.state().certificates.get(arn).map(|c| c.snapshot.clone())
    }

    #[must_use]
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.state().calls.clone()
    }

    /// Recorded calls that changed remote state
    #[must_use]
    pub fn mutations(&self) -> Vec<ProviderCall> {
        self.state()
            .calls
            .iter()
            .filter(|c| c.is_mutation())
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    #[must_use]
    pub fn certificate_count(&self) -> usize {
        self.state().certificates.len()
    }

    /// Record a call and pop any injected failure for it
    fn record(&self, call: ProviderCall) -> Result<(), ProviderError> {
        let mut state = self.state();
        let operation = call.operation();
        state.calls.push(call);
        match state.failures.get_mut(operation).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn insert_new(state: &mut State, snapshot: impl FnOnce(String) -> RemoteSnapshot) -> String {
        state.next_id += 1;
        let arn = format!(
            "arn:aws:acm:us-west-2:111122223333:certificate/{:08x}-0000-0000-0000-000000000000",
            state.next_id
        );
        state.certificates.insert(
            arn.clone(),
            StoredCertificate {
                snapshot: snapshot(arn.clone()),
                pending_delete: None,
            },
        );
        arn
    }
}

#[async_trait]
impl CertificateProvider for InMemoryCertificateProvider {
    async fn describe(&self, arn: &str) -> Result<Option<RemoteSnapshot>, ProviderError> {
        self.record(ProviderCall::Describe(arn.to_string()))?;
        let mut state = self.state();

        let gone = match state.certificates.get_mut(arn) {
            None => return Ok(None),
            Some(stored) => match stored.pending_delete {
                Some(0) => true,
                Some(remaining) => {
                    stored.pending_delete = Some(remaining - 1);
                    false
                }
                None => false,
            },
        };
        if gone {
            state.certificates.remove(arn);
            return Ok(None);
        }

        Ok(state.certificates.get(arn).map(|stored| RemoteSnapshot {
            tags: Vec::new(),
            ..stored.snapshot.clone()
        }))
    }

    async fn list_tags(&self, arn: &str) -> Result<Option<Vec<Tag>>, ProviderError> {
        self.record(ProviderCall::ListTags(arn.to_string()))?;
        Ok(self
            .state()
            .certificates
            .get(arn)
            .map(|stored| stored.snapshot.tags.clone()))
    }

    async fn request_certificate(
        &self,
        spec: &CertificateSpec,
        idempotency_token: &str,
        tags: &[Tag],
    ) -> Result<String, ProviderError> {
        let domain_name = spec.domain_name.clone().unwrap_or_default();
        self.record(ProviderCall::Request {
            domain_name: domain_name.clone(),
            token: idempotency_token.to_string(),
        })?;

        let mut state = self.state();
        if let Some(existing) = state.tokens.get(idempotency_token) {
            return Ok(existing.clone());
        }

        let status = state
            .request_status
            .clone()
            .unwrap_or(RemoteStatus::PendingValidation);
        let certificate_type = if spec.is_public() {
            CertificateType::AmazonIssued
        } else {
            CertificateType::Private
        };
        let transparency_logging = spec
            .options
            .as_ref()
            .and_then(|o| o.certificate_transparency_logging_preference.clone())
            .unwrap_or_else(|| "ENABLED".to_string());
        let tags = tags.to_vec();
        let sans = if spec.subject_alternative_names.is_empty() {
            vec![domain_name.clone()]
        } else {
            spec.subject_alternative_names.clone()
        };
        let arn = Self::insert_new(&mut state, |arn| RemoteSnapshot {
            arn,
            issued_at: status.is_success().then(Utc::now),
            status,
            certificate_type,
            domain_name,
            subject_alternative_names: sans,
            not_after: None,
            failure_reason: None,
            domain_validations: Vec::new(),
            transparency_logging: Some(transparency_logging),
            tags,
        });
        state
            .tokens
            .insert(idempotency_token.to_string(), arn.clone());
        Ok(arn)
    }

    async fn import_certificate(
        &self,
        material: &ImportMaterial,
        tags: &[Tag],
    ) -> Result<String, ProviderError> {
        self.record(ProviderCall::Import)?;
        if material.private_key.is_empty() {
            return Err(ProviderError::Validation {
                operation: "ImportCertificate".to_string(),
                message: "private key is empty".to_string(),
            });
        }

        let mut state = self.state();
        let tags = tags.to_vec();
        let arn = Self::insert_new(&mut state, |arn| RemoteSnapshot {
            arn,
            status: RemoteStatus::Issued,
            certificate_type: CertificateType::Imported,
            domain_name: String::new(),
            subject_alternative_names: Vec::new(),
            issued_at: Some(Utc::now()),
            not_after: None,
            failure_reason: None,
            domain_validations: Vec::new(),
            transparency_logging: None,
            tags,
        });
        Ok(arn)
    }

    async fn update_tags(&self, arn: &str, delta: &TagDelta) -> Result<(), ProviderError> {
        self.record(ProviderCall::UpdateTags {
            arn: arn.to_string(),
            delta: delta.clone(),
        })?;
        let mut state = self.state();
        let Some(stored) = state.certificates.get_mut(arn) else {
            return Err(ProviderError::NotFound {
                arn: arn.to_string(),
            });
        };
        stored.snapshot.tags = delta.apply(&stored.snapshot.tags);
        Ok(())
    }

    async fn update_options(&self, arn: &str, transparency_logging: &str) -> Result<(), ProviderError> {
        self.record(ProviderCall::UpdateOptions {
            arn: arn.to_string(),
            transparency_logging: transparency_logging.to_string(),
        })?;
        let mut state = self.state();
        let Some(stored) = state.certificates.get_mut(arn) else {
            return Err(ProviderError::NotFound {
                arn: arn.to_string(),
            });
        };
        stored.snapshot.transparency_logging = Some(transparency_logging.to_string());
        Ok(())
    }

    async fn delete(&self, arn: &str) -> Result<(), ProviderError> {
        self.record(ProviderCall::Delete(arn.to_string()))?;
        let mut state = self.state();
        let lag = state.deletion_lag;
        if lag == 0 {
            state.certificates.remove(arn);
        } else if let Some(stored) = state.certificates.get_mut(arn) {
            if stored.pending_delete.is_none() {
                stored.pending_delete = Some(lag);
            }
        }
        Ok(())
    }
}
