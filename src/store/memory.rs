//! # In-Memory Store
//!
//! `CertificateStore` that mimics the API server semantics the reconciler
//! relies on: resource versions bump on every write, stale writes conflict,
//! spec edits bump the generation, and a record marked for deletion is
//! purged once its last finalizer is removed.

use async_trait::async_trait;
use chrono::Utc;
use kube::ResourceExt;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{with_finalizer, without_finalizer, CertificateStore, StoreError};
use crate::crd::{Certificate, CertificateSpec, CertificateStatus, SecretKeyReference};

type Key = (String, String);

#[derive(Debug, Default)]
struct State {
    certificates: HashMap<Key, Certificate>,
    secrets: HashMap<Key, BTreeMap<String, Vec<u8>>>,
    next_version: u64,
    status_writes: usize,
    conflicts_pending: usize,
}

impl State {
    fn bump(&mut self, certificate: &mut Certificate) {
        self.next_version += 1;
        certificate.metadata.resource_version = Some(self.next_version.to_string());
    }
}

/// In-memory Certificate store
#[derive(Debug, Default)]
pub struct InMemoryCertificateStore {
    state: Mutex<State>,
}

fn key_of(certificate: &Certificate) -> Key {
    (
        certificate.namespace().unwrap_or_else(|| "default".to_string()),
        certificate.name_any(),
    )
}

impl InMemoryCertificateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a record, assigning uid, generation and resource version
    pub fn create(&self, namespace: &str, name: &str, spec: CertificateSpec) -> Certificate {
        let mut certificate = Certificate::new(name, spec);
        certificate.metadata.namespace = Some(namespace.to_string());
        certificate.metadata.uid = Some(format!("uid-{namespace}-{name}"));
        certificate.metadata.generation = Some(1);

        let mut state = self.state();
        state.bump(&mut certificate);
        state
            .certificates
            .insert(key_of(&certificate), certificate.clone());
        certificate
    }

    /// Latest stored copy of a record
    #[must_use]
    pub fn get(&self, namespace: &str, name: &str) -> Option<Certificate> {
        self.state()
            .certificates
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Edit the spec as a user would, bumping generation and resource version
    pub fn update_spec(
        &self,
        namespace: &str,
        name: &str,
        edit: impl FnOnce(&mut CertificateSpec),
    ) -> Option<Certificate> {
        let mut state = self.state();
        let mut certificate = state
            .certificates
            .get(&(namespace.to_string(), name.to_string()))?
            .clone();
        edit(&mut certificate.spec);
        certificate.metadata.generation = Some(certificate.metadata.generation.unwrap_or(0) + 1);
        state.bump(&mut certificate);
        state
            .certificates
            .insert(key_of(&certificate), certificate.clone());
        Some(certificate)
    }

    /// Request deletion
    ///
    /// Records without finalizers are removed at once; others get a
    /// deletion timestamp and wait for their finalizers to be removed.
    pub fn delete(&self, namespace: &str, name: &str) -> Option<Certificate> {
        let mut state = self.state();
        let key = (namespace.to_string(), name.to_string());
        let mut certificate = state.certificates.get(&key)?.clone();
        if certificate.finalizers().is_empty() {
            state.certificates.remove(&key);
            return None;
        }
        if certificate.metadata.deletion_timestamp.is_none() {
            let now = Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
            certificate.metadata.deletion_timestamp = serde_json::from_value(now.into()).ok();
            state.bump(&mut certificate);
            state.certificates.insert(key, certificate.clone());
        }
        Some(certificate)
    }

    pub fn insert_secret(&self, namespace: &str, name: &str, key: &str, value: &[u8]) {
        self.state()
            .secrets
            .entry((namespace.to_string(), name.to_string()))
            .or_default()
            .insert(key.to_string(), value.to_vec());
    }

    /// Number of successful status writes
    #[must_use]
    pub fn status_writes(&self) -> usize {
        self.state().status_writes
    }

    /// Make the next `count` status writes fail with a conflict, as if
    /// another writer had updated the record first
    pub fn conflict_next_status_writes(&self, count: usize) {
        self.state().conflicts_pending = count;
    }

    fn check_version(state: &State, certificate: &Certificate) -> Result<Certificate, StoreError> {
        let (namespace, name) = key_of(certificate);
        let stored = state
            .certificates
            .get(&(namespace.clone(), name.clone()))
            .ok_or_else(|| StoreError::NotFound {
                namespace: namespace.clone(),
                name: name.clone(),
            })?;
        if stored.metadata.resource_version != certificate.metadata.resource_version {
            return Err(StoreError::Conflict { namespace, name });
        }
        Ok(stored.clone())
    }
}

#[async_trait]
impl CertificateStore for InMemoryCertificateStore {
    async fn fetch(&self, certificate: &Certificate) -> Result<Option<Certificate>, StoreError> {
        Ok(self.state().certificates.get(&key_of(certificate)).cloned())
    }

    async fn update_status(
        &self,
        certificate: &Certificate,
        status: &CertificateStatus,
    ) -> Result<Certificate, StoreError> {
        let mut state = self.state();
        if state.conflicts_pending > 0 {
            state.conflicts_pending -= 1;
            let (namespace, name) = key_of(certificate);
            return Err(StoreError::Conflict { namespace, name });
        }
        let mut stored = Self::check_version(&state, certificate)?;
        stored.status = Some(status.clone());
        state.bump(&mut stored);
        state.status_writes += 1;
        state.certificates.insert(key_of(&stored), stored.clone());
        Ok(stored)
    }

    async fn add_finalizer(&self, certificate: &Certificate) -> Result<Certificate, StoreError> {
        let Some(finalizers) = with_finalizer(certificate) else {
            return Ok(certificate.clone());
        };
        let mut state = self.state();
        let mut stored = Self::check_version(&state, certificate)?;
        stored.metadata.finalizers = Some(finalizers);
        state.bump(&mut stored);
        state.certificates.insert(key_of(&stored), stored.clone());
        Ok(stored)
    }

    async fn remove_finalizer(&self, certificate: &Certificate) -> Result<(), StoreError> {
        let mut state = self.state();
        let key = key_of(certificate);
        let Some(mut stored) = state.certificates.get(&key).cloned() else {
            return Ok(());
        };
        let Some(finalizers) = without_finalizer(&stored) else {
            return Ok(());
        };
        if finalizers.is_empty() && stored.metadata.deletion_timestamp.is_some() {
            state.certificates.remove(&key);
            return Ok(());
        }
        stored.metadata.finalizers = Some(finalizers);
        state.bump(&mut stored);
        state.certificates.insert(key, stored);
        Ok(())
    }

    async fn read_secret_key(
        &self,
        default_namespace: &str,
        reference: &SecretKeyReference,
    ) -> Result<Vec<u8>, StoreError> {
        let namespace = reference
            .namespace
            .clone()
            .unwrap_or_else(|| default_namespace.to_string());
        self.state()
            .secrets
            .get(&(namespace.clone(), reference.name.clone()))
            .and_then(|data| data.get(&reference.key))
            .cloned()
            .ok_or_else(|| StoreError::MissingSecret {
                namespace,
                name: reference.name.clone(),
                key: reference.key.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::FINALIZER;

    fn spec() -> CertificateSpec {
        CertificateSpec {
            domain_name: Some("example.com".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_stale_status_write_conflicts() {
        let store = InMemoryCertificateStore::new();
        let stale = store.create("default", "cert", spec());
        store.update_spec("default", "cert", |s| s.tags.clear());

        let result = store
            .update_status(&stale, &CertificateStatus::default())
            .await;
        assert!(matches!(result, Err(StoreError::Conflict { .. })));
        assert_eq!(store.status_writes(), 0);
    }

    #[tokio::test]
    async fn test_status_write_bumps_version() {
        let store = InMemoryCertificateStore::new();
        let created = store.create("default", "cert", spec());
        let updated = store
            .update_status(&created, &CertificateStatus::default())
            .await
            .unwrap();
        assert_ne!(
            created.metadata.resource_version,
            updated.metadata.resource_version
        );
        // The returned copy can be written again
        store
            .update_status(&updated, &CertificateStatus::default())
            .await
            .unwrap();
        assert_eq!(store.status_writes(), 2);
    }

    #[tokio::test]
    async fn test_delete_waits_for_finalizer() {
        let store = InMemoryCertificateStore::new();
        let created = store.create("default", "cert", spec());
        let with_finalizer = store.add_finalizer(&created).await.unwrap();
        assert_eq!(with_finalizer.finalizers(), &[FINALIZER.to_string()]);

        let deleting = store.delete("default", "cert").unwrap();
        assert!(deleting.metadata.deletion_timestamp.is_some());

        store.remove_finalizer(&deleting).await.unwrap();
        assert!(store.get("default", "cert").is_none());
    }

    #[tokio::test]
    async fn test_read_secret_key() {
        let store = InMemoryCertificateStore::new();
        store.insert_secret("default", "tls", "tls.crt", b"PEM");
        let reference = SecretKeyReference {
            name: "tls".to_string(),
            namespace: None,
            key: "tls.crt".to_string(),
        };
        assert_eq!(
            store.read_secret_key("default", &reference).await.unwrap(),
            b"PEM".to_vec()
        );

        let missing = SecretKeyReference {
            key: "tls.key".to_string(),
            ..reference
        };
        assert!(matches!(
            store.read_secret_key("default", &missing).await,
            Err(StoreError::MissingSecret { .. })
        ));
    }
}
