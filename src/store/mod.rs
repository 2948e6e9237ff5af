//! # Desired-State Store
//!
//! Access to `Certificate` records and the Secrets they reference.
//!
//! The reconciler only writes status and finalizers. Every write carries the
//! resource version the pass started from, so a pass working from a stale
//! copy fails with `StoreError::Conflict` instead of overwriting a newer edit.
//!
//! - `kube`: backed by the Kubernetes API server
//! - `memory`: in-process store used by tests

use async_trait::async_trait;
use thiserror::Error;

use crate::crd::{Certificate, CertificateStatus, SecretKeyReference};

pub mod kube;
pub mod memory;

pub use self::kube::KubeCertificateStore;
pub use self::memory::InMemoryCertificateStore;

/// Store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// The write was based on an outdated resource version
    #[error("conflict writing {namespace}/{name}: resource changed since it was read")]
    Conflict { namespace: String, name: String },

    #[error("{namespace}/{name} not found")]
    NotFound { namespace: String, name: String },

    #[error("secret {namespace}/{name} has no key {key}")]
    MissingSecret {
        namespace: String,
        name: String,
        key: String,
    },

    #[error("kubernetes API error: {0}")]
    Kube(#[from] ::kube::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Store trait for Certificate records
#[async_trait]
pub trait CertificateStore: Send + Sync + std::fmt::Debug {
    /// Read the latest stored copy of `certificate`, or `None` if it is gone
    async fn fetch(&self, certificate: &Certificate) -> Result<Option<Certificate>, StoreError>;

    /// Replace the status of `certificate`, conditional on its resource version
    ///
    /// Returns the stored object after the write.
    async fn update_status(
        &self,
        certificate: &Certificate,
        status: &CertificateStatus,
    ) -> Result<Certificate, StoreError>;

    /// Add the controller finalizer, conditional on the resource version
    async fn add_finalizer(&self, certificate: &Certificate) -> Result<Certificate, StoreError>;

    /// Remove the controller finalizer, allowing the record to be garbage-collected
    async fn remove_finalizer(&self, certificate: &Certificate) -> Result<(), StoreError>;

    /// Read one key of a Secret
    ///
    /// `default_namespace` is used when the reference does not name one.
    async fn read_secret_key(
        &self,
        default_namespace: &str,
        reference: &SecretKeyReference,
    ) -> Result<Vec<u8>, StoreError>;
}

/// Finalizer list with the controller finalizer added, or `None` if already present
pub(crate) fn with_finalizer(certificate: &Certificate) -> Option<Vec<String>> {
    let mut finalizers = certificate.metadata.finalizers.clone().unwrap_or_default();
    if finalizers.iter().any(|f| f == crate::constants::FINALIZER) {
        return None;
    }
    finalizers.push(crate::constants::FINALIZER.to_string());
    Some(finalizers)
}

/// Finalizer list with the controller finalizer removed, or `None` if absent
pub(crate) fn without_finalizer(certificate: &Certificate) -> Option<Vec<String>> {
    let finalizers = certificate.metadata.finalizers.clone().unwrap_or_default();
    if !finalizers.iter().any(|f| f == crate::constants::FINALIZER) {
        return None;
    }
    Some(
        finalizers
            .into_iter()
            .filter(|f| f != crate::constants::FINALIZER)
            .collect(),
    )
}
