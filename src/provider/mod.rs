//! # Certificate Provider
//!
//! The remote state client. Everything the reconciler knows about ACM comes
//! through the `CertificateProvider` trait, which keeps the reconciler free of
//! SDK types and lets tests substitute an in-memory implementation.
//!
//! - `aws`: AWS Certificate Manager via `aws-sdk-acm`
//! - `memory`: in-process fake used by tests and local runs

use async_trait::async_trait;

use crate::crd::{CertificateSpec, Tag};

mod error;
mod types;

pub mod aws;
pub mod memory;

pub use error::ProviderError;
pub use types::{CertificateType, ImportMaterial, RemoteSnapshot, RemoteStatus, TagDelta};

/// Provider trait for the remote certificate service
///
/// Every call fetches fresh state. Implementations must not cache between calls.
#[async_trait]
pub trait CertificateProvider: Send + Sync + std::fmt::Debug {
    /// Describe a certificate
    ///
    /// Returns `Ok(None)` when the certificate does not exist. The returned
    /// snapshot carries no tags; use `list_tags` for those.
    async fn describe(&self, arn: &str) -> Result<Option<RemoteSnapshot>, ProviderError>;

    /// List all tags on a certificate, or `Ok(None)` when it does not exist
    async fn list_tags(&self, arn: &str) -> Result<Option<Vec<Tag>>, ProviderError>;

    /// Request a new certificate and return its ARN
    ///
    /// `idempotency_token` makes retried requests for the same resource
    /// return the same certificate.
    async fn request_certificate(
        &self,
        spec: &CertificateSpec,
        idempotency_token: &str,
        tags: &[Tag],
    ) -> Result<String, ProviderError>;

    /// Import externally issued key material and return its ARN
    async fn import_certificate(
        &self,
        material: &ImportMaterial,
        tags: &[Tag],
    ) -> Result<String, ProviderError>;

    /// Apply a tag delta, removals first
    async fn update_tags(&self, arn: &str, delta: &TagDelta) -> Result<(), ProviderError>;

    /// Set the certificate transparency logging preference
    async fn update_options(&self, arn: &str, transparency_logging: &str) -> Result<(), ProviderError>;

    /// Delete a certificate. Deleting a certificate that does not exist succeeds.
    async fn delete(&self, arn: &str) -> Result<(), ProviderError>;
}
