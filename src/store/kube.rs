//! # Kubernetes Store
//!
//! `CertificateStore` backed by the API server. Conditional writes use a JSON
//! merge patch that includes `metadata.resourceVersion`; the API server
//! rejects it with 409 when the object has moved on.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Patch, PatchParams};
use kube::{Api, Client, ResourceExt};
use serde_json::json;
use tracing::{debug, info};

use super::{with_finalizer, without_finalizer, CertificateStore, StoreError};
use crate::constants::CONTROLLER_NAME;
use crate::crd::{Certificate, CertificateStatus, SecretKeyReference};

/// Store backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeCertificateStore {
    client: Client,
}

impl std::fmt::Debug for KubeCertificateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeCertificateStore").finish_non_exhaustive()
    }
}

impl KubeCertificateStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, certificate: &Certificate) -> Api<Certificate> {
        let namespace = certificate.namespace().unwrap_or_else(|| "default".to_string());
        Api::namespaced(self.client.clone(), &namespace)
    }
}

fn patch_params() -> PatchParams {
    PatchParams {
        field_manager: Some(CONTROLLER_NAME.to_string()),
        ..PatchParams::default()
    }
}

/// Map API errors for `certificate` onto store errors
fn map_kube_error(certificate: &Certificate, err: kube::Error) -> StoreError {
    match err {
        kube::Error::Api(api_err) if api_err.code == 409 => StoreError::Conflict {
            namespace: certificate.namespace().unwrap_or_default(),
            name: certificate.name_any(),
        },
        kube::Error::Api(api_err) if api_err.code == 404 => StoreError::NotFound {
            namespace: certificate.namespace().unwrap_or_default(),
            name: certificate.name_any(),
        },
        other => StoreError::Kube(other),
    }
}

#[async_trait]
impl CertificateStore for KubeCertificateStore {
    async fn fetch(&self, certificate: &Certificate) -> Result<Option<Certificate>, StoreError> {
        self.api(certificate)
            .get_opt(&certificate.name_any())
            .await
            .map_err(|e| map_kube_error(certificate, e))
    }

    async fn update_status(
        &self,
        certificate: &Certificate,
        status: &CertificateStatus,
    ) -> Result<Certificate, StoreError> {
        let patch = json!({
            "metadata": { "resourceVersion": certificate.resource_version() },
            "status": serde_json::to_value(status)?,
        });

        debug!(
            name = %certificate.name_any(),
            resource_version = ?certificate.resource_version(),
            "Patching certificate status"
        );

        self.api(certificate)
            .patch_status(
                &certificate.name_any(),
                &patch_params(),
                &Patch::Merge(patch),
            )
            .await
            .map_err(|e| map_kube_error(certificate, e))
    }

    async fn add_finalizer(&self, certificate: &Certificate) -> Result<Certificate, StoreError> {
        let Some(finalizers) = with_finalizer(certificate) else {
            return Ok(certificate.clone());
        };
        info!(name = %certificate.name_any(), "Adding finalizer");
        let patch = json!({
            "metadata": {
                "resourceVersion": certificate.resource_version(),
                "finalizers": finalizers,
            }
        });
        self.api(certificate)
            .patch(
                &certificate.name_any(),
                &patch_params(),
                &Patch::Merge(patch),
            )
            .await
            .map_err(|e| map_kube_error(certificate, e))
    }

    async fn remove_finalizer(&self, certificate: &Certificate) -> Result<(), StoreError> {
        let Some(finalizers) = without_finalizer(certificate) else {
            return Ok(());
        };
        info!(name = %certificate.name_any(), "Removing finalizer");
        let patch = json!({ "metadata": { "finalizers": finalizers } });
        match self
            .api(certificate)
            .patch(
                &certificate.name_any(),
                &patch_params(),
                &Patch::Merge(patch),
            )
            .await
        {
            Ok(_) => Ok(()),
            // Already gone
            Err(kube::Error::Api(api_err)) if api_err.code == 404 => Ok(()),
            Err(e) => Err(map_kube_error(certificate, e)),
        }
    }

    async fn read_secret_key(
        &self,
        default_namespace: &str,
        reference: &SecretKeyReference,
    ) -> Result<Vec<u8>, StoreError> {
        let namespace = reference.namespace.as_deref().unwrap_or(default_namespace);
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let missing = || StoreError::MissingSecret {
            namespace: namespace.to_string(),
            name: reference.name.clone(),
            key: reference.key.clone(),
        };

        let secret = secrets.get_opt(&reference.name).await?.ok_or_else(missing)?;
        secret
            .data
            .and_then(|mut data| data.remove(&reference.key))
            .map(|bytes| bytes.0)
            .ok_or_else(missing)
    }
}
