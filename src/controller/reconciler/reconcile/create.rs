//! # Create
//!
//! Requests or imports the remote certificate for a resource with no ARN.

use crate::constants::{TRACKING_TAG_NAME, TRACKING_TAG_NAMESPACE};
use crate::controller::reconciler::diff::is_system_tag;
use crate::controller::reconciler::types::{Reconciler, ReconcilerError};
use crate::crd::{Certificate, Tag};
use crate::provider::ImportMaterial;
use tracing::{debug, info};
use zeroize::Zeroizing;

/// Idempotency token for `RequestCertificate`, stable per resource UID
///
/// ACM limits the token to 32 word characters; an MD5 hex digest fits.
#[must_use]
pub fn idempotency_token(uid: &str) -> String {
    format!("{:x}", md5::compute(uid.as_bytes()))
}

/// Tracking tags followed by the user's own tags
#[must_use]
pub fn creation_tags(namespace: &str, name: &str, user_tags: &[Tag]) -> Vec<Tag> {
    let mut tags = vec![
        Tag::new(TRACKING_TAG_NAMESPACE, namespace),
        Tag::new(TRACKING_TAG_NAME, name),
    ];
    tags.extend(user_tags.iter().filter(|t| !is_system_tag(&t.key)).cloned());
    tags
}

/// Create the remote certificate and return its ARN
pub async fn create_certificate(
    certificate: &Certificate,
    ctx: &Reconciler,
) -> Result<String, ReconcilerError> {
    let name = certificate.metadata.name.as_deref().unwrap_or("unknown");
    let namespace = certificate.metadata.namespace.as_deref().unwrap_or("default");
    let spec = &certificate.spec;
    let tags = creation_tags(namespace, name, &spec.tags);

    if spec.is_import() {
        let material = read_import_material(certificate, ctx, namespace).await?;
        let arn = ctx.provider.import_certificate(&material, &tags).await?;
        info!("📥 Imported certificate for {}/{}: {}", namespace, name, arn);
        Ok(arn)
    } else {
        // Without a UID (never the case for stored objects) fall back to the identity
        let uid = certificate
            .metadata
            .uid
            .clone()
            .unwrap_or_else(|| format!("{namespace}/{name}"));
        let token = idempotency_token(&uid);
        debug!("Requesting certificate for {}/{} with token {}", namespace, name, token);
        let arn = ctx
            .provider
            .request_certificate(spec, &token, &tags)
            .await?;
        info!(
            "📜 Requested certificate for {}/{} ({}): {}",
            namespace,
            name,
            spec.domain_name.as_deref().unwrap_or_default(),
            arn
        );
        Ok(arn)
    }
}

async fn read_import_material(
    certificate: &Certificate,
    ctx: &Reconciler,
    namespace: &str,
) -> Result<ImportMaterial, ReconcilerError> {
    let spec = &certificate.spec;
    let (Some(cert_ref), Some(key_ref)) = (&spec.certificate, &spec.private_key) else {
        return Err(ReconcilerError::Validation(
            "certificate and privateKey are required to import".to_string(),
        ));
    };

    let certificate = ctx.store.read_secret_key(namespace, cert_ref).await?;
    let private_key = Zeroizing::new(ctx.store.read_secret_key(namespace, key_ref).await?);
    let certificate_chain = match &spec.certificate_chain {
        Some(chain_ref) => Some(ctx.store.read_secret_key(namespace, chain_ref).await?),
        None => None,
    };

    Ok(ImportMaterial {
        certificate,
        private_key,
        certificate_chain,
    })
}
