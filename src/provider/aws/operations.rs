//! # ACM Operations
//!
//! Implements `CertificateProvider` for AWS Certificate Manager.

use crate::crd::{CertificateSpec, DomainValidation, ResourceRecord, Tag};
use crate::provider::{
    CertificateProvider, CertificateType, ImportMaterial, ProviderError, RemoteSnapshot,
    RemoteStatus, TagDelta,
};
use async_trait::async_trait;
use aws_sdk_acm::primitives::Blob;
use aws_sdk_acm::types as acm;
use tracing::{debug, info};

use super::{classify_sdk_error, to_chrono, AwsCertificateManager};

fn build_error(operation: &str, err: &aws_sdk_acm::error::BuildError) -> ProviderError {
    ProviderError::Validation {
        operation: operation.to_string(),
        message: err.to_string(),
    }
}

fn to_sdk_tags(operation: &str, tags: &[Tag]) -> Result<Vec<acm::Tag>, ProviderError> {
    tags.iter()
        .map(|tag| {
            acm::Tag::builder()
                .key(&tag.key)
                .set_value(tag.value.clone())
                .build()
                .map_err(|e| build_error(operation, &e))
        })
        .collect()
}

fn to_domain_validation(dv: &acm::DomainValidation) -> DomainValidation {
    DomainValidation {
        domain_name: dv.domain_name().to_string(),
        validation_status: dv.validation_status().map(|s| s.as_str().to_string()),
        validation_method: dv.validation_method().map(|m| m.as_str().to_string()),
        resource_record: dv.resource_record().map(|rr| ResourceRecord {
            name: rr.name().to_string(),
            r#type: rr.r#type().as_str().to_string(),
            value: rr.value().to_string(),
        }),
    }
}

#[async_trait]
impl CertificateProvider for AwsCertificateManager {
    async fn describe(&self, arn: &str) -> Result<Option<RemoteSnapshot>, ProviderError> {
        const OP: &str = "DescribeCertificate";
        let result = self
            .timed(OP, arn, async {
                self.client
                    .describe_certificate()
                    .certificate_arn(arn)
                    .send()
                    .await
                    .map_err(|e| classify_sdk_error(OP, arn, &e))
            })
            .await;

        let output = match result {
            Ok(output) => output,
            Err(ProviderError::NotFound { .. }) => {
                debug!(arn = arn, "Certificate not found");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let Some(detail) = output.certificate() else {
            return Ok(None);
        };

        Ok(Some(RemoteSnapshot {
            arn: detail.certificate_arn().unwrap_or(arn).to_string(),
            status: RemoteStatus::parse(detail.status().map_or("", |s| s.as_str())),
            certificate_type: CertificateType::parse(detail.r#type().map_or("", |t| t.as_str())),
            domain_name: detail.domain_name().unwrap_or_default().to_string(),
            subject_alternative_names: detail.subject_alternative_names().to_vec(),
            issued_at: detail
                .issued_at()
                .or(detail.imported_at())
                .and_then(to_chrono),
            not_after: detail.not_after().and_then(to_chrono),
            failure_reason: detail.failure_reason().map(|r| r.as_str().to_string()),
            domain_validations: detail
                .domain_validation_options()
                .iter()
                .map(to_domain_validation)
                .collect(),
            transparency_logging: detail
                .options()
                .and_then(|o| o.certificate_transparency_logging_preference())
                .map(|p| p.as_str().to_string()),
            tags: Vec::new(),
        }))
    }

    async fn list_tags(&self, arn: &str) -> Result<Option<Vec<Tag>>, ProviderError> {
        const OP: &str = "ListTagsForCertificate";
        let result = self
            .timed(OP, arn, async {
                self.client
                    .list_tags_for_certificate()
                    .certificate_arn(arn)
                    .send()
                    .await
                    .map_err(|e| classify_sdk_error(OP, arn, &e))
            })
            .await;

        match result {
            Ok(output) => Ok(Some(
                output
                    .tags()
                    .iter()
                    .map(|t| Tag {
                        key: t.key().to_string(),
                        value: t.value().map(ToString::to_string),
                    })
                    .collect(),
            )),
            Err(ProviderError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn request_certificate(
        &self,
        spec: &CertificateSpec,
        idempotency_token: &str,
        tags: &[Tag],
    ) -> Result<String, ProviderError> {
        const OP: &str = "RequestCertificate";
        let Some(domain_name) = spec.domain_name.as_deref() else {
            return Err(ProviderError::Validation {
                operation: OP.to_string(),
                message: "domainName is required to request a certificate".to_string(),
            });
        };

        let validation_options = spec
            .domain_validation_options
            .iter()
            .map(|dvo| {
                acm::DomainValidationOption::builder()
                    .domain_name(&dvo.domain_name)
                    .validation_domain(&dvo.validation_domain)
                    .build()
                    .map_err(|e| build_error(OP, &e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut request = self
            .client
            .request_certificate()
            .domain_name(domain_name)
            .idempotency_token(idempotency_token)
            .set_tags(Some(to_sdk_tags(OP, tags)?));

        if !spec.subject_alternative_names.is_empty() {
            request = request.set_subject_alternative_names(Some(spec.subject_alternative_names.clone()));
        }
        if !validation_options.is_empty() {
            request = request.set_domain_validation_options(Some(validation_options));
        }
        if let Some(method) = spec.validation_method {
            request = request.validation_method(acm::ValidationMethod::from(method.as_str()));
        }
        if let Some(algorithm) = spec.key_algorithm.as_deref() {
            request = request.key_algorithm(acm::KeyAlgorithm::from(algorithm));
        }
        if let Some(ca_arn) = spec.certificate_authority_arn.as_deref() {
            request = request.certificate_authority_arn(ca_arn);
        }
        if let Some(preference) = spec
            .options
            .as_ref()
            .and_then(|o| o.certificate_transparency_logging_preference.as_deref())
        {
            request = request.options(
                acm::CertificateOptions::builder()
                    .certificate_transparency_logging_preference(
                        acm::CertificateTransparencyLoggingPreference::from(preference),
                    )
                    .build(),
            );
        }

        let output = self
            .timed(OP, domain_name, async {
                request.send().await.map_err(|e| classify_sdk_error(OP, "", &e))
            })
            .await?;

        let arn = output
            .certificate_arn()
            .ok_or_else(|| ProviderError::Transient {
                operation: OP.to_string(),
                message: "response carried no certificate ARN".to_string(),
            })?
            .to_string();
        info!(arn = %arn, domain_name = domain_name, "Requested ACM certificate");
        Ok(arn)
    }

    async fn import_certificate(
        &self,
        material: &ImportMaterial,
        tags: &[Tag],
    ) -> Result<String, ProviderError> {
        const OP: &str = "ImportCertificate";
        let request = self
            .client
            .import_certificate()
            .certificate(Blob::new(material.certificate.clone()))
            .private_key(Blob::new(material.private_key.to_vec()))
            .set_certificate_chain(material.certificate_chain.clone().map(Blob::new))
            .set_tags(Some(to_sdk_tags(OP, tags)?));

        let output = self
            .timed(OP, "", async {
                request.send().await.map_err(|e| classify_sdk_error(OP, "", &e))
            })
            .await?;

        let arn = output
            .certificate_arn()
            .ok_or_else(|| ProviderError::Transient {
                operation: OP.to_string(),
                message: "response carried no certificate ARN".to_string(),
            })?
            .to_string();
        info!(arn = %arn, "Imported certificate into ACM");
        Ok(arn)
    }

    async fn update_tags(&self, arn: &str, delta: &TagDelta) -> Result<(), ProviderError> {
        if !delta.to_remove.is_empty() {
            const OP: &str = "RemoveTagsFromCertificate";
            let tags = to_sdk_tags(OP, &delta.to_remove)?;
            self.timed(OP, arn, async {
                self.client
                    .remove_tags_from_certificate()
                    .certificate_arn(arn)
                    .set_tags(Some(tags))
                    .send()
                    .await
                    .map_err(|e| classify_sdk_error(OP, arn, &e))
            })
            .await?;
        }

        if !delta.to_add.is_empty() {
            const OP: &str = "AddTagsToCertificate";
            let tags = to_sdk_tags(OP, &delta.to_add)?;
            self.timed(OP, arn, async {
                self.client
                    .add_tags_to_certificate()
                    .certificate_arn(arn)
                    .set_tags(Some(tags))
                    .send()
                    .await
                    .map_err(|e| classify_sdk_error(OP, arn, &e))
            })
            .await?;
        }

        info!(
            arn = arn,
            added = delta.to_add.len(),
            removed = delta.to_remove.len(),
            "Updated certificate tags"
        );
        Ok(())
    }

    async fn update_options(&self, arn: &str, transparency_logging: &str) -> Result<(), ProviderError> {
        const OP: &str = "UpdateCertificateOptions";
        let options = acm::CertificateOptions::builder()
            .certificate_transparency_logging_preference(
                acm::CertificateTransparencyLoggingPreference::from(transparency_logging),
            )
            .build();
        self.timed(OP, arn, async {
            self.client
                .update_certificate_options()
                .certificate_arn(arn)
                .options(options)
                .send()
                .await
                .map_err(|e| classify_sdk_error(OP, arn, &e))
        })
        .await?;
        info!(
            arn = arn,
            transparency_logging = transparency_logging,
            "Updated certificate options"
        );
        Ok(())
    }

    async fn delete(&self, arn: &str) -> Result<(), ProviderError> {
        const OP: &str = "DeleteCertificate";
        let result = self
            .timed(OP, arn, async {
                self.client
                    .delete_certificate()
                    .certificate_arn(arn)
                    .send()
                    .await
                    .map_err(|e| classify_sdk_error(OP, arn, &e))
            })
            .await;

        match result {
            Ok(_) => {
                info!(arn = arn, "Deleted ACM certificate");
                Ok(())
            }
            Err(ProviderError::NotFound { .. }) => {
                debug!(arn = arn, "Certificate already deleted");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
