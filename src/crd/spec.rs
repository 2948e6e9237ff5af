//! # Certificate Spec
//!
//! Main CRD specification type.

use serde::{Deserialize, Serialize};

/// Certificate Custom Resource Definition
///
/// Declares a certificate that should exist in AWS Certificate Manager, either
/// requested from ACM (public or private CA) or imported from key material held
/// in Kubernetes Secrets.
///
/// # Example
///
/// ```yaml
/// apiVersion: acm.certificates.k8s.io/v1alpha1
/// kind: Certificate
/// metadata:
///   name: example-com
///   namespace: default
/// spec:
///   domainName: example.com
///   subjectAlternativeNames:
///     - www.example.com
///   validationMethod: DNS
///   tags:
///     - key: environment
///       value: dev
/// ```
#[derive(
    kube::CustomResource, Debug, Clone, Default, PartialEq, Deserialize, Serialize, schemars::JsonSchema,
)]
#[kube(
    kind = "Certificate",
    group = "acm.certificates.k8s.io",
    version = "v1alpha1",
    namespaced,
    status = "crate::crd::CertificateStatus",
    shortname = "acmcert",
    printcolumn = r#"{"name":"ARN", "type":"string", "priority": 1, "jsonPath":".status.arn"}, {"name":"Status", "type":"string", "jsonPath":".status.status"}, {"name":"Phase", "type":"string", "jsonPath":".status.phase"}, {"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct CertificateSpec {
    /// Fully qualified domain name to secure (request mode)
    /// Immutable once the certificate has been requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain_name: Option<String>,
    /// Additional FQDNs included in the certificate (request mode)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subject_alternative_names: Vec<String>,
    /// How domain ownership is validated (request mode)
    /// Default: DNS
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_method: Option<crate::crd::ValidationMethod>,
    /// Per-domain validation overrides
    /// Public certificates accept at most 5 entries
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domain_validation_options: Vec<crate::crd::DomainValidationOption>,
    /// Key algorithm, e.g. RSA_2048, EC_prime256v1, EC_secp384r1
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_algorithm: Option<String>,
    /// ARN of a private certificate authority
    /// When unset the certificate is a public, Amazon-issued certificate
    #[serde(
        default,
        rename = "certificateAuthorityARN",
        skip_serializing_if = "Option::is_none"
    )]
    pub certificate_authority_arn: Option<String>,
    /// Certificate options (transparency logging)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<crate::crd::CertificateOptions>,
    /// Tags applied to the ACM certificate
    /// Keys starting with `aws:` or the controller's own tracking prefix are ignored
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<crate::crd::Tag>,
    /// PEM certificate body to import (import mode)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate: Option<crate::crd::SecretKeyReference>,
    /// PEM private key matching the imported certificate (import mode)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<crate::crd::SecretKeyReference>,
    /// PEM certificate chain for the imported certificate (import mode)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_chain: Option<crate::crd::SecretKeyReference>,
}

impl CertificateSpec {
    /// True when the spec asks for key material to be imported instead of requested
    #[must_use]
    pub fn is_import(&self) -> bool {
        self.certificate.is_some()
    }

    /// True when the spec carries any field only meaningful for an ACM request
    #[must_use]
    pub fn has_request_fields(&self) -> bool {
        self.domain_name.is_some()
            || !self.subject_alternative_names.is_empty()
            || !self.domain_validation_options.is_empty()
            || self.key_algorithm.is_some()
            || self.options.is_some()
    }

    /// Public certificates are those not issued by a private CA
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.certificate_authority_arn.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::CustomResourceExt;

    #[test]
    fn test_spec_deserializes_camel_case_fields() {
        let yaml = r"
domainName: example.com
subjectAlternativeNames: [www.example.com]
validationMethod: DNS
certificateAuthorityARN: arn:aws:acm-pca:us-west-2:111122223333:certificate-authority/abc
tags:
  - key: environment
    value: dev
";
        let spec: CertificateSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.domain_name.as_deref(), Some("example.com"));
        assert_eq!(spec.subject_alternative_names, vec!["www.example.com"]);
        assert_eq!(
            spec.validation_method,
            Some(crate::crd::ValidationMethod::Dns)
        );
        assert!(!spec.is_public());
        assert!(!spec.is_import());
        assert!(spec.has_request_fields());
        assert_eq!(spec.tags.len(), 1);
    }

    #[test]
    fn test_import_spec_has_no_request_fields() {
        let yaml = r"
certificate: {name: imported, key: tls.crt}
privateKey: {name: imported, key: tls.key}
";
        let spec: CertificateSpec = serde_yaml::from_str(yaml).unwrap();
        assert!(spec.is_import());
        assert!(!spec.has_request_fields());
    }

    #[test]
    fn test_crd_metadata() {
        let crd = Certificate::crd();
        assert_eq!(
            crd.metadata.name.as_deref(),
            Some("certificates.acm.certificates.k8s.io")
        );
        assert_eq!(crd.spec.names.kind, "Certificate");
        assert_eq!(crd.spec.scope, "Namespaced");
    }
}
