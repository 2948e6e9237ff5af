//! # Spec Validation
//!
//! Checks a `CertificateSpec` before any remote call is made.
//!
//! Two outcomes are distinguished: a spec that is malformed and can be fixed
//! by editing it (`ReconcilerError::Validation`), and a request ACM will
//! permanently refuse (`ReconcilerError::TerminalDomain`).

use crate::constants::{
    AWS_RESERVED_TAG_PREFIX, MAX_PUBLIC_DOMAIN_VALIDATION_OPTIONS, MAX_TAGS_PER_CERTIFICATE,
    TRACKING_TAG_PREFIX,
};
use crate::controller::reconciler::types::ReconcilerError;
use crate::crd::CertificateSpec;
use regex::Regex;
use std::sync::LazyLock;

/// Condition message for a public request with too many domain validation options
pub const TOO_MANY_DVO_MESSAGE: &str =
    "Certificate cannot have more than 5 domain validation options when requesting a public certificate";

// ACM private CA ARN, e.g. arn:aws:acm-pca:us-west-2:111122223333:certificate-authority/abc
static CA_ARN_REGEX: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^arn:aws[a-z-]*:acm-pca:[a-z0-9-]+:\d{12}:certificate-authority/[A-Za-z0-9-]+$")
        .ok()
});

// ACM tag key character set
static TAG_KEY_REGEX: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[\p{L}\p{Z}\p{N}_.:/=+\-@]{1,128}$").ok());

/// Validate a certificate spec
///
/// # Errors
///
/// `TerminalDomain` for a public request with more than five domain
/// validation options, `Validation` for any other malformed spec.
pub fn validate_certificate_spec(spec: &CertificateSpec) -> Result<(), ReconcilerError> {
    if spec.is_import() {
        validate_import(spec)?;
    } else {
        validate_request(spec)?;
    }
    validate_tags(spec)
}

fn validate_import(spec: &CertificateSpec) -> Result<(), ReconcilerError> {
    if spec.has_request_fields() || spec.certificate_authority_arn.is_some() {
        return Err(invalid(
            "certificate import cannot be combined with domainName, subjectAlternativeNames, \
             domainValidationOptions, keyAlgorithm, options or certificateAuthorityARN",
        ));
    }
    if spec.private_key.is_none() {
        return Err(invalid("privateKey is required when importing a certificate"));
    }
    Ok(())
}

fn validate_request(spec: &CertificateSpec) -> Result<(), ReconcilerError> {
    if spec.private_key.is_some() || spec.certificate_chain.is_some() {
        return Err(invalid(
            "privateKey and certificateChain are only valid together with certificate",
        ));
    }

    let Some(domain_name) = spec.domain_name.as_deref() else {
        return Err(invalid("either domainName or certificate must be set"));
    };
    if domain_name.trim().is_empty() {
        return Err(invalid("domainName must not be empty"));
    }
    if spec.subject_alternative_names.iter().any(|san| san.trim().is_empty()) {
        return Err(invalid("subjectAlternativeNames must not contain empty names"));
    }

    if let Some(ca_arn) = spec.certificate_authority_arn.as_deref() {
        let valid = CA_ARN_REGEX.as_ref().is_none_or(|re| re.is_match(ca_arn));
        if !valid {
            return Err(invalid(&format!(
                "certificateAuthorityARN '{ca_arn}' is not a private CA ARN"
            )));
        }
    }

    if spec.is_public() && spec.domain_validation_options.len() > MAX_PUBLIC_DOMAIN_VALIDATION_OPTIONS
    {
        return Err(ReconcilerError::TerminalDomain(TOO_MANY_DVO_MESSAGE.to_string()));
    }

    Ok(())
}

fn validate_tags(spec: &CertificateSpec) -> Result<(), ReconcilerError> {
    if spec.tags.len() > MAX_TAGS_PER_CERTIFICATE {
        return Err(invalid(&format!(
            "at most {MAX_TAGS_PER_CERTIFICATE} tags are allowed, got {}",
            spec.tags.len()
        )));
    }
    for tag in &spec.tags {
        if tag.key.is_empty() {
            return Err(invalid("tag keys must not be empty"));
        }
        if tag.key.starts_with(AWS_RESERVED_TAG_PREFIX) || tag.key.starts_with(TRACKING_TAG_PREFIX)
        {
            return Err(invalid(&format!("tag key '{}' uses a reserved prefix", tag.key)));
        }
        let valid = TAG_KEY_REGEX.as_ref().is_none_or(|re| re.is_match(&tag.key));
        if !valid {
            return Err(invalid(&format!("tag key '{}' contains invalid characters", tag.key)));
        }
    }
    Ok(())
}

fn invalid(message: &str) -> ReconcilerError {
    ReconcilerError::Validation(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{DomainValidationOption, SecretKeyReference, Tag};

    fn request() -> CertificateSpec {
        CertificateSpec {
            domain_name: Some("example.com".to_string()),
            ..Default::default()
        }
    }

    fn secret(key: &str) -> Option<SecretKeyReference> {
        Some(SecretKeyReference {
            name: "imported".to_string(),
            namespace: None,
            key: key.to_string(),
        })
    }

    fn dvos(count: usize) -> Vec<DomainValidationOption> {
        (0..count)
            .map(|i| DomainValidationOption {
                domain_name: format!("d{i}.example.com"),
                validation_domain: "example.com".to_string(),
            })
            .collect()
    }

    #[test]
    fn test_valid_request() {
        assert!(validate_certificate_spec(&request()).is_ok());
    }

    #[test]
    fn test_valid_import() {
        let spec = CertificateSpec {
            certificate: secret("tls.crt"),
            private_key: secret("tls.key"),
            ..Default::default()
        };
        assert!(validate_certificate_spec(&spec).is_ok());
    }

    #[test]
    fn test_import_without_private_key() {
        let spec = CertificateSpec {
            certificate: secret("tls.crt"),
            ..Default::default()
        };
        let err = validate_certificate_spec(&spec).unwrap_err();
        assert!(matches!(err, ReconcilerError::Validation(_)));
    }

    #[test]
    fn test_import_and_request_fields_conflict() {
        let spec = CertificateSpec {
            certificate: secret("tls.crt"),
            private_key: secret("tls.key"),
            ..request()
        };
        let err = validate_certificate_spec(&spec).unwrap_err();
        assert!(matches!(err, ReconcilerError::Validation(_)));
    }

    #[test]
    fn test_missing_domain_and_certificate() {
        let err = validate_certificate_spec(&CertificateSpec::default()).unwrap_err();
        assert!(matches!(err, ReconcilerError::Validation(_)));
    }

    #[test]
    fn test_too_many_dvos_on_public_is_terminal() {
        let spec = CertificateSpec {
            domain_validation_options: dvos(6),
            ..request()
        };
        let err = validate_certificate_spec(&spec).unwrap_err();
        match err {
            ReconcilerError::TerminalDomain(message) => assert_eq!(message, TOO_MANY_DVO_MESSAGE),
            other => panic!("expected terminal error, got {other:?}"),
        }

        let at_limit = CertificateSpec {
            domain_validation_options: dvos(5),
            ..request()
        };
        assert!(validate_certificate_spec(&at_limit).is_ok());
    }

    #[test]
    fn test_private_certificates_have_no_dvo_limit() {
        let spec = CertificateSpec {
            domain_validation_options: dvos(6),
            certificate_authority_arn: Some(
                "arn:aws:acm-pca:us-west-2:111122223333:certificate-authority/abc-123".to_string(),
            ),
            ..request()
        };
        assert!(validate_certificate_spec(&spec).is_ok());
    }

    #[test]
    fn test_malformed_ca_arn() {
        let spec = CertificateSpec {
            certificate_authority_arn: Some("not-an-arn".to_string()),
            ..request()
        };
        assert!(matches!(
            validate_certificate_spec(&spec).unwrap_err(),
            ReconcilerError::Validation(_)
        ));
    }

    #[test]
    fn test_reserved_tag_prefixes_rejected() {
        for key in ["aws:foo", "acm.certificates.k8s.io/name"] {
            let spec = CertificateSpec {
                tags: vec![Tag::new(key, "x")],
                ..request()
            };
            assert!(validate_certificate_spec(&spec).is_err(), "{key}");
        }
    }

    #[test]
    fn test_too_many_tags() {
        let spec = CertificateSpec {
            tags: (0..51).map(|i| Tag::new(format!("k{i}"), "v")).collect(),
            ..request()
        };
        assert!(matches!(
            validate_certificate_spec(&spec).unwrap_err(),
            ReconcilerError::Validation(_)
        ));
    }

    #[test]
    fn test_tag_key_characters() {
        let ok = CertificateSpec {
            tags: vec![Tag::new("team/owner-email@example.com", "x")],
            ..request()
        };
        assert!(validate_certificate_spec(&ok).is_ok());

        let bad = CertificateSpec {
            tags: vec![Tag::new("bad*key", "x")],
            ..request()
        };
        assert!(validate_certificate_spec(&bad).is_err());
    }
}
