//! # Spec Options
//!
//! Nested types referenced from `CertificateSpec`.

use serde::{Deserialize, Serialize};

/// A key/value tag attached to the ACM certificate
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
        }
    }
}

/// Domain ownership validation method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
pub enum ValidationMethod {
    #[serde(rename = "DNS")]
    Dns,
    #[serde(rename = "EMAIL")]
    Email,
}

impl ValidationMethod {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationMethod::Dns => "DNS",
            ValidationMethod::Email => "EMAIL",
        }
    }
}

/// Overrides the domain ACM validates against for one name on the certificate
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DomainValidationOption {
    pub domain_name: String,
    pub validation_domain: String,
}

/// Certificate request options
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertificateOptions {
    /// ENABLED or DISABLED
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_transparency_logging_preference: Option<String>,
}

/// Reference to one entry of a Kubernetes Secret
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretKeyReference {
    /// Secret name
    pub name: String,
    /// Secret namespace (defaults to the Certificate's namespace)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Key within the Secret's data
    pub key: String,
}
