//! # Provider Errors
//!
//! Classification of remote call failures. "Not found" is not modelled here
//! for `describe`/`list_tags`, which return `Ok(None)` instead.

use thiserror::Error;

/// Error returned by a `CertificateProvider` call
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The referenced certificate does not exist
    #[error("certificate {arn} not found")]
    NotFound { arn: String },

    /// Network, timeout, throttling or server-side failure; safe to retry
    #[error("transient error calling {operation}: {message}")]
    Transient { operation: String, message: String },

    /// The request itself was rejected as malformed
    #[error("{operation} rejected: {message}")]
    Validation { operation: String, message: String },

    /// The remote service reported a permanent failure
    #[error("{operation} failed permanently: {message}")]
    Terminal { operation: String, message: String },
}

impl ProviderError {
    /// Label used for the API call outcome metric
    #[must_use]
    pub fn outcome(&self) -> &'static str {
        match self {
            ProviderError::NotFound { .. } => "not_found",
            ProviderError::Transient { .. } => "transient",
            ProviderError::Validation { .. } => "validation",
            ProviderError::Terminal { .. } => "terminal",
        }
    }

    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Transient { .. })
    }

    pub(crate) fn timeout(operation: &str, after: std::time::Duration) -> Self {
        ProviderError::Transient {
            operation: operation.to_string(),
            message: format!("timed out after {}s", after.as_secs()),
        }
    }
}
