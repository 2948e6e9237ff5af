//! # AWS Certificate Manager Client
//!
//! Client for the ACM API.
//!
//! This module provides:
//! - Construction of the SDK client from the default credential chain
//!   (IRSA on EKS, environment, profile)
//! - Classification of SDK errors into `ProviderError`
//! - Per-call timeout and API call metrics
//!
//! The `CertificateProvider` implementation lives in `operations.rs`.

use crate::observability::metrics;
use crate::provider::ProviderError;
use anyhow::Result;
use aws_sdk_acm::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_acm::Client as AcmClient;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug_span, info, Instrument};

mod operations;

/// AWS Certificate Manager provider implementation
pub struct AwsCertificateManager {
    client: AcmClient,
    region: String,
    call_timeout: Duration,
}

impl std::fmt::Debug for AwsCertificateManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCertificateManager")
            .field("region", &self.region)
            .field("call_timeout", &self.call_timeout)
            .finish_non_exhaustive()
    }
}

impl AwsCertificateManager {
    /// Create a new ACM client
    ///
    /// When `region` is `None` the SDK default region chain is used. Credentials
    /// always come from the default chain, which covers IRSA via the pod's
    /// service account annotation `eks.amazonaws.com/role-arn`.
    #[allow(
        clippy::missing_errors_doc,
        reason = "Error documentation is provided in doc comments"
    )]
    pub async fn new(region: Option<&str>, call_timeout: Duration) -> Result<Self> {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region.to_string()));
        }
        let sdk_config = loader.load().await;

        let region = sdk_config
            .region()
            .map_or_else(|| "unknown".to_string(), ToString::to_string);
        info!(
            region = %region,
            call_timeout_secs = call_timeout.as_secs(),
            "Initialized ACM client"
        );

        Ok(Self {
            client: AcmClient::new(&sdk_config),
            region,
            call_timeout,
        })
    }

    /// Run one API call under the per-call timeout and record its outcome
    async fn timed<T, F>(&self, operation: &'static str, arn: &str, call: F) -> Result<T, ProviderError>
    where
        F: Future<Output = Result<T, ProviderError>> + Send,
    {
        let span = debug_span!(
            "acm.call",
            operation = operation,
            arn = arn,
            region = %self.region
        );
        let start = Instant::now();

        let result = match tokio::time::timeout(self.call_timeout, call.instrument(span)).await {
            Ok(result) => result,
            Err(_elapsed) => Err(ProviderError::timeout(operation, self.call_timeout)),
        };

        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.outcome(),
        };
        metrics::record_api_call(operation, outcome, start.elapsed().as_secs_f64());
        result
    }
}

/// Map an SDK error onto the provider error taxonomy
pub(crate) fn classify_sdk_error<E, R>(operation: &str, arn: &str, err: &SdkError<E, R>) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let message = DisplayErrorContext(err).to_string();
    match err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            ProviderError::Transient {
                operation: operation.to_string(),
                message,
            }
        }
        SdkError::ConstructionFailure(_) => ProviderError::Validation {
            operation: operation.to_string(),
            message,
        },
        _ => classify_error_code(operation, arn, err.code(), message),
    }
}

/// Map an ACM error code onto the provider error taxonomy
///
/// Unknown codes are treated as transient and retried with backoff.
pub(crate) fn classify_error_code(
    operation: &str,
    arn: &str,
    code: Option<&str>,
    message: String,
) -> ProviderError {
    let operation = operation.to_string();
    match code {
        Some("ResourceNotFoundException") => ProviderError::NotFound {
            arn: arn.to_string(),
        },
        Some(
            "LimitExceededException"
            | "InvalidDomainValidationOptionsException"
            | "InvalidStateException",
        ) => ProviderError::Terminal { operation, message },
        Some(
            "InvalidParameterException"
            | "InvalidArnException"
            | "InvalidTagException"
            | "TooManyTagsException"
            | "TagPolicyException"
            | "ValidationException"
            | "InvalidArgsException"
            | "AccessDeniedException",
        ) => ProviderError::Validation { operation, message },
        _ => ProviderError::Transient { operation, message },
    }
}

/// Convert an SDK timestamp to chrono
pub(crate) fn to_chrono(value: &aws_sdk_acm::primitives::DateTime) -> Option<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::from_timestamp(value.secs(), value.subsec_nanos())
}
