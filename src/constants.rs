//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default HTTP server startup timeout (how long to wait for server to be ready)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default HTTP server readiness poll interval
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Requeue interval after a successful pass on a non-terminal certificate (seconds)
/// ACM issuance and validation are asynchronous, so a stable resource is
/// re-described on this cadence to pick up remote status changes.
pub const DEFAULT_REQUEUE_ON_SUCCESS_SECS: u64 = 60;

/// Requeue interval while waiting for a deleted certificate to disappear (seconds)
pub const DEFAULT_DELETION_POLL_SECS: u64 = 15;

/// Default exponential backoff starting value (milliseconds)
pub const DEFAULT_BACKOFF_START_MS: u64 = 1000;

/// Default exponential backoff maximum value (milliseconds)
pub const DEFAULT_BACKOFF_MAX_MS: u64 = 300_000;

/// Default delay before restarting watch stream after unknown errors (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;

/// Default delay before restarting watch stream after it ends (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS: u64 = 1;

/// Timeout applied to every individual ACM API call (seconds)
pub const DEFAULT_AWS_CALL_TIMEOUT_SECS: u64 = 30;

/// Default worker pool size for the controller
pub const DEFAULT_MAX_CONCURRENT_RECONCILIATIONS: usize = 10;

/// Field manager / controller name used for Kubernetes writes
pub const CONTROLLER_NAME: &str = "acm-certificate-controller";

/// Finalizer guarding remote deletion
pub const FINALIZER: &str = "acm.certificates.k8s.io/finalizer";

/// Prefix of tags the controller writes on certificates it creates
pub const TRACKING_TAG_PREFIX: &str = "acm.certificates.k8s.io/";

/// Tracking tag carrying the owning resource namespace
pub const TRACKING_TAG_NAMESPACE: &str = "acm.certificates.k8s.io/namespace";

/// Tracking tag carrying the owning resource name
pub const TRACKING_TAG_NAME: &str = "acm.certificates.k8s.io/name";

/// Prefix reserved by AWS for system tags
pub const AWS_RESERVED_TAG_PREFIX: &str = "aws:";

/// DNS validation only works for up to 5 chained CNAME records
pub const MAX_PUBLIC_DOMAIN_VALIDATION_OPTIONS: usize = 5;

/// ACM limit on tags per certificate
pub const MAX_TAGS_PER_CERTIFICATE: usize = 50;
