//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use std::time::Duration;

use super::{env_var_or_default, env_var_or_default_str};

/// Controller-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Requeue interval after a successful pass on a non-terminal certificate (seconds)
    pub requeue_on_success_secs: u64,
    /// Requeue interval while waiting for a deleted certificate to disappear (seconds)
    pub deletion_poll_secs: u64,
    /// Exponential backoff starting value (milliseconds)
    /// Initial delay before retrying after a transient error
    pub backoff_start_ms: u64,
    /// Exponential backoff maximum value (milliseconds)
    /// Maximum delay between retries
    pub backoff_max_ms: u64,
    /// Watch stream restart delay after unknown errors (seconds)
    pub watch_restart_delay_secs: u64,
    /// Watch stream restart delay after stream ends (seconds)
    pub watch_restart_delay_after_end_secs: u64,
    /// Timeout applied to each ACM API call (seconds)
    pub aws_call_timeout_secs: u64,
    /// AWS region; the SDK default chain is used when unset
    pub aws_region: Option<String>,
    /// Maximum concurrent reconciliations
    /// Limits how many resources can be reconciled simultaneously
    pub max_concurrent_reconciliations: usize,
    /// Log format (json, text)
    pub log_format: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            requeue_on_success_secs: DEFAULT_REQUEUE_ON_SUCCESS_SECS,
            deletion_poll_secs: DEFAULT_DELETION_POLL_SECS,
            backoff_start_ms: DEFAULT_BACKOFF_START_MS,
            backoff_max_ms: DEFAULT_BACKOFF_MAX_MS,
            watch_restart_delay_secs: DEFAULT_WATCH_RESTART_DELAY_SECS,
            watch_restart_delay_after_end_secs: DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS,
            aws_call_timeout_secs: DEFAULT_AWS_CALL_TIMEOUT_SECS,
            aws_region: None,
            max_concurrent_reconciliations: DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
            log_format: "json".to_string(),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        use crate::constants::*;
        Self {
            requeue_on_success_secs: env_var_or_default(
                "REQUEUE_ON_SUCCESS_SECS",
                DEFAULT_REQUEUE_ON_SUCCESS_SECS,
            ),
            deletion_poll_secs: env_var_or_default("DELETION_POLL_SECS", DEFAULT_DELETION_POLL_SECS),
            backoff_start_ms: env_var_or_default("BACKOFF_START_MS", DEFAULT_BACKOFF_START_MS),
            backoff_max_ms: env_var_or_default("BACKOFF_MAX_MS", DEFAULT_BACKOFF_MAX_MS),
            watch_restart_delay_secs: env_var_or_default(
                "WATCH_RESTART_DELAY_SECS",
                DEFAULT_WATCH_RESTART_DELAY_SECS,
            ),
            watch_restart_delay_after_end_secs: env_var_or_default(
                "WATCH_RESTART_DELAY_AFTER_END_SECS",
                DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS,
            ),
            aws_call_timeout_secs: env_var_or_default(
                "AWS_CALL_TIMEOUT_SECS",
                DEFAULT_AWS_CALL_TIMEOUT_SECS,
            ),
            aws_region: std::env::var("AWS_REGION").ok().filter(|r| !r.is_empty()),
            max_concurrent_reconciliations: env_var_or_default(
                "MAX_CONCURRENT_RECONCILIATIONS",
                DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
            ),
            log_format: env_var_or_default_str("LOG_FORMAT", "json"),
        }
    }

    /// Get success requeue duration
    #[must_use]
    pub fn requeue_on_success_duration(&self) -> Duration {
        Duration::from_secs(self.requeue_on_success_secs)
    }

    /// Get deletion poll duration
    #[must_use]
    pub fn deletion_poll_duration(&self) -> Duration {
        Duration::from_secs(self.deletion_poll_secs)
    }

    /// Get watch restart delay duration
    #[must_use]
    pub fn watch_restart_delay_duration(&self) -> Duration {
        Duration::from_secs(self.watch_restart_delay_secs)
    }

    /// Get watch restart delay after end duration
    #[must_use]
    pub fn watch_restart_delay_after_end_duration(&self) -> Duration {
        Duration::from_secs(self.watch_restart_delay_after_end_secs)
    }

    /// Get per-call ACM timeout
    #[must_use]
    pub fn aws_call_timeout(&self) -> Duration {
        Duration::from_secs(self.aws_call_timeout_secs)
    }
}
