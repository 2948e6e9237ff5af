//! # Metrics
//!
//! Prometheus metrics for monitoring the controller.
//!
//! ## Metrics Exposed
//!
//! - `acm_certificate_reconciliations_total` - Total number of reconciliation passes
//! - `acm_certificate_reconciliation_errors_total` - Reconciliation errors by error kind
//! - `acm_certificate_reconciliation_duration_seconds` - Duration of reconciliation passes
//! - `acm_certificate_requeues_total` - Reconciliations by trigger source
//! - `acm_certificate_api_calls_total` - ACM API calls by operation and outcome
//! - `acm_certificate_api_call_duration_seconds` - Duration of ACM API calls by operation
//! - `acm_certificate_certificates` - Managed certificates by remote status
//! - `acm_certificate_terminal_failures_total` - Resources moved to `TerminallyFailed`
//! - `acm_certificate_status_conflicts_total` - Status writes rejected by a newer resource version

use anyhow::Result;
use prometheus::{
    Histogram, HistogramVec, IntCounter, IntCounterVec, IntGaugeVec, Registry,
};
use std::sync::LazyLock;

// Metrics
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static RECONCILIATIONS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "acm_certificate_reconciliations_total",
        "Total number of reconciliations",
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "acm_certificate_reconciliation_errors_total",
            "Total number of reconciliation errors by error kind",
        ),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

static RECONCILIATION_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "acm_certificate_reconciliation_duration_seconds",
            "Duration of reconciliation in seconds",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0]),
    )
    .expect("Failed to create RECONCILIATION_DURATION metric - this should never happen")
});

static REQUEUES_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "acm_certificate_requeues_total",
            "Total number of reconciliations by trigger source",
        ),
        &["trigger"],
    )
    .expect("Failed to create REQUEUES_TOTAL metric - this should never happen")
});

static API_CALLS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "acm_certificate_api_calls_total",
            "Total number of ACM API calls by operation and outcome",
        ),
        &["operation", "outcome"],
    )
    .expect("Failed to create API_CALLS_TOTAL metric - this should never happen")
});

static API_CALL_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "acm_certificate_api_call_duration_seconds",
            "Duration of ACM API calls in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 30.0]),
        &["operation"],
    )
    .expect("Failed to create API_CALL_DURATION metric - this should never happen")
});

static CERTIFICATES_BY_STATUS: LazyLock<IntGaugeVec> = LazyLock::new(|| {
    IntGaugeVec::new(
        prometheus::Opts::new(
            "acm_certificate_certificates",
            "Current number of managed certificates by remote status",
        ),
        &["status"],
    )
    .expect("Failed to create CERTIFICATES_BY_STATUS metric - this should never happen")
});

static TERMINAL_FAILURES_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "acm_certificate_terminal_failures_total",
        "Total number of certificates moved to TerminallyFailed",
    )
    .expect("Failed to create TERMINAL_FAILURES_TOTAL metric - this should never happen")
});

static STATUS_CONFLICTS_TOTAL: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "acm_certificate_status_conflicts_total",
        "Total number of status writes rejected because the resource changed",
    )
    .expect("Failed to create STATUS_CONFLICTS_TOTAL metric - this should never happen")
});

/// Register all metrics with the registry served on `/metrics`
///
/// # Errors
///
/// Returns an error if a metric was already registered.
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_DURATION.clone()))?;
    REGISTRY.register(Box::new(REQUEUES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(API_CALLS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(API_CALL_DURATION.clone()))?;
    REGISTRY.register(Box::new(CERTIFICATES_BY_STATUS.clone()))?;
    REGISTRY.register(Box::new(TERMINAL_FAILURES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(STATUS_CONFLICTS_TOTAL.clone()))?;

    Ok(())
}

pub fn increment_reconciliations() {
    RECONCILIATIONS_TOTAL.inc();
}

pub fn increment_reconciliation_errors(kind: &str) {
    RECONCILIATION_ERRORS_TOTAL.with_label_values(&[kind]).inc();
}

pub fn observe_reconciliation_duration(duration: f64) {
    RECONCILIATION_DURATION.observe(duration);
}

pub fn increment_requeues(trigger: &str) {
    REQUEUES_TOTAL.with_label_values(&[trigger]).inc();
}

/// Record one ACM API call
///
/// `outcome` is `ok`, `not_found` or the error classification.
pub fn record_api_call(operation: &str, outcome: &str, duration: f64) {
    API_CALLS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
    API_CALL_DURATION
        .with_label_values(&[operation])
        .observe(duration);
}

/// Move one certificate between remote status buckets
pub fn record_status_transition(previous: Option<&str>, next: Option<&str>) {
    if previous == next {
        return;
    }
    if let Some(previous) = previous {
        CERTIFICATES_BY_STATUS.with_label_values(&[previous]).dec();
    }
    if let Some(next) = next {
        CERTIFICATES_BY_STATUS.with_label_values(&[next]).inc();
    }
}

pub fn increment_terminal_failures() {
    TERMINAL_FAILURES_TOTAL.inc();
}

pub fn increment_status_conflicts() {
    STATUS_CONFLICTS_TOTAL.inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_metrics() {
        // This should not panic - metrics should register successfully
        assert!(register_metrics().is_ok());
    }

    #[test]
    fn test_increment_reconciliations() {
        let before = RECONCILIATIONS_TOTAL.get();
        increment_reconciliations();
        let after = RECONCILIATIONS_TOTAL.get();
        assert_eq!(after, before + 1u64);
    }

    #[test]
    fn test_increment_reconciliation_errors_by_kind() {
        let before = RECONCILIATION_ERRORS_TOTAL
            .with_label_values(&["transient"])
            .get();
        increment_reconciliation_errors("transient");
        let after = RECONCILIATION_ERRORS_TOTAL
            .with_label_values(&["transient"])
            .get();
        assert_eq!(after, before + 1u64);
    }

    #[test]
    fn test_record_api_call() {
        let before = API_CALLS_TOTAL
            .with_label_values(&["DescribeCertificate", "ok"])
            .get();
        record_api_call("DescribeCertificate", "ok", 0.2);
        let after = API_CALLS_TOTAL
            .with_label_values(&["DescribeCertificate", "ok"])
            .get();
        assert_eq!(after, before + 1u64);
    }

    #[test]
    fn test_record_status_transition_moves_between_buckets() {
        // Labels unique to this test so parallel tests do not interfere
        let before = CERTIFICATES_BY_STATUS
            .with_label_values(&["TEST_TRANSITION_TO"])
            .get();
        record_status_transition(None, Some("TEST_TRANSITION_FROM"));
        record_status_transition(Some("TEST_TRANSITION_FROM"), Some("TEST_TRANSITION_TO"));
        assert_eq!(
            CERTIFICATES_BY_STATUS
                .with_label_values(&["TEST_TRANSITION_FROM"])
                .get(),
            0
        );
        assert_eq!(
            CERTIFICATES_BY_STATUS
                .with_label_values(&["TEST_TRANSITION_TO"])
                .get(),
            before + 1
        );
    }

    #[test]
    fn test_record_status_transition_unchanged_is_noop() {
        let before = CERTIFICATES_BY_STATUS
            .with_label_values(&["TEST_UNCHANGED"])
            .get();
        record_status_transition(Some("TEST_UNCHANGED"), Some("TEST_UNCHANGED"));
        assert_eq!(
            CERTIFICATES_BY_STATUS
                .with_label_values(&["TEST_UNCHANGED"])
                .get(),
            before
        );
    }
}
