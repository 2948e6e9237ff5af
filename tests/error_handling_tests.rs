//! # Error Handling Tests
//!
//! Transient ACM failures back off exponentially and recover, invalid specs
//! wait for an edit, and lost status-write races are retried immediately
//! without repeating remote mutations.

mod common;

use acm_certificate_controller::prelude::*;
use acm_certificate_controller::provider::memory::ProviderCall;
use acm_certificate_controller::runtime::error_policy::handle_reconciliation_error;
use common::{condition, request_spec, Harness};
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Duration;

const RESOURCE_KEY: &str = "default/web";

fn throttled(operation: &str) -> ProviderError {
    ProviderError::Transient {
        operation: operation.to_string(),
        message: "Rate exceeded".to_string(),
    }
}

fn harness_with_backoff() -> Harness {
    Harness::with_config(ControllerConfig {
        requeue_on_success_secs: 0,
        backoff_start_ms: 1000,
        backoff_max_ms: 4000,
        ..ControllerConfig::default()
    })
}

#[tokio::test]
async fn test_transient_request_failure_backs_off_then_recovers() {
    let h = harness_with_backoff();
    h.provider.fail_next("request", throttled("RequestCertificate"));
    h.provider.fail_next("request", throttled("RequestCertificate"));
    h.create(request_spec("example.com"));

    let action = h.reconcile_once().await.unwrap();
    assert_eq!(action, Action::requeue(Duration::from_secs(1)));
    let status = h.status();
    assert!(status.arn.is_none());
    assert_eq!(status.phase.as_deref(), Some("Creating"));
    let synced = condition(&status, ConditionType::ResourceSynced);
    assert_eq!(synced.status, ConditionStatus::False);
    assert_eq!(synced.reason.as_deref(), Some("TransientError"));

    let action = h.reconcile_once().await.unwrap();
    assert_eq!(action, Action::requeue(Duration::from_secs(2)));
    assert_eq!(h.ctx.with_backoff(RESOURCE_KEY, |b| b.error_count), 2);

    let action = h.reconcile_once().await.unwrap();
    assert_eq!(action, Action::requeue(Duration::ZERO));
    let status = h.status();
    assert!(status.arn.is_some());
    assert_eq!(status.phase.as_deref(), Some("Syncing"));
    assert_eq!(
        condition(&status, ConditionType::ResourceSynced).status,
        ConditionStatus::True
    );
    assert_eq!(h.ctx.with_backoff(RESOURCE_KEY, |b| b.error_count), 0);

    // Every attempt reused the same token, so only one certificate exists
    let tokens: Vec<String> = h
        .provider
        .mutations()
        .into_iter()
        .filter_map(|call| match call {
            ProviderCall::Request { token, .. } => Some(token),
            _ => None,
        })
        .collect();
    assert_eq!(tokens.len(), 3);
    assert!(tokens.iter().all(|t| *t == tokens[0]));
    assert_eq!(h.provider.certificate_count(), 1);
}

#[tokio::test]
async fn test_transient_describe_failure_keeps_state() {
    let h = harness_with_backoff();
    h.create(request_spec("example.com"));
    h.reconcile_once().await.unwrap();

    h.provider.fail_next("describe", throttled("DescribeCertificate"));
    let action = h.reconcile_once().await.unwrap();

    assert_eq!(action, Action::requeue(Duration::from_secs(1)));
    let status = h.status();
    assert_eq!(status.phase.as_deref(), Some("Syncing"));
    assert!(status.arn.is_some());
    assert_eq!(
        condition(&status, ConditionType::ResourceSynced).reason.as_deref(),
        Some("TransientError")
    );
    assert_eq!(h.provider.mutations().len(), 1);
}

#[tokio::test]
async fn test_invalid_spec_waits_for_edit() {
    let h = Harness::new();
    h.create(CertificateSpec {
        domain_name: Some("example.com".to_string()),
        tags: vec![Tag::new("aws:reserved", "x")],
        ..Default::default()
    });

    let action = h.reconcile_once().await.unwrap();
    assert_eq!(action, Action::await_change());
    assert!(h.provider.calls().is_empty());

    let status = h.status();
    let synced = condition(&status, ConditionType::ResourceSynced);
    assert_eq!(synced.status, ConditionStatus::False);
    assert_eq!(synced.reason.as_deref(), Some("ValidationFailed"));
    assert!(status.condition(ConditionType::Terminal).is_none());

    h.store
        .update_spec(common::NAMESPACE, common::NAME, |spec| {
            spec.tags = vec![Tag::new("environment", "dev")];
        })
        .unwrap();
    h.reconcile_once().await.unwrap();

    assert_eq!(h.provider.mutations().len(), 1);
    assert_eq!(
        condition(&h.status(), ConditionType::ResourceSynced).status,
        ConditionStatus::True
    );
}

#[tokio::test]
async fn test_missing_import_secret_is_a_validation_failure() {
    let h = Harness::new();
    h.create(CertificateSpec {
        certificate: Some(SecretKeyReference {
            name: "absent".to_string(),
            namespace: None,
            key: "tls.crt".to_string(),
        }),
        private_key: Some(SecretKeyReference {
            name: "absent".to_string(),
            namespace: None,
            key: "tls.key".to_string(),
        }),
        ..Default::default()
    });

    let action = h.reconcile_once().await.unwrap();

    assert_eq!(action, Action::await_change());
    assert!(h.provider.calls().is_empty());
    let synced = condition(&h.status(), ConditionType::ResourceSynced);
    assert_eq!(synced.reason.as_deref(), Some("ValidationFailed"));
    assert!(synced.message.unwrap_or_default().contains("absent"));
}

#[tokio::test]
async fn test_conflict_recording_arn_does_not_request_twice() {
    let h = Harness::new();
    h.create(request_spec("example.com"));
    h.store.conflict_next_status_writes(1);

    h.reconcile_once().await.unwrap();

    assert_eq!(h.provider.mutations().len(), 1);
    assert_eq!(h.provider.certificate_count(), 1);
    assert!(h.status().arn.is_some());
}

#[tokio::test]
async fn test_status_conflict_is_returned_and_retried_immediately() {
    let h = Harness::new();
    h.create(request_spec("example.com"));
    h.reconcile_once().await.unwrap();

    h.provider.set_status(&h.arn(), RemoteStatus::Issued);
    h.store.conflict_next_status_writes(1);
    let error = h.reconcile_once().await.unwrap_err();
    assert!(matches!(error, ReconcilerError::Conflict(_)));
    assert_eq!(h.status().status.as_deref(), Some("PENDING_VALIDATION"));

    let certificate = Arc::new(h.certificate().unwrap());
    let action = handle_reconciliation_error(&certificate, &error, &h.ctx);
    assert_eq!(action, Action::requeue(Duration::ZERO));

    h.reconcile_once().await.unwrap();
    let status = h.status();
    assert_eq!(status.status.as_deref(), Some("ISSUED"));
    assert_eq!(
        condition(&status, ConditionType::Ready).status,
        ConditionStatus::True
    );
}

#[tokio::test]
async fn test_store_errors_back_off_in_error_policy() {
    let h = harness_with_backoff();
    let certificate = Arc::new(h.create(request_spec("example.com")));
    let error = ReconcilerError::Store("connection reset".to_string());

    let delays: Vec<Action> = (0..4)
        .map(|_| handle_reconciliation_error(&certificate, &error, &h.ctx))
        .collect();

    assert_eq!(
        delays,
        vec![
            Action::requeue(Duration::from_secs(1)),
            Action::requeue(Duration::from_secs(2)),
            Action::requeue(Duration::from_secs(4)),
            Action::requeue(Duration::from_secs(4)),
        ]
    );
    assert_eq!(h.ctx.with_backoff(RESOURCE_KEY, |b| b.error_count), 4);
}
