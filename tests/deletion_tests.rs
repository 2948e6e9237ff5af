//! # Deletion Tests
//!
//! The finalizer is only released once a fresh describe confirms the ACM
//! certificate is gone.

mod common;

use acm_certificate_controller::constants::FINALIZER;
use acm_certificate_controller::prelude::*;
use acm_certificate_controller::provider::memory::ProviderCall;
use common::{request_spec, Harness};
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::time::Duration;

#[tokio::test]
async fn test_delete_waits_until_certificate_disappears() {
    let h = Harness::new();
    h.create(request_spec("example.com"));
    h.reconcile_once().await.unwrap();
    let arn = h.arn();

    h.provider.set_deletion_lag(1);
    h.store.delete(common::NAMESPACE, common::NAME);
    h.provider.clear_calls();

    let action = h.reconcile_once().await.unwrap();
    assert_eq!(action, Action::requeue(Duration::ZERO));
    assert_eq!(
        h.provider.calls(),
        vec![ProviderCall::Delete(arn.clone()), ProviderCall::Describe(arn.clone())]
    );
    let certificate = h.certificate().expect("finalizer still holds the record");
    assert!(certificate.finalizers().iter().any(|f| f == FINALIZER));
    assert_eq!(h.status().phase.as_deref(), Some("Deleting"));

    let action = h.reconcile_once().await.unwrap();
    assert_eq!(action, Action::await_change());
    assert!(h.certificate().is_none());
    assert!(h.provider.get(&arn).is_none());
    assert_eq!(h.provider.certificate_count(), 0);
}

#[tokio::test]
async fn test_delete_confirmed_in_one_pass() {
    let h = Harness::new();
    h.create(request_spec("example.com"));
    h.reconcile_once().await.unwrap();
    h.provider.set_status(&h.arn(), RemoteStatus::Issued);
    h.reconcile_once().await.unwrap();

    h.store.delete(common::NAMESPACE, common::NAME);
    let action = h.reconcile_once().await.unwrap();

    assert_eq!(action, Action::await_change());
    assert!(h.certificate().is_none());
    assert_eq!(h.provider.certificate_count(), 0);
}

#[tokio::test]
async fn test_delete_without_remote_certificate_makes_no_calls() {
    let h = Harness::new();
    // Rejected before anything is created, but the finalizer is already on
    h.create(CertificateSpec {
        domain_name: Some(String::new()),
        ..Default::default()
    });
    h.reconcile_once().await.unwrap();
    assert!(h.status().arn.is_none());

    h.store.delete(common::NAMESPACE, common::NAME);
    h.reconcile_once().await.unwrap();

    assert!(h.provider.calls().is_empty());
    assert!(h.certificate().is_none());
}

#[tokio::test]
async fn test_failed_delete_is_retried_with_backoff() {
    let h = Harness::new();
    h.create(request_spec("example.com"));
    h.reconcile_once().await.unwrap();
    let arn = h.arn();

    h.provider.fail_next(
        "delete",
        ProviderError::Transient {
            operation: "DeleteCertificate".to_string(),
            message: "throttled".to_string(),
        },
    );
    h.store.delete(common::NAMESPACE, common::NAME);

    let action = h.reconcile_once().await.unwrap();
    assert_eq!(action, Action::requeue(Duration::from_secs(1)));
    assert!(h.provider.get(&arn).is_some());
    assert_eq!(h.status().phase.as_deref(), Some("Deleting"));

    h.reconcile_once().await.unwrap();
    assert!(h.certificate().is_none());
    assert!(h.provider.get(&arn).is_none());
}

#[tokio::test]
async fn test_delete_converges_after_update_cycles() {
    let h = Harness::new();
    h.create(request_spec("example.com"));
    h.reconcile_once().await.unwrap();
    let arn = h.arn();

    for i in 0..3 {
        h.store
            .update_spec(common::NAMESPACE, common::NAME, |spec| {
                spec.tags = vec![Tag::new("environment", format!("dev{i}"))];
            })
            .unwrap();
        h.reconcile_once().await.unwrap();
    }
    assert_eq!(h.status().observed_tags, vec![Tag::new("environment", "dev2")]);

    h.provider.set_deletion_lag(3);
    h.store.delete(common::NAMESPACE, common::NAME);

    let mut passes = 0;
    while h.certificate().is_some() {
        passes += 1;
        assert!(passes <= 10, "deletion did not converge");
        h.reconcile_once().await.unwrap();
    }
    assert_eq!(passes, 4);
    assert!(h.provider.get(&arn).is_none());
}

async fn assert_rejected_delete_is_retried(failure: ProviderError) {
    let h = Harness::new();
    h.create(request_spec("example.com"));
    h.reconcile_once().await.unwrap();
    let arn = h.arn();

    h.provider.fail_next("delete", failure);
    h.store.delete(common::NAMESPACE, common::NAME);

    let action = h.reconcile_once().await.unwrap();
    assert_eq!(action, Action::requeue(Duration::from_secs(1)));
    assert!(h.provider.get(&arn).is_some());
    let status = h.status();
    assert_eq!(status.phase.as_deref(), Some("Deleting"));
    assert!(status.next_reconcile_time.is_some());
    assert!(status.condition(ConditionType::Terminal).is_none());

    h.reconcile_once().await.unwrap();
    assert!(h.certificate().is_none());
    assert!(h.provider.get(&arn).is_none());
}

#[tokio::test]
async fn test_access_denied_delete_is_retried() {
    assert_rejected_delete_is_retried(ProviderError::Validation {
        operation: "DeleteCertificate".to_string(),
        message: "AccessDeniedException: not authorized to perform acm:DeleteCertificate".to_string(),
    })
    .await;
}

#[tokio::test]
async fn test_invalid_state_delete_is_retried() {
    assert_rejected_delete_is_retried(ProviderError::Terminal {
        operation: "DeleteCertificate".to_string(),
        message: "InvalidStateException: certificate is in use".to_string(),
    })
    .await;
}
