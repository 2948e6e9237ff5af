//! # Terminal Failure Tests
//!
//! Once a certificate is terminally failed the controller stops talking to
//! ACM for it, whatever happens to the spec, until the resource is deleted.

mod common;

use acm_certificate_controller::prelude::*;
use acm_certificate_controller::provider::memory::ProviderCall;
use common::{condition, request_spec, Harness};
use kube_runtime::controller::Action;

fn too_many_validation_options() -> CertificateSpec {
    CertificateSpec {
        domain_validation_options: (0..6)
            .map(|i| DomainValidationOption {
                domain_name: format!("d{i}.example.com"),
                validation_domain: "example.com".to_string(),
            })
            .collect(),
        ..request_spec("example.com")
    }
}

#[tokio::test]
async fn test_excessive_validation_options_fail_terminally_without_remote_calls() {
    let h = Harness::new();
    h.create(too_many_validation_options());

    let action = h.reconcile_once().await.unwrap();

    assert_eq!(action, Action::await_change());
    assert!(h.provider.calls().is_empty());

    let status = h.status();
    assert!(status.arn.is_none());
    assert_eq!(status.phase.as_deref(), Some("TerminallyFailed"));
    assert!(status.next_reconcile_time.is_none());

    let terminal = condition(&status, ConditionType::Terminal);
    assert_eq!(terminal.status, ConditionStatus::True);
    assert_eq!(terminal.reason.as_deref(), Some("TerminalError"));
    assert!(terminal
        .message
        .unwrap_or_default()
        .contains("more than 5 domain validation options"));

    let synced = condition(&status, ConditionType::ResourceSynced);
    assert_eq!(synced.status, ConditionStatus::False);
    assert_eq!(synced.reason.as_deref(), Some("TerminalError"));
}

#[tokio::test]
async fn test_terminal_is_sticky_across_spec_edits() {
    let h = Harness::new();
    h.create(too_many_validation_options());
    h.reconcile_once().await.unwrap();
    let writes = h.store.status_writes();

    // Fixing the spec does not resurrect the resource
    h.store
        .update_spec(common::NAMESPACE, common::NAME, |spec| {
            spec.domain_validation_options.clear();
        })
        .unwrap();
    let action = h.reconcile_once().await.unwrap();

    assert_eq!(action, Action::await_change());
    assert!(h.provider.calls().is_empty());
    assert_eq!(h.store.status_writes(), writes);
    assert_eq!(h.status().phase.as_deref(), Some("TerminallyFailed"));
}

#[tokio::test]
async fn test_domain_change_on_existing_certificate_is_terminal() {
    let h = Harness::new();
    h.create(request_spec("example.com"));
    h.reconcile_once().await.unwrap();
    let arn = h.arn();

    h.store
        .update_spec(common::NAMESPACE, common::NAME, |spec| {
            spec.domain_name = Some("other.example.com".to_string());
        })
        .unwrap();
    h.provider.clear_calls();
    let action = h.reconcile_once().await.unwrap();

    assert_eq!(action, Action::await_change());
    assert!(h.provider.mutations().is_empty());

    let status = h.status();
    assert_eq!(status.phase.as_deref(), Some("TerminallyFailed"));
    assert_eq!(status.arn.as_deref(), Some(arn.as_str()));
    // What was observed is still reported
    assert_eq!(status.status.as_deref(), Some("PENDING_VALIDATION"));
    assert_eq!(
        condition(&status, ConditionType::Terminal).status,
        ConditionStatus::True
    );

    h.provider.clear_calls();
    h.reconcile_once().await.unwrap();
    assert!(h.provider.calls().is_empty());
}

#[tokio::test]
async fn test_terminally_failed_certificate_can_still_be_deleted() {
    let h = Harness::new();
    h.create(request_spec("example.com"));
    h.reconcile_once().await.unwrap();
    let arn = h.arn();
    h.store
        .update_spec(common::NAMESPACE, common::NAME, |spec| {
            spec.domain_name = Some("other.example.com".to_string());
        })
        .unwrap();
    h.reconcile_once().await.unwrap();

    h.store.delete(common::NAMESPACE, common::NAME);
    h.provider.clear_calls();
    h.reconcile_once().await.unwrap();

    assert_eq!(h.provider.mutations(), vec![ProviderCall::Delete(arn.clone())]);
    assert!(h.provider.get(&arn).is_none());
    assert!(h.certificate().is_none());
}
