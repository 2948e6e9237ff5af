//! Common test utilities for reconciler integration tests
//!
//! Wires the reconciler to the in-memory provider and store so full passes
//! can be driven without a cluster or AWS account.

#![allow(dead_code, reason = "not every test binary uses every helper")]

use acm_certificate_controller::prelude::*;
use kube_runtime::controller::Action;
use std::sync::Arc;

pub const NAMESPACE: &str = "default";
pub const NAME: &str = "web";

pub struct Harness {
    pub provider: Arc<InMemoryCertificateProvider>,
    pub store: Arc<InMemoryCertificateStore>,
    pub ctx: Arc<Reconciler>,
}

impl Harness {
    /// Harness whose passes are always due again immediately after success
    pub fn new() -> Self {
        Self::with_config(ControllerConfig {
            requeue_on_success_secs: 0,
            deletion_poll_secs: 0,
            ..ControllerConfig::default()
        })
    }

    pub fn with_config(config: ControllerConfig) -> Self {
        let provider = Arc::new(InMemoryCertificateProvider::new());
        let store = Arc::new(InMemoryCertificateStore::new());
        let remote = Arc::clone(&provider) as Arc<dyn CertificateProvider>;
        let records = Arc::clone(&store) as Arc<dyn CertificateStore>;
        let ctx = Arc::new(Reconciler::new(remote, records, config));
        Self {
            provider,
            store,
            ctx,
        }
    }

    /// Create the default test resource
    pub fn create(&self, spec: CertificateSpec) -> Certificate {
        self.store.create(NAMESPACE, NAME, spec)
    }

    /// Run one pass against the latest stored copy of the test resource
    pub async fn reconcile_once(&self) -> Result<Action, ReconcilerError> {
        let certificate = self
            .store
            .get(NAMESPACE, NAME)
            .expect("certificate should exist");
        reconcile(Arc::new(certificate), Arc::clone(&self.ctx)).await
    }

    pub fn certificate(&self) -> Option<Certificate> {
        self.store.get(NAMESPACE, NAME)
    }

    pub fn status(&self) -> CertificateStatus {
        self.certificate()
            .and_then(|c| c.status)
            .expect("status should be written")
    }

    pub fn arn(&self) -> String {
        self.status().arn.expect("arn should be recorded")
    }
}

pub fn condition(status: &CertificateStatus, condition_type: ConditionType) -> Condition {
    status
        .condition(condition_type)
        .cloned()
        .unwrap_or_else(|| panic!("missing {} condition", condition_type.as_str()))
}

pub fn request_spec(domain: &str) -> CertificateSpec {
    CertificateSpec {
        domain_name: Some(domain.to_string()),
        tags: vec![Tag::new("environment", "dev")],
        ..Default::default()
    }
}
