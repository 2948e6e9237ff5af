//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ```rust
//! use acm_certificate_controller::prelude::*;
//! ```
//!
//! This brings into scope:
//! - All CRD types (Certificate, CertificateStatus, Condition, etc.)
//! - The provider and store traits with their implementations
//! - Reconciler types (Reconciler, ReconcilerError, etc.)
//! - Config types (ControllerConfig, ServerConfig)

// CRD types - most commonly used
pub use crate::crd::*;

// Remote state client
pub use crate::provider::aws::AwsCertificateManager;
pub use crate::provider::memory::InMemoryCertificateProvider;
pub use crate::provider::{
    CertificateProvider, CertificateType, ProviderError, RemoteSnapshot, RemoteStatus, TagDelta,
};

// Desired-state store
pub use crate::store::{
    CertificateStore, InMemoryCertificateStore, KubeCertificateStore, StoreError,
};

// Reconciler types - core controller functionality
pub use crate::controller::reconciler::diff::{diff, DiffPlan, Mutation};
pub use crate::controller::reconciler::requeue::{next_requeue, Requeue};
pub use crate::controller::reconciler::state::{ReconcileState, StateEvent};
pub use crate::controller::reconciler::{
    reconcile, BackoffState, PassOutcome, Reconciler, ReconcilerError, TriggerSource,
};

// Config types - for configuration management
pub use crate::config::{ControllerConfig, ServerConfig};
