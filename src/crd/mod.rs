//! # Custom Resource Definitions
//!
//! CRD types for the ACM Certificate Controller.
//!
//! ## Module Structure
//!
//! - `spec.rs` - The `Certificate` resource and its desired-state fields
//! - `options.rs` - Nested spec types (tags, secret references, validation options)
//! - `status.rs` - Status types written exclusively by the reconciler

mod options;
mod spec;
mod status;

// Re-export all public types
pub use options::{
    CertificateOptions, DomainValidationOption, SecretKeyReference, Tag, ValidationMethod,
};
pub use spec::{Certificate, CertificateSpec};
pub use status::{
    CertificateStatus, Condition, ConditionStatus, ConditionType, DomainValidation,
    FieldSyncState, ResourceRecord,
};
