//! # Status
//!
//! Projection of a pass outcome onto `CertificateStatus` and its conditions.

mod conditions;
mod projector;

pub use conditions::{reasons, upsert_condition};
pub use projector::{build_status, format_time, project_conditions};
