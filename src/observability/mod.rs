//! # Observability
//!
//! - `metrics`: Prometheus metrics collection
//!
//! Tracing is configured once in `runtime::initialization`.

pub mod metrics;

// Re-export for convenience
pub use metrics::*;
