//! ACM Certificate Controller Library
//!
//! Keeps `Certificate` resources in a Kubernetes cluster in sync with AWS
//! Certificate Manager. Tests are included in the module files and under
//! `tests/`.
//!
//! ## Quick Start
//!
//! ```rust
//! use acm_certificate_controller::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod prelude;
pub mod provider;
pub mod runtime;
pub mod store;
