//! # Controller
//!
//! Core controller modules for the ACM Certificate Controller.
//!
//! - `backoff`: Exponential backoff for transient failures
//! - `reconciler`: Core reconciliation logic
//! - `server`: HTTP server for metrics and health checks

pub mod backoff;
pub mod reconciler;
pub mod server;
