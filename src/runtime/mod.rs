//! # Runtime
//!
//! Controller process wiring: startup, the watch loop, and error policy.

pub mod error_policy;
pub mod initialization;
pub mod watch_loop;
