//! # Reconciler
//!
//! Core reconciliation logic for `Certificate` resources.
//!
//! ## Module Structure
//!
//! - `types.rs` - Shared context, error taxonomy, pass outcome
//! - `state.rs` - Reconciliation state machine
//! - `diff.rs` - Desired/observed differ
//! - `validation.rs` - Spec validation
//! - `status/` - Status and condition projector
//! - `requeue.rs` - Requeue scheduler
//! - `reconcile/` - The reconciliation pass (create, sync, delete, finalize)

pub mod diff;
pub mod reconcile;
pub mod requeue;
pub mod state;
pub mod status;
pub mod types;
pub mod validation;

pub use reconcile::reconcile;
pub use types::{BackoffState, PassOutcome, Reconciler, ReconcilerError, TriggerSource};
