//! # Types
//!
//! Core types for the reconciler.

use crate::config::ControllerConfig;
use crate::controller::backoff::ExponentialBackoff;
use crate::controller::reconciler::diff::DiffPlan;
use crate::controller::reconciler::state::{ReconcileState, StateEvent};
use crate::observability;
use crate::provider::{CertificateProvider, ProviderError, RemoteSnapshot};
use crate::store::{CertificateStore, StoreError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::sync::Mutex as AsyncMutex;

/// Reconciliation errors
///
/// Only `Transient` and `Store` are retried with backoff. `Conflict` is
/// retried at once from fresh state; `Validation` and `TerminalDomain` wait
/// for the user.
#[derive(Debug, Error)]
pub enum ReconcilerError {
    /// Network, timeout or throttling failure talking to ACM
    #[error("transient ACM error: {0}")]
    Transient(String),

    /// The desired spec is malformed
    #[error("invalid spec: {0}")]
    Validation(String),

    /// ACM reported a permanent failure, or the spec can never be satisfied
    #[error("{0}")]
    TerminalDomain(String),

    /// A status write lost a race with a newer update
    #[error("status write conflict: {0}")]
    Conflict(String),

    #[error("store error: {0}")]
    Store(String),
}

impl ReconcilerError {
    /// Label used for the reconciliation error metric
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            ReconcilerError::Transient(_) => "transient",
            ReconcilerError::Validation(_) => "validation",
            ReconcilerError::TerminalDomain(_) => "terminal",
            ReconcilerError::Conflict(_) => "conflict",
            ReconcilerError::Store(_) => "store",
        }
    }

    /// Condition reason surfaced on `ResourceSynced`
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            ReconcilerError::Transient(_) => "TransientError",
            ReconcilerError::Validation(_) => "ValidationFailed",
            ReconcilerError::TerminalDomain(_) => "TerminalError",
            ReconcilerError::Conflict(_) => "Conflict",
            ReconcilerError::Store(_) => "StoreError",
        }
    }
}

impl From<ProviderError> for ReconcilerError {
    fn from(err: ProviderError) -> Self {
        match err {
            // A mutation hit a certificate that vanished; the next describe decides
            ProviderError::NotFound { .. } | ProviderError::Transient { .. } => {
                ReconcilerError::Transient(err.to_string())
            }
            ProviderError::Validation { .. } => ReconcilerError::Validation(err.to_string()),
            ProviderError::Terminal { .. } => ReconcilerError::TerminalDomain(err.to_string()),
        }
    }
}

impl From<StoreError> for ReconcilerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { .. } => ReconcilerError::Conflict(err.to_string()),
            StoreError::MissingSecret { .. } => ReconcilerError::Validation(err.to_string()),
            StoreError::NotFound { .. } | StoreError::Kube(_) | StoreError::Serialization(_) => {
                ReconcilerError::Store(err.to_string())
            }
        }
    }
}

/// Trigger source for reconciliation
/// Tracks why a reconciliation was triggered for better debugging and observability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSource {
    /// First sight of a resource, or its generation moved past the observed one
    SpecChanged,
    /// A scheduled requeue (success cadence or error backoff) came due
    PeriodicRequeue,
    /// The resource carries a deletion timestamp
    DeleteRequested,
}

impl TriggerSource {
    /// Get human-readable string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerSource::SpecChanged => "spec-changed",
            TriggerSource::PeriodicRequeue => "periodic-requeue",
            TriggerSource::DeleteRequested => "delete-requested",
        }
    }
}

/// Backoff state for a specific resource
/// Tracks error count and backoff calculator for progressive retries
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: ExponentialBackoff,
    pub error_count: u32,
}

impl BackoffState {
    #[must_use]
    pub fn new(config: &ControllerConfig) -> Self {
        Self {
            backoff: ExponentialBackoff::new(config.backoff_start_ms, config.backoff_max_ms),
            error_count: 0,
        }
    }

    pub fn increment_error(&mut self) {
        self.error_count += 1;
    }

    pub fn reset(&mut self) {
        self.error_count = 0;
        self.backoff.reset();
    }
}

/// Everything one pass learned, handed to the status projector
#[derive(Debug)]
pub struct PassOutcome {
    /// State the pass ended in
    pub state: ReconcileState,
    /// Remote id, newly created or carried over from status
    pub arn: Option<String>,
    /// Latest describe (with tags) taken this pass
    pub snapshot: Option<RemoteSnapshot>,
    /// Plan computed against `snapshot`
    pub plan: Option<DiffPlan>,
    /// The plan was applied successfully
    pub updated: bool,
    /// A recorded id was not found remotely
    pub remote_missing: bool,
    pub error: Option<ReconcilerError>,
}

impl PassOutcome {
    #[must_use]
    pub fn new(state: ReconcileState, arn: Option<String>) -> Self {
        Self {
            state,
            arn,
            snapshot: None,
            plan: None,
            updated: false,
            remote_missing: false,
            error: None,
        }
    }

    /// Record an error, moving to `TerminallyFailed` when it is terminal
    #[must_use]
    pub fn failed(mut self, error: ReconcilerError) -> Self {
        if matches!(error, ReconcilerError::TerminalDomain(_)) {
            self.state = self.state.next(&StateEvent::TerminalFailure);
        }
        self.error = Some(error);
        self
    }
}

/// Shared reconciler context
///
/// The provider and store are injected so the same reconciler runs against
/// AWS and the API server in production and in-memory fakes in tests.
#[derive(Clone)]
pub struct Reconciler {
    pub provider: Arc<dyn CertificateProvider>,
    pub store: Arc<dyn CertificateStore>,
    pub config: ControllerConfig,
    // Backoff state per resource (identified by namespace/name)
    pub backoff_states: Arc<Mutex<HashMap<String, BackoffState>>>,
    // One pass per resource at a time, across the controller loop and startup reconciliation
    pub reconcile_locks: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
    // Last remote status seen per resource, feeding the certificates gauge
    pub remote_statuses: Arc<Mutex<HashMap<String, String>>>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("provider", &self.provider)
            .field("store", &self.store)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    #[must_use]
    pub fn new(
        provider: Arc<dyn CertificateProvider>,
        store: Arc<dyn CertificateStore>,
        config: ControllerConfig,
    ) -> Self {
        Self {
            provider,
            store,
            config,
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
            reconcile_locks: Arc::new(Mutex::new(HashMap::new())),
            remote_statuses: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Get or create the reconcile lock for a resource
    pub fn reconcile_lock(&self, resource_key: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self
            .reconcile_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            locks
                .entry(resource_key.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
        )
    }

    /// Run `f` against the backoff state of a resource, creating it if needed
    pub fn with_backoff<T>(&self, resource_key: &str, f: impl FnOnce(&mut BackoffState) -> T) -> T {
        let mut states = self
            .backoff_states
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let state = states
            .entry(resource_key.to_string())
            .or_insert_with(|| BackoffState::new(&self.config));
        f(state)
    }

    /// Reset backoff after a pass without transient errors
    ///
    /// Returns true if the resource had been backing off.
    pub fn reset_backoff(&self, resource_key: &str) -> bool {
        let mut states = self
            .backoff_states
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        states.get_mut(resource_key).is_some_and(|state| {
            let had_errors = state.error_count > 0;
            state.reset();
            had_errors
        })
    }

    /// Update the certificates-by-status gauge for a resource
    pub fn track_remote_status(&self, resource_key: &str, status: Option<&str>) {
        let mut statuses = self
            .remote_statuses
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let previous = match status {
            Some(status) => statuses.insert(resource_key.to_string(), status.to_string()),
            None => statuses.remove(resource_key),
        };
        observability::metrics::record_status_transition(previous.as_deref(), status);
    }

    /// Drop all per-resource state once a resource is gone
    pub fn forget(&self, resource_key: &str) {
        self.track_remote_status(resource_key, None);
        self.backoff_states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(resource_key);
        self.reconcile_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(resource_key);
    }
}
