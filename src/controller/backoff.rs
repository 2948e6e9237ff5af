//! # Exponential Backoff
//!
//! Provides a bounded exponential backoff for retrying transient ACM and
//! Kubernetes API failures.
//!
//! Each call doubles the delay, starting at `start_ms` and capped at `max_ms`.
//! Sequence with the defaults: 1s, 2s, 4s, 8s, ... 300s (max).
//!
//! ## Usage
//!
//! ```rust
//! use acm_certificate_controller::controller::backoff::ExponentialBackoff;
//!
//! let mut backoff = ExponentialBackoff::new(1000, 8000);
//! assert_eq!(backoff.next_backoff_millis(), 1000);
//! assert_eq!(backoff.next_backoff_millis(), 2000);
//! assert_eq!(backoff.next_backoff_millis(), 4000);
//! assert_eq!(backoff.next_backoff_millis(), 8000);
//! assert_eq!(backoff.next_backoff_millis(), 8000);
//! ```

use std::time::Duration;

/// Exponential backoff calculator
///
/// Keeps its own position in the sequence, so one instance is held per
/// resource and reset after a successful reconciliation.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    /// First delay in milliseconds (for reset)
    start_ms: u64,
    /// Delay returned by the next call
    current_ms: u64,
    /// Upper bound in milliseconds
    max_ms: u64,
    /// Number of delays handed out since the last reset
    attempts: u32,
}

impl ExponentialBackoff {
    /// Create a new backoff with the given start and maximum in milliseconds
    ///
    /// A `start_ms` of zero is treated as one millisecond so the sequence
    /// still grows.
    #[must_use]
    pub fn new(start_ms: u64, max_ms: u64) -> Self {
        let start_ms = start_ms.max(1);
        let max_ms = max_ms.max(start_ms);
        Self {
            start_ms,
            current_ms: start_ms,
            max_ms,
            attempts: 0,
        }
    }

    /// Get the next backoff in milliseconds and advance the sequence
    pub fn next_backoff_millis(&mut self) -> u64 {
        let result = self.current_ms;
        self.current_ms = self.current_ms.saturating_mul(2).min(self.max_ms);
        self.attempts = self.attempts.saturating_add(1);
        result
    }

    /// Get the next backoff as a `Duration` and advance the sequence
    ///
    /// # Example
    ///
    /// ```
    /// use acm_certificate_controller::controller::backoff::ExponentialBackoff;
    /// use std::time::Duration;
    ///
    /// let mut backoff = ExponentialBackoff::new(500, 60_000);
    /// assert_eq!(backoff.next_backoff(), Duration::from_millis(500));
    /// assert_eq!(backoff.next_backoff(), Duration::from_secs(1));
    /// ```
    #[must_use]
    pub fn next_backoff(&mut self) -> Duration {
        Duration::from_millis(self.next_backoff_millis())
    }

    /// Number of delays handed out since creation or the last reset
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Reset the backoff to the initial state
    pub fn reset(&mut self) {
        self.current_ms = self.start_ms;
        self.attempts = 0;
    }
}
