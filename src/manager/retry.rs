//! Retry configuration.

use crate::core::ScanError;

/// Configuration for retry behavior.
///
/// Only recoverable errors are retried. For the engine that means malformed
/// output; timeouts and process faults fail immediately. A scan gets at most
/// one extra attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    max_attempts: u32,
}

/// Upper bound on scan attempts: the first plus one retry.
pub const MAX_SCAN_ATTEMPTS: u32 = 2;

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: MAX_SCAN_ATTEMPTS,
        }
    }
}

impl RetryConfig {
    /// Creates a new retry configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Disables retries.
    pub fn no_retry() -> Self {
        Self { max_attempts: 1 }
    }

    /// Sets the maximum number of attempts, clamped to `1..=2`.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.clamp(1, MAX_SCAN_ATTEMPTS);
        self
    }

    /// Returns the maximum number of scan attempts, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns whether another attempt should be made after `attempt`
    /// attempts have been used.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Returns whether `error` after `attempt` attempts warrants another try.
    pub fn should_retry_error(&self, attempt: u32, error: &ScanError) -> bool {
        error.is_recoverable() && self.should_retry(attempt)
    }
}
