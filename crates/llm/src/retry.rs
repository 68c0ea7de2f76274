//! Retry policy for provider calls

use llmgate_common::{ProviderError, RetrySettings};
use std::fmt;
use std::time::Duration;

/// Outcome of one failed attempt, before the policy decides what happens next
#[derive(Debug)]
pub enum AttemptFailure {
    /// No response was received (connect, DNS, timeout)
    Transport(reqwest::Error),
    /// Response with a non-success status
    Status { status: u16, detail: String },
}

impl AttemptFailure {
    /// Final error once no further attempt will be made
    pub fn into_provider_error(self, attempts: u32) -> ProviderError {
        match self {
            Self::Transport(e) => ProviderError::transport(e),
            Self::Status { status, detail } => ProviderError::upstream_status(status, detail),
        }
        .with_attempts(attempts)
    }
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) if e.is_timeout() => write!(f, "timed out: {}", e),
            Self::Transport(e) => write!(f, "transport error: {}", e),
            Self::Status { status, .. } => write!(f, "status {}", status),
        }
    }
}

/// Which failures are retried, how often, and how long to wait in between.
///
/// Passed into the transport as a value so tests can swap in
/// [`RetryPolicy::no_wait`].
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Delay after the first failed attempt
    pub initial_backoff: Duration,
    /// Growth factor between consecutive delays
    pub multiplier: u32,
    /// Upper bound for any single delay
    pub max_backoff: Duration,
    /// Retry connection-level failures and timeouts
    pub retry_transport: bool,
    /// Retry 5xx responses
    pub retry_server_errors: bool,
    /// Additional statuses treated as transient
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            multiplier: 2,
            max_backoff: Duration::from_secs(10),
            retry_transport: true,
            retry_server_errors: true,
            retryable_statuses: vec![408, 429],
        }
    }
}

impl RetryPolicy {
    /// Policy built from configuration
    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            initial_backoff: Duration::from_millis(settings.initial_backoff_ms),
            multiplier: settings.backoff_multiplier.max(1),
            max_backoff: Duration::from_millis(settings.max_backoff_ms),
            ..Self::default()
        }
    }

    /// Same classification, zero delay
    pub fn no_wait() -> Self {
        Self {
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Single attempt, nothing retried
    pub fn never() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Delay after the given failed attempt (1-based)
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        self.multiplier
            .checked_pow(exponent)
            .and_then(|factor| self.initial_backoff.checked_mul(factor))
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }

    /// Whether this status is expected to clear up on its own
    pub fn is_retryable_status(&self, status: u16) -> bool {
        (self.retry_server_errors && (500..=599).contains(&status))
            || self.retryable_statuses.contains(&status)
    }

    /// Whether the failure belongs to a retryable class
    pub fn should_retry(&self, failure: &AttemptFailure) -> bool {
        match failure {
            AttemptFailure::Transport(_) => self.retry_transport,
            AttemptFailure::Status { status, .. } => self.is_retryable_status(*status),
        }
    }
}
