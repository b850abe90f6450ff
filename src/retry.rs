//! Retry budget and backoff arithmetic.
//!
//! Which failures are retried is decided by [`crate::Error::retry_class`];
//! this module only decides how often and how long to wait.

use crate::{Error, Result};
use std::time::Duration;

/// Default number of transport calls per request.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default base delay between attempts.
pub const DEFAULT_BASE_RETRY_DELAY: Duration = Duration::from_secs(1);

/// How long to wait between attempts of one request, and how many attempts
/// to make.
///
/// `max_retries` counts transport calls: a policy with `max_retries = 3`
/// sends a request at most three times. Delays are whole seconds.
///
/// # Examples
///
/// ```
/// use restbind::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::new(5, Duration::from_secs(2), true).unwrap();
/// assert_eq!(policy.delay_for_attempt(1), Duration::from_secs(2));
/// assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(8));
///
/// let constant = RetryPolicy::new(5, Duration::from_secs(2), false).unwrap();
/// assert_eq!(constant.delay_for_attempt(3), Duration::from_secs(2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    exponential: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_RETRY_DELAY,
            exponential: true,
        }
    }
}

impl RetryPolicy {
    /// Creates a validated policy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `max_retries` is zero or
    /// `base_delay` is shorter than one second.
    pub fn new(max_retries: u32, base_delay: Duration, exponential: bool) -> Result<Self> {
        RetryPolicy::default()
            .with_max_retries(max_retries)?
            .with_base_delay(base_delay)
            .map(|policy| policy.with_exponential(exponential))
    }

    /// Returns a copy with a different attempt budget (at least 1).
    pub fn with_max_retries(mut self, max_retries: u32) -> Result<Self> {
        if max_retries < 1 {
            tracing::error!(max_retries, "Rejected retry configuration");
            return Err(Error::Configuration(
                "Max retries must be at least 1".to_string(),
            ));
        }
        self.max_retries = max_retries;
        Ok(self)
    }

    /// Returns a copy with a different base delay (at least 1 second,
    /// truncated to whole seconds).
    pub fn with_base_delay(mut self, base_delay: Duration) -> Result<Self> {
        if base_delay.as_secs() < 1 {
            tracing::error!(base_delay_ms = base_delay.as_millis() as u64, "Rejected retry configuration");
            return Err(Error::Configuration(
                "Base retry delay must be at least 1 second".to_string(),
            ));
        }
        self.base_delay = Duration::from_secs(base_delay.as_secs());
        Ok(self)
    }

    /// Returns a copy with exponential backoff switched on or off.
    pub fn with_exponential(mut self, exponential: bool) -> Self {
        self.exponential = exponential;
        self
    }

    /// The maximum number of transport calls per request.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// The base delay between attempts.
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Whether delays double with every attempt.
    pub fn is_exponential(&self) -> bool {
        self.exponential
    }

    /// The delay after the given failed attempt (1-indexed):
    /// `base * 2^(attempt - 1)` in exponential mode, `base` otherwise.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if !self.exponential {
            return self.base_delay;
        }
        let multiplier = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(multiplier)
    }
}

/// Per-request retry bookkeeping, created for one call and dropped after it.
#[derive(Debug, Clone)]
pub(crate) struct RetryState {
    policy: RetryPolicy,
    failures: u32,
}

impl RetryState {
    pub(crate) fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            failures: 0,
        }
    }

    /// Counts a transient failure. Returns the delay before the next
    /// attempt, or `None` once the budget is spent.
    pub(crate) fn record_failure(&mut self) -> Option<Duration> {
        self.failures += 1;
        if self.failures >= self.policy.max_retries {
            return None;
        }
        Some(self.policy.delay_for_attempt(self.failures))
    }

    /// Number of transport calls made so far, counting the one in flight.
    pub(crate) fn attempts(&self) -> u32 {
        self.failures + 1
    }

    pub(crate) fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}
