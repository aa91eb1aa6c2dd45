// SPDX-License-Identifier: MIT OR Apache-2.0

//! Backoff strategies and poll-error policies for operation polling.
//!
//! The waiter sleeps for `backoff.delay(attempt)` between status checks and
//! consults a [`PollErrorPolicy`] whenever a status check itself fails.
//!
//! # Example
//!
//! ```
//! use cloud_lro_rs::runtime::{BackoffStrategy, ExponentialBackoff};
//! use std::time::Duration;
//!
//! let backoff = ExponentialBackoff::new(Duration::from_secs(1))
//!     .with_multiplier(2.0)
//!     .with_max_delay(Duration::from_secs(10));
//!
//! assert_eq!(backoff.delay(0), Duration::from_secs(1));
//! assert_eq!(backoff.delay(5), Duration::from_secs(10));
//! ```

use crate::error::LroError;
use std::time::Duration;

/// Defines a backoff strategy for poll delays.
pub trait BackoffStrategy: Clone + Send + Sync + 'static {
    /// Calculate the delay before the next poll.
    ///
    /// # Arguments
    /// * `attempt` - The number of sleeps already taken (0-indexed)
    fn delay(&self, attempt: u32) -> Duration;

    /// Upper bound on any delay this strategy returns.
    fn ceiling(&self) -> Duration;
}

// =============================================================================
// No Backoff
// =============================================================================

/// No delay between polls.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBackoff;

impl NoBackoff {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl BackoffStrategy for NoBackoff {
    fn delay(&self, _attempt: u32) -> Duration {
        Duration::ZERO
    }

    fn ceiling(&self) -> Duration {
        Duration::ZERO
    }
}

// =============================================================================
// Fixed Backoff
// =============================================================================

/// Fixed delay between polls.
#[derive(Debug, Clone, Copy)]
pub struct FixedBackoff {
    delay: Duration,
}

impl FixedBackoff {
    /// Create a new fixed backoff strategy.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Create a fixed backoff with delay in milliseconds.
    #[must_use]
    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    /// Create a fixed backoff with delay in seconds.
    #[must_use]
    pub fn from_secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs))
    }
}

impl Default for FixedBackoff {
    fn default() -> Self {
        Self::from_secs(5)
    }
}

impl BackoffStrategy for FixedBackoff {
    fn delay(&self, _attempt: u32) -> Duration {
        self.delay
    }

    fn ceiling(&self) -> Duration {
        self.delay
    }
}

// =============================================================================
// Linear Backoff
// =============================================================================

/// Linear backoff - delay increases linearly with each attempt.
#[derive(Debug, Clone, Copy)]
pub struct LinearBackoff {
    initial_delay: Duration,
    increment: Duration,
    max_delay: Duration,
}

impl LinearBackoff {
    /// Create a new linear backoff strategy.
    #[must_use]
    pub fn new(initial_delay: Duration) -> Self {
        Self {
            initial_delay,
            increment: initial_delay,
            max_delay: Duration::from_secs(30),
        }
    }

    /// Set the increment for each attempt.
    #[must_use]
    pub fn with_increment(mut self, increment: Duration) -> Self {
        self.increment = increment;
        self
    }

    /// Set the maximum delay cap.
    #[must_use]
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }
}

impl Default for LinearBackoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl BackoffStrategy for LinearBackoff {
    fn delay(&self, attempt: u32) -> Duration {
        let delay = self
            .initial_delay
            .saturating_add(self.increment.saturating_mul(attempt));
        delay.min(self.max_delay)
    }

    fn ceiling(&self) -> Duration {
        self.max_delay
    }
}

// =============================================================================
// Exponential Backoff
// =============================================================================

/// Capped exponential backoff.
///
/// The default schedule starts at 2s, grows by 1.4x per sleep and is capped
/// at 180s. Optional jitter adds a random amount up to the given duration;
/// the result is still capped, but the sequence is then no longer monotonic.
#[derive(Debug, Clone, Copy)]
pub struct ExponentialBackoff {
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    jitter: Duration,
}

impl ExponentialBackoff {
    /// Create a new exponential backoff strategy.
    #[must_use]
    pub fn new(initial_delay: Duration) -> Self {
        Self {
            initial_delay,
            max_delay: Duration::from_secs(180),
            multiplier: 1.4,
            jitter: Duration::ZERO,
        }
    }

    /// Set the first delay.
    #[must_use]
    pub fn with_initial_delay(mut self, initial_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self
    }

    /// Set the maximum delay cap.
    #[must_use]
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Set the multiplier for exponential growth. Values below 1.0 are clamped.
    #[must_use]
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier.max(1.0);
        self
    }

    /// Add up to `jitter` of random delay to each sleep.
    #[must_use]
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    fn base_delay_millis(&self, attempt: u32) -> f64 {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let base = self.initial_delay.as_millis() as f64 * self.multiplier.powi(exponent);
        base.min(self.max_delay.as_millis() as f64)
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

impl BackoffStrategy for ExponentialBackoff {
    fn delay(&self, attempt: u32) -> Duration {
        let mut millis = self.base_delay_millis(attempt).round() as u64;

        let jitter_ms = self.jitter.as_millis() as u64;
        if jitter_ms > 0 {
            millis = millis.saturating_add(rand::random::<u64>() % (jitter_ms + 1));
        }

        Duration::from_millis(millis).min(self.max_delay)
    }

    fn ceiling(&self) -> Duration {
        self.max_delay
    }
}

// =============================================================================
// Poll Error Policy
// =============================================================================

/// What to do after a status check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollErrorAction {
    /// Sleep and poll again.
    Retry,
    /// Give up and return the error.
    Fail,
}

/// Decides whether a failed status check is tolerated.
///
/// Tolerated failures still consume the wait budget and follow the backoff
/// schedule. `max_attempts` bounds *consecutive* failures; a successful poll
/// resets the count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollErrorPolicy {
    /// Every failed status check is returned immediately.
    FailFast,
    /// Retry `NOT_FOUND`, which is common right after a create call.
    RetryNotFound { max_attempts: u32 },
    /// Retry any transient transport failure, including `NOT_FOUND`.
    RetryTransient { max_attempts: u32 },
}

impl Default for PollErrorPolicy {
    fn default() -> Self {
        PollErrorPolicy::RetryNotFound { max_attempts: 3 }
    }
}

impl PollErrorPolicy {
    /// Decide what to do about `error`, the `consecutive_failures`-th
    /// failure in a row (1-based).
    #[must_use]
    pub fn decide(&self, error: &LroError, consecutive_failures: u32) -> PollErrorAction {
        let (tolerated, max_attempts) = match self {
            PollErrorPolicy::FailFast => return PollErrorAction::Fail,
            PollErrorPolicy::RetryNotFound { max_attempts } => {
                (error.is_not_found(), *max_attempts)
            }
            PollErrorPolicy::RetryTransient { max_attempts } => {
                (error.is_transient(), *max_attempts)
            }
        };

        if tolerated && consecutive_failures <= max_attempts {
            PollErrorAction::Retry
        } else {
            PollErrorAction::Fail
        }
    }
}
