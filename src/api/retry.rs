//! Jittered exponential backoff for transport failures.
//!
//! Only transport failures (no HTTP response received) are retried; any
//! response, whatever its status, ends the attempt loop. [`BackoffPolicy`]
//! decides, after a failed attempt, whether another attempt is allowed and
//! how long to sleep first.
//!
//! # Delay Calculation
//!
//! ```text
//! delay = uniform(0, min(base_delay * multiplier^(attempt - 1), max_delay))
//! ```
//!
//! With defaults the ceilings are 0.1s, 0.4s, 1.6s, 6.4s, 25.6s, ...
//!
//! # Example
//!
//! ```
//! use inquestlabs_core::api::{BackoffPolicy, RetryDecision};
//!
//! let policy = BackoffPolicy::with_max_attempts(3);
//! match policy.should_retry(1) {
//!     RetryDecision::Retry { delay, attempt } => {
//!         println!("attempt {attempt} in {delay:?}");
//!     }
//!     RetryDecision::DoNotRetry { reason } => println!("giving up: {reason}"),
//! }
//! ```

use std::time::Duration;

use rand::Rng;
use tracing::{debug, instrument};

use crate::config::DEFAULT_RETRY_BUDGET;

/// Default base delay ceiling after the first failure (100ms).
const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(100);

/// Default ceiling growth per failed attempt.
const DEFAULT_BACKOFF_MULTIPLIER: f64 = 4.0;

/// Hard cap on any single ceiling (15 minutes).
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(15 * 60);

/// Decision on whether to make another attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep for `delay`, then make attempt number `attempt` (1-indexed).
    Retry { delay: Duration, attempt: u32 },

    /// Give up.
    DoNotRetry { reason: String },
}

/// Attempt budget and backoff shape.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    /// Maximum number of attempts, including the first.
    max_attempts: u32,

    /// Ceiling after the first failure.
    base_delay: Duration,

    /// Ceiling growth per failure.
    multiplier: f64,

    /// Cap on any ceiling.
    max_delay: Duration,

    /// Draw the delay uniformly below the ceiling; when false, sleep the full ceiling.
    jitter: bool,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_BUDGET,
            base_delay: DEFAULT_BASE_DELAY,
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            max_delay: DEFAULT_MAX_DELAY,
            jitter: true,
        }
    }
}

impl BackoffPolicy {
    /// Creates a policy with custom settings. `max_attempts` is clamped to at least 1.
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration, multiplier: f64, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            multiplier,
            max_delay,
            jitter: true,
        }
    }

    /// Default backoff shape with a custom attempt budget.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Sleeps the full ceiling instead of a random fraction of it.
    #[must_use]
    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Decides what to do after attempt number `attempt` (1-indexed) failed
    /// at the transport level.
    #[instrument(skip(self), fields(max_attempts = self.max_attempts))]
    pub fn should_retry(&self, attempt: u32) -> RetryDecision {
        if attempt >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        let delay = self.calculate_delay(attempt);

        debug!(
            attempt,
            next_attempt = attempt + 1,
            delay_ms = delay.as_millis(),
            "will retry"
        );

        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }

    /// Upper bound of the sleep following failed attempt `attempt` (1-indexed).
    #[must_use]
    pub fn ceiling(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::try_from_secs_f64(secs)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    fn calculate_delay(&self, attempt: u32) -> Duration {
        let ceiling = self.ceiling(attempt);
        if !self.jitter {
            return ceiling;
        }
        let mut rng = rand::thread_rng();
        Duration::from_secs_f64(rng.gen_range(0.0..=ceiling.as_secs_f64()))
    }
}
