/*!
 * Exponential backoff with jitter for quota retries.
 *
 * The policy is stateless: the caller owns the attempt counter and asks for
 * the wait that precedes a given attempt.
 */

use std::time::Duration;

use rand::Rng;

/// Default base delay in seconds
pub const DEFAULT_BASE_DELAY_SECS: u64 = 30;

/// Default delay ceiling in seconds
pub const DEFAULT_MAX_BACKOFF_SECS: u64 = 300;

/// Fraction of the computed delay added as random jitter at most
pub const JITTER_FRACTION: f64 = 0.1;

/// Retry delay schedule: `min(max_backoff, base_delay * 2^attempt)` plus jitter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    /// Delay for attempt zero
    pub base_delay: Duration,
    /// Ceiling applied before jitter
    pub max_backoff: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(DEFAULT_BASE_DELAY_SECS),
            Duration::from_secs(DEFAULT_MAX_BACKOFF_SECS),
        )
    }
}

impl BackoffPolicy {
    /// Create a policy with the given base delay and ceiling
    pub fn new(base_delay: Duration, max_backoff: Duration) -> Self {
        Self { base_delay, max_backoff }
    }

    /// Capped exponential delay for `attempt`, without jitter
    pub fn capped_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(63) as i32;
        let raw = self.base_delay.as_secs_f64() * 2f64.powi(exponent);
        let capped = raw.min(self.max_backoff.as_secs_f64());
        Duration::from_secs_f64(capped.max(0.0))
    }

    /// Delay for `attempt` with `unit` in `[0, 1]` scaling the jitter.
    ///
    /// Deterministic; `delay` feeds it from the thread RNG.
    pub fn delay_with_jitter(&self, attempt: u32, unit: f64) -> Duration {
        let delay = self.capped_delay(attempt);
        let jitter = delay.mul_f64(JITTER_FRACTION * unit.clamp(0.0, 1.0));
        delay + jitter
    }

    /// Delay for `attempt` with uniform random jitter in `[0, 0.1 * delay]`
    pub fn delay(&self, attempt: u32) -> Duration {
        let unit: f64 = rand::rng().random();
        self.delay_with_jitter(attempt, unit)
    }

    /// Wait that precedes request attempt `attempt`.
    ///
    /// The first attempt goes out immediately; retry `n` waits `delay(n - 1)`.
    pub fn wait_before(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 {
            None
        } else {
            Some(self.delay(attempt - 1))
        }
    }

    /// Largest delay the policy can ever return
    pub fn upper_bound(&self) -> Duration {
        self.max_backoff.mul_f64(1.0 + JITTER_FRACTION)
    }
}
