//! Backoff schedule for transient HTTP failures.

use std::time::{Duration, SystemTime};

use reqwest_retry::{RetryDecision, RetryPolicy};

/// Doubling backoff with a per-delay cap and an optional budget for the whole call.
///
/// Only requests the retry middleware classifies as transient (connect errors, 5xx, 429)
/// reach this policy.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
    max_elapsed: Option<Duration>,
}

impl BackoffPolicy {
    /// `max_retries` attempts after the first, starting at 1s and capped at 30s.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_elapsed: None,
        }
    }

    pub fn with_delays(mut self, base_delay: Duration, max_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self.max_delay = max_delay;
        self
    }

    /// Give up once the next attempt would start later than `budget` after the first.
    pub fn with_max_elapsed(mut self, budget: Duration) -> Self {
        self.max_elapsed = Some(budget);
        self
    }

    fn delay_for(&self, n_past_retries: u32) -> Duration {
        let factor = 1u32.checked_shl(n_past_retries).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

impl RetryPolicy for BackoffPolicy {
    fn should_retry(&self, request_start_time: SystemTime, n_past_retries: u32) -> RetryDecision {
        if n_past_retries >= self.max_retries {
            return RetryDecision::DoNotRetry;
        }

        let execute_after = SystemTime::now() + self.delay_for(n_past_retries);
        if let Some(budget) = self.max_elapsed {
            let spent = execute_after
                .duration_since(request_start_time)
                .unwrap_or_default();
            if spent > budget {
                return RetryDecision::DoNotRetry;
            }
        }
        RetryDecision::Retry { execute_after }
    }
}
