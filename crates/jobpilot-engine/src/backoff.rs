// SPDX-FileCopyrightText: 2026 Jobpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded exponential backoff with full jitter for dispatch retries.

use std::time::Duration;

use rand::Rng;

/// Retry schedule for transient send failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, first try included.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    /// Ceiling for the delay after the given attempt (1-based): the base
    /// delay doubled per prior attempt, capped at `max_delay`.
    pub fn delay_ceiling(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(31);
        let scaled = self
            .base_delay
            .checked_mul(2u32.saturating_pow(exp))
            .unwrap_or(self.max_delay);
        scaled.min(self.max_delay)
    }

    /// Jittered delay after the given attempt: uniform in (0, ceiling].
    ///
    /// Full jitter keeps concurrent runs retrying against the same provider
    /// from synchronizing their attempts.
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let ceiling = self.delay_ceiling(attempt);
        if ceiling.is_zero() {
            return ceiling;
        }
        let millis = ceiling.as_millis().max(1) as u64;
        Duration::from_millis(rand::thread_rng().gen_range(1..=millis))
    }

    /// True when another attempt is allowed after `attempt` tries.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}
