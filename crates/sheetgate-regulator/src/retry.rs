//! Throttle-retry budget and backoff schedule.

use std::time::Duration;

use crate::config::RetrySection;

/// Retry settings shared by every call of one executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetrySection::default())
    }
}

impl From<&RetrySection> for RetryPolicy {
    fn from(cfg: &RetrySection) -> Self {
        Self {
            max_retries: cfg.max_retries,
            base_delay: Duration::from_millis(cfg.base_delay_ms),
            max_delay: Duration::from_millis(cfg.max_delay_ms),
        }
    }
}

/// Per-call attempt counter. `attempt` is 1-based.
#[derive(Debug)]
pub struct RetryContext {
    policy: RetryPolicy,
    attempt: u32,
}

impl RetryContext {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy, attempt: 1 }
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn can_retry(&self) -> bool {
        self.attempt <= self.policy.max_retries
    }

    /// Delay before the next attempt: the server hint when it has one,
    /// otherwise `base × 2^(attempt-1)` capped at `max_delay`.
    pub fn delay(&self, reset_hint: Option<Duration>) -> Duration {
        if let Some(hint) = reset_hint.filter(|h| !h.is_zero()) {
            return hint;
        }
        let factor = 2u32.saturating_pow(self.attempt.saturating_sub(1));
        self.policy
            .base_delay
            .saturating_mul(factor)
            .min(self.policy.max_delay)
    }

    pub fn advance(&mut self) {
        self.attempt += 1;
    }
}
