//! Retry policy and backoff schedule

use std::time::Duration;

use conduit_config::RetryConfig;
use rand::Rng;

use crate::error::{GatewayError, Result};

/// Bounded exponential backoff with jitter
///
/// Immutable once a client is built. `max_retries` counts retries after the
/// first attempt, so a call makes at most `max_retries + 1` requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
    max_delay: Duration,
}

impl RetryPolicy {
    /// Build a policy, rejecting a base delay larger than the cap
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Result<Self> {
        if base_delay > max_delay {
            return Err(GatewayError::validation(format!(
                "retry base_delay ({base_delay:?}) must not exceed max_delay ({max_delay:?})"
            )));
        }

        Ok(Self {
            max_retries,
            base_delay,
            max_delay,
        })
    }

    /// A policy that never retries
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub const fn base_delay(&self) -> Duration {
        self.base_delay
    }

    pub const fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Sleep before retry number `attempt + 1`
    ///
    /// `min(base * 2^attempt + jitter, max)` with jitter drawn from
    /// `[0, base)`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let jitter = if self.base_delay.is_zero() {
            Duration::ZERO
        } else {
            let nanos = u64::try_from(self.base_delay.as_nanos()).unwrap_or(u64::MAX);
            Duration::from_nanos(rand::rng().random_range(0..nanos))
        };

        self.delay_with_jitter(attempt, jitter)
    }

    fn delay_with_jitter(&self, attempt: u32, jitter: Duration) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay
            .saturating_mul(factor)
            .saturating_add(jitter)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        let config = RetryConfig::default();
        Self {
            max_retries: config.max_retries,
            base_delay: config.base_delay,
            max_delay: config.max_delay,
        }
    }
}

impl TryFrom<&RetryConfig> for RetryPolicy {
    type Error = GatewayError;

    fn try_from(config: &RetryConfig) -> Result<Self> {
        Self::new(config.max_retries, config.base_delay, config.max_delay)
    }
}
