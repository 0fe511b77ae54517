use std::time::Duration;

use crate::config::BackoffConfig;

/// Retry state for one batch: counts attempts and doubles the delay
/// between them up to the configured ceiling.
#[derive(Debug)]
pub struct Backoff {
    config: BackoffConfig,
    retries: u32,
    delay: Duration,
}

impl Backoff {
    pub fn new(config: &BackoffConfig) -> Self {
        Self {
            config: config.clone(),
            retries: 0,
            delay: config.min_backoff,
        }
    }

    /// Whether another attempt is allowed
    pub fn ongoing(&self) -> bool {
        self.retries < self.config.max_retries
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Records a failed attempt and returns how long to wait before the
    /// next one, or `None` once the retry budget is spent
    pub fn next_delay(&mut self) -> Option<Duration> {
        self.retries += 1;
        if !self.ongoing() {
            return None;
        }
        let delay = self.delay;
        self.delay = self
            .delay
            .saturating_mul(2)
            .min(self.config.max_backoff);
        Some(delay)
    }
}
