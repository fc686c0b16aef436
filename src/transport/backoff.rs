use crate::config::ReconnectConfig;
use std::time::Duration;

/// Reconnect schedule: the delay grows linearly with the attempt counter
/// up to a fixed ceiling, and attempts stop after a configured maximum.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    base: Duration,
    cap: Duration,
    max_attempts: u32,
}

impl BackoffPolicy {
    pub fn new(base: Duration, cap: Duration, max_attempts: u32) -> Self {
        Self {
            base,
            cap,
            max_attempts,
        }
    }

    pub fn from_config(config: &ReconnectConfig) -> Self {
        Self::new(config.base(), config.cap(), config.max_attempts)
    }

    /// Delay before the given attempt (1-indexed): `min(base * attempt, cap)`.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base.saturating_mul(attempt.max(1)).min(self.cap)
    }

    /// Whether the given attempt exceeds the configured maximum.
    pub fn exhausted(&self, attempt: u32) -> bool {
        attempt > self.max_attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}
