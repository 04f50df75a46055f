//! Delay before reconnecting after the socket closed.

use std::time::Duration;

use breadcord_config::{BackoffPolicy, GatewayConfig};

use crate::jitter::JitterSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPolicy {
    /// Same delay every time.
    Fixed(Duration),
    /// Ceiling doubles per attempt from `initial` up to `max`; the actual
    /// delay is drawn uniformly below the ceiling.
    Exponential { initial: Duration, max: Duration },
}

impl ReconnectPolicy {
    pub fn from_config(config: &GatewayConfig) -> Self {
        match config.backoff.policy {
            BackoffPolicy::Fixed => Self::Fixed(Duration::from_millis(config.reconnect_delay_ms)),
            BackoffPolicy::Exponential => Self::Exponential {
                initial: Duration::from_millis(config.backoff.initial_ms),
                max: Duration::from_millis(config.backoff.max_ms),
            },
        }
    }
}

/// Attempt counter for a [`ReconnectPolicy`]. Reset once a session is
/// established again.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: ReconnectPolicy,
    attempt: u32,
}

impl Backoff {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self { policy, attempt: 0 }
    }

    /// Upper bound of the next delay without consuming an attempt.
    pub fn ceiling(&self) -> Duration {
        match self.policy {
            ReconnectPolicy::Fixed(delay) => delay,
            ReconnectPolicy::Exponential { initial, max } => {
                let factor = 2u32.saturating_pow(self.attempt);
                initial.saturating_mul(factor).min(max)
            },
        }
    }

    pub fn next_delay(&mut self, jitter: &dyn JitterSource) -> Duration {
        let ceiling = self.ceiling();
        match self.policy {
            ReconnectPolicy::Fixed(_) => ceiling,
            ReconnectPolicy::Exponential { .. } => {
                self.attempt = self.attempt.saturating_add(1);
                jitter.jitter(ceiling)
            },
        }
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}
