use std::time::Duration;

use rand::Rng;

/// Source of random delays in `[0, max)`.
///
/// Injected into the session manager so tests can pin the first heartbeat.
pub trait JitterSource: Send + Sync {
    fn jitter(&self, max: Duration) -> Duration;
}

/// Uniformly random jitter at millisecond granularity.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomJitter;

impl JitterSource for RandomJitter {
    fn jitter(&self, max: Duration) -> Duration {
        let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
        if max_ms == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..max_ms))
    }
}

/// Always the same delay, clamped to `max`.
#[derive(Debug, Clone, Copy)]
pub struct FixedJitter(pub Duration);

impl FixedJitter {
    pub fn from_millis(ms: u64) -> Self {
        Self(Duration::from_millis(ms))
    }
}

impl JitterSource for FixedJitter {
    fn jitter(&self, max: Duration) -> Duration {
        self.0.min(max)
    }
}
