//! Propagation delay between a transmission and its delivery.

use std::time::Duration;

pub trait LatencyModel: Send {
    /// Delay added on top of `base`.
    fn apply_latency(&self, base: Duration) -> Duration;
}

/// Constant delay for every delivery on the link.
#[derive(Debug, Clone, Copy)]
pub struct FixedLatencyModel {
    delay: Duration,
}

impl FixedLatencyModel {
    pub fn new(latency_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(latency_ms),
        }
    }
}

impl LatencyModel for FixedLatencyModel {
    #[inline]
    fn apply_latency(&self, base: Duration) -> Duration {
        base + self.delay
    }
}

/// Deliveries land in the next tick.
#[derive(Debug, Clone, Copy)]
pub struct NoLatencyModel;

impl LatencyModel for NoLatencyModel {
    #[inline]
    fn apply_latency(&self, base: Duration) -> Duration {
        base
    }
}
