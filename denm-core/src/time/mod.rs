//! ## denm-core::time
//! **Virtual clock driving the discrete-event loop**
//!
//! Services never read wall-clock time. The simulation owns one clock and
//! hands out clones; all clones observe the same atomic counter.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const NANOS_PER_SEC: f64 = 1_000_000_000.0;

#[derive(Clone, Debug)]
pub struct VirtualClock {
    offset: Arc<AtomicU64>, // Nanoseconds
}

impl VirtualClock {
    pub fn new(start_ns: u64) -> Self {
        Self {
            offset: Arc::new(AtomicU64::new(start_ns)),
        }
    }

    /// TigerBeetle-style time access
    pub fn now_ns(&self) -> u64 {
        self.offset.load(Ordering::Acquire)
    }

    /// Simulation time in seconds, the unit every alert timestamp uses.
    pub fn now_secs(&self) -> f64 {
        self.now_ns() as f64 / NANOS_PER_SEC
    }

    pub fn advance(&self, ns: u64) {
        self.offset.fetch_add(ns, Ordering::Release);
    }

    pub fn advance_secs(&self, secs: f64) {
        self.advance(secs_to_ns(secs));
    }
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new(0)
    }
}

pub fn secs_to_ns(secs: f64) -> u64 {
    (secs.max(0.0) * NANOS_PER_SEC).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_time() {
        let clock = VirtualClock::default();
        let observer = clock.clone();
        clock.advance_secs(0.1);
        clock.advance_secs(0.1);
        assert_eq!(observer.now_ns(), 200_000_000);
        assert!((observer.now_secs() - 0.2).abs() < 1e-9);
    }
}
