//! Random extra delay per delivery, drawn from a seeded generator so a run
//! replays bit for bit.

use std::time::Duration;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

pub trait JitterModel: Send {
    fn apply_jitter(&mut self, base: Duration) -> Duration;
}

/// Uniform jitter in `[0, magnitude_ms]` milliseconds.
#[derive(Debug)]
pub struct RandomJitterModel {
    magnitude_ms: u64,
    rng: SmallRng,
}

impl RandomJitterModel {
    pub fn new(magnitude_ms: u64, seed: u64) -> Self {
        Self {
            magnitude_ms,
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

impl JitterModel for RandomJitterModel {
    #[inline]
    fn apply_jitter(&mut self, base: Duration) -> Duration {
        let added_ms = self.rng.random_range(0..=self.magnitude_ms);
        base + Duration::from_millis(added_ms)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NoJitterModel;

impl JitterModel for NoJitterModel {
    #[inline]
    fn apply_jitter(&mut self, base: Duration) -> Duration {
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jitter_stays_within_magnitude() {
        let mut model = RandomJitterModel::new(50, 7);
        let base = Duration::from_millis(100);
        for _ in 0..1000 {
            let jittered = model.apply_jitter(base);
            assert!(jittered >= base);
            assert!(jittered <= base + Duration::from_millis(50));
        }
    }

    #[test]
    fn same_seed_same_jitter() {
        let draw = |seed| {
            let mut model = RandomJitterModel::new(20, seed);
            (0..32)
                .map(|_| model.apply_jitter(Duration::ZERO))
                .collect::<Vec<_>>()
        };
        assert_eq!(draw(3), draw(3));
    }

    #[test]
    fn no_jitter_is_identity() {
        let base = Duration::from_millis(100);
        assert_eq!(NoJitterModel.apply_jitter(base), base);
    }
}
