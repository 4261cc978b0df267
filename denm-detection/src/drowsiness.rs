//! ## denm-detection::drowsiness
//! **Driver drowsiness level model**
//!
//! The level rises with driving time plus bounded uniform noise and never
//! leaves `[0, 1]`. The random source is seeded so runs replay exactly.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use denm_config::DrowsinessConfig;
use denm_protocols::Severity;

use crate::severity::drowsiness_severity;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrowsinessReading {
    pub level: f64,
    pub reaction_time: f64,
    pub severity: Severity,
}

pub struct DrowsinessMonitor {
    config: DrowsinessConfig,
    level: f64,
    last_update: f64,
    rng: SmallRng,
}

impl DrowsinessMonitor {
    pub fn new(config: DrowsinessConfig, seed: u64, start: f64) -> Self {
        Self {
            config,
            level: 0.0,
            last_update: start,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Advance the model to sim time `now` and classify the new level.
    pub fn level_update(&mut self, now: f64) -> DrowsinessReading {
        let elapsed = (now - self.last_update).max(0.0);
        self.last_update = now;

        let noise = if self.config.noise_max > 0.0 {
            self.rng.random_range(0.0..self.config.noise_max)
        } else {
            0.0
        };
        self.level =
            (self.level + elapsed / 10.0 * self.config.growth_per_10s + noise).clamp(0.0, 1.0);

        DrowsinessReading {
            level: self.level,
            reaction_time: self.reaction_time(),
            severity: drowsiness_severity(self.level, &self.config),
        }
    }

    /// Estimated reaction time in seconds at the current level.
    pub fn reaction_time(&self) -> f64 {
        self.config.base_reaction_time_s + self.level * self.config.reaction_time_gain_s
    }

    pub fn level(&self) -> f64 {
        self.level
    }
}
