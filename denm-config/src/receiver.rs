//! Receiver-side relevance filtering and reaction magnitudes.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

/// Relevance gate of one receiver family.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct RelevanceConfig {
    /// Alerts strictly closer than this are relevant.
    #[validate(range(min = 0.0))]
    pub radius_m: f64,

    /// Minimum interval between two accepted alerts about the same offender.
    #[validate(range(min = 0.0))]
    pub cooldown_s: f64,
}

impl RelevanceConfig {
    pub const fn new(radius_m: f64, cooldown_s: f64) -> Self {
        Self {
            radius_m,
            cooldown_s,
        }
    }
}

const DEFAULT_COOLDOWN_S: f64 = 10.0;

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct ReceiverConfig {
    #[validate(nested)]
    pub collision: RelevanceConfig,

    #[validate(nested)]
    pub drowsiness: RelevanceConfig,

    #[validate(nested)]
    pub lane_change: RelevanceConfig,

    #[validate(nested)]
    pub speed: RelevanceConfig,

    /// Radius within which a non-offending vehicle widens its margin.
    #[validate(range(min = 0.0))]
    pub speed_bystander_radius_m: f64,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            collision: RelevanceConfig::new(200.0, DEFAULT_COOLDOWN_S),
            drowsiness: RelevanceConfig::new(500.0, DEFAULT_COOLDOWN_S),
            lane_change: RelevanceConfig::new(100.0, DEFAULT_COOLDOWN_S),
            speed: RelevanceConfig::new(500.0, DEFAULT_COOLDOWN_S),
            speed_bystander_radius_m: 100.0,
        }
    }
}

/// Multiplicative speed factors applied on reaction.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct ReactionConfig {
    #[validate(range(min = 0.0, max = 1.0))]
    pub collision_warning_factor: f64,

    #[validate(range(min = 0.0, max = 1.0))]
    pub lane_change_warning_factor: f64,

    #[validate(range(min = 0.0, max = 1.0))]
    pub drowsiness_warning_factor: f64,

    #[validate(range(min = 0.0, max = 1.0))]
    pub drowsiness_critical_factor: f64,

    #[validate(range(min = 0.0, max = 1.0))]
    pub speed_warning_factor: f64,

    #[validate(range(min = 0.0, max = 1.0))]
    pub speed_critical_factor: f64,
}

impl Default for ReactionConfig {
    fn default() -> Self {
        Self {
            collision_warning_factor: 0.7,
            lane_change_warning_factor: 0.7,
            drowsiness_warning_factor: 0.8,
            drowsiness_critical_factor: 0.5,
            speed_warning_factor: 0.8,
            speed_critical_factor: 0.5,
        }
    }
}
