//! Hazard detection parameters.
//!
//! Thresholds, weights and zone breakpoints for each alert family, plus the
//! shared relative-speed estimator.

use serde::{Deserialize, Serialize};
use validator::{self, Validate};

use crate::validation;

/// Shared smoothed relative-speed estimator.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct EstimatorConfig {
    /// Observations kept per tracked object.
    #[serde(default = "default_history_capacity")]
    #[validate(range(min = 2, max = 1024))]
    pub history_capacity: usize,

    /// Exponential smoothing factor applied to the raw speed.
    #[serde(default = "default_smoothing_alpha")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub smoothing_alpha: f64,

    /// Plausibility cap on the smoothed object speed (m/s).
    #[serde(default = "default_max_speed")]
    #[validate(range(min = 1.0, max = 200.0))]
    pub max_speed_mps: f64,
}

fn default_history_capacity() -> usize {
    10
}

fn default_smoothing_alpha() -> f64 {
    0.2
}

fn default_max_speed() -> f64 {
    60.0
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
            smoothing_alpha: default_smoothing_alpha(),
            max_speed_mps: default_max_speed(),
        }
    }
}

/// TTC severity bounds in seconds. Smaller TTC is more severe.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct TtcThresholds {
    #[validate(range(min = 0.0))]
    pub warning_s: f64,
    #[validate(range(min = 0.0))]
    pub critical_s: f64,
}

impl Default for TtcThresholds {
    fn default() -> Self {
        Self {
            warning_s: 3.0,
            critical_s: 1.5,
        }
    }
}

#[derive(Default, Debug, Serialize, Deserialize, Validate, Clone)]
pub struct CollisionConfig {
    #[validate(nested)]
    pub thresholds: TtcThresholds,
}

/// Composite lane-change risk weights.
#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct RiskWeights {
    #[validate(range(min = 0.0, max = 1.0))]
    pub distance: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub ttc: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub speed: f64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            distance: 0.2,
            ttc: 0.6,
            speed: 0.2,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct LaneChangeConfig {
    #[validate(nested)]
    pub weights: RiskWeights,

    #[validate(range(min = 1.0))]
    pub max_detection_distance_m: f64,

    #[validate(range(min = 0.1))]
    pub max_relative_speed_mps: f64,

    #[validate(range(min = 0.1))]
    pub min_ttc_s: f64,

    /// Objects whose risk exceeds this are announced.
    #[validate(range(min = 0.0, max = 1.0))]
    pub risk_threshold: f64,

    #[validate(range(min = 0.0, max = 1.0))]
    pub warning_risk: f64,

    #[validate(range(min = 0.0, max = 1.0))]
    pub critical_risk: f64,

    /// Seconds after start before the lane change is initiated.
    #[validate(range(min = 0.0))]
    pub lane_change_delay_s: f64,
}

impl Default for LaneChangeConfig {
    fn default() -> Self {
        Self {
            weights: RiskWeights::default(),
            max_detection_distance_m: 100.0,
            max_relative_speed_mps: 50.0,
            min_ttc_s: 1.0,
            risk_threshold: 0.3,
            warning_risk: 0.4,
            critical_risk: 0.7,
            lane_change_delay_s: 5.0,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct DrowsinessConfig {
    #[validate(range(min = 0.0, max = 1.0))]
    pub warning_level: f64,

    #[validate(range(min = 0.0, max = 1.0))]
    pub critical_level: f64,

    /// Level gained per 10 s of driving.
    #[validate(range(min = 0.0, max = 1.0))]
    pub growth_per_10s: f64,

    /// Upper bound of the uniform noise added on every update.
    #[validate(range(min = 0.0, max = 1.0))]
    pub noise_max: f64,

    pub base_reaction_time_s: f64,

    /// Reaction time added at full drowsiness.
    pub reaction_time_gain_s: f64,
}

impl Default for DrowsinessConfig {
    fn default() -> Self {
        Self {
            warning_level: 0.6,
            critical_level: 0.8,
            growth_per_10s: 0.1,
            noise_max: 0.05,
            base_reaction_time_s: 0.5,
            reaction_time_gain_s: 2.0,
        }
    }
}

/// Speed limit applying beyond `min_distance_m` from the road origin.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct SpeedZone {
    pub min_distance_m: f64,
    pub limit_kmh: f64,
}

impl SpeedZone {
    pub const fn new(min_distance_m: f64, limit_kmh: f64) -> Self {
        Self {
            min_distance_m,
            limit_kmh,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Validate, Clone)]
pub struct SpeedConfig {
    /// Breakpoints, strictly descending by distance.
    #[validate(custom(function = validation::validate_speed_zones))]
    pub zones: Vec<SpeedZone>,

    /// Limit when no zone matches.
    #[validate(range(min = 1.0))]
    pub default_limit_kmh: f64,

    /// Reference point zone distances are measured from.
    pub road_origin_x: f64,
    pub road_origin_y: f64,

    #[validate(range(min = 0.0))]
    pub warning_excess_pct: f64,

    #[validate(range(min = 0.0))]
    pub critical_excess_pct: f64,

    /// Observed speeds older than this are purged.
    #[validate(range(min = 0.0))]
    pub record_ttl_s: f64,
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            zones: vec![
                SpeedZone::new(1000.0, 110.0),
                SpeedZone::new(400.0, 90.0),
                SpeedZone::new(300.0, 70.0),
                SpeedZone::new(200.0, 50.0),
            ],
            default_limit_kmh: 30.0,
            road_origin_x: 0.0,
            road_origin_y: 0.0,
            warning_excess_pct: 10.0,
            critical_excess_pct: 20.0,
            record_ttl_s: 10.0,
        }
    }
}

/// All detection-side parameters.
#[derive(Default, Debug, Serialize, Deserialize, Validate, Clone)]
pub struct DetectionConfig {
    #[validate(nested)]
    pub estimator: EstimatorConfig,

    #[validate(nested)]
    pub collision: CollisionConfig,

    #[validate(nested)]
    pub lane_change: LaneChangeConfig,

    #[validate(nested)]
    pub drowsiness: DrowsinessConfig,

    #[validate(nested)]
    pub speed: SpeedConfig,
}

impl DetectionConfig {
    pub(crate) fn check_consistency(&self) -> Result<(), String> {
        let ttc = &self.collision.thresholds;
        validation::check_descending("collision.thresholds", ttc.warning_s, ttc.critical_s)?;
        validation::check_ascending(
            "lane_change.risk",
            self.lane_change.warning_risk,
            self.lane_change.critical_risk,
        )?;
        validation::check_ascending(
            "drowsiness.level",
            self.drowsiness.warning_level,
            self.drowsiness.critical_level,
        )?;
        validation::check_ascending(
            "speed.excess_pct",
            self.speed.warning_excess_pct,
            self.speed.critical_excess_pct,
        )?;
        Ok(())
    }
}
