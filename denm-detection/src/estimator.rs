//! ## denm-detection::estimator
//! **Time-to-collision and composite risk from tracked-object histories**
//!
//! One estimator per host vehicle. Histories are keyed by tracker object id,
//! created on first sight and kept for the lifetime of the estimator.
//!
//! ### Expectations:
//! - TTC is always in `(0, +inf]`; `+inf` whenever it cannot be resolved
//! - Composite risk is always in `[0, 1]`

use std::collections::HashMap;

use tracing::trace;

use denm_config::{EstimatorConfig, LaneChangeConfig};
use denm_core::geo::Position;

use crate::history::ObjectHistory;
use crate::tracker::{ObjectTracker, TrackedObject};

/// Host state the estimate is relative to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostKinematics {
    pub position: Position,
    pub speed: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TtcEstimate {
    pub ttc: f64,
    pub distance: f64,
    pub relative_speed: f64,
    pub object_position: Option<Position>,
}

impl TtcEstimate {
    /// No sensor or no resolvable detection.
    pub fn unresolved() -> Self {
        Self {
            ttc: f64::INFINITY,
            distance: f64::INFINITY,
            relative_speed: 0.0,
            object_position: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.object_position.is_some()
    }
}

pub struct RiskEstimator {
    config: EstimatorConfig,
    histories: HashMap<String, ObjectHistory>,
}

impl RiskEstimator {
    pub fn new(config: EstimatorConfig) -> Self {
        Self {
            config,
            histories: HashMap::new(),
        }
    }

    /// TTC of `object` relative to the host at sim time `now`.
    pub fn time_to_collision(
        &mut self,
        now: f64,
        host: &HostKinematics,
        object: &TrackedObject,
        tracker: &dyn ObjectTracker,
    ) -> TtcEstimate {
        let Some(sensor) = object.sensors.first() else {
            trace!(object = %object.id, "No reporting sensor");
            return TtcEstimate::unresolved();
        };
        let Some(detection) = tracker.detection(sensor, &object.id) else {
            trace!(object = %object.id, sensor = %sensor, "Detection did not resolve");
            return TtcEstimate::unresolved();
        };

        let capacity = self.config.history_capacity;
        let history = self
            .histories
            .entry(object.id.clone())
            .or_insert_with(|| ObjectHistory::with_capacity(capacity));
        history.observation_record(now, detection.position);
        let object_speed =
            history.speed_smooth(self.config.smoothing_alpha, self.config.max_speed_mps);

        let distance = host.position.distance_to(&detection.position);
        let relative_speed = (object_speed - host.speed).abs();
        let ttc = time_to_collision(distance, relative_speed);

        trace!(
            object = %object.id,
            distance,
            object_speed,
            relative_speed,
            ttc,
            "TTC estimated"
        );

        TtcEstimate {
            ttc,
            distance,
            relative_speed,
            object_position: Some(detection.position),
        }
    }

    /// Weighted lane-change risk clamped to `[0, 1]`.
    pub fn composite_risk(&self, estimate: &TtcEstimate, params: &LaneChangeConfig) -> f64 {
        let distance_term = 1.0 - (estimate.distance / params.max_detection_distance_m).min(1.0);
        let ttc_term = if estimate.ttc < params.min_ttc_s {
            1.0
        } else {
            params.min_ttc_s / estimate.ttc
        };
        let speed_term = (estimate.relative_speed / params.max_relative_speed_mps).min(1.0);

        let risk = params.weights.distance * distance_term
            + params.weights.ttc * ttc_term
            + params.weights.speed * speed_term;
        risk.clamp(0.0, 1.0)
    }

    pub fn history(&self, object_id: &str) -> Option<&ObjectHistory> {
        self.histories.get(object_id)
    }

    pub fn tracked_count(&self) -> usize {
        self.histories.len()
    }
}

/// `distance / relative_speed`, `+inf` when the gap is not closing.
pub fn time_to_collision(distance: f64, relative_speed: f64) -> f64 {
    if relative_speed <= 0.0 || !distance.is_finite() {
        f64::INFINITY
    } else {
        distance / relative_speed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::SensorDetection;
    use proptest::prelude::*;
    use std::collections::HashMap;

    struct FixedTracker {
        detections: HashMap<(String, String), Position>,
    }

    impl FixedTracker {
        fn seeing(object: &str, at: Position) -> Self {
            let mut detections = HashMap::new();
            detections.insert(("front".to_string(), object.to_string()), at);
            Self { detections }
        }
    }

    impl ObjectTracker for FixedTracker {
        fn objects(&self) -> Vec<TrackedObject> {
            Vec::new()
        }

        fn detection(&self, sensor: &str, object_id: &str) -> Option<SensorDetection> {
            self.detections
                .get(&(sensor.to_string(), object_id.to_string()))
                .map(|position| SensorDetection {
                    object_id: object_id.to_string(),
                    position: *position,
                })
        }
    }

    fn object(id: &str, sensors: &[&str]) -> TrackedObject {
        TrackedObject {
            id: id.to_string(),
            position: Position::default(),
            sensors: sensors.iter().map(|s| s.to_string()).collect(),
            observed_at: 0.0,
        }
    }

    #[test]
    fn no_sensor_is_infinite() {
        let mut estimator = RiskEstimator::new(EstimatorConfig::default());
        let tracker = FixedTracker::seeing("obj", Position::new(10.0, 0.0));
        let host = HostKinematics {
            position: Position::default(),
            speed: 20.0,
        };
        let estimate = estimator.time_to_collision(0.0, &host, &object("obj", &[]), &tracker);
        assert!(estimate.ttc.is_infinite());
        assert!(!estimate.is_resolved());
        assert_eq!(estimator.tracked_count(), 0);
    }

    #[test]
    fn unresolved_detection_is_infinite() {
        let mut estimator = RiskEstimator::new(EstimatorConfig::default());
        let tracker = FixedTracker::seeing("other", Position::new(10.0, 0.0));
        let host = HostKinematics {
            position: Position::default(),
            speed: 20.0,
        };
        let estimate =
            estimator.time_to_collision(0.0, &host, &object("obj", &["front"]), &tracker);
        assert!(estimate.ttc.is_infinite());
    }

    #[test]
    fn stationary_object_ahead_of_moving_host() {
        let mut estimator = RiskEstimator::new(EstimatorConfig::default());
        let tracker = FixedTracker::seeing("obj", Position::new(20.0, 0.0));
        let host = HostKinematics {
            position: Position::default(),
            speed: 20.0,
        };
        let estimate =
            estimator.time_to_collision(0.0, &host, &object("obj", &["front"]), &tracker);
        assert!((estimate.ttc - 1.0).abs() < 1e-12);
        assert_eq!(estimate.distance, 20.0);
        assert_eq!(estimator.history("obj").map(|h| h.len()), Some(1));
    }

    #[test]
    fn equal_speeds_never_collide() {
        let mut estimator = RiskEstimator::new(EstimatorConfig::default());
        let tracker = FixedTracker::seeing("obj", Position::new(20.0, 0.0));
        let host = HostKinematics {
            position: Position::default(),
            speed: 0.0,
        };
        let estimate =
            estimator.time_to_collision(0.0, &host, &object("obj", &["front"]), &tracker);
        assert!(estimate.ttc.is_infinite());
    }

    #[test]
    fn composite_risk_defaults() {
        let estimator = RiskEstimator::new(EstimatorConfig::default());
        let params = LaneChangeConfig::default();

        let imminent = TtcEstimate {
            ttc: 0.5,
            distance: 0.0,
            relative_speed: 100.0,
            object_position: Some(Position::default()),
        };
        assert!((estimator.composite_risk(&imminent, &params) - 1.0).abs() < 1e-12);

        let far = TtcEstimate::unresolved();
        assert_eq!(estimator.composite_risk(&far, &params), 0.0);

        let medium = TtcEstimate {
            ttc: 2.0,
            distance: 50.0,
            relative_speed: 25.0,
            object_position: Some(Position::default()),
        };
        // 0.2 * 0.5 + 0.6 * 0.5 + 0.2 * 0.5
        assert!((estimator.composite_risk(&medium, &params) - 0.5).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn ttc_is_positive_or_infinite(distance in 0.001f64..10_000.0, relative in 0.0f64..200.0) {
            let ttc = time_to_collision(distance, relative);
            prop_assert!(ttc > 0.0);
            if relative == 0.0 {
                prop_assert!(ttc.is_infinite());
            }
        }

        #[test]
        fn composite_risk_is_bounded(
            distance in 0.0f64..1_000.0,
            ttc in 0.001f64..1_000.0,
            relative in 0.0f64..500.0,
        ) {
            let estimator = RiskEstimator::new(EstimatorConfig::default());
            let estimate = TtcEstimate {
                ttc,
                distance,
                relative_speed: relative,
                object_position: Some(Position::default()),
            };
            let risk = estimator.composite_risk(&estimate, &LaneChangeConfig::default());
            prop_assert!((0.0..=1.0).contains(&risk));
        }
    }
}
