//! Family-specific severity mapping on top of the shared estimator.

use denm_config::{DrowsinessConfig, LaneChangeConfig, SpeedConfig, TtcThresholds};
use denm_core::geo::Position;
use denm_protocols::Severity;

const MPS_TO_KMH: f64 = 3.6;

/// Strict comparisons: a TTC equal to a bound falls in the milder class.
pub fn ttc_severity(ttc: f64, thresholds: &TtcThresholds) -> Severity {
    if ttc < thresholds.critical_s {
        Severity::Critical
    } else if ttc < thresholds.warning_s {
        Severity::Warning
    } else {
        Severity::None
    }
}

pub fn lane_change_severity(risk: f64, params: &LaneChangeConfig) -> Severity {
    if risk > params.critical_risk {
        Severity::Critical
    } else if risk > params.warning_risk {
        Severity::Warning
    } else {
        Severity::None
    }
}

pub fn drowsiness_severity(level: f64, params: &DrowsinessConfig) -> Severity {
    if level >= params.critical_level {
        Severity::Critical
    } else if level >= params.warning_level {
        Severity::Warning
    } else {
        Severity::None
    }
}

/// Limit in km/h of the first zone whose breakpoint `position` lies beyond.
pub fn speed_limit_kmh(position: &Position, params: &SpeedConfig) -> f64 {
    let origin = Position::new(params.road_origin_x, params.road_origin_y);
    let distance = origin.distance_to(position);
    params
        .zones
        .iter()
        .find(|zone| distance > zone.min_distance_m)
        .map_or(params.default_limit_kmh, |zone| zone.limit_kmh)
}

/// Percentage by which `speed_mps` exceeds `limit_kmh`; negative when below.
pub fn speed_excess_pct(speed_mps: f64, limit_kmh: f64) -> f64 {
    let speed_kmh = speed_mps * MPS_TO_KMH;
    (speed_kmh - limit_kmh) / limit_kmh * 100.0
}

pub fn speed_severity(excess_pct: f64, params: &SpeedConfig) -> Severity {
    if excess_pct > params.critical_excess_pct {
        Severity::Critical
    } else if excess_pct > params.warning_excess_pct {
        Severity::Warning
    } else {
        Severity::None
    }
}

pub fn kmh_to_mps(kmh: f64) -> f64 {
    kmh / MPS_TO_KMH
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttc_classes() {
        let thresholds = TtcThresholds::default();
        assert_eq!(ttc_severity(0.5, &thresholds), Severity::Critical);
        assert_eq!(ttc_severity(2.0, &thresholds), Severity::Warning);
        assert_eq!(ttc_severity(10.0, &thresholds), Severity::None);
        assert_eq!(ttc_severity(f64::INFINITY, &thresholds), Severity::None);
        assert_eq!(ttc_severity(1.5, &thresholds), Severity::Warning);
        assert_eq!(ttc_severity(3.0, &thresholds), Severity::None);
    }

    #[test]
    fn lane_change_classes() {
        let params = LaneChangeConfig::default();
        assert_eq!(lane_change_severity(0.8, &params), Severity::Critical);
        assert_eq!(lane_change_severity(0.5, &params), Severity::Warning);
        assert_eq!(lane_change_severity(0.35, &params), Severity::None);
    }

    #[test]
    fn drowsiness_classes() {
        let params = DrowsinessConfig::default();
        assert_eq!(drowsiness_severity(0.85, &params), Severity::Critical);
        assert_eq!(drowsiness_severity(0.6, &params), Severity::Warning);
        assert_eq!(drowsiness_severity(0.2, &params), Severity::None);
    }

    #[test]
    fn speed_zones() {
        let params = SpeedConfig::default();
        assert_eq!(speed_limit_kmh(&Position::new(1500.0, 0.0), &params), 110.0);
        assert_eq!(speed_limit_kmh(&Position::new(500.0, 0.0), &params), 90.0);
        assert_eq!(speed_limit_kmh(&Position::new(350.0, 0.0), &params), 70.0);
        assert_eq!(speed_limit_kmh(&Position::new(250.0, 0.0), &params), 50.0);
        assert_eq!(speed_limit_kmh(&Position::new(150.0, 0.0), &params), 30.0);
        assert_eq!(speed_limit_kmh(&Position::new(200.0, 0.0), &params), 30.0);
    }

    #[test]
    fn speed_excess_classes() {
        let params = SpeedConfig::default();
        // 30 km/h zone: 10 m/s = 36 km/h, 20% over.
        let excess = speed_excess_pct(10.0, 30.0);
        assert!((excess - 20.0).abs() < 1e-9);
        assert_eq!(speed_severity(25.0, &params), Severity::Critical);
        assert_eq!(speed_severity(15.0, &params), Severity::Warning);
        assert_eq!(speed_severity(5.0, &params), Severity::None);
        assert_eq!(speed_severity(-40.0, &params), Severity::None);
        assert!((kmh_to_mps(36.0) - 10.0).abs() < 1e-12);
    }
}
