//! ## denm-core::geo
//! **Flat positions and geographic broadcast areas**
//!
//! All relevance decisions use flat Euclidean distance in the mobility
//! model's metre plane. The lat/long conversion is the small-area
//! approximation used for broadcast destinations and is not geodesic.

use serde::{Deserialize, Serialize};

/// Metres per degree used for the flat to WGS84 approximation.
pub const METERS_PER_DEGREE: f64 = 111_319.9;

/// Position in the mobility model's metre plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Position) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Approximate geographic position (x maps to latitude, y to longitude).
    pub fn to_geo(&self) -> GeoPosition {
        GeoPosition {
            latitude: self.x / METERS_PER_DEGREE,
            longitude: self.y / METERS_PER_DEGREE,
        }
    }
}

/// Geographic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPosition {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPosition {
    pub fn to_flat(&self) -> Position {
        Position {
            x: self.latitude * METERS_PER_DEGREE,
            y: self.longitude * METERS_PER_DEGREE,
        }
    }
}

/// Destination area of a geo-area broadcast. The centre stays in the metre
/// plane so membership is decided on exact distances; the boundary is
/// inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GeoArea {
    Circle { center: Position, radius_m: f64 },
}

impl GeoArea {
    pub fn circle(center: Position, radius_m: f64) -> Self {
        GeoArea::Circle { center, radius_m }
    }

    /// Centre in degrees, as announced on the air.
    pub fn center_geo(&self) -> GeoPosition {
        match self {
            GeoArea::Circle { center, .. } => center.to_geo(),
        }
    }

    pub fn contains(&self, position: &Position) -> bool {
        match self {
            GeoArea::Circle { center, radius_m } => center.distance_to(position) <= *radius_m,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn distance_is_euclidean() {
        let a = Position::new(0.0, 0.0);
        let b = Position::new(3.0, 4.0);
        assert_eq!(a.distance_to(&b), 5.0);
        assert_eq!(b.distance_to(&a), 5.0);
    }

    #[test]
    fn geo_conversion_divides_by_meters_per_degree() {
        let geo = Position::new(111_319.9, 222_639.8).to_geo();
        assert!((geo.latitude - 1.0).abs() < 1e-12);
        assert!((geo.longitude - 2.0).abs() < 1e-12);
    }

    #[test]
    fn circle_contains_points_within_radius() {
        let area = GeoArea::circle(Position::new(1000.0, 0.0), 500.0);
        assert!(area.contains(&Position::new(1400.0, 0.0)));
        assert!(!area.contains(&Position::new(1600.0, 0.0)));
    }

    #[test]
    fn circle_boundary_is_inclusive() {
        // 300 m does not survive a round trip through degrees exactly.
        let area = GeoArea::circle(Position::new(300.0, 0.0), 1000.0);
        assert!(area.contains(&Position::new(1300.0, 0.0)));
        assert!(area.contains(&Position::new(300.0, -1000.0)));
        assert!(!area.contains(&Position::new(1300.000_001, 0.0)));
        assert!((area.center_geo().latitude - 300.0 / METERS_PER_DEGREE).abs() < 1e-15);
    }

    proptest! {
        #[test]
        fn circle_membership_follows_distance(
            cx in -1.0e4f64..1.0e4,
            cy in -1.0e4f64..1.0e4,
            px in -1.0e4f64..1.0e4,
            py in -1.0e4f64..1.0e4,
            radius in 0.0f64..5.0e3,
        ) {
            let center = Position::new(cx, cy);
            let point = Position::new(px, py);
            let area = GeoArea::circle(center, radius);
            prop_assert_eq!(center.distance_to(&point), point.distance_to(&center));
            prop_assert_eq!(area.contains(&point), center.distance_to(&point) <= radius);
            prop_assert!(area.contains(&center));
        }

        #[test]
        fn geo_conversion_is_nearly_lossless(x in -1.0e5f64..1.0e5, y in -1.0e5f64..1.0e5) {
            let back = Position::new(x, y).to_geo().to_flat();
            prop_assert!((back.x - x).abs() < 1e-6);
            prop_assert!((back.y - y).abs() < 1e-6);
        }
    }
}
