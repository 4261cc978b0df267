//! ## denm-detection::tracker
//! **Adapter over the external perception feed**
//!
//! The tracker is owned by the environment (sensor fusion, a simulator's
//! ground truth). This crate only reads from it.

use denm_core::geo::Position;

/// Object as reported by the external tracker for the current tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedObject {
    /// Tracker-assigned id, stable across ticks.
    pub id: String,
    /// Centre point at the last update.
    pub position: Position,
    /// Sensors currently reporting this object, in priority order.
    pub sensors: Vec<String>,
    /// Sim time of the last observation.
    pub observed_at: f64,
}

/// One sensor's current view of an object.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorDetection {
    pub object_id: String,
    pub position: Position,
}

pub trait ObjectTracker {
    /// Objects currently tracked around the host.
    fn objects(&self) -> Vec<TrackedObject>;

    /// Current detection of `object_id` by `sensor`, if the sensor sees it.
    fn detection(&self, sensor: &str, object_id: &str) -> Option<SensorDetection>;
}
