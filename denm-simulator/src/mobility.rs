//! Kinematic stand-ins for the external mobility model and perception feed.
//!
//! Vehicles drive straight along their heading at constant speed until a
//! reaction changes it. Headings are degrees counter-clockwise from +x.

use std::io;
use std::sync::Arc;

use parking_lot::Mutex;

use denm_core::geo::Position;
use denm_core::station::StationId;
use denm_core::vehicle::VehicleController;
use denm_detection::{ObjectTracker, SensorDetection, TrackedObject};
use denm_engine::SpeedLogSource;

/// Sensor name the ground-truth tracker reports under.
pub const GROUND_TRUTH_SENSOR: &str = "ground_truth";

fn displacement(speed: f64, heading: f64, dt: f64) -> (f64, f64) {
    let rad = heading.to_radians();
    (speed * rad.cos() * dt, speed * rad.sin() * dt)
}

#[derive(Debug, Clone)]
pub struct SimVehicle {
    station: StationId,
    mobility_id: String,
    position: Position,
    speed: f64,
    heading: f64,
    lane: u8,
    emergency: bool,
}

impl SimVehicle {
    pub fn new(
        station: StationId,
        mobility_id: impl Into<String>,
        position: Position,
        speed: f64,
        heading: f64,
    ) -> Self {
        Self {
            station,
            mobility_id: mobility_id.into(),
            position,
            speed,
            heading,
            lane: 0,
            emergency: false,
        }
    }

    pub fn with_lane(mut self, lane: u8) -> Self {
        self.lane = lane;
        self
    }

    pub fn with_emergency(mut self, emergency: bool) -> Self {
        self.emergency = emergency;
        self
    }

    pub fn advance(&mut self, dt: f64) {
        let (dx, dy) = displacement(self.speed, self.heading, dt);
        self.position.x += dx;
        self.position.y += dy;
    }

    /// Speed log line: `timestamp,vehicleId,speed,heading,longitude,latitude`.
    pub fn speed_log_line(&self, now: f64) -> String {
        let geo = self.position.to_geo();
        format!(
            "{now},{},{},{},{},{}",
            self.mobility_id, self.speed, self.heading, geo.longitude, geo.latitude
        )
    }
}

impl VehicleController for SimVehicle {
    fn station_id(&self) -> StationId {
        self.station
    }

    fn mobility_id(&self) -> &str {
        &self.mobility_id
    }

    fn position(&self) -> Position {
        self.position
    }

    fn speed(&self) -> f64 {
        self.speed
    }

    fn heading(&self) -> f64 {
        self.heading
    }

    fn lane(&self) -> u8 {
        self.lane
    }

    fn is_emergency(&self) -> bool {
        self.emergency
    }

    fn set_speed(&mut self, speed: f64) {
        self.speed = speed.max(0.0);
    }
}

/// Non-communicating road user, e.g. a stalled car.
#[derive(Debug, Clone)]
pub struct Obstacle {
    pub id: String,
    pub position: Position,
    pub speed: f64,
    pub heading: f64,
}

impl Obstacle {
    pub fn advance(&mut self, dt: f64) {
        let (dx, dy) = displacement(self.speed, self.heading, dt);
        self.position.x += dx;
        self.position.y += dy;
    }
}

/// Perfect perception within a fixed range, rebuilt for each host and tick.
#[derive(Debug, Clone, Default)]
pub struct GroundTruthTracker {
    objects: Vec<TrackedObject>,
}

impl GroundTruthTracker {
    /// Everything in `scene` within `range_m` of `host`, except `host_id`.
    pub fn observe<'a>(
        scene: impl IntoIterator<Item = (&'a str, Position)>,
        host_id: &str,
        host: Position,
        range_m: f64,
        now: f64,
    ) -> Self {
        let objects = scene
            .into_iter()
            .filter(|(id, position)| *id != host_id && host.distance_to(position) <= range_m)
            .map(|(id, position)| TrackedObject {
                id: id.to_string(),
                position,
                sensors: vec![GROUND_TRUTH_SENSOR.to_string()],
                observed_at: now,
            })
            .collect();
        Self { objects }
    }
}

impl ObjectTracker for GroundTruthTracker {
    fn objects(&self) -> Vec<TrackedObject> {
        self.objects.clone()
    }

    fn detection(&self, sensor: &str, object_id: &str) -> Option<SensorDetection> {
        if sensor != GROUND_TRUTH_SENSOR {
            return None;
        }
        self.objects
            .iter()
            .find(|object| object.id == object_id)
            .map(|object| SensorDetection {
                object_id: object.id.clone(),
                position: object.position,
            })
    }
}

/// In-memory speed log the harness appends to. Reading drains it, so a feed
/// holds only the lines its monitor has not seen yet.
#[derive(Debug, Clone, Default)]
pub struct SharedSpeedLog {
    contents: Arc<Mutex<String>>,
}

impl SharedSpeedLog {
    pub fn line_append(&self, line: &str) {
        let mut contents = self.contents.lock();
        contents.push_str(line);
        contents.push('\n');
    }

    pub fn pending_lines(&self) -> usize {
        self.contents.lock().lines().count()
    }
}

impl SpeedLogSource for SharedSpeedLog {
    fn read_log(&mut self) -> io::Result<String> {
        Ok(std::mem::take(&mut *self.contents.lock()))
    }
}
