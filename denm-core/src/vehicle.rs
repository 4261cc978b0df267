//! Boundary towards the external mobility model.
//!
//! Services read host state through `VehicleController` and actuate speed
//! through it. They never own the vehicle.

use crate::geo::Position;
use crate::station::StationId;

pub trait VehicleController: Send {
    fn station_id(&self) -> StationId;

    /// Identifier used by the mobility model (e.g. a SUMO vehicle id).
    fn mobility_id(&self) -> &str;

    fn position(&self) -> Position;

    /// Current speed in m/s.
    fn speed(&self) -> f64;

    /// Heading in degrees.
    fn heading(&self) -> f64;

    fn lane(&self) -> u8;

    fn is_emergency(&self) -> bool;

    fn set_speed(&mut self, speed: f64);
}
